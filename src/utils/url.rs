//! Endpoint URL assembly.
//!
//! Base URLs come from config, the environment or the command line, and are
//! joined with relative endpoint paths without doubling slashes.

/// Strip trailing slashes from a base URL.
///
/// ```
/// use recipecast::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:3000/"), "http://localhost:3000");
/// assert_eq!(normalize_base_url("http://localhost:3000///"), "http://localhost:3000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path.
///
/// ```
/// use recipecast::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:3000/", "/api/images"),
///     "http://localhost:3000/api/images"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim().trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Whether the value parses as an absolute http(s) URL.
pub fn is_http_url(value: &str) -> bool {
    reqwest::Url::parse(value.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes_and_whitespace() {
        assert_eq!(
            normalize_base_url("http://localhost:3000"),
            "http://localhost:3000"
        );
        assert_eq!(
            normalize_base_url(" https://recipes.example.com/app/ "),
            "https://recipes.example.com/app"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn construct_joins_without_double_slashes() {
        assert_eq!(
            construct_api_url("http://localhost:3000", "api/chat"),
            "http://localhost:3000/api/chat"
        );
        assert_eq!(
            construct_api_url("http://localhost:3000///", "///api/audio"),
            "http://localhost:3000/api/audio"
        );
        assert_eq!(
            construct_api_url("https://recipes.example.com/app/", "/api/images"),
            "https://recipes.example.com/app/api/images"
        );
    }

    #[test]
    fn only_absolute_http_urls_are_accepted() {
        assert!(is_http_url("http://localhost:3000"));
        assert!(is_http_url("https://recipes.example.com/app"));
        assert!(!is_http_url("localhost:3000"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url(""));
    }
}
