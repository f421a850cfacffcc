//! Generation gateways for the image and audio endpoints.
//!
//! Both adapters send the same `{ "message": text }` body and differ only in
//! how the response is decoded. Gateways hold no workflow state; results are
//! written into stage state by the caller.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::api::errors::summarize_api_error;
use crate::api::GenerationRequest;
use crate::core::media::{sniff_image_mime, MediaKind, MediaPayload, DEFAULT_AUDIO_MIME};

#[derive(Debug)]
pub enum GatewayError {
    /// The endpoint could not be reached or timed out.
    Transport(reqwest::Error),
    /// The endpoint answered with a non-success status.
    Endpoint {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The body did not have the expected payload shape.
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(source) if source.is_timeout() => {
                write!(f, "request timed out: {source}")
            }
            GatewayError::Transport(source) => write!(f, "request failed: {source}"),
            GatewayError::Endpoint { status, body } => {
                write!(f, "endpoint returned {status}: {}", summarize_api_error(body))
            }
            GatewayError::Decode(reason) => write!(f, "could not decode response: {reason}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Transport(source) => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        GatewayError::Transport(value)
    }
}

#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn generate_image(&self, text: &str) -> Result<MediaPayload, GatewayError>;

    async fn generate_audio(&self, text: &str) -> Result<MediaPayload, GatewayError>;

    async fn generate(&self, kind: MediaKind, text: &str) -> Result<MediaPayload, GatewayError> {
        match kind {
            MediaKind::Image => self.generate_image(text).await,
            MediaKind::Audio => self.generate_audio(text).await,
        }
    }
}

pub struct HttpMediaGateway {
    client: reqwest::Client,
    image_url: String,
    audio_url: String,
    api_key: Option<String>,
}

impl HttpMediaGateway {
    pub fn new(
        client: reqwest::Client,
        image_url: String,
        audio_url: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            image_url,
            audio_url,
            api_key,
        }
    }

    async fn post(
        &self,
        kind: MediaKind,
        url: &str,
        text: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        debug!(kind = kind.label(), %url, chars = text.len(), "sending generation request");
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .json(&GenerationRequest { message: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            warn!(kind = kind.label(), %status, "generation endpoint returned an error");
            return Err(GatewayError::Endpoint { status, body });
        }
        Ok(response)
    }
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

#[async_trait]
impl MediaGateway for HttpMediaGateway {
    async fn generate_image(&self, text: &str) -> Result<MediaPayload, GatewayError> {
        let response = self.post(MediaKind::Image, &self.image_url, text).await?;
        let content_type = content_type(&response);
        let body = response.bytes().await?;
        decode_image_body(&body, content_type.as_deref())
    }

    async fn generate_audio(&self, text: &str) -> Result<MediaPayload, GatewayError> {
        let response = self.post(MediaKind::Audio, &self.audio_url, text).await?;
        let content_type = content_type(&response);
        let body = response.bytes().await?;
        decode_audio_body(body.to_vec(), content_type.as_deref())
    }
}

const IMAGE_FIELD_POINTERS: &[&str] = &["/image", "/b64_json", "/data", "/data/0/b64_json", "/url"];

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

/// Pull the encoded image string out of a JSON body: either a bare string or
/// the first string found at one of the known field locations.
fn encoded_image_from_json(value: &serde_json::Value) -> Option<&str> {
    if let Some(encoded) = value.as_str() {
        return Some(encoded);
    }
    IMAGE_FIELD_POINTERS
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(|v| v.as_str()))
}

/// Split an optional `data:<mime>;base64,` prefix from the encoded bytes.
fn split_data_url(encoded: &str) -> (Option<&str>, &str) {
    let trimmed = encoded.trim();
    if let Some(rest) = trimmed.strip_prefix("data:") {
        if let Some((header, data)) = rest.split_once(',') {
            let mime = header
                .split(';')
                .next()
                .filter(|mime| !mime.is_empty());
            return (mime, data);
        }
    }
    (None, trimmed)
}

pub fn decode_image_body(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<MediaPayload, GatewayError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| GatewayError::Decode("image body is not UTF-8 base64 text".to_string()))?;

    let parsed_json = if is_json(content_type) || text.trim_start().starts_with(['{', '"']) {
        Some(
            serde_json::from_str::<serde_json::Value>(text)
                .map_err(|e| GatewayError::Decode(format!("invalid JSON body: {e}")))?,
        )
    } else {
        None
    };

    let encoded = match parsed_json.as_ref() {
        Some(value) => encoded_image_from_json(value).ok_or_else(|| {
            GatewayError::Decode("JSON body has no image field".to_string())
        })?,
        None => text,
    };

    let (declared_mime, data) = split_data_url(encoded);
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(GatewayError::Decode("image data is empty".to_string()));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| GatewayError::Decode(format!("invalid base64 image data: {e}")))?;

    let mime = declared_mime
        .map(str::to_owned)
        .or_else(|| sniff_image_mime(&bytes).map(str::to_owned))
        .unwrap_or_else(|| MediaKind::Image.default_mime().to_string());

    Ok(MediaPayload::new(bytes, mime))
}

pub fn decode_audio_body(
    body: Vec<u8>,
    content_type: Option<&str>,
) -> Result<MediaPayload, GatewayError> {
    if body.is_empty() {
        return Err(GatewayError::Decode("audio body is empty".to_string()));
    }
    if is_json(content_type) {
        return Err(GatewayError::Decode(format!(
            "expected an audio stream, got {}",
            content_type.unwrap_or_default()
        )));
    }

    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_string())
        .filter(|ct| ct.starts_with("audio/"))
        .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string());

    Ok(MediaPayload::new(body, mime))
}

#[cfg(test)]
mod tests;
