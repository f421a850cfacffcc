//! Binary media produced by the generation gateways.

use std::io::{self, Write};
use std::path::Path;

use tempfile::TempPath;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }

    pub fn default_mime(self) -> &'static str {
        match self {
            MediaKind::Image => DEFAULT_IMAGE_MIME,
            MediaKind::Audio => DEFAULT_AUDIO_MIME,
        }
    }
}

/// Raw bytes plus the MIME type they were delivered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    bytes: Vec<u8>,
    mime: String,
}

impl MediaPayload {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime)
    }

    /// Write the payload to a temporary file that lives as long as the
    /// returned handle.
    pub fn materialize(&self) -> io::Result<MediaFile> {
        let mut file = tempfile::Builder::new()
            .prefix("recipecast-")
            .suffix(&format!(".{}", self.extension()))
            .tempfile()?;
        file.write_all(&self.bytes)?;
        file.as_file_mut().sync_all()?;
        Ok(MediaFile {
            path: file.into_temp_path(),
        })
    }
}

/// A payload written to disk, addressable by a `file://` URL.
#[derive(Debug)]
pub struct MediaFile {
    path: TempPath,
}

impl MediaFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// A gateway result as held in stage state: the payload and, when it could be
/// written out, the file that makes it openable.
#[derive(Debug)]
pub struct MediaAsset {
    payload: MediaPayload,
    file: Option<MediaFile>,
}

impl MediaAsset {
    pub fn new(payload: MediaPayload, file: Option<MediaFile>) -> Self {
        Self { payload, file }
    }

    /// Materialize the payload, keeping it in memory only if the write fails.
    pub fn from_payload(payload: MediaPayload) -> Self {
        let file = match payload.materialize() {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(mime = payload.mime(), "could not write media to disk: {e}");
                None
            }
        };
        Self { payload, file }
    }

    pub fn payload(&self) -> &MediaPayload {
        &self.payload
    }

    pub fn file(&self) -> Option<&MediaFile> {
        self.file.as_ref()
    }

    pub fn url(&self) -> Option<String> {
        self.file.as_ref().map(MediaFile::url)
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/aac" => "aac",
        "audio/flac" => "flac",
        "audio/webm" => "webm",
        _ => "bin",
    }
}

/// Guess an image MIME type from magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Human-readable byte count for the status panels.
pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let value = bytes as f64;
    if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_image_formats() {
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(
            sniff_image_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]),
            Some("image/png")
        );
        assert_eq!(sniff_image_mime(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_mime(b"hello"), None);
    }

    #[test]
    fn extensions_ignore_parameters_and_case() {
        assert_eq!(extension_for_mime("audio/MPEG; charset=binary"), "mp3");
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("application/octet-stream"), "bin");
    }

    #[test]
    fn materialized_file_holds_bytes_until_dropped() {
        let payload = MediaPayload::new(vec![1, 2, 3], "audio/mpeg");
        let file = payload.materialize().expect("write temp file");
        let path = file.path().to_path_buf();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert!(path.to_string_lossy().ends_with(".mp3"));
        assert!(file.url().starts_with("file://"));

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
