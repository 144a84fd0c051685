use crate::error::{GenFillError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Fallback MIME type for attachments whose type cannot be inferred.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Inline media in `data:<mimetype>;base64,<payload>` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(DATA_PREFIX)
            .ok_or_else(|| GenFillError::RequestError("media is not a data URI".into()))?;

        let (mime_type, data) = rest.split_once(BASE64_MARKER).ok_or_else(|| {
            GenFillError::RequestError("data URI is not base64 encoded".into())
        })?;

        if mime_type.is_empty() {
            return Err(GenFillError::RequestError(
                "data URI does not declare a MIME type".into(),
            ));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| GenFillError::ResponseError(format!("invalid base64 payload: {}", e)))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", DATA_PREFIX, self.mime_type, BASE64_MARKER, self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        None
    }
}

/// Picks the MIME type for an attachment: the file extension wins, then the
/// content itself, then `application/octet-stream`. Nothing is rejected.
pub fn infer_mime_type(file_name: Option<&str>, bytes: &[u8]) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .and_then(|(_, ext)| ImageFormat::from_extension(ext))
        .or_else(|| ImageFormat::from_magic_bytes(bytes))
        .map(|format| format.mime_type().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}
