//! Attachments travel inline as `data:` URLs so the message stays
//! self-contained.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::{Result, SyncError};

/// Text content sent alongside an attachment.
pub const PHOTO_CAPTION: &str = "📷 Photo";

/// Read `path` and encode it as a `data:` URL.
pub async fn encode_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_data_url(mime_for(path), &bytes))
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, B64.encode(bytes))
}

/// Split a base64 `data:` URL back into its media type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SyncError::Media("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SyncError::Media("missing payload separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| SyncError::Media("payload is not base64".into()))?;
    let bytes = B64
        .decode(payload)
        .map_err(|e| SyncError::Media(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}

pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
