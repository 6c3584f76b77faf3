//! Media type sniffing for files picked from disk.

/// Fallback for bytes that are not a recognised image.
pub const OCTET_STREAM: &str = "application/octet-stream";

pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Declared media type for a file, `application/octet-stream` if unknown.
pub fn media_type_for(bytes: &[u8]) -> &'static str {
    detect_image_mime(bytes).unwrap_or_else(|| {
        tracing::warn!(
            "Unrecognized image format (first 4 bytes: {:02X?})",
            &bytes[..bytes.len().min(4)]
        );
        OCTET_STREAM
    })
}
