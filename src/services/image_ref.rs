use base64::Engine;
use image::ImageFormat;
use std::path::Path;

/// Largest reference image accepted for inline upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Encode image bytes as a `data:` URI usable as `image_url`.
pub fn to_data_uri(bytes: &[u8]) -> Result<String, ImageRefError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageRefError::TooLarge(bytes.len()));
    }

    let format = image::guess_format(bytes).map_err(|_| ImageRefError::Unsupported)?;
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        _ => return Err(ImageRefError::Unsupported),
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

/// Resolve a reference image argument: URLs pass through, anything else is
/// read from disk and inlined.
pub fn resolve_image_arg(arg: &str) -> Result<String, ImageRefError> {
    if arg.starts_with("http://") || arg.starts_with("https://") || arg.starts_with("data:") {
        return Ok(arg.to_string());
    }
    let bytes = std::fs::read(Path::new(arg))?;
    to_data_uri(&bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum ImageRefError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported image format (expected PNG, JPEG, WebP or GIF)")]
    Unsupported,

    #[error("Image is too large ({0} bytes)")]
    TooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_png_data_uri() {
        let uri = to_data_uri(PNG_HEADER).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_rejects_non_image() {
        assert!(matches!(
            to_data_uri(b"plain text"),
            Err(ImageRefError::Unsupported)
        ));
    }

    #[test]
    fn test_urls_pass_through() {
        assert_eq!(
            resolve_image_arg("https://x/ref.jpg").unwrap(),
            "https://x/ref.jpg"
        );
    }

    #[test]
    fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");
        std::fs::write(&path, PNG_HEADER).unwrap();
        let uri = resolve_image_arg(path.to_str().unwrap()).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
