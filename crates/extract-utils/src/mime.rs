//! Media type helpers for package parts.

/// Whether an OPF manifest media type denotes an (X)HTML chapter.
pub fn is_html(media_type: &str) -> bool {
    media_type.to_ascii_lowercase().contains("html")
}

/// Standard file extension for an image media type.
pub fn image_extension(mime: &str) -> Option<&'static str> {
    let ext = match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" | "image/x-bmp" => "bmp",
        "image/tiff" => "tif",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        "image/x-emf" | "image/emf" => "emf",
        "image/x-wmf" | "image/wmf" => "wmf",
        _ => return None,
    };
    Some(ext)
}
