//! Converting binary data to a `data:` URL, for inline image previews.

use base64::{Engine as _, prelude::BASE64_STANDARD};

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// Guess the MIME type of an image, preferring the actual bytes over the
/// file name the browser sent us.
pub fn sniff_image_mime_type(data: &[u8], file_name: Option<&str>) -> String {
    if let Some(kind) = infer::get(data) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return kind.mime_type().to_owned();
        }
    }
    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|mime| mime.essence_str().to_owned())
        .unwrap_or_else(|| "application/octet-stream".to_owned())
}
