//! Content encoding for the contents API (base64, standard alphabet).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode UTF-8 text for transport.
pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode transported content back to text.
///
/// GitHub wraps the base64 it returns with newlines, so whitespace is ignored. Content that is
/// not valid base64 or not valid UTF-8 decodes to an empty string instead of failing the request.
pub fn decode_content(encoded: &str) -> String {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|e| {
            log::debug!("stored content is not utf-8: {}", e);
            String::new()
        }),
        Err(e) => {
            log::debug!("stored content is not base64: {}", e);
            String::new()
        }
    }
}
