//! Data-URI encoding: raw file bytes ⇄ `data:<mime>;base64,<payload>`.
//!
//! Staged documents carry their full content inline so the batch can be
//! submitted as a single JSON body and restored from a snapshot without the
//! source files.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*),(?P<payload>.*)$").unwrap()
});

/// Encode `bytes` as a base64 data URI of the given MIME type.
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    format!("data:{mime_type};base64,{b64}")
}

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Failure to decode a data URI or bare base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(String),
    #[error("data URI is not base64-encoded")]
    NotBase64,
}

/// Decode a data URI. A bare base64 string (no `data:` prefix) is accepted
/// too, with an empty MIME type.
pub fn decode_data_uri(input: &str) -> Result<DecodedPayload, DecodeError> {
    let (mime_type, payload) = match DATA_URI.captures(input) {
        Some(caps) => {
            let params = caps.name("params").map_or("", |m| m.as_str());
            if !params.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(DecodeError::NotBase64);
            }
            (
                caps.name("mime").map_or("", |m| m.as_str()).to_string(),
                caps.name("payload").map_or("", |m| m.as_str()),
            )
        }
        None => (String::new(), input),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    Ok(DecodedPayload { mime_type, bytes })
}
