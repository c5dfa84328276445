//! Staged documents and the results derived from them.
//!
//! Field names on the wire follow the JSON the upload page has always
//! produced (`type`, `uploadedAt`, `extractedText`), so snapshots written by
//! older clients still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Identity of a staged document.
///
/// A UUID v7: millisecond timestamp prefix plus random bits, so two files
/// staged in the same millisecond still get distinct ids.
///
/// The upload page stored ids as `Date.now() + Math.random()`; such numeric
/// ids are accepted on load and replaced by a fresh UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Uuid(Uuid),
            Legacy(f64),
        }

        match WireId::deserialize(deserializer)? {
            WireId::Uuid(id) => Ok(Self(id)),
            WireId::Legacy(n) => {
                debug!("Replacing numeric document id {n}");
                Ok(Self::new())
            }
        }
    }
}

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A staged file plus its encoded content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size of the source file in bytes.
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// MIME subtype, e.g. `png` for `image/png`.
    pub fn subtype(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or("")
    }
}

/// Width or height reported in [`ParsedMetadata`].
///
/// The placeholder extractor cannot measure anything and reports `"N/A"`;
/// an engine that decodes the image reports pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Pixels(u32),
    Label(String),
}

impl Dimension {
    pub fn unknown() -> Self {
        Dimension::Label("N/A".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetadata {
    pub width: Dimension,
    pub height: Dimension,
    pub format: String,
}

/// Summary record derived from one [`Document`] by the parse step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResult {
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Kibibytes with two decimals, e.g. `"2.00 KB"`.
    pub size: String,
    pub uploaded_at: DateTime<Utc>,
    pub extracted_text: String,
    pub metadata: ParsedMetadata,
}

/// Format a byte count as kibibytes with two decimals.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// `true` for `image/*` and `application/pdf`.
pub fn is_supported_type(mime_type: &str) -> bool {
    mime_type.starts_with("image/") || mime_type == "application/pdf"
}
