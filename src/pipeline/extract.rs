//! Extraction boundary: one [`Document`] in, one [`ParsedResult`] out.
//!
//! The workflow only ever talks to [`Extractor`], so a real OCR engine can
//! replace [`PlaceholderExtractor`] through
//! [`crate::workflow::Workflow::with_extractor`] without touching the
//! parse-and-persist sequence above it.

use crate::document::{format_size, Dimension, Document, ParsedMetadata, ParsedResult};

/// Derives a [`ParsedResult`] from a staged [`Document`].
///
/// Implementations must be pure with respect to the document: the same
/// input yields the same output.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document) -> ParsedResult;
}

/// Fabricates metadata without looking at the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderExtractor;

impl Extractor for PlaceholderExtractor {
    fn extract(&self, document: &Document) -> ParsedResult {
        ParsedResult {
            filename: document.name.clone(),
            mime_type: document.mime_type.clone(),
            size: format_size(document.size),
            uploaded_at: document.uploaded_at,
            extracted_text: format!("[Parsed content from {}]", document.name),
            metadata: ParsedMetadata {
                width: Dimension::unknown(),
                height: Dimension::unknown(),
                format: document.subtype().to_string(),
            },
        }
    }
}

/// Run `extractor` over every document, preserving order.
pub fn extract_all(extractor: &dyn Extractor, documents: &[Document]) -> Vec<ParsedResult> {
    documents.iter().map(|d| extractor.extract(d)).collect()
}
