//! Codec errors.

use foldermap_core::ValueType;
use thiserror::Error;

/// Errors raised by decoders and encoders.
///
/// The dispatcher never produces these on its own: an unknown type falls
/// back to raw text, a missing encoder to plain string conversion.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Text forced to a numeric type does not parse.
    #[error("Invalid {target} literal: '{text}'")]
    InvalidNumber { text: String, target: ValueType },

    /// A map nested below a section cannot be written as INI.
    #[error("Section '{path}' is nested more than one level deep")]
    SectionTooDeep { path: String },

    /// A document did not decode to a map.
    #[error("Expected a map document, found {found}")]
    NotAMap { found: ValueType },

    /// JSON syntax or serialisation error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
