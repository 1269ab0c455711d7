//! Whole-document codecs.

use foldermap_core::{CodecKind, ValueMap};

use crate::error::CodecError;
use crate::ini::IniCodec;
use crate::json::JsonCodec;

/// Turns a whole file's text into a map of values and back.
pub trait TextCodec: Send + Sync {
    /// Which codec this is.
    fn kind(&self) -> CodecKind;

    /// Decode a file's full text. Empty text decodes to an empty map.
    fn decode_document(&self, text: &str) -> Result<ValueMap, CodecError>;

    /// Encode a map as a file's full text, without a trailing newline.
    fn encode_document(&self, values: &ValueMap) -> Result<String, CodecError>;
}

/// Shared codec instance for a kind.
pub fn codec_for(kind: CodecKind) -> &'static dyn TextCodec {
    match kind {
        CodecKind::Ini => IniCodec::global(),
        CodecKind::Json => JsonCodec::global(),
    }
}
