//! Type-directed text codecs for foldermap.
//!
//! A [`Dispatcher`] sniffs the type of a piece of text and decodes it with
//! the decoder registered for that type. [`IniCodec`] configures one for the
//! INI-like leaf format; [`JsonCodec`] is the fallback for other files.

mod codec;
mod dispatcher;
mod error;
mod ini;
mod json;

pub use codec::{TextCodec, codec_for};
pub use dispatcher::{Decoder, Dispatcher, DispatcherBuilder, Encoder, Sniffer};
pub use error::CodecError;
pub use ini::IniCodec;
pub use json::JsonCodec;
