//! Type-directed parse/stringify engine.
//!
//! A [`Dispatcher`] turns text into a [`Value`] in two steps: an ordered list
//! of sniffers picks the target type, then the decoder registered for that
//! type does the work. Encoding looks the encoder up by the value's runtime
//! type instead.
//!
//! Registration happens on a [`DispatcherBuilder`]; the built dispatcher is
//! immutable and can be shared across threads.

use std::collections::HashMap;
use std::fmt;

use foldermap_core::{Value, ValueType};

use crate::error::CodecError;

/// Decides whether text should decode to a type.
pub type Sniffer = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Decodes text into a value of one type.
pub type Decoder = Box<dyn Fn(&Dispatcher, &str) -> Result<Value, CodecError> + Send + Sync>;

/// Encodes a value of one type; the last argument is the indent context.
pub type Encoder =
    Box<dyn Fn(&Dispatcher, &Value, &str) -> Result<String, CodecError> + Send + Sync>;

/// Collects sniffers, decoders and encoders before freezing them.
#[derive(Default)]
pub struct DispatcherBuilder {
    name: String,
    sniffers: Vec<(Sniffer, ValueType)>,
    decoders: HashMap<ValueType, Decoder>,
    encoders: HashMap<ValueType, Encoder>,
}

impl DispatcherBuilder {
    /// Start a builder for a named format.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a sniffer. Sniffers run in registration order.
    pub fn register_sniffer(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        target: ValueType,
    ) -> Self {
        self.sniffers.push((Box::new(predicate), target));
        self
    }

    /// Register the decoder for a target type, replacing any previous one.
    pub fn register_decoder(
        mut self,
        target: ValueType,
        decoder: impl Fn(&Dispatcher, &str) -> Result<Value, CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.decoders.insert(target, Box::new(decoder));
        self
    }

    /// Register the encoder for a runtime type, replacing any previous one.
    pub fn register_encoder(
        mut self,
        value_type: ValueType,
        encoder: impl Fn(&Dispatcher, &Value, &str) -> Result<String, CodecError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.encoders.insert(value_type, Box::new(encoder));
        self
    }

    /// Freeze the registration tables.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            name: self.name,
            sniffers: self.sniffers,
            decoders: self.decoders,
            encoders: self.encoders,
        }
    }
}

/// Frozen parse/stringify tables for one text format.
pub struct Dispatcher {
    name: String,
    sniffers: Vec<(Sniffer, ValueType)>,
    decoders: HashMap<ValueType, Decoder>,
    encoders: HashMap<ValueType, Encoder>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder(name: impl Into<String>) -> DispatcherBuilder {
        DispatcherBuilder::new(name)
    }

    /// Name of the format.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target type of the first matching sniffer, or [`ValueType::Raw`].
    pub fn sniff(&self, text: &str) -> ValueType {
        self.sniffers
            .iter()
            .find(|(predicate, _)| predicate(text))
            .map(|(_, target)| *target)
            .unwrap_or(ValueType::Raw)
    }

    /// Decode text to whatever type it sniffs as.
    pub fn decode(&self, text: &str) -> Result<Value, CodecError> {
        self.decode_as(text, self.sniff(text))
    }

    /// Decode text as a given type.
    ///
    /// Without a decoder for `target` the text is returned unchanged.
    pub fn decode_as(&self, text: &str, target: ValueType) -> Result<Value, CodecError> {
        match self.decoders.get(&target) {
            Some(decoder) => decoder(self, text),
            None => Ok(Value::Text(text.to_string())),
        }
    }

    /// Encode a value with the encoder of its runtime type.
    ///
    /// `Null` is always `"null"`; types without an encoder use plain string
    /// conversion.
    pub fn encode(&self, value: &Value, indent: &str) -> Result<String, CodecError> {
        if matches!(value, Value::Null) {
            return Ok("null".to_string());
        }

        match self.encoders.get(&value.value_type()) {
            Some(encoder) => encoder(self, value, indent),
            None => Ok(value.to_string()),
        }
    }

    /// Encode an optional value; `None` is `"null"`.
    pub fn encode_opt(&self, value: Option<&Value>, indent: &str) -> Result<String, CodecError> {
        match value {
            Some(value) => self.encode(value, indent),
            None => Ok("null".to_string()),
        }
    }

    /// Check if a decoder is registered for a type.
    pub fn has_decoder(&self, target: ValueType) -> bool {
        self.decoders.contains_key(&target)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sniffers: Vec<ValueType> = self.sniffers.iter().map(|(_, t)| *t).collect();
        let mut decoders: Vec<ValueType> = self.decoders.keys().copied().collect();
        let mut encoders: Vec<ValueType> = self.encoders.keys().copied().collect();
        decoders.sort_by_key(|t| t.to_string());
        encoders.sort_by_key(|t| t.to_string());

        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("sniffers", &sniffers)
            .field("decoders", &decoders)
            .field("encoders", &encoders)
            .finish()
    }
}
