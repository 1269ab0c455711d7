//! INI-like text codec.
//!
//! Scalars are sniffed in this order, first match wins:
//!
//! 1. sequence: single line, no `=`, contains `,`
//! 2. boolean: exactly `true` or `false`
//! 3. float: a float literal ending in `F`/`f`
//! 4. double: a float literal containing `.` and not ending in `f`
//! 5. long: an integer with an `L`/`l` suffix
//! 6. int: a plain 32-bit integer
//! 7. section map: contains a line break
//!
//! Anything else stays raw text.
//!
//! Documents are `key=value` lines, optionally grouped under `[section]`
//! headers. Sections are always top-level siblings; maps nested inside a
//! section cannot be written and fail with [`CodecError::SectionTooDeep`].

use std::sync::LazyLock;

use foldermap_core::{CodecKind, Value, ValueMap, ValueType};
use itertools::Itertools;

use crate::codec::TextCodec;
use crate::dispatcher::Dispatcher;
use crate::error::CodecError;

/// Characters removed from section-map text before it is split into lines.
const STRIPPED_CHARS: [char; 4] = ['\r', '\t', '\0', '\u{FFFD}'];

static GLOBAL: LazyLock<IniCodec> = LazyLock::new(IniCodec::new);

/// The INI codec: a dispatcher configured with INI rules.
#[derive(Debug)]
pub struct IniCodec {
    dispatcher: Dispatcher,
}

impl IniCodec {
    /// Build the codec's registration tables.
    pub fn new() -> Self {
        let dispatcher = Dispatcher::builder("ini")
            .register_sniffer(is_sequence, ValueType::List)
            .register_sniffer(is_boolean, ValueType::Bool)
            .register_sniffer(is_float, ValueType::Float)
            .register_sniffer(is_double, ValueType::Double)
            .register_sniffer(is_long, ValueType::Long)
            .register_sniffer(is_int, ValueType::Int)
            .register_sniffer(is_section_map, ValueType::Map)
            .register_decoder(ValueType::List, decode_sequence)
            .register_decoder(ValueType::Bool, |_, text| Ok(Value::Bool(text == "true")))
            .register_decoder(ValueType::Float, decode_float)
            .register_decoder(ValueType::Double, decode_double)
            .register_decoder(ValueType::Long, decode_long)
            .register_decoder(ValueType::Int, decode_int)
            .register_decoder(ValueType::Map, decode_section_map)
            .register_encoder(ValueType::List, encode_sequence)
            .register_encoder(ValueType::Float, encode_float)
            .register_encoder(ValueType::Double, encode_double)
            .register_encoder(ValueType::Long, encode_long)
            .register_encoder(ValueType::Map, encode_section_map)
            .build();

        Self { dispatcher }
    }

    /// Shared instance.
    pub fn global() -> &'static IniCodec {
        &GLOBAL
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Decode one INI value.
    pub fn decode(&self, text: &str) -> Result<Value, CodecError> {
        self.dispatcher.decode(text)
    }

    /// Encode one INI value.
    pub fn encode(&self, value: &Value) -> Result<String, CodecError> {
        self.dispatcher.encode(value, "")
    }
}

impl Default for IniCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCodec for IniCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Ini
    }

    fn decode_document(&self, text: &str) -> Result<ValueMap, CodecError> {
        match self.dispatcher.decode_as(text, ValueType::Map)? {
            Value::Map(map) => Ok(map),
            other => Err(CodecError::NotAMap {
                found: other.value_type(),
            }),
        }
    }

    fn encode_document(&self, values: &ValueMap) -> Result<String, CodecError> {
        encode_entries(&self.dispatcher, values, None)
    }
}

fn is_sequence(text: &str) -> bool {
    !text.contains('\n') && !text.contains('=') && text.contains(',')
}

fn is_boolean(text: &str) -> bool {
    text == "true" || text == "false"
}

fn is_float(text: &str) -> bool {
    float_literal(text).is_some() && text.ends_with(['F', 'f'])
}

fn is_double(text: &str) -> bool {
    float_literal(text).is_some() && !text.ends_with('f') && text.contains('.')
}

fn is_long(text: &str) -> bool {
    long_literal(text).is_some() && text.ends_with(['L', 'l']) && !text.contains('.')
}

fn is_int(text: &str) -> bool {
    text.parse::<i32>().is_ok()
}

fn is_section_map(text: &str) -> bool {
    text.contains('\n')
}

/// Validate a float literal and return it without suffix or padding.
///
/// Accepts an optional sign, digits with an optional fraction and exponent,
/// an optional `f`/`F`/`d`/`D` suffix, or the literals `NaN` and `Infinity`.
fn float_literal(text: &str) -> Option<&str> {
    let trimmed = text.trim_matches(|c: char| c <= ' ');
    let literal = trimmed
        .strip_suffix(['f', 'F', 'd', 'D'])
        .unwrap_or(trimmed);
    let body = literal.strip_prefix(['+', '-']).unwrap_or(literal);
    if body == "NaN" || body == "Infinity" {
        return Some(literal);
    }

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if digits.is_empty() || !all_digits(digits) {
            return None;
        }
    }

    Some(literal)
}

/// Strip one `L`/`l` suffix and check the rest is a 64-bit integer.
fn long_literal(text: &str) -> Option<i64> {
    text.strip_suffix(['L', 'l']).unwrap_or(text).parse().ok()
}

fn invalid(text: &str, target: ValueType) -> CodecError {
    CodecError::InvalidNumber {
        text: text.to_string(),
        target,
    }
}

fn decode_sequence(dispatcher: &Dispatcher, text: &str) -> Result<Value, CodecError> {
    let mut elements: Vec<&str> = text.split(',').collect();
    while elements.last().is_some_and(|e| e.is_empty()) {
        elements.pop();
    }

    elements
        .into_iter()
        .map(|element| dispatcher.decode(element))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

fn decode_float(_: &Dispatcher, text: &str) -> Result<Value, CodecError> {
    float_literal(text)
        .and_then(|literal| literal.parse::<f32>().ok())
        .map(Value::Float)
        .ok_or_else(|| invalid(text, ValueType::Float))
}

fn decode_double(_: &Dispatcher, text: &str) -> Result<Value, CodecError> {
    float_literal(text)
        .and_then(|literal| literal.parse::<f64>().ok())
        .map(Value::Double)
        .ok_or_else(|| invalid(text, ValueType::Double))
}

fn decode_long(_: &Dispatcher, text: &str) -> Result<Value, CodecError> {
    long_literal(text)
        .map(Value::Long)
        .ok_or_else(|| invalid(text, ValueType::Long))
}

fn decode_int(_: &Dispatcher, text: &str) -> Result<Value, CodecError> {
    text.parse::<i32>()
        .map(Value::Int)
        .map_err(|_| invalid(text, ValueType::Int))
}

fn decode_section_map(dispatcher: &Dispatcher, text: &str) -> Result<Value, CodecError> {
    let cleaned: String = text.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();

    let mut root = ValueMap::new();
    let mut section: Option<usize> = None;

    for line in cleaned.split('\n') {
        // Short lines and `;` lines are comments.
        if line.chars().count() <= 2 || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            let name = &line[1..line.len() - 1];
            let (index, _) = root.insert_full(name.to_string(), Value::Map(ValueMap::new()));
            section = Some(index);
            continue;
        }

        let mut parts = line.split('=');
        let (Some(key), Some(raw), None) = (parts.next(), parts.next(), parts.next()) else {
            tracing::trace!(line, "dropping line without exactly one '='");
            continue;
        };
        let value = dispatcher.decode(raw)?;

        let target = match section {
            Some(index) => match root.get_index_mut(index) {
                Some((_, Value::Map(map))) => map,
                _ => continue,
            },
            None => &mut root,
        };
        target.insert(key.to_string(), value);
    }

    Ok(Value::Map(root))
}

fn encode_sequence(dispatcher: &Dispatcher, value: &Value, _: &str) -> Result<String, CodecError> {
    let Value::List(items) = value else {
        return Ok(value.to_string());
    };
    itertools::process_results(items.iter().map(|item| dispatcher.encode(item, "")), |mut parts| {
        parts.join(",")
    })
}

fn encode_float(_: &Dispatcher, value: &Value, _: &str) -> Result<String, CodecError> {
    match value {
        Value::Float(v) => Ok(format!("{}F", format_decimal(f64::from(*v), format!("{v:?}")))),
        other => Ok(other.to_string()),
    }
}

fn encode_double(_: &Dispatcher, value: &Value, _: &str) -> Result<String, CodecError> {
    match value {
        Value::Double(v) => Ok(format_decimal(*v, format!("{v:?}"))),
        other => Ok(other.to_string()),
    }
}

fn encode_long(_: &Dispatcher, value: &Value, _: &str) -> Result<String, CodecError> {
    match value {
        Value::Long(v) => Ok(format!("{v}L")),
        other => Ok(other.to_string()),
    }
}

/// Encode a map. A non-empty indent names the section being written.
fn encode_section_map(
    dispatcher: &Dispatcher,
    value: &Value,
    indent: &str,
) -> Result<String, CodecError> {
    match value {
        Value::Map(map) => encode_entries(dispatcher, map, Some(indent).filter(|s| !s.is_empty())),
        other => Ok(other.to_string()),
    }
}

fn encode_entries(
    dispatcher: &Dispatcher,
    map: &ValueMap,
    section: Option<&str>,
) -> Result<String, CodecError> {
    let mut lines = Vec::new();
    let mut sections = Vec::new();

    for (key, value) in map {
        match value {
            Value::Map(inner) => match section {
                Some(section) => {
                    return Err(CodecError::SectionTooDeep {
                        path: format!("{section}.{key}"),
                    });
                }
                None => sections.push((key, inner)),
            },
            _ => lines.push(format!("{key}={}", dispatcher.encode(value, "")?)),
        }
    }

    let mut out = lines.join("\n");
    for (key, inner) in sections {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push('[');
        out.push_str(key);
        out.push_str("]\n");
        out.push_str(&encode_entries(dispatcher, inner, Some(key))?);
    }
    Ok(out)
}

/// Render a float so that it reads back as a decimal: always with a `.`.
fn format_decimal(value: f64, debug: String) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if debug.contains('.') {
        return debug;
    }
    match debug.find('e') {
        Some(pos) => format!("{}.0{}", &debug[..pos], &debug[pos..]),
        None => format!("{debug}.0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini() -> &'static IniCodec {
        IniCodec::global()
    }

    fn map(entries: &[(&str, Value)]) -> ValueMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_sniff_order() {
        let d = ini().dispatcher();
        assert_eq!(d.sniff("1,2,3"), ValueType::List);
        assert_eq!(d.sniff("true"), ValueType::Bool);
        assert_eq!(d.sniff("1.5f"), ValueType::Float);
        assert_eq!(d.sniff("2F"), ValueType::Float);
        assert_eq!(d.sniff("3.14"), ValueType::Double);
        assert_eq!(d.sniff("3.14d"), ValueType::Double);
        assert_eq!(d.sniff("7L"), ValueType::Long);
        assert_eq!(d.sniff("-7l"), ValueType::Long);
        assert_eq!(d.sniff("42"), ValueType::Int);
        assert_eq!(d.sniff("a=1\nb=2"), ValueType::Map);
        assert_eq!(d.sniff("hello"), ValueType::Raw);
    }

    #[test]
    fn test_sniff_edge_cases() {
        let d = ini().dispatcher();
        // A comma with '=' is not a sequence.
        assert_eq!(d.sniff("a=1,2"), ValueType::Raw);
        // Comma lists win over everything else on one line.
        assert_eq!(d.sniff("true,false"), ValueType::List);
        // Integers past i32 without a suffix stay text.
        assert_eq!(d.sniff("9999999999"), ValueType::Raw);
        assert_eq!(d.sniff("9999999999L"), ValueType::Long);
        assert_eq!(d.sniff("1.5L"), ValueType::Raw);
        assert_eq!(d.sniff("1e5"), ValueType::Raw);
        assert_eq!(d.sniff("True"), ValueType::Raw);
        assert_eq!(d.sniff(""), ValueType::Raw);
        assert_eq!(d.sniff("."), ValueType::Raw);
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(float_literal("1.5f"), Some("1.5"));
        assert_eq!(float_literal(" 2.5 "), Some("2.5"));
        assert_eq!(float_literal("-.5"), Some("-.5"));
        assert_eq!(float_literal("1.0e10D"), Some("1.0e10"));
        assert_eq!(float_literal("NaN"), Some("NaN"));
        assert_eq!(float_literal("-Infinity"), Some("-Infinity"));
        assert_eq!(float_literal("NaNF"), Some("NaN"));
        assert_eq!(float_literal("-InfinityF"), Some("-Infinity"));
        assert_eq!(float_literal("inf"), None);
        assert_eq!(float_literal("1e"), None);
        assert_eq!(float_literal("f"), None);
        assert_eq!(float_literal("1.2.3"), None);
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(ini().decode("true").unwrap(), Value::Bool(true));
        assert_eq!(ini().decode("3.14").unwrap(), Value::Double(3.14));
        assert_eq!(ini().decode("1.5f").unwrap(), Value::Float(1.5));
        assert_eq!(ini().decode("7L").unwrap(), Value::Long(7));
        assert_eq!(ini().decode("-12").unwrap(), Value::Int(-12));
        assert_eq!(ini().decode("plain text").unwrap(), Value::from("plain text"));
    }

    #[test]
    fn test_decode_sequence() {
        assert_eq!(
            ini().decode("1,2,3").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            ini().decode("a,2L,,true").unwrap(),
            Value::List(vec![
                Value::from("a"),
                Value::Long(2),
                Value::from(""),
                Value::Bool(true),
            ])
        );
        // Trailing empty elements are dropped.
        assert_eq!(
            ini().decode("1,2,,").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_decode_sections_are_top_level_siblings() {
        let text = "top=1\n[a]\nx=1\n[b]\ny=2L\n";
        let decoded = ini().decode(text).unwrap();

        let expected = map(&[
            ("top", Value::Int(1)),
            ("a", Value::Map(map(&[("x", Value::Int(1))]))),
            ("b", Value::Map(map(&[("y", Value::Long(2))]))),
        ]);
        assert_eq!(decoded, Value::Map(expected));
    }

    #[test]
    fn test_decode_section_map_skips_comments_and_bad_lines() {
        let text = "; comment\r\nab\n\tx=1\r\nno equals here\na=b=c\nname=\n=\n";
        let decoded = ini().decode(text).unwrap();

        let expected = map(&[("x", Value::Int(1)), ("name", Value::from(""))]);
        assert_eq!(decoded, Value::Map(expected));
    }

    #[test]
    fn test_special_floats() {
        let nan = ini().encode(&Value::Float(f32::NAN)).unwrap();
        assert_eq!(nan, "NaNF");
        assert!(matches!(ini().decode(&nan).unwrap(), Value::Float(v) if v.is_nan()));

        for v in [f32::INFINITY, f32::NEG_INFINITY] {
            let text = ini().encode(&Value::Float(v)).unwrap();
            assert_eq!(ini().decode(&text).unwrap(), Value::Float(v));
        }

        // Without a '.' or a suffix these read back as text.
        let inf = ini().encode(&Value::Double(f64::INFINITY)).unwrap();
        assert_eq!(ini().decode(&inf).unwrap(), Value::from("Infinity"));
        let nan = ini().encode(&Value::Double(f64::NAN)).unwrap();
        assert_eq!(ini().decode(&nan).unwrap(), Value::from("NaN"));
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(ini().encode(&Value::Float(1.5)).unwrap(), "1.5F");
        assert_eq!(ini().encode(&Value::Float(2.0)).unwrap(), "2.0F");
        assert_eq!(ini().encode(&Value::Double(3.0)).unwrap(), "3.0");
        assert_eq!(ini().encode(&Value::Double(1e100)).unwrap(), "1.0e100");
        assert_eq!(ini().encode(&Value::Double(f64::INFINITY)).unwrap(), "Infinity");
        assert_eq!(ini().encode(&Value::Long(7)).unwrap(), "7L");
        assert_eq!(ini().encode(&Value::Int(7)).unwrap(), "7");
        assert_eq!(ini().encode(&Value::Bool(false)).unwrap(), "false");
        assert_eq!(ini().encode(&Value::Null).unwrap(), "null");
        assert_eq!(
            ini()
                .encode(&Value::List(vec![Value::Int(1), Value::Long(2), Value::Float(0.5)]))
                .unwrap(),
            "1,2L,0.5F"
        );
    }

    #[test]
    fn test_encode_section_map_layout() {
        let value = map(&[
            ("s", Value::Map(map(&[("k", Value::Bool(true))]))),
            ("x", Value::Int(1)),
            ("y", Value::Long(2)),
            ("t", Value::Map(map(&[("z", Value::from("v"))]))),
        ]);

        let text = ini().encode(&Value::Map(value)).unwrap();
        assert_eq!(text, "x=1\ny=2L\n\n[s]\nk=true\n\n[t]\nz=v");
    }

    #[test]
    fn test_encode_sections_only() {
        let value = map(&[("a", Value::Map(map(&[("b", Value::Int(1))])))]);
        assert_eq!(ini().encode(&Value::Map(value)).unwrap(), "[a]\nb=1");
    }

    #[test]
    fn test_encode_rejects_nested_sections() {
        let inner = map(&[("c", Value::Int(1))]);
        let value = map(&[("a", Value::Map(map(&[("b", Value::Map(inner))])))]);

        let err = ini().encode(&Value::Map(value)).unwrap_err();
        match err {
            CodecError::SectionTooDeep { path } => assert_eq!(path, "a.b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_document_single_line() {
        let doc = ini().decode_document("x=1").unwrap();
        assert_eq!(doc, map(&[("x", Value::Int(1))]));
        assert!(ini().decode_document("").unwrap().is_empty());
    }
}
