use foldermap_codec::{CodecError, Dispatcher, IniCodec, JsonCodec, TextCodec, codec_for};
use foldermap_core::{CodecKind, Value, ValueMap, ValueType};
use strum::IntoEnumIterator;

fn ini() -> &'static IniCodec {
    IniCodec::global()
}

#[test]
fn test_round_trip_each_value_class() {
    let mut section = ValueMap::new();
    section.insert("b".into(), Value::Int(1));
    let mut sections = ValueMap::new();
    sections.insert("a".into(), Value::Map(section));

    let values = [
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        Value::Bool(true),
        Value::Float(0.25),
        Value::Double(3.14),
        Value::Long(7),
        Value::Int(-40),
        Value::Map(sections),
    ];

    for value in values {
        let text = ini().encode(&value).unwrap();
        let decoded = ini().decode(&text).unwrap();
        assert_eq!(decoded, value, "round trip through {text:?}");
        assert_eq!(decoded.value_type(), value.value_type());
    }
}

#[test]
fn test_decode_examples() {
    assert_eq!(
        ini().decode("1,2,3").unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert_eq!(ini().decode("true").unwrap(), Value::Bool(true));
    assert_eq!(ini().decode("3.14").unwrap(), Value::Double(3.14));
    assert_eq!(ini().decode("7L").unwrap(), Value::Long(7));

    let decoded = ini().decode("[a]\nb=1").unwrap();
    let section = decoded.as_map().unwrap()["a"].as_map().unwrap();
    assert_eq!(section["b"], Value::Int(1));
}

#[test]
fn test_canonical_text_is_idempotent() {
    let canonical = [
        "1,2,3",
        "true",
        "false",
        "1.5F",
        "3.14",
        "-0.5",
        "7L",
        "42",
        "plain",
        "x=1\ny=2L",
        "x=1\nname=demo\n\n[a]\nb=true\nc=1,2\n\n[b]\nd=2.5",
        "[only]\nk=v",
    ];

    for text in canonical {
        let decoded = ini().decode(text).unwrap();
        assert_eq!(ini().encode(&decoded).unwrap(), text);
    }
}

#[test]
fn test_document_decode_forces_map() {
    let doc = ini().decode_document("x=1\ny=2L\n").unwrap();
    assert_eq!(doc.len(), 2);
    assert_eq!(doc["x"], Value::Int(1));
    assert_eq!(doc["y"], Value::Long(2));

    // One line with no line break still decodes as a document.
    let doc = ini().decode_document("name=demo").unwrap();
    assert_eq!(doc["name"], Value::from("demo"));
}

#[test]
fn test_document_encode_round_trip() {
    let doc = ini()
        .decode_document("a=1\nb=2.0\n\n[s]\nc=x,y")
        .unwrap();
    let text = ini().encode_document(&doc).unwrap();
    assert_eq!(ini().decode_document(&text).unwrap(), doc);
}

#[test]
fn test_depth_beyond_one_section_is_rejected() {
    let mut deepest = ValueMap::new();
    deepest.insert("k".into(), Value::Int(1));
    let mut section = ValueMap::new();
    section.insert("inner".into(), Value::Map(deepest));
    let mut doc = ValueMap::new();
    doc.insert("outer".into(), Value::Map(section));

    match ini().encode_document(&doc) {
        Err(CodecError::SectionTooDeep { path }) => assert_eq!(path, "outer.inner"),
        other => panic!("expected SectionTooDeep, got {other:?}"),
    }
}

#[test]
fn test_custom_dispatcher() {
    // A format that only knows hex numbers and lists of them.
    let hex = Dispatcher::builder("hex")
        .register_sniffer(|s| s.contains(','), ValueType::List)
        .register_sniffer(|s| s.starts_with("0x"), ValueType::Long)
        .register_decoder(ValueType::List, |d, s| {
            s.split(',')
                .map(|part| d.decode(part))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        })
        .register_decoder(ValueType::Long, |_, s| {
            i64::from_str_radix(&s[2..], 16)
                .map(Value::Long)
                .map_err(|_| CodecError::InvalidNumber {
                    text: s.to_string(),
                    target: ValueType::Long,
                })
        })
        .build();

    assert_eq!(
        hex.decode("0x10,0xff,z").unwrap(),
        Value::List(vec![Value::Long(16), Value::Long(255), Value::from("z")])
    );
    assert!(hex.decode("0xzz").is_err());
    assert_eq!(hex.name(), "hex");
}

#[test]
fn test_codec_lookup_covers_every_kind() {
    for kind in CodecKind::iter() {
        let codec = codec_for(kind);
        assert_eq!(codec.kind(), kind);
        assert!(codec.decode_document("").unwrap().is_empty());
    }
}

#[test]
fn test_json_and_ini_agree_on_flat_documents() {
    let doc = ini().decode_document("x=1\nbig=5000000000L\nname=demo").unwrap();
    let json = JsonCodec.encode_document(&doc).unwrap();
    assert_eq!(JsonCodec.decode_document(&json).unwrap(), doc);
}
