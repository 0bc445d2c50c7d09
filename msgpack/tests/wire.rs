//! End-to-end checks of encoding, inspection, and editing on realistic messages.

use commonware_msgpack::{
    edit, json, nil::NilStack, primitives::*, size, slice, Error, Marshal, Reader, Unmarshal,
    Value, Writer,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_case::test_case;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn two_field_map() -> Vec<u8> {
    let mut map = Vec::new();
    put_map_header(&mut map, 2);
    put_str(&mut map, "a");
    put_str(&mut map, "1");
    put_str(&mut map, "b");
    put_str(&mut map, "2");
    map
}

/// Builds a value of random shape, mixing every kind of value.
fn random_value(rng: &mut StdRng, depth: usize) -> Value {
    let kind = if depth == 0 {
        rng.gen_range(0..7)
    } else {
        rng.gen_range(0..9)
    };
    match kind {
        0 => Value::Nil,
        1 => Value::Bool(rng.gen()),
        2 => Value::Int(rng.gen_range(i64::MIN..0)),
        3 => Value::Uint(rng.gen_range(1 << 32..=u64::MAX)),
        4 => Value::F64(rng.gen()),
        5 => Value::String((0..rng.gen_range(0..40)).map(|_| rng.gen::<char>()).collect()),
        6 => {
            let mut bytes = vec![0u8; rng.gen_range(0..300)];
            rng.fill(&mut bytes[..]);
            Value::Bytes(bytes)
        }
        7 => (0..rng.gen_range(0..20))
            .map(|_| random_value(rng, depth - 1))
            .collect(),
        _ => (0..rng.gen_range(0..20))
            .map(|i| (format!("k{i}"), random_value(rng, depth - 1)))
            .collect(),
    }
}

#[test_case(0, &[0x00]; "zero")]
#[test_case(127, &[0x7f]; "largest positive fixint")]
#[test_case(128, &[0xcc, 0x80]; "smallest uint8")]
#[test_case(200, &[0xcc, 200]; "uint8")]
#[test_case(-1, &[0xff]; "negative fixint")]
#[test_case(-32, &[0xe0]; "smallest negative fixint")]
#[test_case(-33, &[0xd0, 0xdf]; "int8")]
#[test_case(65_536, &[0xce, 0x00, 0x01, 0x00, 0x00]; "uint32")]
fn test_minimal_int(v: i64, expected: &[u8]) {
    assert_eq!(v.to_msg(), expected);
    let mut writer = Writer::new(Vec::new());
    writer.write_int(v).unwrap();
    assert_eq!(writer.into_inner().unwrap(), expected);
    assert_eq!(i64::from_msg(expected).unwrap(), v);
}

#[test]
fn test_map_layout() {
    let map = two_field_map();
    assert_eq!(
        map,
        [0x82, 0xa1, b'a', 0xa1, b'1', 0xa1, b'b', 0xa1, b'2']
    );
    assert_eq!(edit::locate("b", &map), &[0xa1, b'2']);
    assert!(edit::locate("c", &map).is_empty());

    let value: Value = [("a", "1"), ("b", "2")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::from(v)))
        .collect();
    assert_eq!(value.encode(), map);
}

#[test]
fn test_map_as_json() {
    let mut buf = Vec::new();
    put_map_header(&mut buf, 2);
    put_str(&mut buf, "x");
    put_int(&mut buf, 1);
    put_str(&mut buf, "y");
    put_str(&mut buf, "s");

    let mut out = Vec::new();
    let rest = json::unmarshal_as_json(&mut out, &buf).unwrap();
    assert!(rest.is_empty());
    assert_eq!(out, br#"{"x":1,"y":"s"}"#);

    // Transcoding is deterministic
    let mut again = Vec::new();
    json::unmarshal_as_json(&mut again, &buf).unwrap();
    assert_eq!(again, out);

    // Streaming produces the same output and consumes the whole value
    let mut streamed = Vec::new();
    let mut reader = Reader::new(&buf[..]);
    let written = json::copy_to_json(&mut streamed, &mut reader).unwrap();
    assert_eq!(streamed, out);
    assert_eq!(written, out.len() as u64);
    assert_eq!(reader.position(), buf.len() as u64);
}

#[test]
fn test_nil_stack_restores_input() {
    let map = two_field_map();
    let mut stack = NilStack::new();
    let b = stack.push(&map);
    assert!(stack.is_pretending());
    assert!(slice::read_nil(b).unwrap().is_empty());
    assert_eq!(stack.pop(), &map[..]);
    assert!(!stack.is_pretending());
    stack.finish();
}

#[derive(Debug, Default, PartialEq)]
struct Config {
    name: String,
    retries: u32,
}

impl Config {
    /// Decodes a map, treating an absent "retries" field as nil (which resets it to default).
    fn decode(b: &[u8]) -> Result<(Self, &[u8]), Error> {
        let (fields, mut b) = slice::read_map_header(b)?;
        let mut config = Config::default();
        let mut saw_retries = false;
        for _ in 0..fields {
            let (key, rest) = slice::read_map_key_zc(b)?;
            b = match key {
                b"name" => {
                    let (name, rest) = slice::read_string(rest)?;
                    config.name = name;
                    rest
                }
                b"retries" => {
                    saw_retries = true;
                    Self::decode_retries(&mut config, rest)?
                }
                _ => size::skip(rest)?,
            };
        }
        if !saw_retries {
            let mut stack = NilStack::new();
            let nil = stack.push(b);
            Self::decode_retries(&mut config, nil)?;
            b = stack.pop();
            stack.finish();
        }
        Ok((config, b))
    }

    fn decode_retries<'a>(config: &mut Config, b: &'a [u8]) -> Result<&'a [u8], Error> {
        if slice::is_nil(b) {
            config.retries = 3;
            return slice::read_nil(b);
        }
        let (retries, rest) = slice::read_u32(b)?;
        config.retries = retries;
        Ok(rest)
    }
}

#[test]
fn test_missing_field_decodes_as_nil() {
    let mut old = Vec::new();
    put_map_header(&mut old, 2);
    put_str(&mut old, "name");
    put_str(&mut old, "primary");
    put_str(&mut old, "legacy");
    put_bool(&mut old, true);
    old.push(0xc0);

    let (config, rest) = Config::decode(&old).unwrap();
    assert_eq!(
        config,
        Config {
            name: "primary".into(),
            retries: 3
        }
    );
    assert_eq!(rest, &[0xc0]);

    let mut new = Vec::new();
    put_map_header(&mut new, 2);
    put_str(&mut new, "retries");
    put_uint(&mut new, 7);
    put_str(&mut new, "name");
    put_str(&mut new, "backup");
    let (config, rest) = Config::decode(&new).unwrap();
    assert_eq!(config.retries, 7);
    assert_eq!(config.name, "backup");
    assert!(rest.is_empty());
}

#[test]
fn test_random_values() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..100 {
        let value = random_value(&mut rng, 3);
        let encoded = value.encode();
        assert_eq!(encoded.len(), value.encoded_len());

        // Encoding is deterministic
        assert_eq!(value.encode(), encoded);

        // Every decoder agrees on the extent of the value
        let mut trailing = encoded.clone();
        trailing.extend_from_slice(&[0xc3, 0xc2]);
        assert_eq!(size::encoded_len(&trailing).unwrap(), encoded.len());
        assert_eq!(size::skip(&trailing).unwrap(), &[0xc3, 0xc2]);
        let (decoded, rest) = Value::unmarshal_msg(&trailing).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(rest, &[0xc3, 0xc2]);

        let mut reader = Reader::new(&trailing[..]);
        reader.skip().unwrap();
        assert_eq!(reader.position(), encoded.len() as u64);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_value().unwrap(), Value::Bool(false));

        // Copying through a writer reproduces the bytes
        let mut reader = Reader::new(&encoded[..]);
        let mut writer = Writer::new(Vec::new());
        assert_eq!(reader.copy_next(&mut writer).unwrap(), encoded.len() as u64);
        assert_eq!(writer.into_inner().unwrap(), encoded);
    }
}

#[test_case(&[0xc3]; "shorter")]
#[test_case(&[0xa1, b'X']; "same size")]
#[test_case(&[0xa5, b'h', b'e', b'l', b'l', b'o']; "longer")]
#[test_case(&[0xc4, 0x00]; "empty bin")]
fn test_replace_then_locate(val: &[u8]) {
    init_tracing();
    for spare in [0, 64] {
        let mut map = Vec::with_capacity(two_field_map().len() + spare);
        map.extend_from_slice(&two_field_map());
        for key in ["a", "b"] {
            let edited = edit::replace(key, map.clone(), val).unwrap();
            assert_eq!(edit::locate(key, &edited), val);
            let other = if key == "a" { "b" } else { "a" };
            assert_eq!(edit::locate(other, &edited), edit::locate(other, &map));
            assert_eq!(size::encoded_len(&edited).unwrap(), edited.len());
            assert_eq!(edit::copy_replace(key, &map, val).unwrap(), edited);
        }
        // In place, with spare capacity for growth
        let edited = edit::replace("a", map, val).unwrap();
        assert_eq!(edit::locate("a", &edited), val);
    }
}

#[test]
fn test_replace_missing_key() {
    let map = two_field_map();
    assert!(matches!(
        edit::replace("z", map, &[0xc0]),
        Err(Error::FieldNotFound(key)) if key == "z"
    ));
}
