#![no_main]

use arbitrary::Arbitrary;
use commonware_msgpack::{
    edit, size, slice, Complex64, Decode, Encode, EncodeSize, Marshal, Number, Reader, Timestamp,
    Unmarshal, Value, Writer,
};
use libfuzzer_sys::fuzz_target;
use std::{collections::BTreeMap, fmt::Debug};

fn roundtrip<T>(value: T)
where
    T: Marshal + for<'a> Unmarshal<'a> + Encode + Decode + PartialEq + Debug,
{
    let encoded = value.to_msg();
    assert!(encoded.len() <= value.msg_size());
    assert_eq!(size::encoded_len(&encoded).unwrap(), encoded.len());
    let decoded = T::from_msg(&encoded).expect("Failed to decode a successfully encoded input!");
    assert_eq!(decoded, value);

    let mut writer = Writer::new(Vec::new());
    value.encode_msg(&mut writer).unwrap();
    let streamed = writer.into_inner().unwrap();
    assert_eq!(streamed, encoded);

    let mut reader = Reader::new(&streamed[..]);
    assert_eq!(T::decode_msg(&mut reader).unwrap(), value);
    assert_eq!(reader.position(), streamed.len() as u64);
}

fn roundtrip_f32(v: f32) {
    let encoded = v.to_msg();
    let decoded = f32::from_msg(&encoded).unwrap();
    assert_eq!(v.to_bits(), decoded.to_bits());
}

fn roundtrip_f64(v: f64) {
    let encoded = v.to_msg();
    let decoded = f64::from_msg(&encoded).unwrap();
    assert_eq!(v.to_bits(), decoded.to_bits());
}

fn roundtrip_int(v: i64) {
    let encoded = v.to_msg();
    // Non-negative values take the unsigned forms
    if v >= 0 {
        assert_eq!(encoded, (v as u64).to_msg());
    }
    if (-32..=127).contains(&v) {
        assert_eq!(encoded.len(), 1);
    }
    roundtrip(v);
    match Number::from_msg(&encoded).unwrap() {
        Number::Int(n) => assert_eq!(n, v),
        Number::Uint(n) => assert_eq!(n as i64, v),
        other => panic!("integer decoded as {other:?}"),
    }
}

fn roundtrip_map(entries: BTreeMap<String, i64>, key: String, replacement: i64) {
    let value: Value = entries
        .iter()
        .map(|(k, v)| (k.clone(), Value::Int(*v)))
        .collect();
    let encoded = value.encode();
    assert_eq!(Value::from_msg(&encoded).unwrap(), value);

    // Replacing a present key is visible to a subsequent locate
    let replacement = replacement.to_msg();
    if entries.contains_key(&key) {
        let edited = edit::replace(&key, encoded.clone(), &replacement).unwrap();
        assert_eq!(edit::locate(&key, &edited), &replacement[..]);
        let copied = edit::copy_replace(&key, &encoded, &replacement).unwrap();
        assert_eq!(copied, edited);
    } else {
        assert!(edit::locate(&key, &encoded).is_empty());
        assert!(edit::replace(&key, encoded, &replacement).is_err());
    }
}

fn roundtrip_array(items: Vec<Option<String>>) {
    let mut writer = Writer::new(Vec::new());
    writer.write_array_header(items.len() as u32).unwrap();
    for item in &items {
        item.encode_msg(&mut writer).unwrap();
    }
    let encoded = writer.into_inner().unwrap();

    let (len, mut rest) = slice::read_array_header(&encoded).unwrap();
    assert_eq!(len as usize, items.len());
    for item in &items {
        let (decoded, next) = Option::<String>::unmarshal_msg(rest).unwrap();
        assert_eq!(&decoded, item);
        rest = next;
    }
    assert!(rest.is_empty());
}

#[derive(Arbitrary, Debug)]
enum FuzzInput {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(i64, u32),
    Complex64(f32, f32),
    Map(BTreeMap<String, i64>, String, i64),
    Array(Vec<Option<String>>),
}

fn fuzz(input: FuzzInput) {
    match input {
        FuzzInput::Bool(v) => roundtrip(v),
        FuzzInput::I8(v) => roundtrip(v),
        FuzzInput::I16(v) => roundtrip(v),
        FuzzInput::I32(v) => roundtrip(v),
        FuzzInput::I64(v) => roundtrip_int(v),
        FuzzInput::U8(v) => roundtrip(v),
        FuzzInput::U16(v) => roundtrip(v),
        FuzzInput::U32(v) => roundtrip(v),
        FuzzInput::U64(v) => roundtrip(v),
        FuzzInput::F32(v) => roundtrip_f32(v),
        FuzzInput::F64(v) => roundtrip_f64(v),
        FuzzInput::String(v) => roundtrip(v),
        FuzzInput::Bytes(v) => roundtrip(v),
        FuzzInput::Timestamp(secs, nanos) => {
            roundtrip(Timestamp::new(secs.clamp(-(1 << 40), 1 << 40), nanos))
        }
        FuzzInput::Complex64(re, im) => {
            let encoded = Complex64 { re, im }.to_msg();
            let decoded = Complex64::from_msg(&encoded).unwrap();
            assert_eq!(decoded.re.to_bits(), re.to_bits());
            assert_eq!(decoded.im.to_bits(), im.to_bits());
        }
        FuzzInput::Map(entries, key, replacement) => roundtrip_map(entries, key, replacement),
        FuzzInput::Array(items) => roundtrip_array(items),
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
