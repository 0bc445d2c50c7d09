#![no_main]

use commonware_msgpack::{json, size, value, Reader, Value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must never panic, and every decoder must agree on where a value ends
    let Ok(len) = size::encoded_len(data) else {
        assert!(value::read_value(data).is_err());
        return;
    };
    assert_eq!(size::skip(data).unwrap().len(), data.len() - len);

    let mut reader = Reader::new(data);
    reader.skip().unwrap();
    assert_eq!(reader.position(), len as u64);

    if let Ok((decoded, rest)) = value::read_value(data) {
        assert_eq!(rest.len(), data.len() - len);
        let reencoded = decoded.encode();
        assert!(reencoded.len() <= len);
        // Compare encodings, as floats may be NaN
        let (again, _) = value::read_value(&reencoded).unwrap();
        assert_eq!(again.encode(), reencoded);

        let mut reader = Reader::new(data);
        let streamed: Value = reader.read_value().unwrap();
        assert_eq!(streamed.encode(), reencoded);
    }

    let mut out = Vec::new();
    if let Ok(rest) = json::unmarshal_as_json(&mut out, data) {
        assert_eq!(rest.len(), data.len() - len);
        assert!(std::str::from_utf8(&out).is_ok());
    }
});
