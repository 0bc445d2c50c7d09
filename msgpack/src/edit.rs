//! Finding and replacing fields of an encoded map without decoding it.
//!
//! Only the top-level map is scanned: values of other keys are skipped by size, never decoded.
//!
//! # Example
//!
//! ```
//! use commonware_msgpack::{edit, primitives::*};
//!
//! let mut map = Vec::new();
//! put_map_header(&mut map, 2);
//! put_str(&mut map, "a");
//! put_str(&mut map, "1");
//! put_str(&mut map, "b");
//! put_str(&mut map, "2");
//! assert_eq!(edit::locate("b", &map), &[0xa1, b'2']);
//!
//! let map = edit::replace("b", map, &[0xc3]).unwrap();
//! assert_eq!(edit::locate("b", &map), &[0xc3]);
//! ```

use crate::{
    primitives::put_map_header,
    size::encoded_len,
    slice::{read_map_header, read_map_key_zc},
    Error,
};
use std::{cmp::Ordering, ops::Range};
use tracing::trace;

/// A located map entry, as offsets into the encoded map.
struct Entry {
    /// Offset of the entry's key.
    key: usize,
    /// Span of the entry's value.
    value: Range<usize>,
}

/// Scans the top-level map in `raw` for `key`.
fn find(key: &[u8], raw: &[u8]) -> Result<Option<Entry>, Error> {
    let (count, mut rest) = read_map_header(raw)?;
    for _ in 0..count {
        let start = raw.len() - rest.len();
        let (k, after_key) = read_map_key_zc(rest)?;
        let len = encoded_len(after_key)?;
        if k == key {
            let value = raw.len() - after_key.len();
            return Ok(Some(Entry {
                key: start,
                value: value..value + len,
            }));
        }
        rest = &after_key[len..];
    }
    Ok(None)
}

/// Returns the encoded value of `key` in the map `raw`.
///
/// Returns an empty span if the key is absent (or `raw` is not a well-formed map).
pub fn locate<'a>(key: &str, raw: &'a [u8]) -> &'a [u8] {
    match find(key.as_bytes(), raw) {
        Ok(Some(entry)) => &raw[entry.value],
        _ => &[],
    }
}

/// Returns true if the map `raw` has `key`.
pub fn has_key(key: &str, raw: &[u8]) -> bool {
    matches!(find(key.as_bytes(), raw), Ok(Some(_)))
}

/// Replaces the value of `key` in the map `raw` with the encoded value `val`, reusing the
/// storage of `raw` where possible.
///
/// If `val` is larger than the old value and `raw` lacks spare capacity for the difference, the
/// result is built in fresh storage.
pub fn replace(key: &str, mut raw: Vec<u8>, val: &[u8]) -> Result<Vec<u8>, Error> {
    let entry = find(key.as_bytes(), &raw)?.ok_or_else(|| Error::FieldNotFound(key.into()))?;
    let Range { start, end } = entry.value;
    let old = end - start;
    let len = raw.len();
    match val.len().cmp(&old) {
        Ordering::Equal => raw[start..end].copy_from_slice(val),
        Ordering::Less => {
            raw[start..start + val.len()].copy_from_slice(val);
            raw.copy_within(end.., start + val.len());
            raw.truncate(len - (old - val.len()));
        }
        Ordering::Greater => {
            let grow = val.len() - old;
            if raw.capacity() - len >= grow {
                raw.resize(len + grow, 0);
                raw.copy_within(end..len, end + grow);
                raw[start..start + val.len()].copy_from_slice(val);
            } else {
                trace!(len, grow, "reallocating map");
                raw = splice(&raw, start..end, val);
            }
        }
    }
    Ok(raw)
}

/// Returns a copy of the map `raw` with the value of `key` replaced by the encoded value `val`.
///
/// Unlike [replace], `raw` is never modified.
pub fn copy_replace(key: &str, raw: &[u8], val: &[u8]) -> Result<Vec<u8>, Error> {
    let entry = find(key.as_bytes(), raw)?.ok_or_else(|| Error::FieldNotFound(key.into()))?;
    Ok(splice(raw, entry.value, val))
}

/// Removes `key` (and its value) from the map `raw`.
///
/// The map is returned unchanged if the key is absent. The map header is rewritten with the new
/// count, which may shrink it.
pub fn remove(key: &str, raw: Vec<u8>) -> Result<Vec<u8>, Error> {
    let Some(entry) = find(key.as_bytes(), &raw)? else {
        return Ok(raw);
    };
    let (count, rest) = read_map_header(&raw)?;
    let header = raw.len() - rest.len();

    let mut out = Vec::with_capacity(raw.len() - (entry.value.end - entry.key));
    put_map_header(&mut out, count - 1);
    out.extend_from_slice(&raw[header..entry.key]);
    out.extend_from_slice(&raw[entry.value.end..]);
    Ok(out)
}

/// Copies `raw` into fresh storage with `span` replaced by `val`.
fn splice(raw: &[u8], span: Range<usize>, val: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() - span.len() + val.len());
    out.extend_from_slice(&raw[..span.start]);
    out.extend_from_slice(val);
    out.extend_from_slice(&raw[span.end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{primitives::*, value::read_value, Value};
    use test_case::test_case;

    fn sample() -> Vec<u8> {
        let mut buf = Vec::new();
        put_map_header(&mut buf, 3);
        put_str(&mut buf, "first");
        put_array_header(&mut buf, 2);
        put_int(&mut buf, 1);
        put_str(&mut buf, "nested");
        put_str(&mut buf, "mid");
        put_uint(&mut buf, 300);
        put_bin(&mut buf, b"last");
        put_bool(&mut buf, true);
        buf
    }

    fn encoded(v: Value) -> Vec<u8> {
        v.encode()
    }

    #[test]
    fn test_locate() {
        let raw = sample();
        assert_eq!(locate("mid", &raw), &[0xcd, 0x01, 0x2c]);
        assert_eq!(locate("last", &raw), &[0xc3]);
        assert_eq!(locate("first", &raw).len(), 9);
        assert!(locate("absent", &raw).is_empty());
        assert!(locate("mid", &[0x01]).is_empty());
        assert!(has_key("last", &raw));
        assert!(!has_key("nested", &raw));
    }

    #[test_case(Value::Uint(301) ; "equal")]
    #[test_case(Value::Int(3) ; "smaller")]
    #[test_case(Value::from("a much longer replacement value") ; "larger")]
    fn test_replace_then_locate(v: Value) {
        let val = encoded(v);
        let raw = replace("mid", sample(), &val).unwrap();
        assert_eq!(locate("mid", &raw), &val[..]);
        assert_eq!(locate("last", &raw), &[0xc3]);
        assert_eq!(encoded_len(&raw).unwrap(), raw.len());
    }

    #[test]
    fn test_replace_larger_in_place() {
        let val = encoded(Value::from("longer"));
        let mut raw = sample();
        raw.reserve(64);
        let ptr = raw.as_ptr();
        let raw = replace("mid", raw, &val).unwrap();
        assert_eq!(raw.as_ptr(), ptr);
        assert_eq!(locate("mid", &raw), &val[..]);
    }

    #[test]
    fn test_replace_larger_reallocates() {
        let val = encoded(Value::from("longer"));
        let raw = sample();
        let mut exact = Vec::with_capacity(raw.len());
        exact.extend_from_slice(&raw);
        let raw = replace("mid", exact, &val).unwrap();
        assert_eq!(locate("mid", &raw), &val[..]);
        let (value, rest) = read_value(&raw).unwrap();
        assert!(rest.is_empty());
        assert_eq!(value.get("last"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_replace_missing() {
        let err = replace("absent", sample(), &[0xc0]).unwrap_err();
        assert!(matches!(err, Error::FieldNotFound(key) if key == "absent"));
    }

    #[test]
    fn test_copy_replace() {
        let raw = sample();
        let out = copy_replace("first", &raw, &[0xc0]).unwrap();
        assert_eq!(raw, sample());
        assert_eq!(locate("first", &out), &[0xc0]);
        assert_eq!(out.len(), raw.len() - 8);
    }

    #[test]
    fn test_remove() {
        let raw = remove("mid", sample()).unwrap();
        assert_eq!(raw[0], 0x82);
        assert!(!has_key("mid", &raw));
        assert_eq!(locate("last", &raw), &[0xc3]);
        assert_eq!(encoded_len(&raw).unwrap(), raw.len());

        let unchanged = remove("absent", sample()).unwrap();
        assert_eq!(unchanged, sample());
    }

    #[test]
    fn test_remove_shrinks_header() {
        let mut raw = Vec::new();
        put_map_header(&mut raw, 16);
        for i in 0..16 {
            put_str(&mut raw, &format!("k{i}"));
            put_int(&mut raw, i);
        }
        assert_eq!(raw[0], 0xde);
        let raw = remove("k3", raw).unwrap();
        assert_eq!(raw[0], 0x8f);
        assert_eq!(encoded_len(&raw).unwrap(), raw.len());
        assert_eq!(locate("k15", &raw), &[15]);
    }
}
