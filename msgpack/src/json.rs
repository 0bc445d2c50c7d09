//! Streaming translation of encoded values into JSON text.
//!
//! Values are translated as they are read, without building a [crate::Value], so the memory used
//! is bounded by the largest string or binary payload rather than the size of the input.
//!
//! | Wire type | JSON |
//! |-----------|------|
//! | nil | `null` |
//! | bool | `true` / `false` |
//! | int, uint | decimal |
//! | float32, float64 | shortest decimal that round-trips (`null` if not finite) |
//! | str | string |
//! | bin | base64 string |
//! | array | array |
//! | map | object (keys must be str or bin) |
//! | timestamp | RFC 3339 string |
//! | registered extension | [Extension::to_json] |
//! | other extension | `{"type":<code>,"data":"<base64>"}` |
//!
//! No whitespace is inserted, and map entries keep their wire order.

use crate::{
    config::Limits,
    extension::{Extension, ExtensionRegistry, Timestamp, TIMESTAMP_CODE},
    tag::WireType,
    Error, Reader,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::{
    fmt::Write as _,
    io::{self, Write},
    sync::Arc,
};

/// Translates encoded values into JSON.
#[derive(Clone, Debug, Default)]
pub struct Transcoder {
    registry: Arc<ExtensionRegistry>,
    limits: Limits,
}

impl Transcoder {
    /// Creates a transcoder with no registered extensions and default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `registry` to translate application extensions.
    pub fn with_registry(mut self, registry: Arc<ExtensionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Reads the next value from `src` and writes its JSON form to `dst`, returning the number of
    /// bytes written.
    pub fn copy<R: io::Read, W: io::Write>(
        &self,
        dst: &mut W,
        src: &mut Reader<R>,
    ) -> Result<u64, Error> {
        let mut out = Output::new(dst);
        self.next(&mut out, src, 0)?;
        out.finish()
    }

    /// Writes the JSON form of the first value in `b` to `dst`, returning the remainder of `b`.
    pub fn transcode<'a, W: io::Write>(
        &self,
        dst: &mut W,
        b: &'a [u8],
    ) -> Result<&'a [u8], Error> {
        let mut src = Reader::new(b);
        self.copy(dst, &mut src)?;
        Ok(&b[src.position() as usize..])
    }

    fn next<R: io::Read, W: io::Write>(
        &self,
        out: &mut Output<W>,
        src: &mut Reader<R>,
        depth: usize,
    ) -> Result<(), Error> {
        match src.peek_next_type()? {
            WireType::Nil => {
                src.read_nil()?;
                out.put(b"null")
            }
            WireType::Bool => {
                let text: &[u8] = if src.read_bool()? { b"true" } else { b"false" };
                out.put(text)
            }
            WireType::Int => {
                let v = src.read_int()?;
                out.display(v)
            }
            WireType::Uint => {
                let v = src.read_uint()?;
                out.display(v)
            }
            WireType::F32 => {
                let v = src.read_f32()?;
                if !v.is_finite() {
                    return out.put(b"null");
                }
                out.display(v)
            }
            WireType::F64 => {
                let v = src.read_f64()?;
                if !v.is_finite() {
                    return out.put(b"null");
                }
                out.display(v)
            }
            WireType::Str => {
                let scratch = src.read_string_as_bytes(out.take_scratch())?;
                let result = out.quote(&scratch);
                out.restore_scratch(scratch);
                result
            }
            WireType::Bin => {
                let scratch = src.read_bytes(out.take_scratch())?;
                let result = out.base64(&scratch);
                out.restore_scratch(scratch);
                result
            }
            WireType::Array => {
                self.limits.check_depth(depth + 1)?;
                let len = src.read_array_header()?;
                out.put(b"[")?;
                for i in 0..len {
                    if i > 0 {
                        out.put(b",")?;
                    }
                    self.next(out, src, depth + 1)?;
                }
                out.put(b"]")
            }
            WireType::Map => {
                self.limits.check_depth(depth + 1)?;
                let len = src.read_map_header()?;
                out.put(b"{")?;
                for i in 0..len {
                    if i > 0 {
                        out.put(b",")?;
                    }
                    match src.peek_next_type()? {
                        WireType::Str | WireType::Bin => {}
                        other => return Err(Error::InvalidMapKey(other)),
                    }
                    out.quote(src.read_map_key()?)?;
                    out.put(b":")?;
                    self.next(out, src, depth + 1)?;
                }
                out.put(b"}")
            }
            WireType::Extension => self.extension(out, src),
            _ => {
                // Only the unused tag reaches here; reading it reports the prefix
                src.skip()
            }
        }
    }

    fn extension<R: io::Read, W: io::Write>(
        &self,
        out: &mut Output<W>,
        src: &mut Reader<R>,
    ) -> Result<(), Error> {
        let raw = src.read_raw_extension()?;
        if raw.code == TIMESTAMP_CODE {
            let mut ts = Timestamp::default();
            ts.read_payload(&raw.data)?;
            let text = ts.to_rfc3339().ok_or(Error::InvalidExtension {
                code: TIMESTAMP_CODE,
                len: raw.data.len(),
            })?;
            return out.quote(text.as_bytes());
        }
        if let Some(ext) = self.registry.decode(raw.code, &raw.data)? {
            if let Some(json) = ext.to_json() {
                let text = serde_json::to_vec(&json).map_err(io::Error::from)?;
                return out.put(&text);
            }
        }
        out.put(b"{\"type\":")?;
        out.display(raw.code)?;
        out.put(b",\"data\":")?;
        out.base64(&raw.data)?;
        out.put(b"}")
    }
}

/// Reads the next value from `src` and writes its JSON form to `dst`, with no registered
/// extensions.
pub fn copy_to_json<R: io::Read, W: io::Write>(
    dst: &mut W,
    src: &mut Reader<R>,
) -> Result<u64, Error> {
    Transcoder::default().copy(dst, src)
}

/// Writes the JSON form of the first value in `b` to `dst`, returning the remainder of `b`.
pub fn unmarshal_as_json<'a, W: io::Write>(
    dst: &mut W,
    b: &'a [u8],
) -> Result<&'a [u8], Error> {
    Transcoder::default().transcode(dst, b)
}

/// Buffered JSON output.
struct Output<W: io::Write> {
    out: io::BufWriter<W>,
    written: u64,
    /// Formatting space for numbers.
    text: String,
    /// Reusable space for string and binary payloads.
    scratch: Vec<u8>,
}

impl<W: io::Write> Output<W> {
    fn new(dst: W) -> Self {
        Self {
            out: io::BufWriter::new(dst),
            written: 0,
            text: String::new(),
            scratch: Vec::new(),
        }
    }

    fn finish(mut self) -> Result<u64, Error> {
        self.out.flush()?;
        Ok(self.written)
    }

    fn take_scratch(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.scratch)
    }

    fn restore_scratch(&mut self, scratch: Vec<u8>) {
        self.scratch = scratch;
    }

    #[inline]
    fn put(&mut self, b: &[u8]) -> Result<(), Error> {
        self.out.write_all(b)?;
        self.written += b.len() as u64;
        Ok(())
    }

    fn display(&mut self, v: impl std::fmt::Display) -> Result<(), Error> {
        let mut text = std::mem::take(&mut self.text);
        text.clear();
        let _ = write!(text, "{v}");
        let result = self.put(text.as_bytes());
        self.text = text;
        result
    }

    fn base64(&mut self, data: &[u8]) -> Result<(), Error> {
        let encoded = BASE64.encode(data);
        self.put(b"\"")?;
        self.put(encoded.as_bytes())?;
        self.put(b"\"")
    }

    /// Writes `b` as a quoted JSON string.
    ///
    /// Each byte that is not part of a valid UTF-8 sequence becomes U+FFFD.
    fn quote(&mut self, b: &[u8]) -> Result<(), Error> {
        self.put(b"\"")?;
        for chunk in b.utf8_chunks() {
            self.escape(chunk.valid())?;
            for _ in chunk.invalid() {
                self.put(b"\\ufffd")?;
            }
        }
        self.put(b"\"")
    }

    fn escape(&mut self, s: &str) -> Result<(), Error> {
        let mut start = 0;
        for (i, c) in s.char_indices() {
            let escaped: &[u8] = match c {
                '"' => b"\\\"",
                '\\' => b"\\\\",
                '\n' => b"\\n",
                '\r' => b"\\r",
                '\u{2028}' => b"\\u2028",
                '\u{2029}' => b"\\u2029",
                c if (c as u32) < 0x20 => {
                    self.put(&s.as_bytes()[start..i])?;
                    let mut text = std::mem::take(&mut self.text);
                    text.clear();
                    let _ = write!(text, "\\u{:04x}", c as u32);
                    let result = self.put(text.as_bytes());
                    self.text = text;
                    result?;
                    start = i + 1;
                    continue;
                }
                _ => continue,
            };
            self.put(&s.as_bytes()[start..i])?;
            self.put(escaped)?;
            start = i + c.len_utf8();
        }
        self.put(&s.as_bytes()[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        extension::{tests::port_registry, Complex64, RawExtension},
        primitives::*,
        value::put_extension,
    };
    use test_case::test_case;

    fn json(b: &[u8]) -> String {
        let mut out = Vec::new();
        let rest = unmarshal_as_json(&mut out, b).unwrap();
        assert!(rest.is_empty());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_map_keeps_wire_order() {
        let mut buf = Vec::new();
        put_map_header(&mut buf, 2);
        put_str(&mut buf, "y");
        put_str(&mut buf, "s");
        put_str(&mut buf, "x");
        put_int(&mut buf, 1);
        assert_eq!(json(&buf), r#"{"y":"s","x":1}"#);
    }

    #[test]
    fn test_scalars() {
        let mut buf = Vec::new();
        put_array_header(&mut buf, 9);
        put_nil(&mut buf);
        put_bool(&mut buf, true);
        put_bool(&mut buf, false);
        put_int(&mut buf, -5);
        put_uint(&mut buf, u64::MAX);
        put_f32(&mut buf, 0.1);
        put_f64(&mut buf, 1e21);
        put_f64(&mut buf, f64::NAN);
        put_bin(&mut buf, &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            json(&buf),
            r#"[null,true,false,-5,18446744073709551615,0.1,1000000000000000000000,null,"3q2+7w=="]"#
        );
    }

    #[test_case(b"plain", r#""plain""# ; "plain")]
    #[test_case(b"a\"b\\c", r#""a\"b\\c""# ; "quote and backslash")]
    #[test_case(b"l1\nl2\r", r#""l1\nl2\r""# ; "newline")]
    #[test_case(b"\x00\x1f\t", r#""\u0000\u001f\u0009""# ; "control")]
    #[test_case(b"\xff!\xfe", r#""\ufffd!\ufffd""# ; "invalid")]
    #[test_case("\u{2028}\u{2029}".as_bytes(), r#""\u2028\u2029""# ; "separators")]
    #[test_case("héllo ✓".as_bytes(), "\"héllo ✓\"" ; "unicode")]
    fn test_string_escaping(input: &[u8], expected: &str) {
        let mut buf = Vec::new();
        put_str_bytes(&mut buf, input);
        assert_eq!(json(&buf), expected);
    }

    #[test]
    fn test_binary_keys() {
        let mut buf = Vec::new();
        put_map_header(&mut buf, 1);
        put_bin(&mut buf, b"k");
        put_nil(&mut buf);
        assert_eq!(json(&buf), r#"{"k":null}"#);
    }

    #[test]
    fn test_invalid_key() {
        let mut buf = Vec::new();
        put_map_header(&mut buf, 1);
        put_int(&mut buf, 1);
        put_nil(&mut buf);
        let err = unmarshal_as_json(&mut Vec::new(), &buf).unwrap_err();
        assert!(matches!(err, Error::InvalidMapKey(WireType::Int)));
    }

    #[test]
    fn test_extensions() {
        let mut buf = Vec::new();
        put_array_header(&mut buf, 4);
        put_extension(&mut buf, &Timestamp::new(1_700_000_000, 500_000_000));
        put_extension(&mut buf, &RawExtension::new(9, vec![1, 2, 3]));
        put_extension(&mut buf, &RawExtension::new(42, vec![0x1f, 0x90]));
        put_extension(&mut buf, &Complex64 { re: 1.0, im: 2.0 });

        let transcoder = Transcoder::new().with_registry(Arc::new(port_registry()));
        let mut out = Vec::new();
        let rest = transcoder.transcode(&mut out, &buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"["2023-11-14T22:13:20.500Z",{"type":9,"data":"AQID"},{"port":8080},{"type":3,"data":"P4AAAEAAAAA="}]"#
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut buf = Vec::new();
        for _ in 0..5 {
            put_array_header(&mut buf, 1);
        }
        put_nil(&mut buf);
        let limits = Limits {
            max_depth: 4,
            ..Limits::default()
        };
        let err = Transcoder::new()
            .with_limits(limits)
            .transcode(&mut Vec::new(), &buf)
            .unwrap_err();
        assert!(matches!(err, Error::DepthExceeded(4)));
        assert_eq!(json(&buf), "[[[[[null]]]]]");
    }

    #[test]
    fn test_stream_returns_rest() {
        let mut buf = Vec::new();
        put_str(&mut buf, "first");
        put_int(&mut buf, 2);

        let mut reader = Reader::new(&buf[..]);
        let mut out = Vec::new();
        assert_eq!(copy_to_json(&mut out, &mut reader).unwrap(), 7);
        assert_eq!(reader.read_int().unwrap(), 2);

        let rest = unmarshal_as_json(&mut Vec::new(), &buf).unwrap();
        assert_eq!(rest, &[0x02]);
    }

    #[test]
    fn test_truncated() {
        let mut buf = Vec::new();
        put_array_header(&mut buf, 2);
        put_int(&mut buf, 1);
        let err = unmarshal_as_json(&mut Vec::new(), &buf).unwrap_err();
        assert!(err.is_short());
    }
}
