//! Minimal-size encoders for every scalar and header form.
//!
//! Every function appends to a [BufMut], choosing the shortest representation the format allows:
//! - Integers use a fixint when possible and otherwise the narrowest 8/16/32/64-bit form.
//!   Non-negative integers always use the unsigned forms, negative integers the signed forms.
//! - Floats are never narrowed.
//! - Strings use fixstr below 32 bytes, then 8/16/32-bit lengths at the 256 and 65536
//!   thresholds. Binary payloads use the same thresholds without a "fix" form.
//! - Array and map headers use the fix form below 16 elements, then 16/32-bit counts.
//! - Extensions use fixext when the payload is exactly 1, 2, 4, 8, or 16 bytes.
//!
//! All multi-byte fields are big-endian.
//!
//! # Panics
//!
//! Lengths that do not fit in a `u32` cannot be represented on the wire and panic.

use crate::tag::*;
use bytes::BufMut;

#[inline]
fn wire_len(len: usize) -> u32 {
    u32::try_from(len).expect("length exceeds u32")
}

/// Appends a nil.
#[inline]
pub fn put_nil(buf: &mut impl BufMut) {
    buf.put_u8(NIL);
}

/// Appends a bool.
#[inline]
pub fn put_bool(buf: &mut impl BufMut, v: bool) {
    buf.put_u8(if v { TRUE } else { FALSE });
}

/// Appends a signed integer in its minimal form.
///
/// Non-negative values are delegated to [put_uint] so that, for example, `200i64` encodes the
/// same as `200u64`.
#[inline]
pub fn put_int(buf: &mut impl BufMut, v: i64) {
    if v >= 0 {
        return put_uint(buf, v as u64);
    }
    if v >= NEGATIVE_FIXINT_MIN as i64 {
        buf.put_i8(v as i8);
    } else if v >= i8::MIN as i64 {
        buf.put_u8(INT8);
        buf.put_i8(v as i8);
    } else if v >= i16::MIN as i64 {
        buf.put_u8(INT16);
        buf.put_i16(v as i16);
    } else if v >= i32::MIN as i64 {
        buf.put_u8(INT32);
        buf.put_i32(v as i32);
    } else {
        buf.put_u8(INT64);
        buf.put_i64(v);
    }
}

/// Appends an unsigned integer in its minimal form.
#[inline]
pub fn put_uint(buf: &mut impl BufMut, v: u64) {
    if v <= POSITIVE_FIXINT_MAX as u64 {
        buf.put_u8(v as u8);
    } else if v <= u8::MAX as u64 {
        buf.put_u8(UINT8);
        buf.put_u8(v as u8);
    } else if v <= u16::MAX as u64 {
        buf.put_u8(UINT16);
        buf.put_u16(v as u16);
    } else if v <= u32::MAX as u64 {
        buf.put_u8(UINT32);
        buf.put_u32(v as u32);
    } else {
        buf.put_u8(UINT64);
        buf.put_u64(v);
    }
}

/// Appends a 32-bit float.
#[inline]
pub fn put_f32(buf: &mut impl BufMut, v: f32) {
    buf.put_u8(FLOAT32);
    buf.put_f32(v);
}

/// Appends a 64-bit float.
#[inline]
pub fn put_f64(buf: &mut impl BufMut, v: f64) {
    buf.put_u8(FLOAT64);
    buf.put_f64(v);
}

/// Appends the header of a string of `len` bytes.
pub fn put_str_header(buf: &mut impl BufMut, len: usize) {
    let len = wire_len(len);
    if len as usize <= FIXSTR_MAX {
        buf.put_u8(FIXSTR_PREFIX | len as u8);
    } else if len <= u8::MAX as u32 {
        buf.put_u8(STR8);
        buf.put_u8(len as u8);
    } else if len <= u16::MAX as u32 {
        buf.put_u8(STR16);
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(STR32);
        buf.put_u32(len);
    }
}

/// Appends a string.
#[inline]
pub fn put_str(buf: &mut impl BufMut, v: &str) {
    put_str_header(buf, v.len());
    buf.put_slice(v.as_bytes());
}

/// Appends raw bytes with a string header.
///
/// The bytes are not checked for valid UTF-8.
#[inline]
pub fn put_str_bytes(buf: &mut impl BufMut, v: &[u8]) {
    put_str_header(buf, v.len());
    buf.put_slice(v);
}

/// Appends the header of a binary payload of `len` bytes.
pub fn put_bin_header(buf: &mut impl BufMut, len: usize) {
    let len = wire_len(len);
    if len <= u8::MAX as u32 {
        buf.put_u8(BIN8);
        buf.put_u8(len as u8);
    } else if len <= u16::MAX as u32 {
        buf.put_u8(BIN16);
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(BIN32);
        buf.put_u32(len);
    }
}

/// Appends a binary payload.
#[inline]
pub fn put_bin(buf: &mut impl BufMut, v: &[u8]) {
    put_bin_header(buf, v.len());
    buf.put_slice(v);
}

/// Appends an array header for `len` elements.
pub fn put_array_header(buf: &mut impl BufMut, len: u32) {
    if len as usize <= FIX_COUNT_MAX {
        buf.put_u8(FIXARRAY_PREFIX | len as u8);
    } else if len <= u16::MAX as u32 {
        buf.put_u8(ARRAY16);
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(ARRAY32);
        buf.put_u32(len);
    }
}

/// Appends a map header for `len` key-value pairs.
pub fn put_map_header(buf: &mut impl BufMut, len: u32) {
    if len as usize <= FIX_COUNT_MAX {
        buf.put_u8(FIXMAP_PREFIX | len as u8);
    } else if len <= u16::MAX as u32 {
        buf.put_u8(MAP16);
        buf.put_u16(len as u16);
    } else {
        buf.put_u8(MAP32);
        buf.put_u32(len);
    }
}

/// Appends the header of an extension with a `len` byte payload.
pub fn put_ext_header(buf: &mut impl BufMut, code: i8, len: usize) {
    let len = wire_len(len);
    match len {
        1 => buf.put_u8(FIXEXT1),
        2 => buf.put_u8(FIXEXT2),
        4 => buf.put_u8(FIXEXT4),
        8 => buf.put_u8(FIXEXT8),
        16 => buf.put_u8(FIXEXT16),
        _ if len <= u8::MAX as u32 => {
            buf.put_u8(EXT8);
            buf.put_u8(len as u8);
        }
        _ if len <= u16::MAX as u32 => {
            buf.put_u8(EXT16);
            buf.put_u16(len as u16);
        }
        _ => {
            buf.put_u8(EXT32);
            buf.put_u32(len);
        }
    }
    buf.put_i8(code);
}

/// Appends an extension.
#[inline]
pub fn put_ext(buf: &mut impl BufMut, code: i8, payload: &[u8]) {
    put_ext_header(buf, code, payload.len());
    buf.put_slice(payload);
}

/// Reads a big-endian unsigned integer of `width` (1, 2, 4, or 8) bytes.
///
/// The caller must ensure `b` holds at least `width` bytes.
#[inline]
pub fn get_be(b: &[u8], width: usize) -> u64 {
    match width {
        1 => b[0] as u64,
        2 => u16::from_be_bytes([b[0], b[1]]) as u64,
        4 => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64,
        8 => u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
        _ => unreachable!("invalid field width {width}"),
    }
}

/// Returns true if the byte is a positive fixint.
#[inline]
pub const fn is_positive_fixint(byte: u8) -> bool {
    byte <= POSITIVE_FIXINT_MAX
}

/// Returns true if the byte is a negative fixint.
#[inline]
pub const fn is_negative_fixint(byte: u8) -> bool {
    byte >= NEGATIVE_FIXINT_PREFIX
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn int(v: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        put_int(&mut buf, v);
        buf
    }

    fn uint(v: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        put_uint(&mut buf, v);
        buf
    }

    #[test_case(0, &[0x00]; "zero")]
    #[test_case(127, &[0x7f]; "fixint max")]
    #[test_case(128, &[0xcc, 0x80]; "uint8 min")]
    #[test_case(200, &[0xcc, 200]; "uint8")]
    #[test_case(256, &[0xcd, 0x01, 0x00]; "uint16 min")]
    #[test_case(65536, &[0xce, 0x00, 0x01, 0x00, 0x00]; "uint32 min")]
    #[test_case(1 << 32, &[0xcf, 0, 0, 0, 1, 0, 0, 0, 0]; "uint64 min")]
    fn test_put_uint(v: u64, expected: &[u8]) {
        assert_eq!(uint(v), expected);
        assert_eq!(int(v as i64), expected);
    }

    #[test_case(-1, &[0xff]; "minus one")]
    #[test_case(-32, &[0xe0]; "fixint min")]
    #[test_case(-33, &[0xd0, 0xdf]; "int8")]
    #[test_case(-128, &[0xd0, 0x80]; "int8 min")]
    #[test_case(-129, &[0xd1, 0xff, 0x7f]; "int16")]
    #[test_case(-32769, &[0xd2, 0xff, 0xff, 0x7f, 0xff]; "int32")]
    #[test_case(i64::MIN, &[0xd3, 0x80, 0, 0, 0, 0, 0, 0, 0]; "int64 min")]
    fn test_put_negative_int(v: i64, expected: &[u8]) {
        assert_eq!(int(v), expected);
    }

    #[test]
    fn test_put_floats_not_narrowed() {
        let mut buf = Vec::new();
        put_f64(&mut buf, 1.0);
        assert_eq!(buf, [0xcb, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        buf.clear();
        put_f32(&mut buf, 1.0);
        assert_eq!(buf, [0xca, 0x3f, 0x80, 0, 0]);
    }

    #[test_case(0, &[0xa0]; "empty")]
    #[test_case(31, &[0xbf]; "fixstr max")]
    #[test_case(32, &[0xd9, 32]; "str8")]
    #[test_case(255, &[0xd9, 255]; "str8 max")]
    #[test_case(256, &[0xda, 0x01, 0x00]; "str16")]
    #[test_case(65536, &[0xdb, 0x00, 0x01, 0x00, 0x00]; "str32")]
    fn test_put_str_header(len: usize, expected: &[u8]) {
        let mut buf = Vec::new();
        put_str_header(&mut buf, len);
        assert_eq!(buf, expected);
    }

    #[test_case(0, &[0xc4, 0]; "empty")]
    #[test_case(255, &[0xc4, 255]; "bin8 max")]
    #[test_case(256, &[0xc5, 0x01, 0x00]; "bin16")]
    #[test_case(65536, &[0xc6, 0x00, 0x01, 0x00, 0x00]; "bin32")]
    fn test_put_bin_header(len: usize, expected: &[u8]) {
        let mut buf = Vec::new();
        put_bin_header(&mut buf, len);
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_put_container_headers() {
        let mut buf = Vec::new();
        put_map_header(&mut buf, 2);
        put_array_header(&mut buf, 15);
        put_array_header(&mut buf, 16);
        put_map_header(&mut buf, 65536);
        assert_eq!(
            buf,
            [0x82, 0x9f, 0xdc, 0x00, 0x10, 0xdf, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test_case(0, &[0xc7, 0, 7]; "empty ext8")]
    #[test_case(1, &[0xd4, 7]; "fixext1")]
    #[test_case(3, &[0xc7, 3, 7]; "ext8")]
    #[test_case(16, &[0xd8, 7]; "fixext16")]
    #[test_case(256, &[0xc8, 0x01, 0x00, 7]; "ext16")]
    #[test_case(65536, &[0xc9, 0x00, 0x01, 0x00, 0x00, 7]; "ext32")]
    fn test_put_ext_header(len: usize, expected: &[u8]) {
        let mut buf = Vec::new();
        put_ext_header(&mut buf, 7, len);
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_get_be() {
        assert_eq!(get_be(&[0x01, 0x02], 2), 0x0102);
        assert_eq!(get_be(&[0xff, 0, 0, 1], 4), 0xff000001);
    }

    #[test]
    fn test_fixint_ranges() {
        assert!(is_positive_fixint(0x7f));
        assert!(!is_positive_fixint(0x80));
        assert!(is_negative_fixint(0xe0));
        assert!(!is_negative_fixint(0xdf));
    }
}
