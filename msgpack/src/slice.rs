//! Decoding directly from an in-memory byte span.
//!
//! Every function takes the input span and returns the decoded value together with the remainder
//! of the span that follows it. Nothing here performs I/O or blocks.
//!
//! String and binary payloads can be read in two styles:
//! - zero-copy (`*_zc`), returning a sub-slice of the input. The result borrows the input and is
//!   only valid as long as the caller's buffer is.
//! - copying, returning owned memory (reusing the capacity of a caller-provided buffer where one
//!   is accepted).
//!
//! Header reads ([read_map_header], [read_array_header], [read_str_header], [read_bin_header])
//! report a nil in place of the header as [Error::Nil] without consuming it, so callers can
//! distinguish a nullable field that is present-and-nil from truncated input.
//!
//! Encoding into a span is provided by the `put_*` functions of [crate::primitives].

use crate::{
    error::at_least,
    extension::{Complex128, Complex64, Extension, RawExtension, Timestamp},
    primitives::{get_be, is_negative_fixint, is_positive_fixint},
    size::encoded_len,
    tag::*,
    Error, Number,
};
use bytes::Bytes;

/// Returns the first byte of `b`.
#[inline]
fn first(b: &[u8]) -> Result<u8, Error> {
    b.first().copied().ok_or(Error::ShortBytes {
        needed: 1,
        remaining: 0,
    })
}

/// Builds the error for a value of the wrong type.
#[inline]
pub(crate) fn mismatch(expected: WireType, tag: u8) -> Error {
    if tag == NEVER_USED {
        return Error::InvalidPrefix(tag);
    }
    Error::Type {
        expected,
        actual: wire_type(tag),
    }
}

/// Reads the big-endian field of `width` bytes following the tag.
#[inline]
fn field(b: &[u8], width: usize) -> Result<u64, Error> {
    at_least(b, 1 + width)?;
    Ok(get_be(&b[1..], width))
}

/// Splits `n` bytes off the front of `b`.
#[inline]
fn take(b: &[u8], n: usize) -> Result<(&[u8], &[u8]), Error> {
    at_least(b, n)?;
    Ok(b.split_at(n))
}

/// Returns the type of the next value.
pub fn next_type(b: &[u8]) -> Result<WireType, Error> {
    first(b).map(wire_type)
}

/// Returns true if the next value is nil.
pub fn is_nil(b: &[u8]) -> bool {
    b.first() == Some(&NIL)
}

/// Consumes a nil.
pub fn read_nil(b: &[u8]) -> Result<&[u8], Error> {
    match first(b)? {
        NIL => Ok(&b[1..]),
        tag => Err(mismatch(WireType::Nil, tag)),
    }
}

/// Reads a bool.
pub fn read_bool(b: &[u8]) -> Result<(bool, &[u8]), Error> {
    match first(b)? {
        TRUE => Ok((true, &b[1..])),
        FALSE => Ok((false, &b[1..])),
        tag => Err(mismatch(WireType::Bool, tag)),
    }
}

/// Reads any integer as an `i64`.
///
/// Unsigned forms are accepted if the value fits.
pub fn read_int(b: &[u8]) -> Result<(i64, &[u8]), Error> {
    let tag = first(b)?;
    if is_positive_fixint(tag) {
        return Ok((tag as i64, &b[1..]));
    }
    if is_negative_fixint(tag) {
        return Ok((tag as i8 as i64, &b[1..]));
    }
    let (v, n) = match tag {
        INT8 => (field(b, 1)? as u8 as i8 as i64, 2),
        INT16 => (field(b, 2)? as u16 as i16 as i64, 3),
        INT32 => (field(b, 4)? as u32 as i32 as i64, 5),
        INT64 => (field(b, 8)? as i64, 9),
        UINT8 | UINT16 | UINT32 | UINT64 => {
            let (u, rest) = read_uint(b)?;
            let v = i64::try_from(u).map_err(|_| Error::IntOverflow {
                value: u as i128,
                bits: 64,
            })?;
            return Ok((v, rest));
        }
        _ => return Err(mismatch(WireType::Int, tag)),
    };
    Ok((v, &b[n..]))
}

/// Reads any non-negative integer as a `u64`.
///
/// Signed forms are accepted if the value is not negative.
pub fn read_uint(b: &[u8]) -> Result<(u64, &[u8]), Error> {
    let tag = first(b)?;
    if is_positive_fixint(tag) {
        return Ok((tag as u64, &b[1..]));
    }
    let (v, n) = match tag {
        UINT8 => (field(b, 1)?, 2),
        UINT16 => (field(b, 2)?, 3),
        UINT32 => (field(b, 4)?, 5),
        UINT64 => (field(b, 8)?, 9),
        INT8 | INT16 | INT32 | INT64 | NEGATIVE_FIXINT_PREFIX..=u8::MAX => {
            let (i, rest) = read_int(b)?;
            let v = u64::try_from(i).map_err(|_| Error::UintBelowZero(i))?;
            return Ok((v, rest));
        }
        _ => return Err(mismatch(WireType::Uint, tag)),
    };
    Ok((v, &b[n..]))
}

macro_rules! impl_narrow {
    ($name:ident, $wide:ident, $type:ty, $bits:expr, $err:ident, $cast:ty) => {
        #[doc = concat!("Reads an integer that must fit in a `", stringify!($type), "`.")]
        pub fn $name(b: &[u8]) -> Result<($type, &[u8]), Error> {
            let (v, rest) = $wide(b)?;
            let v = <$type>::try_from(v).map_err(|_| Error::$err {
                value: v as $cast,
                bits: $bits,
            })?;
            Ok((v, rest))
        }
    };
}

impl_narrow!(read_i8, read_int, i8, 8, IntOverflow, i128);
impl_narrow!(read_i16, read_int, i16, 16, IntOverflow, i128);
impl_narrow!(read_i32, read_int, i32, 32, IntOverflow, i128);
impl_narrow!(read_u8, read_uint, u8, 8, UintOverflow, u64);
impl_narrow!(read_u16, read_uint, u16, 16, UintOverflow, u64);
impl_narrow!(read_u32, read_uint, u32, 32, UintOverflow, u64);

/// Reads an `i64` (alias of [read_int]).
#[inline]
pub fn read_i64(b: &[u8]) -> Result<(i64, &[u8]), Error> {
    read_int(b)
}

/// Reads a `u64` (alias of [read_uint]).
#[inline]
pub fn read_u64(b: &[u8]) -> Result<(u64, &[u8]), Error> {
    read_uint(b)
}

/// Reads a 32-bit float. Other numeric types are rejected.
pub fn read_f32(b: &[u8]) -> Result<(f32, &[u8]), Error> {
    match first(b)? {
        FLOAT32 => Ok((f32::from_bits(field(b, 4)? as u32), &b[5..])),
        tag => Err(mismatch(WireType::F32, tag)),
    }
}

/// Reads a 64-bit float, widening a 32-bit float if one is found.
pub fn read_f64(b: &[u8]) -> Result<(f64, &[u8]), Error> {
    match first(b)? {
        FLOAT64 => Ok((f64::from_bits(field(b, 8)?), &b[9..])),
        FLOAT32 => read_f32(b).map(|(v, rest)| (v as f64, rest)),
        tag => Err(mismatch(WireType::F64, tag)),
    }
}

/// Reads any integer or float, preserving its wire type.
///
/// Positive fixints and the signed forms decode as [Number::Int], the explicitly unsigned forms
/// as [Number::Uint].
pub fn read_number(b: &[u8]) -> Result<(Number, &[u8]), Error> {
    let tag = first(b)?;
    match wire_type(tag) {
        WireType::Int => read_int(b).map(|(v, rest)| (Number::Int(v), rest)),
        WireType::Uint => read_uint(b).map(|(v, rest)| (Number::Uint(v), rest)),
        WireType::F32 => read_f32(b).map(|(v, rest)| (Number::F32(v), rest)),
        WireType::F64 => read_f64(b).map(|(v, rest)| (Number::F64(v), rest)),
        _ => Err(mismatch(WireType::Number, tag)),
    }
}

/// Reads a map header, returning the number of key-value pairs.
pub fn read_map_header(b: &[u8]) -> Result<(u32, &[u8]), Error> {
    let tag = first(b)?;
    let (len, n) = match tag {
        0x80..=0x8f => ((tag & 0x0f) as u64, 1),
        MAP16 => (field(b, 2)?, 3),
        MAP32 => (field(b, 4)?, 5),
        NIL => return Err(Error::Nil),
        _ => return Err(mismatch(WireType::Map, tag)),
    };
    Ok((len as u32, &b[n..]))
}

/// Reads an array header, returning the number of elements.
pub fn read_array_header(b: &[u8]) -> Result<(u32, &[u8]), Error> {
    let tag = first(b)?;
    let (len, n) = match tag {
        0x90..=0x9f => ((tag & 0x0f) as u64, 1),
        ARRAY16 => (field(b, 2)?, 3),
        ARRAY32 => (field(b, 4)?, 5),
        NIL => return Err(Error::Nil),
        _ => return Err(mismatch(WireType::Array, tag)),
    };
    Ok((len as u32, &b[n..]))
}

/// Reads a string header, returning the byte length of the string.
pub fn read_str_header(b: &[u8]) -> Result<(u32, &[u8]), Error> {
    let tag = first(b)?;
    let (len, n) = match tag {
        0xa0..=0xbf => ((tag & 0x1f) as u64, 1),
        STR8 => (field(b, 1)?, 2),
        STR16 => (field(b, 2)?, 3),
        STR32 => (field(b, 4)?, 5),
        NIL => return Err(Error::Nil),
        _ => return Err(mismatch(WireType::Str, tag)),
    };
    Ok((len as u32, &b[n..]))
}

/// Reads a binary header, returning the byte length of the payload.
pub fn read_bin_header(b: &[u8]) -> Result<(u32, &[u8]), Error> {
    let tag = first(b)?;
    let (len, n) = match tag {
        BIN8 => (field(b, 1)?, 2),
        BIN16 => (field(b, 2)?, 3),
        BIN32 => (field(b, 4)?, 5),
        NIL => return Err(Error::Nil),
        _ => return Err(mismatch(WireType::Bin, tag)),
    };
    Ok((len as u32, &b[n..]))
}

/// Reads a binary payload without copying.
pub fn read_bytes_zc(b: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    let (len, rest) = read_bin_header(b)?;
    take(rest, len as usize)
}

/// Reads a binary payload into `dst`, reusing its allocation when the capacity suffices.
pub fn read_bytes(b: &[u8], mut dst: Vec<u8>) -> Result<(Vec<u8>, &[u8]), Error> {
    let (v, rest) = read_bytes_zc(b)?;
    dst.clear();
    dst.extend_from_slice(v);
    Ok((dst, rest))
}

/// Reads a binary payload as a zero-copy slice of a shared [Bytes] buffer.
pub fn read_bytes_shared(b: &Bytes) -> Result<(Bytes, Bytes), Error> {
    let (v, rest) = read_bytes_zc(b)?;
    Ok((b.slice_ref(v), b.slice_ref(rest)))
}

/// Reads the raw bytes of a string without copying or validating them.
pub fn read_str_bytes_zc(b: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    let (len, rest) = read_str_header(b)?;
    take(rest, len as usize)
}

/// Reads a string without copying.
///
/// The bytes are validated as UTF-8; use [read_str_bytes_zc] to skip validation.
pub fn read_str_zc(b: &[u8]) -> Result<(&str, &[u8]), Error> {
    let (v, rest) = read_str_bytes_zc(b)?;
    let v = std::str::from_utf8(v).map_err(|_| Error::InvalidUtf8)?;
    Ok((v, rest))
}

/// Reads a string into owned memory.
pub fn read_string(b: &[u8]) -> Result<(String, &[u8]), Error> {
    read_str_zc(b).map(|(v, rest)| (v.to_owned(), rest))
}

/// Reads the bytes of a string into `dst`, reusing its allocation when the capacity suffices.
pub fn read_string_as_bytes(b: &[u8], mut dst: Vec<u8>) -> Result<(Vec<u8>, &[u8]), Error> {
    let (v, rest) = read_str_bytes_zc(b)?;
    dst.clear();
    dst.extend_from_slice(v);
    Ok((dst, rest))
}

/// Reads a map key without copying.
///
/// Both string and binary values are accepted, so keys need not be valid UTF-8.
pub fn read_map_key_zc(b: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    let tag = first(b)?;
    match wire_type(tag) {
        WireType::Str => read_str_bytes_zc(b),
        WireType::Bin => read_bytes_zc(b),
        _ => Err(mismatch(WireType::Str, tag)),
    }
}

/// Reads an extension header, returning the type code, the payload length, and the input that
/// starts at the payload.
pub fn read_ext_header(b: &[u8]) -> Result<(i8, usize, &[u8]), Error> {
    let tag = first(b)?;
    let (len, header) = match tag {
        FIXEXT1 => (1, 2),
        FIXEXT2 => (2, 2),
        FIXEXT4 => (4, 2),
        FIXEXT8 => (8, 2),
        FIXEXT16 => (16, 2),
        EXT8 => (field(b, 1)? as usize, 3),
        EXT16 => (field(b, 2)? as usize, 4),
        EXT32 => (field(b, 4)? as usize, 6),
        _ => return Err(mismatch(WireType::Extension, tag)),
    };
    at_least(b, header)?;
    Ok((b[header - 1] as i8, len, &b[header..]))
}

/// Reads an extension without copying, returning the type code and payload.
pub fn read_extension_zc(b: &[u8]) -> Result<(i8, &[u8], &[u8]), Error> {
    let (code, len, rest) = read_ext_header(b)?;
    let (payload, rest) = take(rest, len)?;
    Ok((code, payload, rest))
}

/// Decodes an extension into `ext`, which must have the same type code as the encoded value.
pub fn read_extension<'a, E: Extension + ?Sized>(
    b: &'a [u8],
    ext: &mut E,
) -> Result<&'a [u8], Error> {
    let (code, payload, rest) = read_extension_zc(b)?;
    if code != ext.type_code() {
        return Err(Error::ExtensionMismatch {
            expected: ext.type_code(),
            actual: code,
        });
    }
    ext.read_payload(payload)?;
    Ok(rest)
}

/// Reads an extension of any type code.
pub fn read_raw_extension(b: &[u8]) -> Result<(RawExtension, &[u8]), Error> {
    let (code, payload, rest) = read_extension_zc(b)?;
    Ok((RawExtension::new(code, payload), rest))
}

/// Reads a built-in timestamp.
pub fn read_timestamp(b: &[u8]) -> Result<(Timestamp, &[u8]), Error> {
    let mut ts = Timestamp::default();
    let rest = read_extension(b, &mut ts)?;
    Ok((ts, rest))
}

/// Reads a built-in complex64.
pub fn read_complex64(b: &[u8]) -> Result<(Complex64, &[u8]), Error> {
    let mut c = Complex64::default();
    let rest = read_extension(b, &mut c)?;
    Ok((c, rest))
}

/// Reads a built-in complex128.
pub fn read_complex128(b: &[u8]) -> Result<(Complex128, &[u8]), Error> {
    let mut c = Complex128::default();
    let rest = read_extension(b, &mut c)?;
    Ok((c, rest))
}

/// Returns the complete encoding of the next value without decoding it.
pub fn read_raw(b: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    let len = encoded_len(b)?;
    Ok(b.split_at(len))
}
