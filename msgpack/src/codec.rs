//! Traits for types that encode themselves.
//!
//! Application types implement these traits (usually by hand, field by field) to be written to
//! and read from either codec:
//! - [Encode] and [Decode] for the stream [Writer] and [Reader].
//! - [Marshal] and [Unmarshal] for in-memory byte spans.
//! - [EncodeSize] for sizing buffers before marshaling.

use crate::{
    extension::{Complex128, Complex64, Timestamp},
    primitives::*,
    raw::Raw,
    size, slice,
    value::{self, put_extension},
    Error, Number, Reader, Value, Writer,
};
use bytes::BufMut;
use std::io;

/// Trait for types that can be written to a [Writer].
pub trait Encode {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error>;
}

/// Trait for types that can be read from a [Reader].
pub trait Decode: Sized {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error>;
}

/// Trait for types that can estimate their encoded size.
pub trait EncodeSize {
    /// Returns an upper bound on the number of bytes the value encodes to.
    fn msg_size(&self) -> usize;
}

/// Trait for types that can be appended to a buffer.
pub trait Marshal: EncodeSize {
    /// Appends the encoding of this value.
    fn marshal_msg(&self, buf: &mut impl BufMut);

    /// Encodes the value into a new buffer.
    ///
    /// Panics if `marshal_msg` writes more than `msg_size` bytes.
    ///
    /// (Provided method).
    fn to_msg(&self) -> Vec<u8> {
        let len = self.msg_size();
        let mut buf = Vec::with_capacity(len);
        self.marshal_msg(&mut buf);
        assert!(buf.len() <= len, "marshal_msg() exceeded msg_size()");
        buf
    }
}

/// Trait for types that can be read from a byte span, possibly borrowing from it.
pub trait Unmarshal<'a>: Sized {
    /// Reads a value from the front of `b`, returning it and the rest of `b`.
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error>;

    /// Reads a value from `b`, ensuring `b` is fully consumed.
    ///
    /// (Provided method).
    fn from_msg(b: &'a [u8]) -> Result<Self, Error> {
        let (value, rest) = Self::unmarshal_msg(b)?;
        if !rest.is_empty() {
            return Err(Error::ExtraData(rest.len()));
        }
        Ok(value)
    }
}

macro_rules! impl_scalar {
    ($($type:ty => $write:ident, $read:ident, $put:ident, $size:expr;)+) => {
        $(
            impl Encode for $type {
                #[inline]
                fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
                    w.$write(*self)
                }
            }

            impl Decode for $type {
                #[inline]
                fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
                    r.$read()
                }
            }

            impl EncodeSize for $type {
                #[inline]
                fn msg_size(&self) -> usize {
                    $size
                }
            }

            impl Marshal for $type {
                #[inline]
                fn marshal_msg(&self, buf: &mut impl BufMut) {
                    $put(buf, (*self).into());
                }
            }

            impl<'a> Unmarshal<'a> for $type {
                #[inline]
                fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
                    slice::$read(b)
                }
            }
        )+
    };
}

impl_scalar! {
    bool => write_bool, read_bool, put_bool, size::BOOL_SIZE;
    i8 => write_i8, read_i8, put_int, size::INT8_SIZE;
    i16 => write_i16, read_i16, put_int, size::INT16_SIZE;
    i32 => write_i32, read_i32, put_int, size::INT32_SIZE;
    i64 => write_i64, read_i64, put_int, size::INT64_SIZE;
    u8 => write_u8, read_u8, put_uint, size::INT8_SIZE;
    u16 => write_u16, read_u16, put_uint, size::INT16_SIZE;
    u32 => write_u32, read_u32, put_uint, size::INT32_SIZE;
    u64 => write_u64, read_u64, put_uint, size::INT64_SIZE;
    f32 => write_f32, read_f32, put_f32, size::FLOAT32_SIZE;
    f64 => write_f64, read_f64, put_f64, size::FLOAT64_SIZE;
}

impl Encode for str {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        w.write_str(self)
    }
}

impl EncodeSize for str {
    fn msg_size(&self) -> usize {
        size::str_prefix_size(self.len()) + self.len()
    }
}

impl Marshal for str {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        put_str(buf, self);
    }
}

impl<'a> Unmarshal<'a> for &'a str {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        slice::read_str_zc(b)
    }
}

impl Encode for String {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        w.write_str(self)
    }
}

impl Decode for String {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
        r.read_string()
    }
}

impl EncodeSize for String {
    fn msg_size(&self) -> usize {
        self.as_str().msg_size()
    }
}

impl Marshal for String {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        put_str(buf, self);
    }
}

impl<'a> Unmarshal<'a> for String {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        slice::read_string(b)
    }
}

// Byte vectors encode as binary, not as arrays of integers.

impl Encode for [u8] {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        w.write_bytes(self)
    }
}

impl EncodeSize for [u8] {
    fn msg_size(&self) -> usize {
        size::bin_prefix_size(self.len()) + self.len()
    }
}

impl Marshal for [u8] {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        put_bin(buf, self);
    }
}

impl<'a> Unmarshal<'a> for &'a [u8] {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        slice::read_bytes_zc(b)
    }
}

impl Encode for Vec<u8> {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        w.write_bytes(self)
    }
}

impl Decode for Vec<u8> {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
        r.read_bytes(Vec::new())
    }
}

impl EncodeSize for Vec<u8> {
    fn msg_size(&self) -> usize {
        self.as_slice().msg_size()
    }
}

impl Marshal for Vec<u8> {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        put_bin(buf, self);
    }
}

impl<'a> Unmarshal<'a> for Vec<u8> {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        slice::read_bytes(b, Vec::new())
    }
}

impl Encode for Number {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        w.write_number(*self)
    }
}

impl Decode for Number {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
        r.read_number()
    }
}

impl EncodeSize for Number {
    fn msg_size(&self) -> usize {
        self.encoded_len()
    }
}

impl Marshal for Number {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        self.put(buf);
    }
}

impl<'a> Unmarshal<'a> for Number {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        slice::read_number(b)
    }
}

impl Encode for Value {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        w.write_value(self)
    }
}

impl Decode for Value {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
        r.read_value()
    }
}

impl EncodeSize for Value {
    fn msg_size(&self) -> usize {
        self.encoded_len()
    }
}

impl Marshal for Value {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        self.put(buf);
    }
}

impl<'a> Unmarshal<'a> for Value {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        value::read_value(b)
    }
}

impl Encode for Raw<'_> {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        if self.is_empty() {
            return w.write_nil();
        }
        w.write_raw(self.as_bytes())
    }
}

impl Decode for Raw<'static> {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
        r.read_raw()
    }
}

impl EncodeSize for Raw<'_> {
    fn msg_size(&self) -> usize {
        self.encoded_len()
    }
}

impl Marshal for Raw<'_> {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        self.put(buf);
    }
}

impl<'a> Unmarshal<'a> for Raw<'a> {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        Raw::read_from(b)
    }
}

macro_rules! impl_extension {
    ($($type:ty => $write:ident, $read:ident, $size:expr;)+) => {
        $(
            impl Encode for $type {
                fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
                    w.$write(*self)
                }
            }

            impl Decode for $type {
                fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
                    r.$read()
                }
            }

            impl EncodeSize for $type {
                fn msg_size(&self) -> usize {
                    $size
                }
            }

            impl Marshal for $type {
                fn marshal_msg(&self, buf: &mut impl BufMut) {
                    put_extension(buf, self);
                }
            }

            impl<'a> Unmarshal<'a> for $type {
                fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
                    slice::$read(b)
                }
            }
        )+
    };
}

impl_extension! {
    Timestamp => write_timestamp, read_timestamp, size::TIMESTAMP_SIZE;
    Complex64 => write_complex64, read_complex64, size::COMPLEX64_SIZE;
    Complex128 => write_complex128, read_complex128, size::COMPLEX128_SIZE;
}

// An absent optional value encodes as nil.

impl<T: Encode> Encode for Option<T> {
    fn encode_msg<W: io::Write>(&self, w: &mut Writer<W>) -> Result<(), Error> {
        match self {
            Some(v) => v.encode_msg(w),
            None => w.write_nil(),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_msg<R: io::Read>(r: &mut Reader<R>) -> Result<Self, Error> {
        if r.is_nil() {
            r.read_nil()?;
            return Ok(None);
        }
        T::decode_msg(r).map(Some)
    }
}

impl<T: EncodeSize> EncodeSize for Option<T> {
    fn msg_size(&self) -> usize {
        match self {
            Some(v) => v.msg_size(),
            None => size::NIL_SIZE,
        }
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn marshal_msg(&self, buf: &mut impl BufMut) {
        match self {
            Some(v) => v.marshal_msg(buf),
            None => put_nil(buf),
        }
    }
}

impl<'a, T: Unmarshal<'a>> Unmarshal<'a> for Option<T> {
    fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        if slice::is_nil(b) {
            return Ok((None, slice::read_nil(b)?));
        }
        let (v, rest) = T::unmarshal_msg(b)?;
        Ok((Some(v), rest))
    }
}
