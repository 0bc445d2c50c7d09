//! A numeric value of any wire width.

use crate::{primitives, tag::WireType};
use bytes::BufMut;
use std::fmt;

/// A signed integer, unsigned integer, or float, as it appeared on the wire.
///
/// The default (zero) value is `Int(0)`.
///
/// Integers are encoded in their minimal form, which does not record the variant: positive
/// fixints decode as `Int` and the explicitly unsigned forms as `Uint`. So `Uint(5)` decodes
/// as `Int(5)` and `Int(200)` decodes as `Uint(200)`. Compare decoded integers with
/// [Number::as_i64] or [Number::as_u64] rather than `==`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
}

impl Default for Number {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl Number {
    /// Returns the wire type this number encodes as.
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Int(_) => WireType::Int,
            Self::Uint(_) => WireType::Uint,
            Self::F32(_) => WireType::F32,
            Self::F64(_) => WireType::F64,
        }
    }

    /// Returns the value as an `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Uint(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns the value as a `u64` if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Int(v) => u64::try_from(v).ok(),
            Self::Uint(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as an `f64`, rounding large integers.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Uint(v) => v as f64,
            Self::F32(v) => v as f64,
            Self::F64(v) => v,
        }
    }

    /// Returns true if the number is zero of any type.
    pub fn is_zero(&self) -> bool {
        match *self {
            Self::Int(v) => v == 0,
            Self::Uint(v) => v == 0,
            Self::F32(v) => v == 0.0,
            Self::F64(v) => v == 0.0,
        }
    }

    /// Appends the minimal encoding of the number.
    pub fn put(&self, buf: &mut impl BufMut) {
        match *self {
            Self::Int(v) => primitives::put_int(buf, v),
            Self::Uint(v) => primitives::put_uint(buf, v),
            Self::F32(v) => primitives::put_f32(buf, v),
            Self::F64(v) => primitives::put_f64(buf, v),
        }
    }

    /// Returns the exact encoded size of the number.
    pub fn encoded_len(&self) -> usize {
        match *self {
            Self::Int(v) => crate::size::int_size(v),
            Self::Uint(v) => crate::size::uint_size(v),
            Self::F32(_) => crate::size::FLOAT32_SIZE,
            Self::F64(_) => crate::size::FLOAT64_SIZE,
        }
    }
}

/// Formats the number as decimal text, using the shortest representation that round-trips for
/// floats.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $target:ty, $($type:ty),+) => {
        $(
            impl From<$type> for Number {
                fn from(v: $type) -> Self {
                    Self::$variant(v as $target)
                }
            }
        )+
    };
}

impl_from!(Int, i64, i8, i16, i32, i64);
impl_from!(Uint, u64, u8, u16, u32, u64);
impl_from!(F32, f32, f32);
impl_from!(F64, f64, f64);
