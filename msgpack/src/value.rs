//! Decoding of arbitrary encoded data into a closed dynamic representation.

use crate::{
    config::Limits,
    extension::{
        Complex128, Complex64, Extension, ExtensionRegistry, RawExtension, Timestamp,
        COMPLEX128_CODE, COMPLEX64_CODE, TIMESTAMP_CODE,
    },
    primitives::*,
    size,
    slice::{self, mismatch},
    tag::WireType,
    Error, Number,
};
use bytes::BufMut;
use std::{collections::BTreeMap, sync::Arc};

/// Any encoded value.
///
/// Positive fixints and signed forms decode as [Value::Int]; the explicitly unsigned forms
/// decode as [Value::Uint]. Map keys may be encoded as strings or binary, but must be UTF-8.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Extension(ExtValue),
}

/// A decoded extension.
#[derive(Clone, Debug)]
pub enum ExtValue {
    Complex64(Complex64),
    Complex128(Complex128),
    Timestamp(Timestamp),
    /// A type rebuilt from an [ExtensionRegistry].
    Registered(Arc<dyn Extension>),
    /// An unregistered type.
    Raw(RawExtension),
}

impl ExtValue {
    /// Builds the concrete extension for `code`, consulting `registry` for application codes.
    pub fn decode(code: i8, data: &[u8], registry: &ExtensionRegistry) -> Result<Self, Error> {
        let ext = match code {
            COMPLEX64_CODE => {
                let mut c = Complex64::default();
                c.read_payload(data)?;
                Self::Complex64(c)
            }
            COMPLEX128_CODE => {
                let mut c = Complex128::default();
                c.read_payload(data)?;
                Self::Complex128(c)
            }
            TIMESTAMP_CODE => {
                let mut ts = Timestamp::default();
                ts.read_payload(data)?;
                Self::Timestamp(ts)
            }
            _ => match registry.decode(code, data)? {
                Some(ext) => Self::Registered(Arc::from(ext)),
                None => Self::Raw(RawExtension::new(code, data)),
            },
        };
        Ok(ext)
    }

    /// Returns the extension as a trait object.
    pub fn as_extension(&self) -> &dyn Extension {
        match self {
            Self::Complex64(c) => c as &dyn Extension,
            Self::Complex128(c) => c as &dyn Extension,
            Self::Timestamp(ts) => ts as &dyn Extension,
            Self::Registered(ext) => ext.as_ref(),
            Self::Raw(raw) => raw as &dyn Extension,
        }
    }

    /// Appends the encoded extension.
    pub fn put(&self, buf: &mut impl BufMut) {
        put_extension(buf, self.as_extension());
    }
}

impl PartialEq for ExtValue {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.as_extension(), other.as_extension());
        if a.type_code() != b.type_code() || a.payload_len() != b.payload_len() {
            return false;
        }
        let mut left = Vec::with_capacity(a.payload_len());
        let mut right = Vec::with_capacity(b.payload_len());
        a.write_payload(&mut left);
        b.write_payload(&mut right);
        left == right
    }
}

/// Appends an extension (header and payload).
pub fn put_extension(buf: &mut impl BufMut, ext: &dyn Extension) {
    put_ext_header(buf, ext.type_code(), ext.payload_len());
    ext.write_payload(buf);
}

impl Value {
    /// Returns the wire type this value encodes as.
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Nil => WireType::Nil,
            Self::Bool(_) => WireType::Bool,
            Self::Int(_) => WireType::Int,
            Self::Uint(_) => WireType::Uint,
            Self::F32(_) => WireType::F32,
            Self::F64(_) => WireType::F64,
            Self::String(_) => WireType::Str,
            Self::Bytes(_) => WireType::Bin,
            Self::Array(_) => WireType::Array,
            Self::Map(_) => WireType::Map,
            Self::Extension(_) => WireType::Extension,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a [Number] if it is numeric.
    pub fn as_number(&self) -> Option<Number> {
        match *self {
            Self::Int(v) => Some(Number::Int(v)),
            Self::Uint(v) => Some(Number::Uint(v)),
            Self::F32(v) => Some(Number::F32(v)),
            Self::F64(v) => Some(Number::F64(v)),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` if the value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Appends the minimal encoding of the value.
    ///
    /// Map entries are written in key order.
    pub fn put(&self, buf: &mut impl BufMut) {
        match self {
            Self::Nil => put_nil(buf),
            Self::Bool(v) => put_bool(buf, *v),
            Self::Int(v) => put_int(buf, *v),
            Self::Uint(v) => put_uint(buf, *v),
            Self::F32(v) => put_f32(buf, *v),
            Self::F64(v) => put_f64(buf, *v),
            Self::String(s) => put_str(buf, s),
            Self::Bytes(b) => put_bin(buf, b),
            Self::Array(items) => {
                put_array_header(buf, count(items.len()));
                for item in items {
                    item.put(buf);
                }
            }
            Self::Map(map) => {
                put_map_header(buf, count(map.len()));
                for (key, value) in map {
                    put_str(buf, key);
                    value.put(buf);
                }
            }
            Self::Extension(ext) => ext.put(buf),
        }
    }

    /// Returns the exact encoded length of the value.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Nil | Self::Bool(_) => 1,
            Self::Int(v) => size::int_size(*v),
            Self::Uint(v) => size::uint_size(*v),
            Self::F32(_) => size::FLOAT32_SIZE,
            Self::F64(_) => size::FLOAT64_SIZE,
            Self::String(s) => size::str_prefix_size(s.len()) + s.len(),
            Self::Bytes(b) => size::bin_prefix_size(b.len()) + b.len(),
            Self::Array(items) => {
                size::header_size(count(items.len()))
                    + items.iter().map(Value::encoded_len).sum::<usize>()
            }
            Self::Map(map) => {
                size::header_size(count(map.len()))
                    + map
                        .iter()
                        .map(|(k, v)| size::str_prefix_size(k.len()) + k.len() + v.encoded_len())
                        .sum::<usize>()
            }
            Self::Extension(ext) => {
                let len = ext.as_extension().payload_len();
                size::ext_prefix_size(len) + len
            }
        }
    }

    /// Encodes the value into a new buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.put(&mut buf);
        buf
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).expect("collection length exceeds u32")
}

/// Decodes the next value with an empty registry and default limits.
pub fn read_value(b: &[u8]) -> Result<(Value, &[u8]), Error> {
    read_value_with(b, &ExtensionRegistry::default(), &Limits::default())
}

/// Decodes the next value, rebuilding registered extensions from `registry`.
pub fn read_value_with<'a>(
    b: &'a [u8],
    registry: &ExtensionRegistry,
    limits: &Limits,
) -> Result<(Value, &'a [u8]), Error> {
    decode(b, registry, limits, 0)
}

fn decode<'a>(
    b: &'a [u8],
    registry: &ExtensionRegistry,
    limits: &Limits,
    depth: usize,
) -> Result<(Value, &'a [u8]), Error> {
    let tag = slice::next_type(b)?;
    let (value, rest) = match tag {
        WireType::Nil => (Value::Nil, slice::read_nil(b)?),
        WireType::Bool => {
            let (v, rest) = slice::read_bool(b)?;
            (Value::Bool(v), rest)
        }
        WireType::Int => {
            let (v, rest) = slice::read_int(b)?;
            (Value::Int(v), rest)
        }
        WireType::Uint => {
            let (v, rest) = slice::read_uint(b)?;
            (Value::Uint(v), rest)
        }
        WireType::F32 => {
            let (v, rest) = slice::read_f32(b)?;
            (Value::F32(v), rest)
        }
        WireType::F64 => {
            let (v, rest) = slice::read_f64(b)?;
            (Value::F64(v), rest)
        }
        WireType::Str => {
            let (v, rest) = slice::read_string(b)?;
            (Value::String(v), rest)
        }
        WireType::Bin => {
            let (v, rest) = slice::read_bytes_zc(b)?;
            (Value::Bytes(v.to_vec()), rest)
        }
        WireType::Array => {
            limits.check_depth(depth + 1)?;
            let (len, mut rest) = slice::read_array_header(b)?;
            let mut items = Vec::with_capacity(limits.prealloc(len as usize));
            for _ in 0..len {
                let (item, next) = decode(rest, registry, limits, depth + 1)?;
                items.push(item);
                rest = next;
            }
            (Value::Array(items), rest)
        }
        WireType::Map => {
            limits.check_depth(depth + 1)?;
            let (len, mut rest) = slice::read_map_header(b)?;
            let mut map = BTreeMap::new();
            for _ in 0..len {
                let (key, next) = slice::read_map_key_zc(rest)?;
                let key = std::str::from_utf8(key).map_err(|_| Error::InvalidUtf8)?;
                let (value, next) = decode(next, registry, limits, depth + 1)?;
                map.insert(key.to_owned(), value);
                rest = next;
            }
            (Value::Map(map), rest)
        }
        WireType::Extension => {
            let (code, payload, rest) = slice::read_extension_zc(b)?;
            (
                Value::Extension(ExtValue::decode(code, payload, registry)?),
                rest,
            )
        }
        WireType::Invalid | WireType::Number => return Err(mismatch(WireType::Nil, b[0])),
    };
    Ok((value, rest))
}

macro_rules! impl_from {
    ($variant:ident, $target:ty, $($type:ty),+) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )+
    };
}

impl_from!(Bool, bool, bool);
impl_from!(Int, i64, i8, i16, i32, i64);
impl_from!(Uint, u64, u8, u16, u32, u64);
impl_from!(F32, f32, f32);
impl_from!(F64, f64, f64);
impl_from!(String, String, String, &str);
impl_from!(Bytes, Vec<u8>, Vec<u8>, &[u8]);

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => Self::Int(v),
            Number::Uint(v) => Self::Uint(v),
            Number::F32(v) => Self::F32(v),
            Number::F64(v) => Self::F64(v),
        }
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Self::Extension(ExtValue::Timestamp(ts))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().collect())
    }
}
