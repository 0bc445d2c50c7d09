//! Pre-encoded values.

use crate::{
    extension::ExtensionRegistry,
    primitives::put_nil,
    size, slice,
    tag::WireType,
    value::read_value_with,
    Error, Limits, Value,
};
use bytes::BufMut;
use std::borrow::Cow;

/// The complete encoding of a single value, passed through without decoding.
///
/// An empty `Raw` encodes as nil.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Raw<'a>(Cow<'a, [u8]>);

impl<'a> Raw<'a> {
    /// Wraps bytes that hold exactly one encoded value, without checking them.
    pub fn borrowed(encoded: &'a [u8]) -> Self {
        Self(Cow::Borrowed(encoded))
    }

    /// Takes ownership of bytes that hold exactly one encoded value, without checking them.
    pub fn owned(encoded: Vec<u8>) -> Raw<'static> {
        Raw(Cow::Owned(encoded))
    }

    /// Splits the next encoded value off the front of `b`, without copying.
    pub fn read_from(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        let (raw, rest) = slice::read_raw(b)?;
        Ok((Self::borrowed(raw), rest))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the wire type of the value (nil if empty).
    pub fn wire_type(&self) -> WireType {
        if self.is_empty() {
            return WireType::Nil;
        }
        crate::tag::wire_type(self.0[0])
    }

    /// Returns the number of bytes [Raw::put] appends.
    pub fn encoded_len(&self) -> usize {
        if self.is_empty() {
            return size::NIL_SIZE;
        }
        self.len()
    }

    /// Appends the encoding as-is.
    pub fn put(&self, buf: &mut impl BufMut) {
        if self.is_empty() {
            put_nil(buf);
            return;
        }
        buf.put_slice(&self.0);
    }

    /// Decodes the value.
    pub fn to_value(&self, registry: &ExtensionRegistry, limits: &Limits) -> Result<Value, Error> {
        if self.is_empty() {
            return Ok(Value::Nil);
        }
        read_value_with(&self.0, registry, limits).map(|(value, _)| value)
    }

    /// Copies borrowed bytes so the value no longer borrows its source.
    pub fn into_owned(self) -> Raw<'static> {
        Raw(Cow::Owned(self.0.into_owned()))
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0.into_owned()
    }
}

impl AsRef<[u8]> for Raw<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::*;

    #[test]
    fn test_read_from() {
        let mut buf = Vec::new();
        put_array_header(&mut buf, 2);
        put_int(&mut buf, 1);
        put_str(&mut buf, "two");
        put_bool(&mut buf, true);

        let (raw, rest) = Raw::read_from(&buf).unwrap();
        assert_eq!(raw.len(), 6);
        assert_eq!(raw.wire_type(), WireType::Array);
        assert_eq!(rest, &[0xc3]);
        assert_eq!(raw.as_bytes().as_ptr(), buf.as_ptr());

        let value = raw
            .to_value(&ExtensionRegistry::default(), &Limits::default())
            .unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(1), Value::from("two")])
        );
    }

    #[test]
    fn test_empty_is_nil() {
        let raw = Raw::default();
        assert_eq!(raw.wire_type(), WireType::Nil);
        assert_eq!(raw.encoded_len(), 1);
        let mut buf = Vec::new();
        raw.put(&mut buf);
        assert_eq!(buf, [0xc0]);
    }

    #[test]
    fn test_into_owned() {
        let buf = vec![0x01];
        let owned = Raw::borrowed(&buf).into_owned();
        drop(buf);
        assert_eq!(owned.into_vec(), vec![0x01]);
    }
}
