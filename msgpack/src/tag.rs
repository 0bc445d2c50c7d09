//! Classification of the leading byte of an encoded value.
//!
//! Every MessagePack value starts with a single tag byte. For the "fix" families (positive and
//! negative fixint, fixstr, fixarray, fixmap) the tag also carries a small inline value or length
//! in its low bits. Every other component dispatches on the [Tag] and [Layout] computed here.

use std::fmt;

pub const NIL: u8 = 0xc0;
pub const NEVER_USED: u8 = 0xc1;
pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;
pub const BIN8: u8 = 0xc4;
pub const BIN16: u8 = 0xc5;
pub const BIN32: u8 = 0xc6;
pub const EXT8: u8 = 0xc7;
pub const EXT16: u8 = 0xc8;
pub const EXT32: u8 = 0xc9;
pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;
pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;
pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;
pub const FIXEXT1: u8 = 0xd4;
pub const FIXEXT2: u8 = 0xd5;
pub const FIXEXT4: u8 = 0xd6;
pub const FIXEXT8: u8 = 0xd7;
pub const FIXEXT16: u8 = 0xd8;
pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;
pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;
pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

/// Upper bound of the positive fixint range (inclusive).
pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;
/// Lower bound of the negative fixint range (`-32`).
pub const NEGATIVE_FIXINT_MIN: i8 = -32;

pub const FIXMAP_PREFIX: u8 = 0x80;
pub const FIXARRAY_PREFIX: u8 = 0x90;
pub const FIXSTR_PREFIX: u8 = 0xa0;
pub const NEGATIVE_FIXINT_PREFIX: u8 = 0xe0;

/// Largest count that fits in a fixmap or fixarray tag.
pub const FIX_COUNT_MAX: usize = 15;
/// Largest length that fits in a fixstr tag.
pub const FIXSTR_MAX: usize = 31;

/// Fine-grained tag family of a leading byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Nil,
    Bool,
    PositiveFixInt,
    NegativeFixInt,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    FixStr,
    Str8,
    Str16,
    Str32,
    Bin8,
    Bin16,
    Bin32,
    FixArray,
    Array16,
    Array32,
    FixMap,
    Map16,
    Map32,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Ext8,
    Ext16,
    Ext32,
}

impl Tag {
    /// Returns the semantic type this tag family encodes.
    ///
    /// Positive fixints are reported as [WireType::Int]; only the explicitly unsigned 8/16/32/64
    /// bit forms are [WireType::Uint].
    pub const fn wire_type(self) -> WireType {
        match self {
            Self::Nil => WireType::Nil,
            Self::Bool => WireType::Bool,
            Self::PositiveFixInt
            | Self::NegativeFixInt
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64 => WireType::Int,
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => WireType::Uint,
            Self::Float32 => WireType::F32,
            Self::Float64 => WireType::F64,
            Self::FixStr | Self::Str8 | Self::Str16 | Self::Str32 => WireType::Str,
            Self::Bin8 | Self::Bin16 | Self::Bin32 => WireType::Bin,
            Self::FixArray | Self::Array16 | Self::Array32 => WireType::Array,
            Self::FixMap | Self::Map16 | Self::Map32 => WireType::Map,
            Self::FixExt1
            | Self::FixExt2
            | Self::FixExt4
            | Self::FixExt8
            | Self::FixExt16
            | Self::Ext8
            | Self::Ext16
            | Self::Ext32 => WireType::Extension,
        }
    }
}

/// Semantic type of an encoded value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Unrecognized leading byte.
    Invalid,
    Nil,
    Bool,
    Int,
    Uint,
    F32,
    F64,
    Str,
    Bin,
    Array,
    Map,
    Extension,
    /// Any numeric type; used as the expected type by readers that accept several.
    Number,
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::Nil => "nil",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Str => "str",
            Self::Bin => "bin",
            Self::Array => "array",
            Self::Map => "map",
            Self::Extension => "ext",
            Self::Number => "number",
        };
        f.write_str(name)
    }
}

/// How the payload following a tag is sized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    /// A payload of exactly this many bytes follows the header.
    Bytes(usize),
    /// The payload byte length is a big-endian integer of `width` bytes directly after the tag.
    Length { width: usize },
    /// The value holds this many sub-elements, counted inline in the tag.
    Elements(usize),
    /// The value holds `per` sub-elements for each unit of a big-endian count of `width` bytes
    /// directly after the tag.
    Count { width: usize, per: usize },
}

/// Header length and payload rule for a tag.
///
/// `header` counts the tag byte, any length or count field, and the type byte of extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub header: usize,
    pub payload: Payload,
}

const fn layout(header: usize, payload: Payload) -> Option<Layout> {
    Some(Layout { header, payload })
}

/// Classifies a leading byte, returning `None` for the single invalid tag (`0xc1`).
pub const fn classify(byte: u8) -> Option<Tag> {
    let tag = match byte {
        0x00..=0x7f => Tag::PositiveFixInt,
        0x80..=0x8f => Tag::FixMap,
        0x90..=0x9f => Tag::FixArray,
        0xa0..=0xbf => Tag::FixStr,
        NIL => Tag::Nil,
        NEVER_USED => return None,
        FALSE | TRUE => Tag::Bool,
        BIN8 => Tag::Bin8,
        BIN16 => Tag::Bin16,
        BIN32 => Tag::Bin32,
        EXT8 => Tag::Ext8,
        EXT16 => Tag::Ext16,
        EXT32 => Tag::Ext32,
        FLOAT32 => Tag::Float32,
        FLOAT64 => Tag::Float64,
        UINT8 => Tag::Uint8,
        UINT16 => Tag::Uint16,
        UINT32 => Tag::Uint32,
        UINT64 => Tag::Uint64,
        INT8 => Tag::Int8,
        INT16 => Tag::Int16,
        INT32 => Tag::Int32,
        INT64 => Tag::Int64,
        FIXEXT1 => Tag::FixExt1,
        FIXEXT2 => Tag::FixExt2,
        FIXEXT4 => Tag::FixExt4,
        FIXEXT8 => Tag::FixExt8,
        FIXEXT16 => Tag::FixExt16,
        STR8 => Tag::Str8,
        STR16 => Tag::Str16,
        STR32 => Tag::Str32,
        ARRAY16 => Tag::Array16,
        ARRAY32 => Tag::Array32,
        MAP16 => Tag::Map16,
        MAP32 => Tag::Map32,
        0xe0..=0xff => Tag::NegativeFixInt,
    };
    Some(tag)
}

/// Returns the semantic type of a leading byte ([WireType::Invalid] for `0xc1`).
pub const fn wire_type(byte: u8) -> WireType {
    match classify(byte) {
        Some(tag) => tag.wire_type(),
        None => WireType::Invalid,
    }
}

/// Returns the header length and payload rule of a leading byte.
pub const fn inline_length(byte: u8) -> Option<Layout> {
    let Some(tag) = classify(byte) else {
        return None;
    };
    match tag {
        Tag::Nil | Tag::Bool | Tag::PositiveFixInt | Tag::NegativeFixInt => {
            layout(1, Payload::Bytes(0))
        }
        Tag::Int8 | Tag::Uint8 => layout(1, Payload::Bytes(1)),
        Tag::Int16 | Tag::Uint16 => layout(1, Payload::Bytes(2)),
        Tag::Int32 | Tag::Uint32 | Tag::Float32 => layout(1, Payload::Bytes(4)),
        Tag::Int64 | Tag::Uint64 | Tag::Float64 => layout(1, Payload::Bytes(8)),
        Tag::FixStr => layout(1, Payload::Bytes((byte & 0x1f) as usize)),
        Tag::Str8 | Tag::Bin8 => layout(2, Payload::Length { width: 1 }),
        Tag::Str16 | Tag::Bin16 => layout(3, Payload::Length { width: 2 }),
        Tag::Str32 | Tag::Bin32 => layout(5, Payload::Length { width: 4 }),
        Tag::FixArray => layout(1, Payload::Elements((byte & 0x0f) as usize)),
        Tag::FixMap => layout(1, Payload::Elements(2 * (byte & 0x0f) as usize)),
        Tag::Array16 => layout(3, Payload::Count { width: 2, per: 1 }),
        Tag::Array32 => layout(5, Payload::Count { width: 4, per: 1 }),
        Tag::Map16 => layout(3, Payload::Count { width: 2, per: 2 }),
        Tag::Map32 => layout(5, Payload::Count { width: 4, per: 2 }),
        Tag::FixExt1 => layout(2, Payload::Bytes(1)),
        Tag::FixExt2 => layout(2, Payload::Bytes(2)),
        Tag::FixExt4 => layout(2, Payload::Bytes(4)),
        Tag::FixExt8 => layout(2, Payload::Bytes(8)),
        Tag::FixExt16 => layout(2, Payload::Bytes(16)),
        Tag::Ext8 => layout(3, Payload::Length { width: 1 }),
        Tag::Ext16 => layout(4, Payload::Length { width: 2 }),
        Tag::Ext32 => layout(6, Payload::Length { width: 4 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_every_byte_classified() {
        for byte in 0..=u8::MAX {
            match classify(byte) {
                None => assert_eq!(byte, NEVER_USED),
                Some(tag) => {
                    assert_ne!(tag.wire_type(), WireType::Invalid);
                    assert!(inline_length(byte).is_some());
                }
            }
        }
        assert_eq!(wire_type(NEVER_USED), WireType::Invalid);
        assert!(inline_length(NEVER_USED).is_none());
    }

    #[test_case(0x00, Tag::PositiveFixInt; "zero")]
    #[test_case(0x7f, Tag::PositiveFixInt; "fixint max")]
    #[test_case(0x80, Tag::FixMap; "empty fixmap")]
    #[test_case(0x9f, Tag::FixArray; "full fixarray")]
    #[test_case(0xbf, Tag::FixStr; "full fixstr")]
    #[test_case(0xc3, Tag::Bool; "true")]
    #[test_case(0xd8, Tag::FixExt16; "fixext16")]
    #[test_case(0xdf, Tag::Map32; "map32")]
    #[test_case(0xe0, Tag::NegativeFixInt; "minus thirty two")]
    #[test_case(0xff, Tag::NegativeFixInt; "minus one")]
    fn test_classify(byte: u8, expected: Tag) {
        assert_eq!(classify(byte), Some(expected));
    }

    #[test]
    fn test_inline_lengths() {
        assert_eq!(
            inline_length(0xa5),
            Some(Layout {
                header: 1,
                payload: Payload::Bytes(5)
            })
        );
        assert_eq!(
            inline_length(0x83),
            Some(Layout {
                header: 1,
                payload: Payload::Elements(6)
            })
        );
        assert_eq!(
            inline_length(EXT16),
            Some(Layout {
                header: 4,
                payload: Payload::Length { width: 2 }
            })
        );
        assert_eq!(
            inline_length(MAP16),
            Some(Layout {
                header: 3,
                payload: Payload::Count { width: 2, per: 2 }
            })
        );
    }

    #[test]
    fn test_wire_type_display() {
        assert_eq!(WireType::F64.to_string(), "float64");
        assert_eq!(wire_type(0xd9).to_string(), "str");
    }
}
