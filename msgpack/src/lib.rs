//! Encode, decode, inspect, and edit MessagePack data.
//!
//! # Overview
//!
//! A byte-exact implementation of the [MessagePack](https://msgpack.org) wire format designed to
//! efficiently and safely:
//! - Encode values in their smallest wire form (the same value always yields the same bytes)
//! - Decode untrusted input, either from a stream ([Reader]) or directly from memory
//!   ([slice], with zero-copy access to strings and binary payloads)
//! - Skip, copy, or measure values without decoding them ([size])
//! - Translate values to JSON as they are read ([json])
//! - Replace a field of an encoded map without re-encoding the map ([edit])
//!
//! # Supported Types
//!
//! Natively supports:
//! - Primitives: `u8`, `u16`, `u32`, `u64`, `i8`, `i16`, `i32`, `i64`, `f32`, `f64`, `bool`
//! - Strings (`String`, `&str`) and binary (`Vec<u8>`, `&[u8]`)
//! - `Option<T>` (with `None` encoded as nil)
//! - Extension types: [Timestamp], [Complex64], [Complex128], and any type implementing
//!   [Extension]
//! - Values of unknown shape: [Value] (decoded) and [Raw] (still encoded)
//!
//! User-defined types are encoded and decoded by implementing the traits of [codec].
//!
//! # Example
//!
//! ```
//! use bytes::BufMut;
//! use commonware_msgpack::{
//!     primitives::*, size, slice, EncodeSize, Error, Marshal, Unmarshal,
//! };
//!
//! #[derive(Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: Option<u8>,
//! }
//!
//! impl EncodeSize for Person {
//!     fn msg_size(&self) -> usize {
//!         size::MAP_HEADER_SIZE
//!             + "name".msg_size()
//!             + self.name.msg_size()
//!             + "age".msg_size()
//!             + self.age.msg_size()
//!     }
//! }
//!
//! // Encode as a map, so fields can be added or reordered later
//! impl Marshal for Person {
//!     fn marshal_msg(&self, buf: &mut impl BufMut) {
//!         put_map_header(buf, 2);
//!         put_str(buf, "name");
//!         self.name.marshal_msg(buf);
//!         put_str(buf, "age");
//!         self.age.marshal_msg(buf);
//!     }
//! }
//!
//! // Unknown fields are skipped and missing fields keep their defaults
//! impl<'a> Unmarshal<'a> for Person {
//!     fn unmarshal_msg(b: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
//!         let (fields, mut b) = slice::read_map_header(b)?;
//!         let mut person = Person { name: String::new(), age: None };
//!         for _ in 0..fields {
//!             let (key, rest) = slice::read_map_key_zc(b)?;
//!             b = match key {
//!                 b"name" => {
//!                     let (name, rest) = String::unmarshal_msg(rest)?;
//!                     person.name = name;
//!                     rest
//!                 }
//!                 b"age" => {
//!                     let (age, rest) = Option::<u8>::unmarshal_msg(rest)?;
//!                     person.age = age;
//!                     rest
//!                 }
//!                 _ => size::skip(rest)?,
//!             };
//!         }
//!         Ok((person, b))
//!     }
//! }
//!
//! let person = Person { name: "Ada".into(), age: Some(36) };
//! let encoded = person.to_msg();
//! assert_eq!(encoded.len(), 15);
//! assert_eq!(Person::from_msg(&encoded).unwrap(), person);
//!
//! // The same bytes can be inspected without knowing their shape
//! let mut json = Vec::new();
//! commonware_msgpack::json::unmarshal_as_json(&mut json, &encoded).unwrap();
//! assert_eq!(json, br#"{"name":"Ada","age":36}"#);
//! ```

pub mod codec;
pub mod config;
pub mod edit;
pub mod error;
pub mod extension;
pub mod json;
pub mod nil;
pub mod number;
pub mod pool;
pub mod primitives;
pub mod raw;
pub mod read;
pub mod size;
pub mod slice;
pub mod tag;
pub mod value;
pub mod write;

// Re-export main types and traits
pub use codec::{Decode, Encode, EncodeSize, Marshal, Unmarshal};
pub use config::{Config, Limits};
pub use error::Error;
pub use extension::{
    Complex128, Complex64, Extension, ExtensionRegistry, RawExtension, Timestamp,
};
pub use json::Transcoder;
pub use number::Number;
pub use pool::{Pool, Pooled, Recycle};
pub use raw::Raw;
pub use read::Reader;
pub use tag::WireType;
pub use value::{ExtValue, Value};
pub use write::Writer;
