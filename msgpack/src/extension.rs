//! Application-defined extension types.
//!
//! An extension is a payload of opaque bytes tagged with a signed 8-bit type code. Three codes are
//! reserved for types built into this crate:
//! - `3`: [Complex64], two big-endian `f32` (8 byte payload)
//! - `4`: [Complex128], two big-endian `f64` (16 byte payload)
//! - `5`: [Timestamp], big-endian `i64` seconds and `u32` nanoseconds (12 byte payload, 15
//!   bytes encoded)
//!
//! Non-negative codes other than these may be registered in an [ExtensionRegistry], which dynamic
//! value decoding and JSON transcoding consult to rebuild a concrete type instead of a
//! [RawExtension]. A registry is populated once before use and then shared read-only.

use crate::Error;
use bytes::BufMut;
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    collections::HashMap,
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::debug;

/// Type code of [Complex64].
pub const COMPLEX64_CODE: i8 = 3;
/// Type code of [Complex128].
pub const COMPLEX128_CODE: i8 = 4;
/// Type code of [Timestamp].
pub const TIMESTAMP_CODE: i8 = 5;

const RESERVED: [i8; 3] = [COMPLEX64_CODE, COMPLEX128_CODE, TIMESTAMP_CODE];

/// A type that can be carried as an extension payload.
pub trait Extension: fmt::Debug + Send + Sync {
    /// The type code written with the payload.
    fn type_code(&self) -> i8;

    /// The exact number of bytes [Extension::write_payload] writes.
    fn payload_len(&self) -> usize;

    /// Writes the payload (without any header).
    fn write_payload(&self, buf: &mut dyn BufMut);

    /// Replaces the contents of `self` with the decoded payload.
    fn read_payload(&mut self, data: &[u8]) -> Result<(), Error>;

    /// The JSON form used by the transcoder when this type is registered.
    ///
    /// Returning `None` selects the generic `{"type":<code>,"data":"<base64>"}` form.
    fn to_json(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Returns an error unless `data` is exactly `len` bytes.
fn expect_len(code: i8, data: &[u8], len: usize) -> Result<(), Error> {
    if data.len() != len {
        return Err(Error::InvalidExtension {
            code,
            len: data.len(),
        });
    }
    Ok(())
}

/// An extension of any type code whose payload is kept as raw bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawExtension {
    pub code: i8,
    pub data: Vec<u8>,
}

impl RawExtension {
    pub fn new(code: i8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }
}

impl Extension for RawExtension {
    fn type_code(&self) -> i8 {
        self.code
    }

    fn payload_len(&self) -> usize {
        self.data.len()
    }

    fn write_payload(&self, buf: &mut dyn BufMut) {
        buf.put_slice(&self.data);
    }

    fn read_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        self.data.clear();
        self.data.extend_from_slice(data);
        Ok(())
    }
}

/// A complex number with 32-bit components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex64 {
    pub re: f32,
    pub im: f32,
}

impl Extension for Complex64 {
    fn type_code(&self) -> i8 {
        COMPLEX64_CODE
    }

    fn payload_len(&self) -> usize {
        8
    }

    fn write_payload(&self, buf: &mut dyn BufMut) {
        buf.put_f32(self.re);
        buf.put_f32(self.im);
    }

    fn read_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        expect_len(COMPLEX64_CODE, data, 8)?;
        self.re = f32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        self.im = f32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        Ok(())
    }
}

/// A complex number with 64-bit components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex128 {
    pub re: f64,
    pub im: f64,
}

impl Extension for Complex128 {
    fn type_code(&self) -> i8 {
        COMPLEX128_CODE
    }

    fn payload_len(&self) -> usize {
        16
    }

    fn write_payload(&self, buf: &mut dyn BufMut) {
        buf.put_f64(self.re);
        buf.put_f64(self.im);
    }

    fn read_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        expect_len(COMPLEX128_CODE, data, 16)?;
        let (re, im) = data.split_at(8);
        self.re = f64::from_be_bytes(re.try_into().expect("split at 8"));
        self.im = f64::from_be_bytes(im.try_into().expect("split at 8"));
        Ok(())
    }
}

/// A point in time as seconds and nanoseconds since the Unix epoch.
///
/// `nanos` is always below one billion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp, carrying whole seconds out of `nanos`.
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs.saturating_add((nanos / 1_000_000_000) as i64),
            nanos: nanos % 1_000_000_000,
        }
    }

    /// Converts to a [`DateTime<Utc>`], if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }

    /// Formats as RFC 3339 text (the JSON form of a timestamp).
    pub fn to_rfc3339(&self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            secs: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self::new(after.as_secs() as i64, after.subsec_nanos()),
            Err(err) => {
                let before = err.duration();
                if before.subsec_nanos() == 0 {
                    Self::new(-(before.as_secs() as i64), 0)
                } else {
                    Self::new(
                        -(before.as_secs() as i64) - 1,
                        1_000_000_000 - before.subsec_nanos(),
                    )
                }
            }
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        if ts.secs >= 0 {
            UNIX_EPOCH + Duration::new(ts.secs as u64, ts.nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(ts.secs.unsigned_abs())
                + Duration::from_nanos(ts.nanos as u64)
        }
    }
}

impl Extension for Timestamp {
    fn type_code(&self) -> i8 {
        TIMESTAMP_CODE
    }

    fn payload_len(&self) -> usize {
        12
    }

    fn write_payload(&self, buf: &mut dyn BufMut) {
        buf.put_i64(self.secs);
        buf.put_u32(self.nanos);
    }

    fn read_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        expect_len(TIMESTAMP_CODE, data, 12)?;
        let (secs, nanos) = data.split_at(8);
        let nanos = u32::from_be_bytes(nanos.try_into().expect("split at 8"));
        if nanos >= 1_000_000_000 {
            return Err(Error::InvalidExtension {
                code: TIMESTAMP_CODE,
                len: data.len(),
            });
        }
        self.secs = i64::from_be_bytes(secs.try_into().expect("split at 8"));
        self.nanos = nanos;
        Ok(())
    }

    fn to_json(&self) -> Option<serde_json::Value> {
        self.to_rfc3339().map(serde_json::Value::String)
    }
}

/// Builds an empty instance of a registered extension type.
pub type Constructor = fn() -> Box<dyn Extension>;

/// Maps application type codes to constructors of their concrete types.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    constructors: HashMap<i8, Constructor>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.constructors.keys().collect();
        codes.sort();
        f.debug_struct("ExtensionRegistry")
            .field("codes", &codes)
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for `code`.
    ///
    /// Negative codes and the built-in codes (3, 4, 5) are rejected, as is registering the same
    /// code twice.
    pub fn register(&mut self, code: i8, constructor: Constructor) -> Result<(), Error> {
        if code < 0 || RESERVED.contains(&code) {
            return Err(Error::ReservedExtension(code));
        }
        if self.constructors.contains_key(&code) {
            return Err(Error::DuplicateExtension(code));
        }
        self.constructors.insert(code, constructor);
        debug!(code, "registered extension");
        Ok(())
    }

    /// Returns true if `code` has a registered constructor.
    pub fn contains(&self, code: i8) -> bool {
        self.constructors.contains_key(&code)
    }

    /// Returns the number of registered codes.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Builds the registered type for `code` from `data`, or returns `None` if `code` is not
    /// registered.
    pub fn decode(&self, code: i8, data: &[u8]) -> Result<Option<Box<dyn Extension>>, Error> {
        let Some(constructor) = self.constructors.get(&code) else {
            return Ok(None);
        };
        let mut ext = constructor();
        if ext.type_code() != code {
            return Err(Error::ExtensionMismatch {
                expected: code,
                actual: ext.type_code(),
            });
        }
        ext.read_payload(data)?;
        Ok(Some(ext))
    }
}
