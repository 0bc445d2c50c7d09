//! A buffered encoder backed by an [io::Write] sink.

use crate::{
    config::Config,
    extension::{Complex128, Complex64, Extension, Timestamp},
    pool::Recycle,
    primitives::*,
    size, Error, Number, Value,
};
use std::io;
use tracing::trace;

/// A writer that encodes values into an internal buffer and writes the buffer to a sink.
///
/// Every value is written in its minimal form (see [crate::primitives]). A write that would
/// overflow the buffer first flushes it; payloads larger than the whole buffer bypass it and go
/// straight to the sink. Data is not durable until [Writer::flush] returns.
///
/// # Example
///
/// ```
/// use commonware_msgpack::Writer;
///
/// let mut writer = Writer::new(Vec::new());
/// writer.write_map_header(1).unwrap();
/// writer.write_str("n").unwrap();
/// writer.write_int(200).unwrap();
/// writer.flush().unwrap();
/// assert_eq!(writer.get_ref(), &[0x81, 0xa1, b'n', 0xcc, 200]);
/// ```
pub struct Writer<W: io::Write> {
    /// The underlying sink.
    sink: W,
    /// Encoded bytes not yet written to the sink.
    buffer: Vec<u8>,
    /// The size at which the buffer is flushed.
    capacity: usize,
}

impl<W: io::Write> Writer<W> {
    /// Creates a writer with the default buffer size.
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, Config::default())
    }

    /// Creates a writer with the configured buffer size.
    pub fn with_config(sink: W, cfg: Config) -> Self {
        let capacity = cfg.buffer_size.get();
        Self {
            sink,
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the number of bytes buffered but not yet written to the sink.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the buffer size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a reference to the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Rebinds the writer to a new sink, discarding any buffered bytes, and returns the old sink.
    pub fn reset(&mut self, sink: W) -> W {
        self.buffer.clear();
        std::mem::replace(&mut self.sink, sink)
    }

    /// Flushes buffered bytes and returns the sink.
    pub fn into_inner(mut self) -> Result<W, Error> {
        self.flush()?;
        Ok(self.sink)
    }

    /// Writes all buffered bytes to the sink and flushes it.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.flush_buffer()?;
        self.sink.flush()?;
        Ok(())
    }

    /// Writes all buffered bytes to the sink.
    fn flush_buffer(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        trace!(len = self.buffer.len(), "flushing buffer");
        self.sink.write_all(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    /// Ensures `n` more bytes fit in the buffer, flushing if they do not.
    #[inline]
    fn require(&mut self, n: usize) -> Result<(), Error> {
        if self.buffer.len() + n > self.capacity {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Appends an unframed payload, bypassing the buffer if it is larger than the buffer.
    fn write_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.len() > self.capacity {
            self.flush_buffer()?;
            trace!(len = data.len(), "writing directly to sink");
            self.sink.write_all(data)?;
            return Ok(());
        }
        self.require(data.len())?;
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Flushes if an unbounded write grew the buffer past its capacity.
    #[inline]
    fn settle(&mut self) -> Result<(), Error> {
        if self.buffer.len() > self.capacity {
            self.flush_buffer()?;
        }
        Ok(())
    }

    pub fn write_nil(&mut self) -> Result<(), Error> {
        self.require(size::NIL_SIZE)?;
        put_nil(&mut self.buffer);
        Ok(())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), Error> {
        self.require(size::BOOL_SIZE)?;
        put_bool(&mut self.buffer, v);
        Ok(())
    }

    /// Writes a signed integer in its minimal form.
    pub fn write_int(&mut self, v: i64) -> Result<(), Error> {
        self.require(size::INT64_SIZE)?;
        put_int(&mut self.buffer, v);
        Ok(())
    }

    /// Writes an unsigned integer in its minimal form.
    pub fn write_uint(&mut self, v: u64) -> Result<(), Error> {
        self.require(size::INT64_SIZE)?;
        put_uint(&mut self.buffer, v);
        Ok(())
    }

    pub fn write_i8(&mut self, v: i8) -> Result<(), Error> {
        self.write_int(v as i64)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<(), Error> {
        self.write_int(v as i64)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<(), Error> {
        self.write_int(v as i64)
    }

    pub fn write_i64(&mut self, v: i64) -> Result<(), Error> {
        self.write_int(v)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), Error> {
        self.write_uint(v as u64)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), Error> {
        self.write_uint(v as u64)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), Error> {
        self.write_uint(v as u64)
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), Error> {
        self.write_uint(v)
    }

    pub fn write_f32(&mut self, v: f32) -> Result<(), Error> {
        self.require(size::FLOAT32_SIZE)?;
        put_f32(&mut self.buffer, v);
        Ok(())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<(), Error> {
        self.require(size::FLOAT64_SIZE)?;
        put_f64(&mut self.buffer, v);
        Ok(())
    }

    /// Writes a number, preserving its type.
    pub fn write_number(&mut self, v: Number) -> Result<(), Error> {
        self.require(size::INT64_SIZE)?;
        v.put(&mut self.buffer);
        Ok(())
    }

    pub fn write_map_header(&mut self, len: u32) -> Result<(), Error> {
        self.require(size::MAP_HEADER_SIZE)?;
        put_map_header(&mut self.buffer, len);
        Ok(())
    }

    pub fn write_array_header(&mut self, len: u32) -> Result<(), Error> {
        self.require(size::ARRAY_HEADER_SIZE)?;
        put_array_header(&mut self.buffer, len);
        Ok(())
    }

    /// Writes the header of a string of `len` bytes. The caller writes the bytes with
    /// [Writer::write_raw].
    pub fn write_str_header(&mut self, len: usize) -> Result<(), Error> {
        self.require(size::STR_PREFIX_SIZE)?;
        put_str_header(&mut self.buffer, len);
        Ok(())
    }

    /// Writes the header of a binary payload of `len` bytes. The caller writes the bytes with
    /// [Writer::write_raw].
    pub fn write_bin_header(&mut self, len: usize) -> Result<(), Error> {
        self.require(size::BIN_PREFIX_SIZE)?;
        put_bin_header(&mut self.buffer, len);
        Ok(())
    }

    pub fn write_str(&mut self, v: &str) -> Result<(), Error> {
        self.write_str_header(v.len())?;
        self.write_payload(v.as_bytes())
    }

    /// Writes bytes with a string header, without checking that they are valid UTF-8.
    pub fn write_str_bytes(&mut self, v: &[u8]) -> Result<(), Error> {
        self.write_str_header(v.len())?;
        self.write_payload(v)
    }

    pub fn write_bytes(&mut self, v: &[u8]) -> Result<(), Error> {
        self.write_bin_header(v.len())?;
        self.write_payload(v)
    }

    /// Writes an extension in its minimal frame.
    pub fn write_extension(&mut self, ext: &dyn Extension) -> Result<(), Error> {
        let len = ext.payload_len();
        self.require(size::ext_prefix_size(len) + len)?;
        put_ext_header(&mut self.buffer, ext.type_code(), len);
        ext.write_payload(&mut self.buffer);
        self.settle()
    }

    pub fn write_timestamp(&mut self, v: Timestamp) -> Result<(), Error> {
        self.write_extension(&v)
    }

    pub fn write_complex64(&mut self, v: Complex64) -> Result<(), Error> {
        self.write_extension(&v)
    }

    pub fn write_complex128(&mut self, v: Complex128) -> Result<(), Error> {
        self.write_extension(&v)
    }

    /// Writes a dynamic value.
    pub fn write_value(&mut self, v: &Value) -> Result<(), Error> {
        self.require(v.encoded_len())?;
        v.put(&mut self.buffer);
        self.settle()
    }

    /// Writes bytes that are already encoded (or the payload following a header written with
    /// [Writer::write_str_header] or [Writer::write_bin_header]).
    pub fn write_raw(&mut self, encoded: &[u8]) -> Result<(), Error> {
        self.write_payload(encoded)
    }
}

impl<W: io::Write + Default> Default for Writer<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}

/// Recycling discards unflushed bytes and binds a default sink.
impl<W: io::Write + Default> Recycle for Writer<W> {
    fn recycle(&mut self) {
        self.reset(W::default());
    }
}
