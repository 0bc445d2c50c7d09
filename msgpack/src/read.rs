//! A buffered decoder backed by an [io::Read] source.

use crate::{
    config::{Config, Limits},
    extension::{Complex128, Complex64, Extension, ExtensionRegistry, RawExtension, Timestamp},
    pool::Recycle,
    raw::Raw,
    size, slice,
    tag::{inline_length, Layout, Payload, WireType, NIL},
    value, Error, Number, Value, Writer,
};
use std::{
    io::{self, Read},
    sync::Arc,
};
use tracing::trace;

/// A reader that decodes values from a buffered byte source.
///
/// Scalars and headers are decoded by the same routines as [crate::slice], applied to a window
/// of the internal buffer. Payloads whose length is taken from the wire are copied as bytes
/// arrive, so a hostile length prefix cannot force a large allocation.
///
/// Reads consume input only on success, with two exceptions:
/// - A payload read that fails midway (because the source ended) leaves the reader positioned
///   inside the value.
/// - [Reader::read_string], [Reader::read_extension] (and the typed extension reads built on it)
///   and [Reader::read_value] consume a value larger than the internal buffer before validating
///   it, so such a value is skipped if validation rejects it.
///
/// # Example
///
/// ```
/// use commonware_msgpack::Reader;
///
/// let encoded = [0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0xc3];
/// let mut reader = Reader::new(&encoded[..]);
/// assert_eq!(reader.read_map_header().unwrap(), 2);
/// assert_eq!(reader.read_string().unwrap(), "a");
/// assert_eq!(reader.read_int().unwrap(), 1);
/// reader.skip().unwrap();
/// assert!(reader.read_bool().unwrap());
/// ```
pub struct Reader<R: io::Read> {
    /// The underlying source.
    source: R,
    /// Bytes read from the source, valid from `pos`.
    buffer: Vec<u8>,
    /// Offset of the next unread byte in `buffer`.
    pos: usize,
    /// Bytes consumed before the start of `buffer`.
    consumed: u64,
    /// Reusable space for map keys and values assembled from the stream.
    scratch: Vec<u8>,
    /// The size of each read from the source.
    buffer_size: usize,
    limits: Limits,
    registry: Arc<ExtensionRegistry>,
}

impl<R: io::Read> Reader<R> {
    /// Creates a reader with the default configuration and no registered extensions.
    pub fn new(source: R) -> Self {
        Self::with_config(source, Config::default())
    }

    /// Creates a reader with the given configuration.
    pub fn with_config(source: R, cfg: Config) -> Self {
        let buffer_size = cfg.buffer_size.get();
        Self {
            source,
            buffer: Vec::with_capacity(buffer_size),
            pos: 0,
            consumed: 0,
            scratch: Vec::new(),
            buffer_size,
            limits: cfg.limits,
            registry: Arc::new(ExtensionRegistry::default()),
        }
    }

    /// Uses `registry` to rebuild extensions in [Reader::read_value].
    pub fn with_registry(mut self, registry: Arc<ExtensionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the number of bytes consumed since creation (or the last [Reader::reset]).
    pub fn position(&self) -> u64 {
        self.consumed + self.pos as u64
    }

    /// Returns the number of bytes read from the source but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.pos
    }

    /// Returns the decoding limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Rebinds the reader to a new source, discarding buffered input, and returns the old source.
    pub fn reset(&mut self, source: R) -> R {
        self.buffer.clear();
        self.scratch.clear();
        self.pos = 0;
        self.consumed = 0;
        std::mem::replace(&mut self.source, source)
    }

    /// Ensures at least `n` unconsumed bytes are buffered.
    fn fill(&mut self, n: usize) -> Result<(), Error> {
        if self.buffered() >= n {
            return Ok(());
        }

        // Move unconsumed bytes to the front
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.consumed += self.pos as u64;
            self.pos = 0;
        }

        let target = n.max(self.buffer_size);
        while self.buffer.len() < n {
            let start = self.buffer.len();
            self.buffer.resize(target, 0);
            match self.source.read(&mut self.buffer[start..]) {
                Ok(0) => {
                    self.buffer.truncate(start);
                    return Err(Error::ShortBytes {
                        needed: n,
                        remaining: start,
                    });
                }
                Ok(read) => self.buffer.truncate(start + read),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    self.buffer.truncate(start)
                }
                Err(err) => {
                    self.buffer.truncate(start);
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Returns the next `n` unconsumed bytes without consuming them.
    fn peek(&mut self, n: usize) -> Result<&[u8], Error> {
        self.fill(n)?;
        Ok(&self.buffer[self.pos..self.pos + n])
    }

    #[inline]
    fn peek_tag(&mut self) -> Result<u8, Error> {
        Ok(self.peek(1)?[0])
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.buffered());
        self.pos += n;
    }

    /// Decodes the value (or header) at the front of the stream with `f`, consuming only the
    /// bytes `f` used.
    ///
    /// The window handed to `f` holds the header of the next value and, for fixed-size values,
    /// its payload.
    fn decode<T>(
        &mut self,
        f: impl FnOnce(&[u8]) -> Result<(T, &[u8]), Error>,
    ) -> Result<T, Error> {
        let (value, used) = self.peek_decode(f)?;
        self.consume(used);
        Ok(value)
    }

    /// Like [Reader::decode], but consumes nothing and returns the number of bytes `f` used.
    fn peek_decode<T>(
        &mut self,
        f: impl FnOnce(&[u8]) -> Result<(T, &[u8]), Error>,
    ) -> Result<(T, usize), Error> {
        let tag = self.peek_tag()?;
        let want = match inline_length(tag) {
            Some(Layout {
                header,
                payload: Payload::Bytes(n),
            }) => header + n,
            Some(layout) => layout.header,
            None => 1,
        };
        let window = self.peek(want)?;
        let (value, rest) = f(window)?;
        Ok((value, window.len() - rest.len()))
    }

    /// Returns the encoded length of the next value if the whole value fits in the buffer,
    /// filling the buffer as needed. Nothing is consumed.
    fn buffered_len(&mut self) -> Result<Option<usize>, Error> {
        loop {
            match size::encoded_len(&self.buffer[self.pos..]) {
                Ok(len) => return Ok(Some(len)),
                Err(err) if err.is_short() => {
                    let have = self.buffered();
                    if have >= self.buffer_size {
                        return Ok(None);
                    }
                    self.fill(have + 1)?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Appends the next `len` bytes of the stream to `dst`.
    fn read_payload(&mut self, len: usize, dst: &mut Vec<u8>) -> Result<(), Error> {
        let from_buffer = len.min(self.buffered());
        dst.extend_from_slice(&self.buffer[self.pos..self.pos + from_buffer]);
        self.consume(from_buffer);

        let rest = len - from_buffer;
        if rest == 0 {
            return Ok(());
        }
        if rest <= self.buffer_size {
            self.fill(rest)?;
            dst.extend_from_slice(&self.buffer[self.pos..self.pos + rest]);
            self.consume(rest);
            return Ok(());
        }

        // Large payloads are read straight from the source, growing `dst` only as bytes arrive
        trace!(len = rest, "reading directly from source");
        let read = (&mut self.source).take(rest as u64).read_to_end(dst)?;
        self.consumed += read as u64;
        if read < rest {
            return Err(Error::ShortBytes {
                needed: rest,
                remaining: read,
            });
        }
        Ok(())
    }

    /// Visits every byte of the next value (including nested values) in order, in chunks of at
    /// most the buffer size, consuming it. Returns the number of bytes visited.
    fn walk(&mut self, mut f: impl FnMut(&[u8]) -> Result<(), Error>) -> Result<u64, Error> {
        let mut pending: u64 = 1;
        let mut total = 0u64;
        while pending > 0 {
            let tag = self.peek_tag()?;
            let header = size::header_len(tag)?;
            let (len, elements) = size::size_of(self.peek(header)?)?;

            let mut remaining = len;
            while remaining > 0 {
                let chunk = remaining.min(self.buffer_size);
                f(self.peek(chunk)?)?;
                self.consume(chunk);
                remaining -= chunk;
            }
            total += len as u64;
            pending = pending - 1 + elements as u64;
        }
        Ok(total)
    }

    /// Returns the type of the next value without consuming it.
    pub fn peek_next_type(&mut self) -> Result<WireType, Error> {
        self.peek_tag().map(crate::tag::wire_type)
    }

    /// Returns true if the next value is nil.
    ///
    /// Returns false if no input remains or the source fails; the error is reported by the next
    /// read.
    pub fn is_nil(&mut self) -> bool {
        matches!(self.peek_tag(), Ok(NIL))
    }

    /// Consumes the next value without decoding it.
    pub fn skip(&mut self) -> Result<(), Error> {
        self.walk(|_| Ok(())).map(|_| ())
    }

    /// Copies the next value, as encoded, to `w`. Returns the number of bytes copied.
    pub fn copy_next<W: io::Write>(&mut self, w: &mut Writer<W>) -> Result<u64, Error> {
        self.walk(|chunk| w.write_raw(chunk))
    }

    /// Returns a copy of the next encoded value.
    pub fn read_raw(&mut self) -> Result<Raw<'static>, Error> {
        let mut out = Vec::new();
        self.walk(|chunk| {
            out.extend_from_slice(chunk);
            Ok(())
        })?;
        Ok(Raw::owned(out))
    }

    pub fn read_nil(&mut self) -> Result<(), Error> {
        self.decode(|b| slice::read_nil(b).map(|rest| ((), rest)))
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        self.decode(slice::read_bool)
    }

    /// Reads any integer that fits in an `i64`.
    pub fn read_int(&mut self) -> Result<i64, Error> {
        self.decode(slice::read_int)
    }

    /// Reads any non-negative integer that fits in a `u64`.
    pub fn read_uint(&mut self) -> Result<u64, Error> {
        self.decode(slice::read_uint)
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        self.decode(slice::read_i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        self.decode(slice::read_i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        self.decode(slice::read_i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        self.decode(slice::read_i64)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.decode(slice::read_u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.decode(slice::read_u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.decode(slice::read_u32)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.decode(slice::read_u64)
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        self.decode(slice::read_f32)
    }

    /// Reads a float64, widening a float32.
    pub fn read_f64(&mut self) -> Result<f64, Error> {
        self.decode(slice::read_f64)
    }

    /// Reads any integer or float, preserving its type.
    pub fn read_number(&mut self) -> Result<Number, Error> {
        self.decode(slice::read_number)
    }

    /// Reads a map header, returning the number of key-value pairs.
    ///
    /// A nil in place of the header is reported as [Error::Nil] and left unconsumed.
    pub fn read_map_header(&mut self) -> Result<u32, Error> {
        self.decode(slice::read_map_header)
    }

    /// Reads an array header, returning the number of elements.
    ///
    /// A nil in place of the header is reported as [Error::Nil] and left unconsumed.
    pub fn read_array_header(&mut self) -> Result<u32, Error> {
        self.decode(slice::read_array_header)
    }

    /// Reads a string header, returning the payload length.
    pub fn read_str_header(&mut self) -> Result<u32, Error> {
        self.decode(slice::read_str_header)
    }

    /// Reads a binary header, returning the payload length.
    pub fn read_bin_header(&mut self) -> Result<u32, Error> {
        self.decode(slice::read_bin_header)
    }

    /// Reads a binary value into `dst`, reusing its capacity.
    pub fn read_bytes(&mut self, mut dst: Vec<u8>) -> Result<Vec<u8>, Error> {
        let len = self.read_bin_header()? as usize;
        dst.clear();
        self.read_payload(len, &mut dst)?;
        Ok(dst)
    }

    /// Reads the payload of a string into `dst`, reusing its capacity, without validating it.
    pub fn read_string_as_bytes(&mut self, mut dst: Vec<u8>) -> Result<Vec<u8>, Error> {
        let len = self.read_str_header()? as usize;
        dst.clear();
        self.read_payload(len, &mut dst)?;
        Ok(dst)
    }

    /// Reads a UTF-8 string.
    ///
    /// A string that fits in the buffer is left unconsumed if it is not valid UTF-8.
    pub fn read_string(&mut self) -> Result<String, Error> {
        let (len, header) = self.peek_decode(slice::read_str_header)?;
        let total = header.saturating_add(len as usize);
        if total <= self.buffer_size {
            let window = self.peek(total)?;
            let text = std::str::from_utf8(&window[header..]).map_err(|_| Error::InvalidUtf8)?;
            let text = text.to_owned();
            self.consume(total);
            return Ok(text);
        }
        let bytes = self.read_string_as_bytes(Vec::new())?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Reads a map key, which may be encoded as a string or as binary.
    ///
    /// The returned bytes are only valid until the next read.
    pub fn read_map_key(&mut self) -> Result<&[u8], Error> {
        let len = match self.peek_next_type()? {
            WireType::Bin => self.read_bin_header()?,
            _ => self.read_str_header()?,
        } as usize;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let result = self.read_payload(len, &mut scratch);
        self.scratch = scratch;
        result?;
        Ok(&self.scratch)
    }

    /// Reads an extension header without consuming it, returning the code, payload length and
    /// header length.
    fn peek_ext_header(&mut self) -> Result<(i8, usize, usize), Error> {
        let tag = self.peek_tag()?;
        let header = match inline_length(tag) {
            Some(layout) => layout.header,
            None => 1,
        };
        let window = self.peek(header)?;
        let (code, len, rest) = slice::read_ext_header(window)?;
        Ok((code, len, window.len() - rest.len()))
    }

    /// Reads the payload of the extension whose header was just peeked.
    fn read_ext_payload(&mut self, header: usize, len: usize) -> Result<&[u8], Error> {
        self.consume(header);
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let result = self.read_payload(len, &mut scratch);
        self.scratch = scratch;
        result?;
        Ok(&self.scratch)
    }

    /// Reads an extension into `ext`.
    ///
    /// If the type code on the wire does not match `ext`, nothing is consumed. An extension that
    /// fits in the buffer is also left unconsumed if `ext` rejects its payload.
    pub fn read_extension<E: Extension + ?Sized>(&mut self, ext: &mut E) -> Result<(), Error> {
        let (code, len, header) = self.peek_ext_header()?;
        if code != ext.type_code() {
            return Err(Error::ExtensionMismatch {
                expected: ext.type_code(),
                actual: code,
            });
        }
        let total = header.saturating_add(len);
        if total <= self.buffer_size {
            let window = self.peek(total)?;
            ext.read_payload(&window[header..])?;
            self.consume(total);
            return Ok(());
        }
        let data = self.read_ext_payload(header, len)?;
        ext.read_payload(data)
    }

    /// Reads an extension of any type code, copying its payload.
    pub fn read_raw_extension(&mut self) -> Result<RawExtension, Error> {
        let (code, len, header) = self.peek_ext_header()?;
        let data = self.read_ext_payload(header, len)?;
        Ok(RawExtension::new(code, data))
    }

    pub fn read_timestamp(&mut self) -> Result<Timestamp, Error> {
        let mut ts = Timestamp::default();
        self.read_extension(&mut ts)?;
        Ok(ts)
    }

    pub fn read_complex64(&mut self) -> Result<Complex64, Error> {
        let mut c = Complex64::default();
        self.read_extension(&mut c)?;
        Ok(c)
    }

    pub fn read_complex128(&mut self) -> Result<Complex128, Error> {
        let mut c = Complex128::default();
        self.read_extension(&mut c)?;
        Ok(c)
    }

    /// Reads the next value of any type.
    ///
    /// Registered extensions are rebuilt from the reader's registry; other extension codes are
    /// kept as raw bytes.
    ///
    /// A value that fits in the buffer is left unconsumed if it cannot be decoded.
    pub fn read_value(&mut self) -> Result<Value, Error> {
        if let Some(len) = self.buffered_len()? {
            let window = &self.buffer[self.pos..self.pos + len];
            let (value, _) = value::read_value_with(window, &self.registry, &self.limits)?;
            self.consume(len);
            return Ok(value);
        }
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let result = self.walk(|chunk| {
            scratch.extend_from_slice(chunk);
            Ok(())
        });
        let decoded = result.and_then(|_| {
            value::read_value_with(&scratch, &self.registry, &self.limits).map(|(v, _)| v)
        });
        self.scratch = scratch;
        decoded
    }
}

impl<R: io::Read + Default> Default for Reader<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

/// Recycling discards buffered input and binds a default source.
impl<R: io::Read + Default> Recycle for Reader<R> {
    fn recycle(&mut self) {
        self.reset(R::default());
    }
}
