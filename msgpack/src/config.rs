//! Configuration for readers, writers, and decoders of untrusted input.

use std::num::NonZeroUsize;

/// Default size of the internal buffer of a [crate::Reader] or [crate::Writer].
pub const DEFAULT_BUFFER_SIZE: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(size) => size,
    None => unreachable!(),
};

/// Configuration of a buffered [crate::Reader] or [crate::Writer].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Size of the internal buffer.
    ///
    /// A writer flushes to its sink whenever a write would overflow this buffer, and writes
    /// payloads larger than the buffer directly to the sink.
    pub buffer_size: NonZeroUsize,

    /// Bounds applied when decoding dynamic values or transcoding to JSON.
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            limits: Limits::default(),
        }
    }
}

impl Config {
    /// Returns a configuration with the given buffer size and default limits.
    pub fn with_buffer_size(buffer_size: NonZeroUsize) -> Self {
        Self {
            buffer_size,
            ..Self::default()
        }
    }
}

/// Bounds on the work a decoder performs on behalf of (possibly untrusted) input.
///
/// Lengths read from the wire are only trusted up to `max_prealloc` elements when sizing
/// collections up front; anything larger grows as elements are actually decoded. Recursive
/// operations (dynamic value decode, JSON transcoding) fail with
/// [crate::Error::DepthExceeded] beyond `max_depth` levels of nesting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of arrays and maps.
    pub max_depth: usize,

    /// Maximum number of elements pre-allocated from a length prefix.
    pub max_prealloc: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_prealloc: 1024,
        }
    }
}

impl Limits {
    /// Returns the capacity to reserve for a collection whose wire length is `len`.
    #[inline]
    pub fn prealloc(&self, len: usize) -> usize {
        len.min(self.max_prealloc)
    }

    /// Returns an error if `depth` exceeds the maximum nesting.
    #[inline]
    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), crate::Error> {
        if depth > self.max_depth {
            return Err(crate::Error::DepthExceeded(self.max_depth));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.buffer_size.get(), 4096);
        assert_eq!(cfg.limits.max_depth, 1000);
        let cfg = Config::with_buffer_size(NonZeroUsize::new(16).unwrap());
        assert_eq!(cfg.buffer_size.get(), 16);
        assert_eq!(cfg.limits, Limits::default());
    }

    #[test]
    fn test_limits() {
        let limits = Limits {
            max_depth: 2,
            max_prealloc: 8,
        };
        assert_eq!(limits.prealloc(4), 4);
        assert_eq!(limits.prealloc(u32::MAX as usize), 8);
        assert!(limits.check_depth(2).is_ok());
        assert!(matches!(
            limits.check_depth(3),
            Err(crate::Error::DepthExceeded(2))
        ));
    }
}
