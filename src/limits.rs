//! Resource limits for decoding.
//!
//! [`Limits`] caps how much of a stream is buffered before decoding and how
//! many pixels a decoded image may hold. Use the `check_*` methods for
//! rejection before any pixel work.

use crate::error::{Error, Result};

/// Largest stream accepted by default: 100 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 100 * 1024 * 1024;

/// Resource limits for probe and decode operations.
///
/// # Example
///
/// ```
/// use qoi_raster::Limits;
///
/// let limits = Limits::default()
///     .with_max_input_bytes(16 * 1024 * 1024)
///     .with_max_pixels(4096 * 4096);
/// assert!(limits.check_dimensions(4096, 4096).is_ok());
/// assert!(limits.check_dimensions(4097, 4096).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of stream bytes buffered before decoding.
    pub max_input_bytes: u64,
    /// Maximum total pixels (width × height) of a decoded image.
    pub max_pixels: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_pixels: None,
        }
    }
}

impl Limits {
    /// No pixel cap and no practical stream cap.
    pub fn none() -> Self {
        Self {
            max_input_bytes: u64::MAX,
            max_pixels: None,
        }
    }

    /// Set the maximum number of stream bytes.
    pub fn with_max_input_bytes(mut self, bytes: u64) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    /// Set the maximum total pixels.
    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = Some(max);
        self
    }

    /// Check a stream length against `max_input_bytes`.
    pub fn check_input_size(&self, bytes: u64) -> Result<()> {
        if bytes > self.max_input_bytes {
            return Err(Error::TooLarge {
                actual: bytes,
                max: self.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Check image dimensions against `max_pixels`.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if let Some(max) = self.max_pixels {
            let pixels = width as u64 * height as u64;
            if pixels > max {
                return Err(Error::TooLarge {
                    actual: pixels,
                    max,
                });
            }
        }
        Ok(())
    }
}
