use thiserror::Error;

/// Everything a read, write or probe call can fail with.
///
/// All variants are terminal for the call that produced them. Partial results
/// are only ever returned through an aborted [`Completion`](crate::Completion),
/// never alongside an error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed header or body, truncated stream, or an I/O failure while
    /// reading.
    #[error("QOI decode failed: {0}")]
    Decode(#[source] qoi::Error),

    /// Encoder rejected the buffer, or an I/O failure while writing.
    #[error("QOI encode failed: {0}")]
    Encode(#[source] qoi::Error),

    /// The raster cannot be represented by this codec (band count outside
    /// 3..=4 on write, band size other than 8 bits).
    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Out-of-range image or band indices, conflicting region or
    /// subsampling settings, or mismatched buffer geometry.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A stream or image exceeds the configured [`Limits`](crate::Limits).
    #[error("input too large: {actual} exceeds limit of {max}")]
    TooLarge { actual: u64, max: u64 },
}

impl Error {
    pub(crate) fn decode_io(err: std::io::Error) -> Self {
        Self::Decode(qoi::Error::IoError(err))
    }

    pub(crate) fn encode_io(err: std::io::Error) -> Self {
        Self::Encode(qoi::Error::IoError(err))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedLayout(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
