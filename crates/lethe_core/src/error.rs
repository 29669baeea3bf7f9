use std::fmt;

use thiserror::Error;

/// How a marker stream violated the JPEG segment grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// The buffer ends in the middle of a two-byte marker.
    TruncatedMarker,
    /// The buffer ends before the two-byte length field of a sized segment.
    TruncatedLength,
    /// A marker position does not start with the 0xFF prefix byte.
    InvalidMarkerByte(u8),
    /// A length field smaller than 2, which cannot even cover itself.
    BadSegmentLength(u16),
    /// A declared segment length that reads past the end of the buffer.
    SegmentOverrun { declared: u16, remaining: usize },
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedMarker => write!(f, "truncated marker"),
            Self::TruncatedLength => write!(f, "truncated length field"),
            Self::InvalidMarkerByte(b) => write!(f, "invalid marker byte 0x{b:02X}"),
            Self::BadSegmentLength(len) => write!(f, "segment length {len} is below the minimum of 2"),
            Self::SegmentOverrun { declared, remaining } => write!(
                f,
                "declared segment length {declared} overruns the buffer ({remaining} bytes remain)"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a JPEG: stream does not begin with the SOI marker")]
    NotAJpeg,

    #[error("malformed JPEG stream at offset {offset}: {kind}")]
    MalformedStream { offset: usize, kind: MalformedKind },
}

impl CoreError {
    #[inline]
    pub const fn malformed(offset: usize, kind: MalformedKind) -> Self {
        Self::MalformedStream { offset, kind }
    }

    #[inline]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedStream { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
