mod detect;
mod strip;
mod walker;

pub use detect::{detect_metadata, MetadataReport, EXIF_CATEGORIES};
pub use strip::strip_metadata;
pub use walker::{scan_segments, SegmentWalker};

use std::fmt;

use crate::error::Result;

pub const SOI: [u8; 2] = [0xFF, 0xD8];
pub const EOI: [u8; 2] = [0xFF, 0xD9];
pub const MARKER_PREFIX: u8 = 0xFF;
pub const SOS: u8 = 0xDA;
pub const DQT: u8 = 0xDB;
pub const DHT: u8 = 0xC4;
pub const DRI: u8 = 0xDD;
pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1;
pub const COM: u8 = 0xFE;
pub const TEM: u8 = 0x01;

/// Payload prefix identifying an EXIF block inside an APP1 segment.
pub const EXIF_IDENT: &[u8] = b"Exif";

#[inline]
pub const fn is_restart_marker(marker: u8) -> bool {
    marker >= 0xD0 && marker <= 0xD7
}

#[inline]
pub const fn is_sof_marker(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF)
}

#[inline]
pub const fn is_app_marker(marker: u8) -> bool {
    marker >= 0xE0 && marker <= 0xEF
}

/// Markers that carry no length field: SOI, EOI, TEM and the restart set.
#[inline]
pub const fn is_standalone_marker(marker: u8) -> bool {
    matches!(marker, 0xD8 | 0xD9 | TEM) || is_restart_marker(marker)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    Soi,
    Eoi,
    Sos,
    Dqt,
    Dht,
    Dri,
    Com,
    Sof(u8),
    App(u8),
    Rst(u8),
    Other(u8),
}

impl MarkerType {
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0xD8 => Self::Soi,
            0xD9 => Self::Eoi,
            0xDA => Self::Sos,
            0xDB => Self::Dqt,
            0xC4 => Self::Dht,
            0xDD => Self::Dri,
            0xFE => Self::Com,
            b if is_restart_marker(b) => Self::Rst(b - 0xD0),
            b if is_app_marker(b) => Self::App(b - 0xE0),
            b if is_sof_marker(b) => Self::Sof(b),
            b => Self::Other(b),
        }
    }

    #[inline]
    pub fn to_byte(&self) -> u8 {
        match self {
            Self::Soi => 0xD8,
            Self::Eoi => 0xD9,
            Self::Sos => 0xDA,
            Self::Dqt => 0xDB,
            Self::Dht => 0xC4,
            Self::Dri => 0xDD,
            Self::Com => 0xFE,
            Self::Rst(n) => 0xD0 + n,
            Self::App(n) => 0xE0 + n,
            Self::Sof(b) | Self::Other(b) => *b,
        }
    }

    /// Full two-byte marker code as it appears in the stream, e.g. 0xFFE1.
    #[inline]
    pub fn code(&self) -> u16 {
        0xFF00 | self.to_byte() as u16
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soi => write!(f, "SOI"),
            Self::Eoi => write!(f, "EOI"),
            Self::Sos => write!(f, "SOS"),
            Self::Dqt => write!(f, "DQT"),
            Self::Dht => write!(f, "DHT"),
            Self::Dri => write!(f, "DRI"),
            Self::Com => write!(f, "COM"),
            Self::Sof(b) => write!(f, "SOF{}", b - 0xC0),
            Self::App(n) => write!(f, "APP{n}"),
            Self::Rst(n) => write!(f, "RST{n}"),
            Self::Other(b) => write!(f, "0xFF{b:02X}"),
        }
    }
}

/// One marker-delimited region of a JPEG stream.
///
/// `length` is the declared big-endian length field, inclusive of its own two
/// bytes per JPEG convention; it is zero for standalone markers and for the
/// trailing scan-data region. `end` is exclusive and always in bounds of the
/// buffer the segment was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub marker: MarkerType,
    pub offset: usize,
    pub length: u16,
    pub end: usize,
}

impl Segment {
    /// Bytes this segment spans in the source, marker included.
    #[inline]
    pub const fn byte_len(&self) -> usize {
        self.end - self.offset
    }

    /// True for the rest-of-buffer region that begins at the SOS marker.
    #[inline]
    pub const fn is_trailing(&self) -> bool {
        matches!(self.marker, MarkerType::Sos)
    }

    /// The exact byte range of this segment in its source buffer.
    #[inline]
    pub fn bytes<'d>(&self, data: &'d [u8]) -> &'d [u8] {
        &data[self.offset..self.end]
    }

    /// Declared payload, i.e. the bytes after the marker and length field.
    /// Empty for standalone markers and the trailing region.
    #[inline]
    pub fn payload<'d>(&self, data: &'d [u8]) -> &'d [u8] {
        if self.length >= 2 {
            &data[self.offset + 4..self.end]
        } else {
            &[]
        }
    }

    /// Whether this is an APP1 segment carrying an EXIF block.
    #[inline]
    pub fn is_exif(&self, data: &[u8]) -> bool {
        matches!(self.marker, MarkerType::App(1)) && self.payload(data).starts_with(EXIF_IDENT)
    }
}

/// Stream-level facts gathered from one full walk, for presentation layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub segment_count: usize,
    pub sos_offset: Option<usize>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    /// Offset and total byte span of the first EXIF APP1 segment.
    pub exif_span: Option<(usize, usize)>,
}

pub fn summarize(data: &[u8]) -> Result<StreamSummary> {
    let mut summary = StreamSummary::default();
    for segment in SegmentWalker::new(data)? {
        let segment = segment?;
        summary.segment_count += 1;
        match segment.marker {
            MarkerType::Sof(_) => {
                // Payload layout: precision byte, then height and width.
                let payload = segment.payload(data);
                if payload.len() >= 5 {
                    summary.height = Some(u16::from_be_bytes([payload[1], payload[2]]));
                    summary.width = Some(u16::from_be_bytes([payload[3], payload[4]]));
                }
            }
            MarkerType::Sos => summary.sos_offset = Some(segment.offset),
            MarkerType::App(1) => {
                if summary.exif_span.is_none() && segment.is_exif(data) {
                    summary.exif_span = Some((segment.offset, segment.byte_len()));
                }
            }
            _ => {}
        }
    }
    Ok(summary)
}
