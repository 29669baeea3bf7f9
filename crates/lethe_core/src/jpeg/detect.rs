use crate::error::Result;

use super::walker::SegmentWalker;

/// Metadata categories an EXIF block conventionally carries.
///
/// Advisory only: the TIFF/IFD payload is never parsed, so presence of the
/// segment does not confirm any individual field. Field-level extraction is
/// a separate, larger task and deliberately out of scope.
pub const EXIF_CATEGORIES: &[&str] = &[
    "camera make and model",
    "capture timestamp",
    "GPS position",
    "exposure settings",
    "software tag",
];

/// Outcome of a metadata scan over one JPEG buffer.
///
/// A report with `has_exif == false` means the stream was walked to its SOS
/// boundary (or clean end) without finding an EXIF APP1 segment; it is a
/// success, distinct from the parse failures carried by `CoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataReport {
    pub has_exif: bool,
    /// Declared length of the EXIF APP1 segment, inclusive of the two length
    /// bytes, when present.
    pub size_bytes: Option<u16>,
    pub categories: &'static [&'static str],
}

impl MetadataReport {
    const fn absent() -> Self {
        Self {
            has_exif: false,
            size_bytes: None,
            categories: &[],
        }
    }
}

/// Scans for an APP1 segment whose payload starts with `"Exif"`.
///
/// Stops at the first match; the stream past it is not walked.
pub fn detect_metadata(data: &[u8]) -> Result<MetadataReport> {
    for segment in SegmentWalker::new(data)? {
        let segment = segment?;
        if segment.is_exif(data) {
            return Ok(MetadataReport {
                has_exif: true,
                size_bytes: Some(segment.length),
                categories: EXIF_CATEGORIES,
            });
        }
    }
    Ok(MetadataReport::absent())
}
