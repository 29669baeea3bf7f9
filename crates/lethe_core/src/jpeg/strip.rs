use crate::error::Result;

use super::walker::SegmentWalker;

/// Rebuilds the stream with EXIF APP1 segments omitted.
///
/// Every other segment, the trailing scan-data region included, is copied
/// verbatim in original order, so the output is a well-formed JPEG whose
/// length is the input length minus the spans of the removed segments. APP1
/// segments that do not carry an `"Exif"` payload (XMP, for instance) are
/// preserved. The input buffer is never modified; on error no buffer is
/// returned at all.
pub fn strip_metadata(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    for segment in SegmentWalker::new(data)? {
        let segment = segment?;
        if segment.is_exif(data) {
            continue;
        }
        out.extend_from_slice(segment.bytes(data));
    }
    Ok(out)
}
