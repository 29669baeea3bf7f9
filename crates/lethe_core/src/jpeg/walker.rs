use crate::error::{CoreError, MalformedKind, Result};

use super::{is_standalone_marker, MarkerType, Segment, MARKER_PREFIX, SOI, SOS};

/// Lazy, forward-only walk over the marker segments of a JPEG byte stream.
///
/// Segments come out in stream order, starting with SOI at offset 0 and
/// ending with either a standalone EOI or the rest-of-buffer region that
/// begins at the SOS marker; the entropy-coded data after SOS is never
/// re-parsed for markers. The iterator is fused: after the terminal segment
/// or the first error it only returns `None`. Walking the same buffer twice
/// means constructing two walkers; no cursor state is shared.
pub struct SegmentWalker<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> SegmentWalker<'a> {
    /// Verifies the SOI prefix (exactly once, before any segment is yielded)
    /// and positions the walk at offset 0.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < 2 || data[..2] != SOI {
            return Err(CoreError::NotAJpeg);
        }
        Ok(Self {
            data,
            pos: 0,
            done: false,
        })
    }

    fn fail(&mut self, offset: usize, kind: MalformedKind) -> Option<Result<Segment>> {
        self.done = true;
        Some(Err(CoreError::malformed(offset, kind)))
    }
}

impl<'a> Iterator for SegmentWalker<'a> {
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let data = self.data;
        let offset = self.pos;
        if offset >= data.len() {
            // Clean end at a segment boundary.
            self.done = true;
            return None;
        }
        if offset + 2 > data.len() {
            return self.fail(offset, MalformedKind::TruncatedMarker);
        }
        if data[offset] != MARKER_PREFIX {
            return self.fail(offset, MalformedKind::InvalidMarkerByte(data[offset]));
        }

        let marker_byte = data[offset + 1];
        let marker = MarkerType::from_byte(marker_byte);

        if marker_byte == SOS {
            // Entropy-coded data follows immediately, with no length field.
            // The rest of the buffer is one opaque trailing region.
            self.done = true;
            return Some(Ok(Segment {
                marker,
                offset,
                length: 0,
                end: data.len(),
            }));
        }

        if is_standalone_marker(marker_byte) {
            self.pos = offset + 2;
            if matches!(marker, MarkerType::Eoi) {
                self.done = true;
            }
            return Some(Ok(Segment {
                marker,
                offset,
                length: 0,
                end: offset + 2,
            }));
        }

        if offset + 4 > data.len() {
            return self.fail(offset, MalformedKind::TruncatedLength);
        }
        let length = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
        if length < 2 {
            return self.fail(offset, MalformedKind::BadSegmentLength(length));
        }

        // The length field already counts its own two bytes.
        let end = offset + 2 + length as usize;
        if end > data.len() {
            return self.fail(
                offset,
                MalformedKind::SegmentOverrun {
                    declared: length,
                    remaining: data.len() - offset - 2,
                },
            );
        }

        self.pos = end;
        Some(Ok(Segment {
            marker,
            offset,
            length,
            end,
        }))
    }
}

impl std::iter::FusedIterator for SegmentWalker<'_> {}

/// Collects one full walk. Fails on the first grammar violation.
pub fn scan_segments(data: &[u8]) -> Result<Vec<Segment>> {
    SegmentWalker::new(data)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, MalformedKind};
    use crate::jpeg::{APP0, APP1, EOI};

    fn sized_segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut v = vec![0xFF, marker];
        v.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        v.extend_from_slice(payload);
        v
    }

    #[test]
    fn test_rejects_missing_soi() {
        assert!(matches!(
            SegmentWalker::new(&[0x00, 0x00]),
            Err(CoreError::NotAJpeg)
        ));
        assert!(matches!(SegmentWalker::new(&[]), Err(CoreError::NotAJpeg)));
        assert!(matches!(
            SegmentWalker::new(&[0xFF]),
            Err(CoreError::NotAJpeg)
        ));
    }

    #[test]
    fn test_walks_segments_in_stream_order() {
        let mut data = SOI.to_vec();
        data.extend(sized_segment(APP0, b"JFIF\0"));
        data.extend(sized_segment(APP1, b"Exif\0\0AB"));
        data.extend(sized_segment(SOS, &[0x01, 0x01, 0x00]));
        data.extend_from_slice(&[0x12, 0x34]);
        data.extend_from_slice(&EOI);

        let segments = scan_segments(&data).unwrap();
        assert_eq!(segments.len(), 4);

        assert_eq!(segments[0].marker, MarkerType::Soi);
        assert_eq!(segments[0].offset, 0);
        assert_eq!(segments[0].end, 2);

        assert_eq!(segments[1].marker, MarkerType::App(0));
        assert_eq!(segments[1].offset, 2);
        assert_eq!(segments[1].length, 7);

        assert_eq!(segments[2].marker, MarkerType::App(1));
        assert_eq!(segments[2].offset, segments[1].end);

        let trailing = segments[3];
        assert_eq!(trailing.marker, MarkerType::Sos);
        assert_eq!(trailing.end, data.len());
        assert!(trailing.is_trailing());
    }

    #[test]
    fn test_soi_then_eoi_terminates() {
        let data = [0xFF, 0xD8, 0xFF, 0xD9];
        let segments = scan_segments(&data).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].marker, MarkerType::Eoi);
    }

    #[test]
    fn test_trailing_region_is_not_reparsed() {
        // Bytes after SOS that look like markers must stay opaque.
        let mut data = SOI.to_vec();
        data.extend(sized_segment(SOS, &[0x01]));
        data.extend_from_slice(&[0xFF, 0xE1, 0xFF, 0x00, 0xFF, 0xD9]);

        let segments = scan_segments(&data).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].marker, MarkerType::Sos);
        assert_eq!(segments[1].end, data.len());
    }

    #[test]
    fn test_truncated_marker_fails() {
        let data = [0xFF, 0xD8, 0xFF];
        let err = scan_segments(&data).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedStream {
                offset: 2,
                kind: MalformedKind::TruncatedMarker
            }
        ));
    }

    #[test]
    fn test_truncated_length_fails() {
        let data = [0xFF, 0xD8, 0xFF, 0xE1, 0x00];
        let err = scan_segments(&data).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedStream {
                offset: 2,
                kind: MalformedKind::TruncatedLength
            }
        ));
    }

    #[test]
    fn test_segment_overrun_fails() {
        let mut data = SOI.to_vec();
        data.extend_from_slice(&[0xFF, APP1, 0xFF, 0xFF, 0x00]);
        let err = scan_segments(&data).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedStream {
                kind: MalformedKind::SegmentOverrun { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_undersized_length_field_fails() {
        let mut data = SOI.to_vec();
        data.extend_from_slice(&[0xFF, APP1, 0x00, 0x01]);
        let err = scan_segments(&data).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedStream {
                kind: MalformedKind::BadSegmentLength(1),
                ..
            }
        ));
    }

    #[test]
    fn test_non_marker_byte_fails() {
        let mut data = SOI.to_vec();
        data.extend_from_slice(&[0x00, 0x10]);
        let err = scan_segments(&data).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedStream {
                offset: 2,
                kind: MalformedKind::InvalidMarkerByte(0x00)
            }
        ));
    }

    #[test]
    fn test_walker_is_fused_after_error() {
        let data = [0xFF, 0xD8, 0xFF];
        let mut walker = SegmentWalker::new(&data).unwrap();
        assert!(walker.next().unwrap().is_ok());
        assert!(walker.next().unwrap().is_err());
        assert!(walker.next().is_none());
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_clean_end_without_sos() {
        let mut data = SOI.to_vec();
        data.extend(sized_segment(APP0, b"JFIF\0"));
        let segments = scan_segments(&data).unwrap();
        assert_eq!(segments.len(), 2);
    }
}
