use std::path::{Path, PathBuf};

use anyhow::Result;
use humansize::{format_size, BINARY};
use lethe_core::jpeg::{self, Segment};
use lethe_core::CoreError;
use lethe_io::ImageSource;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct InspectRecord<'a> {
    file: String,
    has_exif: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<&'a str>,
}

pub fn run(files: &[PathBuf], json: bool, segments: bool) -> Result<()> {
    let mut failures = 0usize;

    for path in files {
        match inspect_file(path, json, segments) {
            Ok(()) => {}
            Err(CoreError::NotAJpeg) => {
                eprintln!("{}: not a valid JPEG image", path.display());
                failures += 1;
            }
            Err(err) => {
                eprintln!("{}: could not be processed: {err}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} file(s) could not be inspected");
    }
    Ok(())
}

fn inspect_file(path: &Path, json: bool, segments: bool) -> lethe_core::Result<()> {
    let source = ImageSource::open(path)?;
    let data = source.bytes();
    let report = jpeg::detect_metadata(data)?;

    if json {
        let record = InspectRecord {
            file: path.display().to_string(),
            has_exif: report.has_exif,
            size_bytes: report.size_bytes,
            categories: report.categories.to_vec(),
        };
        println!(
            "{}",
            serde_json::to_string(&record).expect("inspect record always serializes")
        );
        return Ok(());
    }

    let summary = jpeg::summarize(data)?;

    let dimensions = match (summary.width, summary.height) {
        (Some(w), Some(h)) => format!("{w}x{h}, "),
        _ => String::new(),
    };
    if report.has_exif {
        let size = report.size_bytes.unwrap_or_default();
        println!(
            "{}: {}EXIF present ({})",
            path.display(),
            dimensions,
            format_size(size as u64, BINARY)
        );
        println!("  may carry: {}", report.categories.join(", "));
    } else {
        println!("{}: {}no EXIF metadata", path.display(), dimensions);
    }

    if segments {
        print_segment_walk(data)?;
    }
    Ok(())
}

fn print_segment_walk(data: &[u8]) -> lethe_core::Result<()> {
    println!("  {:<10} {:<6} {:>8}", "OFFSET", "MARKER", "LENGTH");
    for segment in jpeg::scan_segments(data)? {
        println!("  {}", render_segment(&segment, data.len()));
    }
    Ok(())
}

fn render_segment(segment: &Segment, buffer_len: usize) -> String {
    let length = if segment.is_trailing() {
        format!("scan data to end ({})", format_size((buffer_len - segment.offset) as u64, BINARY))
    } else if segment.length == 0 {
        "-".to_string()
    } else {
        segment.length.to_string()
    };
    format!(
        "0x{:08X} {:<6} {:>8}",
        segment.offset, segment.marker, length
    )
}
