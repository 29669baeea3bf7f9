//! JSON receipt sidecars documenting what a strip removed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Serialize)]
struct StripReceipt {
    source: String,
    output: String,
    original_size: u64,
    cleaned_size: u64,
    bytes_removed: u64,
    /// Declared length of the EXIF APP1 segment that was found, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    exif_declared_length: Option<u16>,
    cleaned_sha256: String,
    stripped_at: String,
    tool: String,
}

pub fn write_receipt(
    output: &Path,
    source: &Path,
    original_size: u64,
    cleaned: &[u8],
    exif_declared_length: Option<u16>,
) -> Result<()> {
    let receipt = StripReceipt {
        source: source.display().to_string(),
        output: output.display().to_string(),
        original_size,
        cleaned_size: cleaned.len() as u64,
        bytes_removed: original_size - cleaned.len() as u64,
        exif_declared_length,
        cleaned_sha256: compute_sha256(cleaned),
        stripped_at: Utc::now().to_rfc3339(),
        tool: format!("lethe {}", env!("CARGO_PKG_VERSION")),
    };

    let json = serde_json::to_string_pretty(&receipt)?;
    fs::write(sidecar_path(output), json)?;
    Ok(())
}

fn sidecar_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{name}.receipt.json"))
}

fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/out/photo.jpg")),
            Path::new("/out/photo.jpg.receipt.json")
        );
    }

    #[test]
    fn test_compute_sha256_of_empty_input() {
        assert_eq!(
            compute_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_write_receipt_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("photo.jpg");

        write_receipt(&output, Path::new("/pics/photo.jpg"), 100, b"0123456789", Some(80))
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("photo.jpg.receipt.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["original_size"], 100);
        assert_eq!(value["cleaned_size"], 10);
        assert_eq!(value["bytes_removed"], 90);
        assert_eq!(value["exif_declared_length"], 80);
        assert_eq!(value["cleaned_sha256"], compute_sha256(b"0123456789"));
    }
}
