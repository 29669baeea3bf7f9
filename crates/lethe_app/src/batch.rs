use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use lethe_core::jpeg;
use lethe_core::CoreError;
use lethe_io::ImageSource;

use crate::report;

const JOB_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct StripOptions {
    pub output_dir: Option<PathBuf>,
    pub in_place: bool,
    pub jobs: usize,
    pub receipt: bool,
}

struct WorkerContext {
    output_dir: Option<PathBuf>,
    in_place: bool,
    receipt: bool,
}

enum Outcome {
    Cleaned { removed: u64 },
    Unchanged,
}

enum StripEvent {
    Cleaned { file: PathBuf, removed: u64 },
    Unchanged,
    Failed { file: PathBuf, message: String },
    WorkerDone,
}

pub fn run_strip(files: &[PathBuf], options: &StripOptions, running: Arc<AtomicBool>) -> Result<()> {
    let start_time = Instant::now();
    let num_workers = options.jobs.max(1).min(files.len().max(1));

    if let Some(dir) = &options.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    println!(
        "[lethe] Stripping EXIF from {} file(s) with {} worker(s)",
        files.len(),
        num_workers
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("invalid progress bar template - this is a bug")
            .progress_chars("##-"),
    );

    let (job_tx, job_rx): (Sender<PathBuf>, Receiver<PathBuf>) = bounded(JOB_CHANNEL_CAPACITY);
    let (event_tx, event_rx): (Sender<StripEvent>, Receiver<StripEvent>) =
        bounded(EVENT_CHANNEL_CAPACITY);

    let feeder_files: Vec<PathBuf> = files.to_vec();
    let running_feeder = Arc::clone(&running);
    let feeder_handle = thread::spawn(move || {
        for file in feeder_files {
            if !running_feeder.load(Ordering::SeqCst) {
                break;
            }
            if job_tx.send(file).is_err() {
                break;
            }
        }
    });

    let context = Arc::new(WorkerContext {
        output_dir: options.output_dir.clone(),
        in_place: options.in_place,
        receipt: options.receipt,
    });

    let mut worker_handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let rx = job_rx.clone();
        let tx = event_tx.clone();
        let ctx = Arc::clone(&context);

        worker_handles.push(thread::spawn(move || {
            while let Ok(file) = rx.recv() {
                let event = match strip_file(&file, &ctx) {
                    Ok(Outcome::Cleaned { removed }) => StripEvent::Cleaned { file, removed },
                    Ok(Outcome::Unchanged) => StripEvent::Unchanged,
                    Err(err) => StripEvent::Failed {
                        file,
                        message: render_error(&err),
                    },
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            let _ = tx.send(StripEvent::WorkerDone);
        }));
    }
    drop(job_rx);
    drop(event_tx);

    let mut cleaned = 0u64;
    let mut unchanged = 0u64;
    let mut failed = 0u64;
    let mut bytes_removed = 0u64;
    let mut workers_done = 0usize;

    loop {
        match event_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(StripEvent::Cleaned { file, removed }) => {
                cleaned += 1;
                bytes_removed += removed;
                pb.set_message(file.display().to_string());
                pb.inc(1);
            }
            Ok(StripEvent::Unchanged) => {
                unchanged += 1;
                pb.inc(1);
            }
            Ok(StripEvent::Failed { file, message }) => {
                failed += 1;
                pb.println(format!("{}: {}", file.display(), message));
                pb.inc(1);
            }
            Ok(StripEvent::WorkerDone) => {
                workers_done += 1;
                if workers_done == num_workers {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Err(e) = feeder_handle.join() {
        eprintln!("[FATAL] Feeder thread panicked: {e:?}");
    }
    for (i, handle) in worker_handles.into_iter().enumerate() {
        if let Err(e) = handle.join() {
            eprintln!("[FATAL] Worker thread {i} panicked: {e:?}");
        }
    }

    let was_cancelled = !running.load(Ordering::SeqCst);
    pb.finish_and_clear();

    let elapsed = start_time.elapsed();
    if was_cancelled {
        println!("\n=== Strip interrupted ===");
    } else {
        println!("\n=== Strip finished ===");
    }
    println!("Elapsed:       {:.1}s", elapsed.as_secs_f64());
    println!("Cleaned:       {cleaned}");
    println!("Unchanged:     {unchanged}");
    println!("Failed:        {failed}");
    println!("Bytes removed: {}", format_size(bytes_removed, BINARY));

    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed");
    }
    Ok(())
}

fn strip_file(path: &Path, ctx: &WorkerContext) -> Result<Outcome> {
    let source = ImageSource::open(path)?;
    let data = source.bytes();

    let report = jpeg::detect_metadata(data)?;
    if !report.has_exif {
        return Ok(Outcome::Unchanged);
    }

    let cleaned = jpeg::strip_metadata(data)?;

    // Nothing touches the filesystem until the output is re-checked.
    if jpeg::detect_metadata(&cleaned)?.has_exif {
        anyhow::bail!("cleaned buffer still reports EXIF metadata");
    }

    let removed = (data.len() - cleaned.len()) as u64;
    let dest = destination(path, ctx);
    if ctx.in_place {
        lethe_io::write_replace(&dest, &cleaned)?;
    } else {
        lethe_io::write_new(&dest, &cleaned)?;
    }

    if ctx.receipt {
        report::write_receipt(&dest, path, data.len() as u64, &cleaned, report.size_bytes)?;
    }

    Ok(Outcome::Cleaned { removed })
}

fn destination(path: &Path, ctx: &WorkerContext) -> PathBuf {
    if ctx.in_place {
        return path.to_path_buf();
    }
    if let Some(dir) = &ctx.output_dir {
        return dir.join(path.file_name().unwrap_or_default());
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "jpg".to_string());
    path.with_file_name(format!("{stem}.clean.{ext}"))
}

fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::NotAJpeg) => "not a valid JPEG image".to_string(),
        _ => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(output_dir: Option<PathBuf>, in_place: bool) -> WorkerContext {
        WorkerContext {
            output_dir,
            in_place,
            receipt: false,
        }
    }

    #[test]
    fn test_destination_default_sibling() {
        let dest = destination(Path::new("/pics/photo.jpeg"), &ctx(None, false));
        assert_eq!(dest, Path::new("/pics/photo.clean.jpeg"));
    }

    #[test]
    fn test_destination_output_dir() {
        let dest = destination(
            Path::new("/pics/photo.jpg"),
            &ctx(Some(PathBuf::from("/out")), false),
        );
        assert_eq!(dest, Path::new("/out/photo.jpg"));
    }

    #[test]
    fn test_destination_in_place() {
        let dest = destination(Path::new("/pics/photo.jpg"), &ctx(None, true));
        assert_eq!(dest, Path::new("/pics/photo.jpg"));
    }

    #[test]
    fn test_destination_without_extension() {
        let dest = destination(Path::new("/pics/photo"), &ctx(None, false));
        assert_eq!(dest, Path::new("/pics/photo.clean.jpg"));
    }

    #[test]
    fn test_strip_file_end_to_end() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.jpg");

        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x0A]);
        data.extend_from_slice(b"Exif\0\0\x00\x00");
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x04, 0x01, 0x02, 0xAA, 0xFF, 0xD9]);
        fs::write(&path, &data).unwrap();

        let outcome = strip_file(&path, &ctx(None, false)).unwrap();
        assert!(matches!(outcome, Outcome::Cleaned { removed: 12 }));

        let cleaned = fs::read(dir.path().join("shot.clean.jpg")).unwrap();
        assert!(!jpeg::detect_metadata(&cleaned).unwrap().has_exif);
        assert_eq!(cleaned.len(), data.len() - 12);
        // Original untouched.
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_strip_file_without_exif_is_unchanged() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        let outcome = strip_file(&path, &ctx(None, false)).unwrap();
        assert!(matches!(outcome, Outcome::Unchanged));
        assert!(!dir.path().join("plain.clean.jpg").exists());
    }
}
