//! Blocking copy of a live log into its archive (optionally gzip'd)

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Result, RotationError, RotationErrorKind};
use crate::naming::{ArchiveNamer, MAX_SEQUENCE};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Sink {
    fn new(file: File, compress: bool) -> Self {
        let writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, file);
        if compress {
            Sink::Gzip(GzEncoder::new(writer, Compression::best()))
        } else {
            Sink::Plain(writer)
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.write_all(buf),
            Sink::Gzip(w) => w.write_all(buf),
        }
    }

    /// Flush every stage and fsync the archive
    fn finish(self, archive: &Path) -> Result<()> {
        let writer = match self {
            Sink::Plain(w) => w,
            Sink::Gzip(encoder) => encoder
                .finish()
                .map_err(|e| RotationError::io(RotationErrorKind::CompressFailure, archive, &e))?,
        };
        let file = writer.into_inner().map_err(|e| {
            RotationError::io(RotationErrorKind::WriteFailure, archive, e.error())
        })?;
        file.sync_all()
            .map_err(|e| RotationError::io(RotationErrorKind::WriteFailure, archive, &e))
    }
}

/// Create the archive file under the first free name
fn create_archive(namer: &ArchiveNamer) -> Result<(PathBuf, File)> {
    let existing: Vec<String> = fs::read_dir(namer.dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let start = namer.next_sequence(existing.iter().map(String::as_str));

    for sequence in start..=MAX_SEQUENCE {
        let candidate = namer.candidate(sequence);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(RotationError::io(
                    RotationErrorKind::WriteFailure,
                    &candidate,
                    &e,
                ))
            }
        }
    }

    Err(RotationError::new(
        RotationErrorKind::WriteFailure,
        &namer.candidate(0),
        "no free archive name left for this timestamp",
    ))
}

fn copy_into(source: &Path, input: &mut File, mut sink: Sink, archive: &Path, compress: bool) -> Result<u64> {
    let write_kind = if compress {
        RotationErrorKind::CompressFailure
    } else {
        RotationErrorKind::WriteFailure
    };

    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RotationError::io(RotationErrorKind::ReadFailure, source, &e)),
        };
        sink.write_all(&buf[..n])
            .map_err(|e| RotationError::io(write_kind, archive, &e))?;
        total += n as u64;
    }

    sink.finish(archive)?;
    Ok(total)
}

/// Copy `source` into a new archive and return its path and the bytes copied.
///
/// Any failure removes the partial archive; the source is never modified here.
pub fn write_archive(source: &Path, namer: &ArchiveNamer, compress: bool) -> Result<(PathBuf, u64)> {
    let mut input = File::open(source)
        .map_err(|e| RotationError::io(RotationErrorKind::ReadFailure, source, &e))?;

    let (archive, file) = create_archive(namer)?;
    let sink = Sink::new(file, compress);

    match copy_into(source, &mut input, sink, &archive, compress) {
        Ok(bytes) => Ok((archive, bytes)),
        Err(err) => {
            if let Err(e) = fs::remove_file(&archive) {
                warn!("Failed to remove partial archive {}: {}", archive.display(), e);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flate2::read::GzDecoder;
    use oxirotate_core::RotationConfig;
    use tempfile::TempDir;

    fn namer_for(source: &Path, compress: bool) -> ArchiveNamer {
        let config = RotationConfig::new(1, None).with_compress(compress);
        ArchiveNamer::new(source, &config, Utc::now()).unwrap()
    }

    #[test]
    fn test_write_plain_archive() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("api-out.log");
        fs::write(&source, b"line one\nline two\n").unwrap();

        let (archive, bytes) = write_archive(&source, &namer_for(&source, false), false).unwrap();
        assert_eq!(bytes, 18);
        assert_eq!(fs::read(&archive).unwrap(), b"line one\nline two\n");
        // Source untouched by the copy stage
        assert_eq!(fs::read(&source).unwrap().len(), 18);
    }

    #[test]
    fn test_write_gzip_archive() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("api-out.log");
        let content: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
        fs::write(&source, &content).unwrap();

        let (archive, _) = write_archive(&source, &namer_for(&source, true), true).unwrap();
        assert!(archive.to_string_lossy().ends_with(".log.gz"));

        let mut decoded = Vec::new();
        GzDecoder::new(File::open(&archive).unwrap())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_collisions_get_increasing_sequences() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("api-out.log");
        fs::write(&source, b"x").unwrap();
        let namer = namer_for(&source, false);

        let (first, _) = write_archive(&source, &namer, false).unwrap();
        let (second, _) = write_archive(&source, &namer, false).unwrap();
        let (third, _) = write_archive(&source, &namer, false).unwrap();

        assert_eq!(first, namer.candidate(0));
        assert_eq!(second, namer.candidate(1));
        assert_eq!(third, namer.candidate(2));

        // A pruned slot below the highest sequence is not reused
        fs::remove_file(&first).unwrap();
        let (fourth, _) = write_archive(&source, &namer, false).unwrap();
        assert_eq!(fourth, namer.candidate(3));
    }

    #[test]
    fn test_missing_source_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("gone.log");
        let err = write_archive(&source, &namer_for(&source, false), false).unwrap_err();
        assert_eq!(err.kind, RotationErrorKind::ReadFailure);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreadable_source_leaves_no_partial_archive() {
        let dir = TempDir::new().unwrap();
        // Reading a directory fails after open succeeds
        let source = dir.path().join("api-out.log");
        fs::create_dir(&source).unwrap();

        let err = write_archive(&source, &namer_for(&source, false), false).unwrap_err();
        assert_eq!(err.kind, RotationErrorKind::ReadFailure);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
