//! Archive naming: `<dir>/<stem>__<timestamp>[_NNN].log[.gz]`

use chrono::{DateTime, Local, Utc};
use oxirotate_core::{
    RotationConfig, Timezone, ARCHIVE_EXTENSION, ARCHIVE_SEPARATOR, COMPRESSED_SUFFIX,
};
use std::path::{Path, PathBuf};

/// Highest collision sequence tried before giving up on a timestamp
pub const MAX_SEQUENCE: u32 = 999;

/// Base prefix shared by all archives of a source file (`<stem>__`)
pub fn base_prefix(source: &Path) -> Option<String> {
    let stem = source.file_stem()?.to_str()?;
    Some(format!("{}{}", stem, ARCHIVE_SEPARATOR))
}

/// Recover the base stem from an archive file name
pub fn base_of(archive_name: &str) -> Option<&str> {
    let name = archive_name
        .strip_suffix(&format!(".{}", COMPRESSED_SUFFIX))
        .unwrap_or(archive_name);
    let name = name.strip_suffix(&format!(".{}", ARCHIVE_EXTENSION))?;
    let (stem, disambiguator) = name.rsplit_once(ARCHIVE_SEPARATOR)?;
    if stem.is_empty() || disambiguator.is_empty() {
        return None;
    }
    Some(stem)
}

/// Render the archive timestamp
pub fn format_stamp(date_format: &str, timezone: Timezone, now: DateTime<Utc>) -> String {
    match timezone {
        Timezone::Utc => now.format(date_format).to_string(),
        Timezone::Local => now.with_timezone(&Local).format(date_format).to_string(),
    }
}

/// Candidate archive paths for one rotation of one source file
#[derive(Debug, Clone)]
pub struct ArchiveNamer {
    dir: PathBuf,
    prefix: String,
    stamp: String,
    compress: bool,
}

impl ArchiveNamer {
    /// Returns None when the source has no usable file name
    pub fn new(source: &Path, config: &RotationConfig, now: DateTime<Utc>) -> Option<Self> {
        let prefix = base_prefix(source)?;
        let dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Some(Self {
            dir,
            prefix,
            stamp: format_stamp(&config.date_format, config.timezone, now),
            compress: config.compress,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Archive path for a collision sequence; 0 is the plain timestamp
    pub fn candidate(&self, sequence: u32) -> PathBuf {
        let mut name = format!("{}{}", self.prefix, self.stamp);
        if sequence > 0 {
            name.push_str(&format!("_{:03}", sequence));
        }
        name.push('.');
        name.push_str(ARCHIVE_EXTENSION);
        if self.compress {
            name.push('.');
            name.push_str(COMPRESSED_SUFFIX);
        }
        self.dir.join(name)
    }

    /// Collision sequence of an existing archive carrying this timestamp
    pub fn sequence_of(&self, file_name: &str) -> Option<u32> {
        let rest = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.stamp.as_str())?;
        let rest = rest
            .strip_suffix(&format!(".{}", COMPRESSED_SUFFIX))
            .unwrap_or(rest);
        let rest = rest.strip_suffix(&format!(".{}", ARCHIVE_EXTENSION))?;
        if rest.is_empty() {
            return Some(0);
        }
        rest.strip_prefix('_')?.parse().ok()
    }

    /// First sequence above every existing archive with this timestamp.
    ///
    /// Never reuses a pruned slot, so a newer archive can't sort below an
    /// older one that shares its timestamp.
    pub fn next_sequence<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> u32 {
        existing
            .into_iter()
            .filter_map(|name| self.sequence_of(name))
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }
}
