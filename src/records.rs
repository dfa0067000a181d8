//! Photo record model and local directory collection.
//!
//! A [`PhotoRecord`] is one row of the collected-photos table the host merges
//! across sources: a unique id (file path or remote id), a creation timestamp
//! in UTC at second precision, and a source tag naming the collector, plus
//! any extra columns a source wants to carry along (MIME type, remote URL).
//! Records are rebuilt from scratch on every collection pass.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use walkdir::{DirEntry, WalkDir};

use crate::error::PluginError;
use crate::magick;

/// One collected photo.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    /// Unique identifier: a local file path or a remote id.
    pub id: String,
    /// Creation time, UTC, second precision.
    pub created_at: DateTime<Utc>,
    /// Tag naming the collector that produced this record.
    pub source: String,
    /// Extra columns (MIME type, download URL, ...), free-form.
    pub extra: BTreeMap<String, String>,
}

impl PhotoRecord {
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            source: source.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Attach an extra column, builder style.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Creation time in the fixed wire format, e.g. `2021-01-27T22:59:37Z`.
    #[must_use]
    pub fn creation_stamp(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Parse a wire-format creation stamp back into a UTC timestamp.
    pub fn parse_creation_stamp(stamp: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(stamp).map(|dt| dt.with_timezone(&Utc))
    }
}

/// Sort records by creation time; newest first when `ascending` is false.
pub fn sort_by_creation(records: &mut [PhotoRecord], ascending: bool) {
    if ascending {
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    } else {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

/// Records produced by the collector with the given source tag.
pub fn filter_by_source<'a>(
    records: &'a [PhotoRecord],
    source: &str,
) -> impl Iterator<Item = &'a PhotoRecord> {
    records.iter().filter(move |r| r.source == source)
}

/// Collects photo records from a local directory.
///
/// The scan skips hidden dot-directories below the root and keeps only files
/// with a supported image extension. File order is lexicographic so indexes
/// derived from it stay stable across passes.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
    recursive: bool,
    exts: Option<Vec<&'static str>>,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            root: root.into(),
            recursive,
            exts: None,
        }
    }

    /// Override the allowed extensions (lowercase, without dot).
    #[must_use]
    pub fn with_extensions(mut self, exts: Vec<&'static str>) -> Self {
        self.exts = Some(exts);
        self
    }

    /// All matching files under the root, sorted.
    pub fn files(&self) -> Result<Vec<PathBuf>, PluginError> {
        if !self.root.is_dir() {
            return Err(PluginError::BadDir(self.root.clone()));
        }
        let mut wd = WalkDir::new(&self.root);
        if !self.recursive {
            wd = wd.max_depth(1);
        }
        let mut out = Vec::new();
        for entry in wd
            .into_iter()
            .filter_entry(|e| !should_skip_dir(e))
            .flatten()
        {
            let path = entry.path();
            if path.is_file() && is_supported_image(path, self.exts.as_deref()) {
                out.push(path.to_path_buf());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Build one record per file, stamped with `source`.
    pub fn collect(&self, source: &str) -> Result<Vec<PhotoRecord>, PluginError> {
        let files = self.files()?;
        Ok(files
            .into_iter()
            .map(|path| {
                let created = photo_created_at(&path);
                PhotoRecord::new(path.to_string_lossy().into_owned(), created, source)
            })
            .collect())
    }
}

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path, exts: Option<&[&str]>) -> bool {
    let exts = exts.unwrap_or(magick::EXTENSIONS);
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| *e == ext)
        })
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

fn photo_created_at(path: &Path) -> DateTime<Utc> {
    let st = match fs::metadata(path) {
        Ok(meta) => meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or_else(|_| SystemTime::now()),
        Err(_) => SystemTime::now(),
    };
    DateTime::<Utc>::from(st)
}
