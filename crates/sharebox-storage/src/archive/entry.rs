//! Archive entries and the tree they are planned from.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use sharebox_core::types::path::sanitize_archive_path;

/// One record of a generated archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    /// A directory, with a trailing `/` on its path.
    Directory {
        /// Path inside the archive.
        archive_path: String,
        /// Timestamp written for the directory.
        modified: DateTime<Utc>,
    },
    /// A stored file streamed from storage.
    File {
        /// Path inside the archive.
        archive_path: String,
        /// Size the file had when the plan was built.
        size: u64,
        /// Modification time of the stored file.
        modified: DateTime<Utc>,
        /// Storage key the content is read from.
        source: String,
    },
}

impl ArchiveEntry {
    /// Path inside the archive.
    pub fn archive_path(&self) -> &str {
        match self {
            Self::Directory { archive_path, .. } | Self::File { archive_path, .. } => archive_path,
        }
    }

    /// Timestamp recorded for the entry.
    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            Self::Directory { modified, .. } | Self::File { modified, .. } => *modified,
        }
    }

    /// Whether this is a directory entry.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Length of the UTF-8 encoded path.
    pub fn name_len(&self) -> u64 {
        self.archive_path().len() as u64
    }

    /// Content length (zero for directories).
    pub fn data_len(&self) -> u64 {
        match self {
            Self::Directory { .. } => 0,
            Self::File { size, .. } => *size,
        }
    }
}

/// An ordered entry list ready to be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePlan {
    root_name: String,
    entries: Vec<ArchiveEntry>,
}

impl ArchivePlan {
    /// Name of the archive's top-level directory.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Entries in stream order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Number of file entries.
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_directory()).count()
    }

    /// Whether the plan holds no files at all.
    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    pub(crate) fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }
}

#[derive(Debug, Clone)]
struct PlannedFile {
    size: u64,
    modified: DateTime<Utc>,
    source: String,
}

#[derive(Debug, Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeMap<String, PlannedFile>,
}

/// Builds an [`ArchivePlan`] from a flat list of files.
///
/// Every file lands under the archive root; each of its ancestor
/// directories becomes an explicit entry. Entries are emitted as a
/// pre-order walk: a directory, then its sub-directories, then its files,
/// each group sorted by byte order.
#[derive(Debug)]
pub struct ArchivePlanBuilder {
    root_name: String,
    directory_time: DateTime<Utc>,
    tree: DirNode,
}

impl ArchivePlanBuilder {
    /// Start a plan whose entries live under `root_name/`.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            directory_time: Utc::now(),
            tree: DirNode::default(),
        }
    }

    /// Timestamp written on directory entries (defaults to now).
    pub fn directory_time(mut self, time: DateTime<Utc>) -> Self {
        self.directory_time = time;
        self
    }

    /// Add a file at `relative_path` below the root.
    ///
    /// Returns `false` when the path sanitizes to nothing or the same path
    /// was already added; the first file for a path wins.
    pub fn add_file(
        &mut self,
        relative_path: &str,
        size: u64,
        modified: DateTime<Utc>,
        source: impl Into<String>,
    ) -> bool {
        let clean = sanitize_archive_path(relative_path);
        let mut segments: Vec<&str> = clean.split('/').filter(|s| !s.is_empty()).collect();
        let Some(file_name) = segments.pop() else {
            return false;
        };

        let mut node = &mut self.tree;
        for segment in segments {
            node = node.dirs.entry(segment.to_string()).or_default();
        }

        if node.files.contains_key(file_name) {
            return false;
        }
        node.files.insert(
            file_name.to_string(),
            PlannedFile {
                size,
                modified,
                source: source.into(),
            },
        );
        true
    }

    /// Finish the plan.
    pub fn build(self) -> ArchivePlan {
        let mut entries = Vec::new();
        walk(&self.root_name, &self.tree, self.directory_time, &mut entries);
        debug_assert!(verify_tree(&entries).is_ok());
        ArchivePlan {
            root_name: self.root_name,
            entries,
        }
    }
}

fn walk(prefix: &str, node: &DirNode, time: DateTime<Utc>, out: &mut Vec<ArchiveEntry>) {
    out.push(ArchiveEntry::Directory {
        archive_path: format!("{prefix}/"),
        modified: time,
    });
    for (name, child) in &node.dirs {
        walk(&format!("{prefix}/{name}"), child, time, out);
    }
    for (name, file) in &node.files {
        out.push(ArchiveEntry::File {
            archive_path: format!("{prefix}/{name}"),
            size: file.size,
            modified: file.modified,
            source: file.source.clone(),
        });
    }
}

/// Check that every entry's parent directory appears, as its own entry,
/// before it, and that no path repeats.
pub fn verify_tree(entries: &[ArchiveEntry]) -> Result<(), String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut directories: HashSet<&str> = HashSet::new();

    for entry in entries {
        let path = entry.archive_path();
        if !seen.insert(path) {
            return Err(format!("duplicate archive path {path}"));
        }
        if let Some(parent) = parent_directory(path) {
            if !directories.contains(parent) {
                return Err(format!("{path} appears before its directory {parent}"));
            }
        }
        if entry.is_directory() {
            directories.insert(path);
        }
    }
    Ok(())
}

/// `a/b/` for `a/b/c.txt` or `a/b/c/`; `None` at the top level.
fn parent_directory(path: &str) -> Option<&str> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.rfind('/').map(|idx| &path[..=idx])
}
