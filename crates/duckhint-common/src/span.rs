//! File identifiers and source locations.
//!
//! Every IR node may carry a [`SourceLoc`] so the host can map an editor
//! position back to the node to infer. Paths are interned once into a
//! [`FileTable`] and referred to by [`FileId`] everywhere else.

use std::fmt;
use std::path::{Path, PathBuf};

use rowan::{TextRange, TextSize};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A unique identifier for a source file within an indexing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Where a node came from: a file plus a byte range inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub file: FileId,
    pub range: TextRange,
}

impl SourceLoc {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "range start ({start}) must be <= end ({end})");
        Self {
            file,
            range: TextRange::new(TextSize::from(start), TextSize::from(end)),
        }
    }

    /// Whether `offset` falls inside this location's range (end inclusive,
    /// so a cursor placed right after an identifier still hits it).
    pub fn contains(&self, file: FileId, offset: u32) -> bool {
        self.file == file && self.range.contains_inclusive(TextSize::from(offset))
    }

    pub fn start(&self) -> u32 {
        self.range.start().into()
    }

    pub fn end(&self) -> u32 {
        self.range.end().into()
    }
}

/// Interns file paths into [`FileId`]s.
///
/// Ids are assigned sequentially in first-seen order and never reused, even
/// after a file is dropped from the index.
#[derive(Debug, Default)]
pub struct FileTable {
    paths: Vec<PathBuf>,
    path_to_id: FxHashMap<PathBuf, FileId>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `path`, assigning a fresh one on first sight.
    pub fn intern(&mut self, path: &Path) -> FileId {
        if let Some(id) = self.path_to_id.get(path) {
            return *id;
        }
        let id = FileId(self.paths.len() as u32);
        self.paths.push(path.to_path_buf());
        self.path_to_id.insert(path.to_path_buf(), id);
        id
    }

    /// Look up an already-interned path.
    pub fn get(&self, path: &Path) -> Option<FileId> {
        self.path_to_id.get(path).copied()
    }

    pub fn path(&self, id: FileId) -> Option<&Path> {
        self.paths.get(id.0 as usize).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
