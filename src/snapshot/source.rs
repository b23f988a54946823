//! Input references and the sources that enumerate them.
//!
//! The pipeline never walks storage itself: it asks a [`SnapshotSource`] for the ordered
//! list of [`InputRef`]s making up a batch. Two sources ship with the crate:
//!
//! * any `Vec<InputRef>` / `[InputRef]` (explicit list, e.g. built by a caller or a test),
//! * [`DirectorySource`], which lists the files of one directory having a given extension,
//!   sorted by file name so that the batch order is reproducible.
use std::{fmt, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};

use crate::lightfit_errors::LightfitError;

/// Reference to one snapshot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRef {
    /// A record stored on disk.
    File(Utf8PathBuf),
    /// A record already held in memory, with a label used in diagnostics.
    Memory { label: String, contents: Arc<str> },
}

impl InputRef {
    pub fn file(path: impl Into<Utf8PathBuf>) -> Self {
        InputRef::File(path.into())
    }

    pub fn memory(label: impl Into<String>, contents: impl Into<Arc<str>>) -> Self {
        InputRef::Memory {
            label: label.into(),
            contents: contents.into(),
        }
    }

    /// Human-readable reference used in diagnostics and snapshot labels.
    pub fn label(&self) -> &str {
        match self {
            InputRef::File(path) => path.as_str(),
            InputRef::Memory { label, .. } => label,
        }
    }

    /// Path of the record when it lives on disk.
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            InputRef::File(path) => Some(path),
            InputRef::Memory { .. } => None,
        }
    }

    /// Read the whole record as text.
    pub fn read_to_string(&self) -> std::io::Result<String> {
        match self {
            InputRef::File(path) => std::fs::read_to_string(path),
            InputRef::Memory { contents, .. } => Ok(contents.to_string()),
        }
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Producer of the ordered list of inputs making up one batch.
pub trait SnapshotSource {
    fn inputs(&self) -> Result<Vec<InputRef>, LightfitError>;
}

impl SnapshotSource for [InputRef] {
    fn inputs(&self) -> Result<Vec<InputRef>, LightfitError> {
        Ok(self.to_vec())
    }
}

impl SnapshotSource for Vec<InputRef> {
    fn inputs(&self) -> Result<Vec<InputRef>, LightfitError> {
        Ok(self.clone())
    }
}

/// Every file of a directory with a given extension (non-recursive, sorted by name).
#[derive(Debug, Clone)]
pub struct DirectorySource {
    directory: Utf8PathBuf,
    extension: String,
}

impl DirectorySource {
    /// Source listing the `.spec` files of `directory`.
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Self {
        Self::with_extension(directory, "spec")
    }

    pub fn with_extension(directory: impl Into<Utf8PathBuf>, extension: impl Into<String>) -> Self {
        DirectorySource {
            directory: directory.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }
}

impl SnapshotSource for DirectorySource {
    fn inputs(&self) -> Result<Vec<InputRef>, LightfitError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| LightfitError::Utf8PathError(p.display().to_string()))?;
            if path.extension() == Some(self.extension.as_str()) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files.into_iter().map(InputRef::File).collect())
    }
}
