//! Local persistence for voyage plans and the audit logbook.
//!
//! Everything lives under one storage root:
//!
//! ```text
//! <root>/
//!   plans.sqlite     # Saved plans and the overrides recorded against them
//!   logbook.jsonl    # Append-only, hash-chained audit entries
//! ```

use std::{fs, io, path::PathBuf};

use uuid::Uuid;

mod logbook;
mod plans;

pub use logbook::{FileLogbook, LogbookCheck};
pub use plans::PlanSummary;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Local file-based storage.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the default storage root: `~/.lookout/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lookout"))
    }

    fn plans_path(&self) -> PathBuf {
        self.root.join("plans.sqlite")
    }

    fn logbook_path(&self) -> PathBuf {
        self.root.join("logbook.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn new_creates_the_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("lookout");
        Storage::new(&root).unwrap();
        assert!(root.is_dir());
    }
}
