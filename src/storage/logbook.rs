//! Logbook storage: the audit chain, appended one JSON line per entry.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

// Traits must be in scope for `.lines()` on BufReader and `.write_all()` on File.
use io::{BufRead, Write};

use jiff::Timestamp;
use tracing::error;

use crate::audit::{AuditChain, AuditEntry, AuditEvent, AuditSink, verify_chain};

use super::{Result, Storage};

/// Outcome of checking the logbook's hash chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogbookCheck {
    pub entries: usize,

    /// Sequence number of the first entry that does not fit the chain.
    pub broken_at: Option<u64>,
}

impl Storage {
    /// Opens the logbook for appending, continuing its existing chain.
    pub fn logbook(&self) -> Result<FileLogbook> {
        let path = self.logbook_path();
        let last = read_entries(&path)?.pop();
        Ok(FileLogbook {
            path,
            chain: Mutex::new(AuditChain::resume(last.as_ref())),
        })
    }

    /// Loads every logbook entry, oldest first.
    pub fn load_logbook(&self) -> Result<Vec<AuditEntry>> {
        read_entries(&self.logbook_path())
    }

    /// Recomputes the logbook's hash chain.
    pub fn verify_logbook(&self) -> Result<LogbookCheck> {
        let entries = self.load_logbook()?;
        Ok(LogbookCheck {
            entries: entries.len(),
            broken_at: verify_chain(&entries),
        })
    }
}

/// An audit sink that appends sealed entries to `logbook.jsonl`.
pub struct FileLogbook {
    path: PathBuf,
    chain: Mutex<AuditChain>,
}

impl FileLogbook {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl AuditSink for FileLogbook {
    fn record(&self, event: AuditEvent) {
        // Held across the write so entries land in sequence order.
        let mut chain = self.chain.lock().unwrap_or_else(PoisonError::into_inner);
        let name = event.name();
        // The chain only advances once the entry is on disk.
        let mut next = chain.clone();
        let entry = next.seal(event, Timestamp::now());
        match self.append(&entry) {
            Ok(()) => *chain = next,
            Err(e) => error!(
                event = name,
                seq = entry.seq,
                path = %self.path.display(),
                error = %e,
                "failed to write audit entry"
            ),
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let reader = io::BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.is_empty() {
            entries.push(serde_json::from_str(&line)?);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("lookout")).unwrap();
        (dir, storage)
    }

    fn opened() -> AuditEvent {
        AuditEvent::SessionOpened {
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn load_empty_logbook() {
        let (_dir, storage) = test_storage();
        assert!(storage.load_logbook().unwrap().is_empty());
        assert_eq!(
            storage.verify_logbook().unwrap(),
            LogbookCheck {
                entries: 0,
                broken_at: None
            }
        );
    }

    #[test]
    fn recorded_events_are_appended_in_order() {
        let (_dir, storage) = test_storage();
        let logbook = storage.logbook().unwrap();
        logbook.record(opened());
        logbook.record(opened());

        let entries = storage.load_logbook().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].seq, 1);
        assert_eq!(entries[1].seq, 2);
        assert_eq!(entries[1].prev_hash, entries[0].hash);
    }

    #[test]
    fn reopening_continues_the_chain() {
        let (_dir, storage) = test_storage();
        storage.logbook().unwrap().record(opened());
        storage.logbook().unwrap().record(opened());

        let check = storage.verify_logbook().unwrap();
        assert_eq!(check.entries, 2);
        assert_eq!(check.broken_at, None);
    }

    #[test]
    fn tampering_is_detected() {
        let (_dir, storage) = test_storage();
        let logbook = storage.logbook().unwrap();
        logbook.record(opened());
        logbook.record(AuditEvent::Cancelled {
            session_id: Uuid::new_v4(),
            reason: "false alarm".into(),
        });
        logbook.record(opened());

        let path = storage.logbook_path();
        let edited = fs::read_to_string(&path)
            .unwrap()
            .replace("false alarm", "drill");
        fs::write(&path, edited).unwrap();

        assert_eq!(storage.verify_logbook().unwrap().broken_at, Some(2));
    }

    #[test]
    fn failed_write_leaves_the_chain_intact() {
        let (_dir, storage) = test_storage();
        let logbook = storage.logbook().unwrap();
        logbook.record(opened());

        let path = storage.logbook_path();
        let kept = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        logbook.record(opened());

        fs::remove_dir(&path).unwrap();
        fs::write(&path, kept).unwrap();
        logbook.record(opened());

        let entries = storage.load_logbook().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].seq, 2);
        assert_eq!(storage.verify_logbook().unwrap().broken_at, None);
    }
}
