//! Append-only history of pipeline runs, persisted as a single YAML document.
//!
//! The file is a `---` header followed by one block-sequence entry per record:
//!
//! ```yaml
//! ---
//! - revision: 42
//!   author: dawuss
//!   message: Fixed the bibliography
//!   status: ok
//!   file: report-42.pdf
//! ```
//!
//! Appending writes exactly one more entry at the end of the file, so the file after N
//! appends is byte-identical to [`RunLog::document`] of those N records and stays a
//! valid document after every write.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::error::RunLogError;
use crate::revision::Revision;
use crate::template::Template;

/// First bytes of every run log file.
pub const DOCUMENT_HEADER: &str = "---\n";

pub const STATUS_OK: &str = "ok";

/// Status recorded for a failed run.
pub fn error_status(cause: &dyn std::fmt::Display) -> String {
    format!("ERROR: {cause}")
}

/// Outcome of one pipeline run. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub revision: Revision,
    pub author: String,
    pub message: String,
    pub status: String,
    pub file: String,
}

impl RunRecord {
    /// Field names addressable from a presentation template.
    pub const FIELDS: [&'static str; 5] = ["revision", "author", "message", "status", "file"];

    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "revision" => Some(self.revision.to_string()),
            "author" => Some(self.author.clone()),
            "message" => Some(self.message.clone()),
            "status" => Some(self.status.clone()),
            "file" => Some(self.file.clone()),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    records: Vec<RunRecord>,
}

impl RunLog {
    /// Load every record from `path`. A missing file is an empty log.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunLogError> {
        let path = path.as_ref().to_path_buf();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No run log yet, starting empty");
                return Ok(Self {
                    path,
                    records: Vec::new(),
                });
            }
            Err(e) => {
                error!(error = ?e, path = %path.display(), "Failed to read run log");
                return Err(RunLogError::Io { path, source: e });
            }
        };

        let records = parse_document(&content).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to parse run log");
            RunLogError::Parse {
                path: path.clone(),
                source: e,
            }
        })?;
        info!(path = %path.display(), records = records.len(), "Loaded run log");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records in the order they were appended.
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// The complete file contents for `records`, as if written from scratch.
    pub fn document(records: &[RunRecord]) -> Result<String, RunLogError> {
        let mut doc = String::from(DOCUMENT_HEADER);
        for record in records {
            doc.push_str(&entry(record)?);
        }
        Ok(doc)
    }

    /// Persist `record` by extending the file with its entry, then keep it in memory.
    pub fn append(&mut self, record: RunRecord) -> Result<(), RunLogError> {
        let entry = entry(&record)?;

        if !self.path.exists() {
            self.create_document()?;
        }

        let metadata = fs::metadata(&self.path).map_err(|e| self.io_error(e))?;
        if metadata.permissions().readonly() {
            error!(path = %self.path.display(), "Run log is read-only");
            return Err(RunLogError::NotWritable(self.path.clone()));
        }

        let mut file = match OpenOptions::new().append(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                error!(path = %self.path.display(), "Run log is not writable");
                return Err(RunLogError::NotWritable(self.path.clone()));
            }
            Err(e) => return Err(self.io_error(e)),
        };

        file.lock_exclusive().map_err(|e| self.io_error(e))?;
        let written = file
            .write_all(entry.as_bytes())
            .and_then(|_| file.sync_data());
        let _ = FileExt::unlock(&file);
        written.map_err(|e| self.io_error(e))?;

        info!(
            path = %self.path.display(),
            revision = %record.revision,
            status = %record.status,
            "Appended run record"
        );
        self.records.push(record);
        Ok(())
    }

    /// Render the whole history, not just the latest run.
    pub fn render(&self, template: &Template) -> String {
        template.render(&self.records)
    }

    /// Create the file holding only the header. The header lands atomically, and a file
    /// created concurrently by someone else is left alone.
    fn create_document(&self) -> Result<(), RunLogError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(DOCUMENT_HEADER.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;

        match tmp.persist_noclobber(&self.path) {
            Ok(_) => {
                debug!(path = %self.path.display(), "Created run log");
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(self.io_error(e.error)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> RunLogError {
        RunLogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// One record as a block-sequence entry (`- revision: ...`).
fn entry(record: &RunRecord) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(std::slice::from_ref(record))
}

fn parse_document(content: &str) -> Result<Vec<RunRecord>, serde_yaml::Error> {
    let body = content.trim_start().strip_prefix("---").unwrap_or(content);
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(revision: Revision, status: &str) -> RunRecord {
        RunRecord {
            file: format!("report-{revision}.pdf"),
            revision,
            author: "dawuss".into(),
            message: "Added related work".into(),
            status: status.into(),
        }
    }

    #[test]
    fn entry_is_a_single_sequence_item() {
        let text = entry(&record(Revision::Number(42), STATUS_OK)).unwrap();
        assert_eq!(
            text,
            "- revision: 42\n  author: dawuss\n  message: Added related work\n  status: ok\n  file: report-42.pdf\n"
        );
    }

    #[test]
    fn symbolic_revision_round_trips_as_string() {
        let doc = RunLog::document(&[record(Revision::head(), "ERROR: svn failed: 1")]).unwrap();
        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed[0].revision, Revision::head());
    }

    #[test]
    fn header_only_document_is_empty() {
        assert!(parse_document(DOCUMENT_HEADER).unwrap().is_empty());
        assert!(parse_document("").unwrap().is_empty());
    }

    #[test]
    fn multiline_message_survives() {
        let mut r = record(Revision::Number(7), STATUS_OK);
        r.message = "First line\nsecond: line with colon\n".into();
        let doc = RunLog::document(&[r.clone(), record(Revision::Number(8), STATUS_OK)]).unwrap();
        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed, vec![r, record(Revision::Number(8), STATUS_OK)]);
    }

    #[test]
    fn error_status_prefix() {
        assert_eq!(error_status(&"Build failed."), "ERROR: Build failed.");
    }
}
