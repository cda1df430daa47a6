//! Append-only journal
//!
//! Every committed unit of work becomes one line:
//!
//! ```text
//! <crc32 of json, 8 lowercase hex> <JournalRecord as json>\n
//! ```
//!
//! Lines are written with a single `write_all`, so a crash leaves at most one
//! torn line at the end of the file. On open, a final line that is
//! unterminated, unparsable or fails its checksum is discarded and the file
//! truncated back to the last good line. The same failure anywhere before the
//! final line means the file was damaged by something other than a crash and
//! the open fails.

mod durability;

pub use durability::Durability;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use verdant_core::{CustodyEvent, UnitId};

/// Journal failures
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying file I/O failed
    #[error("journal I/O error at {path}: {source}")]
    Io {
        /// Journal file
        path: PathBuf,
        /// Cause
        source: io::Error,
    },

    /// A line before the tail is damaged
    #[error("journal {path} is corrupt at line {line}: {reason}")]
    Corrupt {
        /// Journal file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// A record could not be serialized
    #[error("journal record serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One event written by a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unit the event belongs to
    pub unit_id: UnitId,
    /// The recorded event
    pub event: CustodyEvent,
}

/// One committed unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Ledger version assigned to the commit
    pub version: u64,
    /// Wall-clock time of the commit
    pub committed_at: DateTime<Utc>,
    /// Events in commit order
    pub entries: Vec<JournalEntry>,
}

/// Encode a record as one journal line, newline included
pub fn encode_line(record: &JournalRecord) -> Result<String, JournalError> {
    let json = serde_json::to_string(record)?;
    let crc = crc32fast::hash(json.as_bytes());
    Ok(format!("{:08x} {}\n", crc, json))
}

/// Decode one journal line (without its newline)
pub fn decode_line(line: &str) -> Result<JournalRecord, String> {
    let (crc_hex, json) = line
        .split_once(' ')
        .ok_or_else(|| "missing checksum separator".to_string())?;
    let expected = u32::from_str_radix(crc_hex, 16).map_err(|_| format!("bad checksum field {:?}", crc_hex))?;
    let actual = crc32fast::hash(json.as_bytes());
    if expected != actual {
        return Err(format!("checksum mismatch: stored {:08x}, computed {:08x}", expected, actual));
    }
    serde_json::from_str(json).map_err(|e| format!("invalid record: {}", e))
}

/// Open journal file, positioned for appends
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: File,
    len: u64,
    durability: Durability,
}

impl Journal {
    /// Open or create the journal at `path` and return the records it holds.
    pub fn open(path: impl AsRef<Path>, durability: Durability) -> Result<(Journal, Vec<JournalRecord>), JournalError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| JournalError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(io_err)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(io_err)?;
        // A torn tail may end inside a multi-byte character
        let contents = String::from_utf8_lossy(&bytes);

        let (records, good_len) = scan(&path, &contents)?;
        if good_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                discarded_bytes = bytes.len() as u64 - good_len,
                "discarding torn journal tail"
            );
            file.set_len(good_len).map_err(io_err)?;
            file.sync_data().map_err(io_err)?;
        }

        Ok((
            Journal {
                path,
                file,
                len: good_len,
                durability,
            },
            records,
        ))
    }

    /// Append one record. On failure the file is cut back to its previous
    /// length so a later append never lands behind a partial line.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        let line = encode_line(record)?;
        let written = self
            .file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .and_then(|()| {
                if self.durability.requires_fsync() {
                    self.file.sync_data()
                } else {
                    Ok(())
                }
            });

        match written {
            Ok(()) => {
                self.len += line.len() as u64;
                debug!(version = record.version, entries = record.entries.len(), "journal append");
                Ok(())
            }
            Err(source) => {
                if let Err(e) = self.file.set_len(self.len) {
                    warn!(path = %self.path.display(), error = %e, "failed to roll back partial journal write");
                }
                Err(JournalError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of committed records
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if no record has been written
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Durability mode
    pub fn durability(&self) -> Durability {
        self.durability
    }
}

/// Parse every line, returning the good records and the byte length they span
fn scan(path: &Path, contents: &str) -> Result<(Vec<JournalRecord>, u64), JournalError> {
    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut lines = contents.split_inclusive('\n').enumerate().peekable();

    while let Some((index, raw)) = lines.next() {
        let is_last = lines.peek().is_none();
        let parsed = match raw.strip_suffix('\n') {
            Some(line) => decode_line(line.strip_suffix('\r').unwrap_or(line)),
            None => Err("unterminated line".to_string()),
        };
        match parsed {
            Ok(record) => {
                records.push(record);
                offset += raw.len();
            }
            Err(_) if is_last => break,
            Err(reason) => {
                return Err(JournalError::Corrupt {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason,
                })
            }
        }
    }

    Ok((records, offset as u64))
}
