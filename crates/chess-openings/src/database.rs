//! Opening book storage and lookup.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::fingerprint::Fingerprint;
use crate::opening::OpeningEntry;
use crate::pgn::{Mainline, PgnError, ReplayError};

/// Errors that can occur when loading an opening book.
#[derive(Debug, Error)]
pub enum OpeningBookError {
    /// Failed to read the reference database.
    #[error("failed to read opening database: {0}")]
    IoError(#[from] std::io::Error),

    /// A record lacks a required tag.
    #[error("opening record {index}: missing {tag} tag")]
    MissingTag {
        /// 1-based record index.
        index: usize,
        /// Name of the missing tag.
        tag: &'static str,
    },

    /// A record's movetext holds a token that is not a move.
    #[error("opening record {index}: unreadable movetext token \"{token}\"")]
    UnreadableLine {
        /// 1-based record index.
        index: usize,
        /// The offending token.
        token: String,
    },

    /// A record's moves do not replay from the starting position.
    #[error("opening record {index}: {source}")]
    IllegalLine {
        /// 1-based record index.
        index: usize,
        /// The replay failure.
        #[source]
        source: ReplayError,
    },
}

/// Mapping from position fingerprint to the opening it identifies.
///
/// Built once from a reference database and read-only afterward. When two
/// reference lines reach the same position, the one loaded later wins.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: HashMap<Fingerprint, OpeningEntry>,
}

impl OpeningBook {
    /// Creates a new empty opening book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an opening book from a PGN file of opening lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or any record is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OpeningBookError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let book = Self::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), positions = book.len(), "loaded opening book");
        Ok(book)
    }

    /// Builds an opening book from PGN text read from `source`, one record
    /// at a time.
    ///
    /// Each record must carry `ECO` and `Opening` tags; `Variation` is
    /// optional. The record's mainline is replayed from the starting
    /// position and the entry is stored under the fingerprint of the
    /// position it ends in.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, a missing required tag, or a line
    /// that cannot be read or replayed. Errors carry the 1-based record index.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self, OpeningBookError> {
        let mut book = Self::new();
        for (i, record) in Mainline::games(source).enumerate() {
            let index = i + 1;
            let record = match record {
                Ok(record) => record,
                Err(PgnError::IoError(e)) => return Err(e.into()),
                Err(PgnError::UnreadableToken(token)) => {
                    return Err(OpeningBookError::UnreadableLine { index, token })
                }
            };
            let eco = record
                .tag("ECO")
                .ok_or(OpeningBookError::MissingTag { index, tag: "ECO" })?;
            let name = record
                .tag("Opening")
                .ok_or(OpeningBookError::MissingTag {
                    index,
                    tag: "Opening",
                })?;
            let mut entry = OpeningEntry::new(eco, name);
            if let Some(variation) = record.tag("Variation") {
                entry = entry.with_variation(variation);
            }

            let position = record
                .final_position()
                .map_err(|source| OpeningBookError::IllegalLine { index, source })?;
            if let Some(previous) = book.insert(Fingerprint::of(&position), entry) {
                debug!(index, eco = %previous.eco, name = %previous.name, "opening entry replaced");
            }
        }
        Ok(book)
    }

    /// Returns the number of positions in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry, replacing and returning any entry already stored for
    /// the same fingerprint.
    pub fn insert(&mut self, fingerprint: Fingerprint, entry: OpeningEntry) -> Option<OpeningEntry> {
        self.entries.insert(fingerprint, entry)
    }

    /// Looks up the opening for a position. `None` means the position is not
    /// a known opening.
    #[must_use]
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&OpeningEntry> {
        self.entries.get(fingerprint)
    }
}
