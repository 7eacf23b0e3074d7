//! # Journal — append-only key log
//!
//! Provides crash-safe durability for the TernDB key set.
//!
//! Every accepted mutation (insert or tombstone) is serialized into one text
//! record and appended **after** the corresponding in-memory update; the
//! append completes before the mutating call returns, so an acknowledged
//! change is durable. On open the journal is replayed to reconstruct the
//! tree, and a tail torn by a crash mid-append is repaired in place.
//!
//! ## File format
//!
//! ```text
//! TSTDB\n
//! <len>\t<key>\n
//! ```
//!
//! `<len>` is a signed decimal byte count: positive for an insertion,
//! negative for a tombstone. `<key>` is exactly `abs(len)` raw bytes — any
//! byte is legal inside a key, including tab and newline, because the reader
//! is length-framed rather than line-framed.
//!
//! ## Tail repair
//!
//! A record interrupted mid-write leaves a partial tail. On the next open
//! the damaged region is overwritten with spaces and a closing newline, so
//! the file stays parseable (the reader skips whitespace between records),
//! and the writer resumes right after the last complete record. Damage
//! anywhere else is reported as [`JournalError::Corrupt`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use journal::{Journal, Record};
//!
//! let mut replayed = Vec::new();
//! let mut j = Journal::open("keys.db", true, |rec| replayed.push(rec)).unwrap();
//! j.append(&Record::insert(b"bananas")).unwrap();
//! ```

use log::warn;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// The magic first line of every journal file.
pub const HEADER: &[u8] = b"TSTDB\n";

/// Maximum key length a record may carry. Lengths beyond this are damage:
/// the writer never emits them.
pub const MAX_KEY_LEN: usize = 512;

/// Upper bound on a torn tail, measured from the newline that terminates
/// the last complete line: sign, digits, tab, key bytes, newline.
const MAX_PARTIAL_RECORD: u64 = (MAX_KEY_LEN + 8) as u64;

/// Bytes of the last good key echoed in a corruption diagnostic.
const SNIPPET_LEN: usize = 40;

/// A single journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A key insertion (positive length on disk).
    Insert { key: Vec<u8> },
    /// A key tombstone (negative length on disk).
    Remove { key: Vec<u8> },
}

impl Record {
    pub fn insert(key: &[u8]) -> Self {
        Record::Insert { key: key.to_vec() }
    }

    pub fn remove(key: &[u8]) -> Self {
        Record::Remove { key: key.to_vec() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Record::Insert { key } | Record::Remove { key } => key,
        }
    }
}

/// Errors surfaced when opening or writing a journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The host file layer refused, or a write failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file exists but does not start with the journal header.
    #[error("not a database (header mismatch)")]
    NotADatabase,

    /// Structural damage beyond a repairable trailing truncation.
    #[error("corrupt record at line {line} near {snippet:?}")]
    Corrupt { line: u64, snippet: String },
}

/// What a full scan of the file concluded.
enum Scan {
    /// Every record parsed; `missing_lf` flags a header-only file that
    /// still needs its terminating newline.
    Clean { missing_lf: bool },
    /// A torn tail starts after the newline at `pos`.
    Repair { pos: u64 },
}

/// An open journal, positioned for appending.
///
/// Records are serialized into a reusable scratch buffer and written with a
/// single `write_all`. With `sync` enabled every append is followed by
/// `sync_all()` so the record is on disk before the call returns.
#[derive(Debug)]
pub struct Journal {
    file: File,
    sync: bool,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl Journal {
    /// Creates a fresh journal at `path`, truncating anything already there,
    /// and writes the header.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, JournalError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(HEADER)?;
        file.flush()?;
        if sync {
            file.sync_all()?;
        }
        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Opens an existing journal (creating it if absent), replaying every
    /// complete record through `apply` and repairing a torn tail.
    ///
    /// The returned journal is positioned so the next [`append`] lands right
    /// after the last complete record. Replay happens before the writer
    /// half exists, so nothing replayed can be re-logged.
    ///
    /// # Errors
    ///
    /// [`JournalError::Io`] if the file cannot be opened or read,
    /// [`JournalError::NotADatabase`] on a header mismatch, and
    /// [`JournalError::Corrupt`] on damage that is not a trailing
    /// truncation.
    ///
    /// [`append`]: Journal::append
    pub fn open<P, F>(path: P, sync: bool, mut apply: F) -> Result<Self, JournalError>
    where
        P: AsRef<Path>,
        F: FnMut(Record),
    {
        let path = path.as_ref();
        let mut file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::create(path, sync),
            Err(e) => return Err(e.into()),
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        match scan(&data, &mut apply)? {
            Scan::Clean { missing_lf } => {
                file.seek(SeekFrom::End(0))?;
                if missing_lf {
                    file.write_all(b"\n")?;
                    file.flush()?;
                    if sync {
                        file.sync_all()?;
                    }
                }
            }
            Scan::Repair { pos } => {
                warn!(
                    "journal {}: repairing torn record after offset {}",
                    path.display(),
                    pos
                );
                let mut fill = vec![b' '; data.len() - (pos as usize + 1)];
                fill.push(b'\n');
                file.seek(SeekFrom::Start(pos + 1))?;
                file.write_all(&fill)?;
                file.flush()?;
                if sync {
                    file.sync_all()?;
                }
                file.seek(SeekFrom::Start(pos + 1))?;
            }
        }

        Ok(Self {
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Serializes `record` and appends it at the current position.
    pub fn append(&mut self, record: &Record) -> Result<(), JournalError> {
        let (len, key): (i64, &[u8]) = match record {
            Record::Insert { key } => (key.len() as i64, key),
            Record::Remove { key } => (-(key.len() as i64), key),
        };
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(JournalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "journal record key must be 1..=512 bytes",
            )));
        }

        // Reuse the internal buffer — clear but keep the allocation.
        self.buf.clear();
        write!(&mut self.buf, "{}\t", len)?;
        self.buf.extend_from_slice(key);
        self.buf.push(b'\n');

        self.file.write_all(&self.buf)?;
        self.file.flush()?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Forces all buffered data to disk via `sync_all()`.
    ///
    /// Useful when `sync` is off and the caller wants a durability point.
    pub fn sync_to_disk(&mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Parses the whole file image, applying every complete record, and decides
/// how the on-disk tail should be treated.
fn scan<F: FnMut(Record)>(data: &[u8], apply: &mut F) -> Result<Scan, JournalError> {
    // A header-only file may have lost its newline; accept and mend it.
    if data == &HEADER[..HEADER.len() - 1] {
        return Ok(Scan::Clean { missing_lf: true });
    }
    if data.len() < HEADER.len() || &data[..HEADER.len()] != HEADER {
        return Err(JournalError::NotADatabase);
    }

    let end = data.len();
    // Start on the header's newline: `pos` always names the newline that
    // terminates the last complete line, and repair preserves it.
    let mut i = HEADER.len() - 1;
    let mut line = 2u64;
    let mut last_key: &[u8] = b"";

    loop {
        let mut pos = i;

        // Skip inter-record whitespace; a previously blanked repair region
        // reads as an empty line here.
        while i < end && matches!(data[i], b' ' | b'\n' | b'\r') {
            i += 1;
        }
        if i == end {
            return Ok(Scan::Clean { missing_lf: false });
        }
        // Keep `pos` on the newline nearest the upcoming record, so a
        // repair never re-blanks lines that already parsed.
        if i > pos && data[i - 1] == b'\n' {
            pos = i - 1;
        }

        // Signed decimal length.
        let neg = data[i] == b'-';
        if neg {
            i += 1;
        }
        let digits_start = i;
        let mut magnitude = 0u64;
        while i < end && data[i].is_ascii_digit() {
            magnitude = magnitude
                .saturating_mul(10)
                .saturating_add((data[i] - b'0') as u64);
            i += 1;
        }
        if i == digits_start || magnitude == 0 || magnitude > MAX_KEY_LEN as u64 {
            return tail_failure(pos, i, end, line, last_key);
        }

        // The single byte after the integer must be the tab delimiter.
        if i == end {
            return tail_failure(pos, i, end, line, last_key);
        }
        if data[i] != b'\t' {
            return tail_failure(pos, i + 1, end, line, last_key);
        }
        i += 1;

        // The key itself: exactly `magnitude` raw bytes.
        let klen = magnitude as usize;
        if end - i < klen {
            return tail_failure(pos, end, end, line, last_key);
        }
        let key = &data[i..i + klen];
        i += klen;

        apply(if neg {
            Record::Remove { key: key.to_vec() }
        } else {
            Record::Insert { key: key.to_vec() }
        });
        last_key = key;
        line += 1;
        // The record's own newline is consumed by the next iteration's
        // whitespace skip, keeping `pos` on it.
    }
}

/// A record failed to parse: a short read at end-of-file within one
/// record's worth of bytes is a torn append and repairable; anything else
/// is corruption.
fn tail_failure(
    pos: usize,
    cur: usize,
    end: usize,
    line: u64,
    last_key: &[u8],
) -> Result<Scan, JournalError> {
    if cur >= end && (end - pos) as u64 <= MAX_PARTIAL_RECORD {
        return Ok(Scan::Repair { pos: pos as u64 });
    }
    let snippet = &last_key[..last_key.len().min(SNIPPET_LEN)];
    Err(JournalError::Corrupt {
        line,
        snippet: String::from_utf8_lossy(snippet).into_owned(),
    })
}
