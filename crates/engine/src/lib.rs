//! # Engine - TernDB key-set store
//!
//! The central orchestrator tying the [`tst`] and [`journal`] crates into a
//! persistent ordered set of byte strings.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → TST mutation → journal append      │
//! │              (change visible, then durable)   │
//! │                                               │
//! │ read.rs  → contains / keys / search / dump    │
//! │              (arena-backed TST, in memory)    │
//! │                                               │
//! │ recovery.rs → rotation restore → replay       │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                                   |
//! |--------------|-----------------------------------------------------------|
//! | [`lib.rs`]   | `Engine` struct, constructors, accessors, `Debug`, `Drop` |
//! | [`recovery`] | interrupted-rotation restore, journal replay              |
//! | [`write`]    | `put()`, `remove()`, `remove_matching()`, `clear()`, `optimize()` |
//! | [`read`]     | `contains()`, `keys()`, `search()`, `dump()`              |
//!
//! ## Crash Safety
//!
//! Every accepted mutation is applied to the in-memory tree and then
//! appended to the journal before the call returns, so a `true` result
//! implies the change is durable (modulo the `sync` flag). `optimize`
//! rotates the journal atomically: the old file survives as `<path>.tmp`
//! until every key has been re-logged, and an interrupted rotation is
//! rolled back on the next open.
//!
//! ## Ownership
//!
//! An `Engine` exclusively owns its journal file. Two engines opened on the
//! same path produce undefined behaviour; nothing detects or prevents it.
mod read;
mod recovery;
mod write;

use anyhow::Result;
use journal::Journal;
use log::info;
use std::path::{Path, PathBuf};
use tst::Tst;

pub use tst::{MAX_KEY_LEN, WILDCARD};

/// Default byte delimiting key segments for wildcard projections.
pub const DEFAULT_SEPARATOR: u8 = b'/';

/// A persistent ordered key set over an arena-backed ternary search tree.
///
/// # Write Path
///
/// 1. Apply the mutation to the in-memory TST.
/// 2. If the set changed, append one journal record and flush.
/// 3. Return whether the set changed.
///
/// # Read Path
///
/// All reads are answered from the in-memory tree; the journal is only
/// touched by mutations and recovery.
///
/// # Recovery
///
/// [`Engine::open`] first rolls back a rotation interrupted by a crash,
/// then replays the journal into a fresh tree. Replay runs before the
/// journal's writer half exists, so replayed mutations cannot be
/// re-logged.
pub struct Engine {
    pub(crate) tst: Tst,
    /// `None` for an ephemeral store, or after a write failure wedged the
    /// handle.
    pub(crate) journal: Option<Journal>,
    pub(crate) path: Option<PathBuf>,
    pub(crate) sync: bool,
    pub(crate) separator: u8,
    /// Set when a journal append fails: memory is ahead of disk from that
    /// point, so every later mutation is refused. Reads keep working.
    pub(crate) write_failed: bool,
}

impl Engine {
    /// Opens a persistent store at `path`, creating the journal if absent
    /// and replaying it otherwise.
    ///
    /// # Arguments
    ///
    /// * `path` — journal file path.
    /// * `sync` — if `true`, every append is followed by `fsync`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened, when its header is not a
    /// journal header, or when it is corrupt beyond a repairable trailing
    /// truncation.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        recovery::restore_interrupted_rotation(&path)?;

        let mut tst = Tst::new();
        let journal = recovery::replay_journal_and_build(&path, sync, &mut tst)?;
        info!(
            "opened {} ({} keys, {} nodes)",
            path.display(),
            tst.key_count(),
            tst.node_count()
        );

        Ok(Self {
            tst,
            journal: Some(journal),
            path: Some(path),
            sync,
            separator: DEFAULT_SEPARATOR,
            write_failed: false,
        })
    }

    /// Creates an ephemeral store with no backing file. Same semantics as a
    /// persistent store, minus durability.
    pub fn in_memory() -> Self {
        Self {
            tst: Tst::new(),
            journal: None,
            path: None,
            sync: false,
            separator: DEFAULT_SEPARATOR,
            write_failed: false,
        }
    }

    /// Flushes and releases the journal.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut journal) = self.journal.take() {
            journal.sync_to_disk()?;
        }
        Ok(())
    }

    /// Number of live keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.tst.key_count()
    }

    /// Number of node slots in use, sentinel included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tst.node_count()
    }

    /// Advisory balance estimate in `[0, 1]`; see [`Tst::balance`].
    #[must_use]
    pub fn state(&self) -> f64 {
        self.tst.balance()
    }

    /// The current segment separator byte.
    #[must_use]
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// Replaces the separator used by [`Engine::search`] segment
    /// projections.
    pub fn set_separator(&mut self, separator: u8) {
        self.separator = separator;
    }

    /// The journal path, or `None` for an ephemeral store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("key_count", &self.tst.key_count())
            .field("node_count", &self.tst.node_count())
            .field("path", &self.path)
            .field("sync", &self.sync)
            .field("separator", &self.separator)
            .field("write_failed", &self.write_failed)
            .finish()
    }
}

/// Best-effort sync on drop.
///
/// Appends are flushed as they happen, so this only matters for stores
/// opened with `sync` off. Errors are ignored because Drop cannot
/// propagate them; use [`Engine::close`] to observe them.
impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(journal) = self.journal.as_mut() {
            let _ = journal.sync_to_disk();
        }
    }
}

#[cfg(test)]
mod tests;
