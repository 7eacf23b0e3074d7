/// Write path: `put()`, `remove()`, `remove_matching()`, `clear()`, and
/// `optimize()`.
///
/// All mutations flow through this module. Each change is applied to the
/// in-memory tree first and then appended to the journal, so a `true`
/// result means the change is both visible and durable. A failed append
/// wedges the handle: memory is ahead of disk and nothing can repair that
/// in place, so later mutations are refused while reads keep working.
use anyhow::{ensure, Context, Result};
use journal::{Journal, Record};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

use crate::{recovery, Engine};

impl Engine {
    /// Adds `key` to the set. Returns `Ok(true)` iff the set changed.
    ///
    /// Empty or oversize keys (beyond [`MAX_KEY_LEN`]) change nothing and
    /// return `Ok(false)`.
    ///
    /// [`MAX_KEY_LEN`]: crate::MAX_KEY_LEN
    pub fn put(&mut self, key: &[u8]) -> Result<bool> {
        self.check_writable()?;
        if !self.tst.insert(key) {
            return Ok(false);
        }
        self.log(Record::insert(key))?;
        Ok(true)
    }

    /// Tombstones `key`. Returns `Ok(true)` iff the set changed.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool> {
        self.check_writable()?;
        if !self.tst.remove(key) {
            return Ok(false);
        }
        self.log(Record::remove(key))?;
        Ok(true)
    }

    /// Tombstones every key matching the wildcard `pattern`, returning how
    /// many were removed.
    ///
    /// Matches are collected first and then removed through the normal
    /// logged path, so only terminal flags flip and the traversal never
    /// races a structural change.
    pub fn remove_matching(&mut self, pattern: &[u8]) -> Result<usize> {
        self.check_writable()?;
        let mut matched = Vec::new();
        self.tst.search(pattern, |key| matched.push(key.to_vec()));

        let mut removed = 0;
        for key in &matched {
            // Multi-wildcard patterns may list a key once per alignment;
            // the second removal is a no-op.
            if self.tst.remove(key) {
                self.log(Record::remove(key))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Empties the set. In persistent mode the journal file is deleted and
    /// recreated with a fresh header.
    pub fn clear(&mut self) -> Result<()> {
        self.check_writable()?;
        self.tst.clear();

        if let Some(path) = self.path.clone() {
            self.journal = None; // release the handle before unlinking
            match reset_journal(&path, self.sync) {
                Ok(journal) => self.journal = Some(journal),
                Err(e) => {
                    self.write_failed = true;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Shuffle-rebuild: re-inserts every key in random order to even out
    /// the low/high branching that skewed insertion orders produce.
    ///
    /// The key set, `key_count`, and `node_count` are all preserved; only
    /// the tree shape (and so [`Engine::state`]) changes. In persistent
    /// mode the journal is rotated around the rebuild: the old file
    /// survives as `<path>.tmp` until every key has been re-logged.
    pub fn optimize<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        self.check_writable()?;

        let mut keys = Vec::with_capacity(self.tst.key_count());
        self.tst.keys(false, |key| keys.push(key.to_vec()));
        keys.shuffle(rng);

        if let Some(path) = self.path.clone() {
            if let Err(e) = self.rebuild_persistent(&path, &keys) {
                self.write_failed = true;
                self.journal = None;
                return Err(e);
            }
        } else {
            self.tst.clear();
            for key in &keys {
                self.tst.insert(key);
            }
        }
        debug!(
            "optimize: {} keys reinserted, balance {:.3}",
            keys.len(),
            self.state()
        );
        Ok(())
    }

    fn rebuild_persistent(&mut self, path: &Path, keys: &[Vec<u8>]) -> Result<()> {
        let tmp = recovery::rotation_tmp_path(path);

        self.journal = None; // close before the rename
        std::fs::rename(path, &tmp)
            .with_context(|| format!("failed to rotate journal to {}", tmp.display()))?;

        self.tst.clear();
        self.journal = Some(Journal::create(path, self.sync)?);
        for key in keys {
            self.tst.insert(key);
            self.log(Record::insert(key))?;
        }

        std::fs::remove_file(&tmp)
            .with_context(|| format!("failed to remove {}", tmp.display()))?;
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        ensure!(
            !self.write_failed,
            "store is read-only after a journal write failure"
        );
        Ok(())
    }

    /// Appends one record for a change that is already visible in memory.
    fn log(&mut self, record: Record) -> Result<()> {
        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = journal.append(&record) {
                self.write_failed = true;
                self.journal = None;
                return Err(anyhow::Error::new(e)
                    .context("journal append failed; store is now read-only"));
            }
        }
        Ok(())
    }
}

/// Deletes and recreates the journal file with a fresh header.
fn reset_journal(path: &Path, sync: bool) -> Result<Journal> {
    std::fs::remove_file(path)
        .with_context(|| format!("failed to remove {}", path.display()))?;
    Ok(Journal::create(path, sync)?)
}
