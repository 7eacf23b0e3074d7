/// Journal replay and rotation-crash recovery.
///
/// This module handles the cold-start path: rolling back a rebuild that
/// died between renaming the journal aside and deleting the rename, then
/// replaying the journal into a fresh tree.
use anyhow::{Context, Result};
use journal::{Journal, Record};
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tst::Tst;

/// Replays the journal at `path` into `tst` (creating the file if absent)
/// and returns the writer half, positioned for appends.
///
/// The tree is mutated directly, not through the logged write path, so
/// replayed records are never logged again.
///
/// # Errors
///
/// Propagates any I/O, header, or corruption error from [`Journal::open`].
pub(crate) fn replay_journal_and_build<P: AsRef<Path>>(
    path: P,
    sync: bool,
    tst: &mut Tst,
) -> Result<Journal> {
    Journal::open(path.as_ref(), sync, |rec| match rec {
        Record::Insert { key } => {
            tst.insert(&key);
        }
        Record::Remove { key } => {
            tst.remove(&key);
        }
    })
    .map_err(|e| anyhow::anyhow!(e).context("failed to open journal for replay"))
}

/// The side file a rebuild rotates the journal into: `<path>.tmp`.
pub(crate) fn rotation_tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Rolls back an interrupted rebuild.
///
/// `optimize` renames the journal to `<path>.tmp` before rebuilding, and
/// deletes it only after every key has been re-logged. A leftover `.tmp`
/// therefore holds the complete pre-rebuild state, while the primary is
/// missing or a partial rebuild, so a `.tmp` with a valid header is
/// always restored over the primary. One with a damaged header is debris
/// and is removed.
pub(crate) fn restore_interrupted_rotation(path: &Path) -> Result<()> {
    let tmp = rotation_tmp_path(path);
    if !tmp.exists() {
        return Ok(());
    }

    if header_is_valid(&tmp)? {
        warn!(
            "restoring {} from rebuild left at {}",
            path.display(),
            tmp.display()
        );
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to drop partial rebuild {}", path.display()))?;
        }
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to restore {}", path.display()))?;
    } else {
        warn!("removing stale rebuild file {}", tmp.display());
        std::fs::remove_file(&tmp)
            .with_context(|| format!("failed to remove {}", tmp.display()))?;
    }
    Ok(())
}

/// True iff the file starts with the journal header (a bare header missing
/// its newline also counts, matching what replay accepts).
fn header_is_valid(path: &Path) -> Result<bool> {
    let file = File::open(path)
        .with_context(|| format!("failed to inspect {}", path.display()))?;
    let mut head = Vec::with_capacity(journal::HEADER.len());
    file.take(journal::HEADER.len() as u64)
        .read_to_end(&mut head)?;
    Ok(head == journal::HEADER || head == &journal::HEADER[..journal::HEADER.len() - 1])
}
