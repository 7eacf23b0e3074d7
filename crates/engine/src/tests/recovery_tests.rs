use crate::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

// --------------------- Persistence round-trip ---------------------

#[test]
fn reopen_replays_the_journal() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");

    // Write some data, then drop the engine (simulates a crash).
    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"a")?;
        engine.put(b"b")?;
        engine.remove(b"a")?;
    }

    let engine = Engine::open(&path, true)?;
    assert!(!engine.contains(b"a")); // tombstoned
    assert!(engine.contains(b"b"));
    assert_eq!(engine.key_count(), 1);
    Ok(())
}

#[test]
fn close_then_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");

    let mut engine = Engine::open(&path, false)?;
    engine.put(b"x")?;
    engine.close()?;

    let engine = Engine::open(&path, false)?;
    assert!(engine.contains(b"x"));
    Ok(())
}

#[test]
fn fresh_path_starts_empty() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path().join("new.db"), true)?;
    assert_eq!(engine.key_count(), 0);
    assert_eq!(engine.node_count(), 1);
    Ok(())
}

// --------------------- Tail repair ---------------------

#[test]
fn torn_tail_is_repaired_on_open() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");

    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"x")?;
    }

    // A record whose integer and tab made it to disk but whose key did
    // not: claims 42 bytes, carries three.
    let mut data = fs::read(&path)?;
    data.extend_from_slice(b"42\tzzz");
    fs::write(&path, &data)?;

    let engine = Engine::open(&path, true)?;
    assert!(engine.contains(b"x"));
    assert!(!engine.contains(b"zzz"));

    // The tail was rewritten to spaces plus a newline.
    let repaired = fs::read(&path)?;
    assert!(repaired.starts_with(b"TSTDB\n1\tx\n"));
    assert!(repaired.ends_with(b" \n"));
    Ok(())
}

#[test]
fn writes_resume_after_repair() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");

    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"keep")?;
    }
    let mut data = fs::read(&path)?;
    data.extend_from_slice(b"7\tban");
    fs::write(&path, &data)?;

    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"after")?;
    }

    let engine = Engine::open(&path, true)?;
    assert!(engine.contains(b"keep"));
    assert!(engine.contains(b"after"));
    assert_eq!(engine.key_count(), 2);
    Ok(())
}

// --------------------- Open failures ---------------------

#[test]
fn foreign_file_is_not_a_database() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("foreign.db");
    fs::write(&path, b"PNG\x0d\x0a\x1a\x0a")?;

    let err = Engine::open(&path, true).unwrap_err();
    assert!(err.root_cause().to_string().contains("not a database"));
    Ok(())
}

#[test]
fn mid_file_damage_is_corrupt() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");

    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"good")?;
        engine.put(b"tail")?;
    }
    let mut data = fs::read(&path)?;
    let off = b"TSTDB\n4\tgood\n".len();
    data[off] = b'!';
    fs::write(&path, &data)?;

    let err = Engine::open(&path, true).unwrap_err();
    let cause = err.root_cause().to_string();
    assert!(cause.contains("corrupt"), "unexpected error: {}", cause);
    assert!(cause.contains("good"));
    Ok(())
}

// --------------------- Interrupted rotation ---------------------

#[test]
fn rotation_tmp_is_restored_over_partial_primary() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");
    let tmp = dir.path().join("keys.db.tmp");

    // Full pre-rotation state.
    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"alpha")?;
        engine.put(b"beta")?;
        engine.put(b"gamma")?;
    }

    // Simulate a crash mid-rotation: journal renamed aside, primary
    // rebuilt only partially.
    fs::rename(&path, &tmp)?;
    fs::write(&path, b"TSTDB\n5\talpha\n")?;

    let engine = Engine::open(&path, true)?;
    assert_eq!(engine.key_count(), 3);
    assert!(engine.contains(b"beta"));
    assert!(!tmp.exists());
    Ok(())
}

#[test]
fn rotation_tmp_is_restored_when_primary_is_missing() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");
    let tmp = dir.path().join("keys.db.tmp");

    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"only")?;
    }
    fs::rename(&path, &tmp)?;

    let engine = Engine::open(&path, true)?;
    assert!(engine.contains(b"only"));
    assert!(!tmp.exists());
    Ok(())
}

#[test]
fn stale_tmp_with_bad_header_is_removed() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("keys.db");
    let tmp = dir.path().join("keys.db.tmp");

    {
        let mut engine = Engine::open(&path, true)?;
        engine.put(b"primary")?;
    }
    fs::write(&tmp, b"debris, not a journal")?;

    let engine = Engine::open(&path, true)?;
    assert!(engine.contains(b"primary"));
    assert!(!tmp.exists());
    Ok(())
}

// --------------------- Property: reopen preserves membership ---------------------

mod props {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn persistence_round_trip(
            inserts in prop::collection::btree_set("[a-f]{1,10}", 1..24),
            removes in prop::collection::btree_set("[a-f]{1,10}", 0..12),
        ) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("keys.db");

            let mut live: BTreeSet<Vec<u8>> = BTreeSet::new();
            {
                let mut engine = Engine::open(&path, false).unwrap();
                for k in &inserts {
                    engine.put(k.as_bytes()).unwrap();
                    live.insert(k.clone().into_bytes());
                }
                for k in &removes {
                    engine.remove(k.as_bytes()).unwrap();
                    live.remove(k.as_bytes());
                }
            }

            let engine = Engine::open(&path, false).unwrap();
            prop_assert_eq!(engine.key_count(), live.len());
            for k in inserts.iter().chain(removes.iter()) {
                prop_assert_eq!(engine.contains(k.as_bytes()), live.contains(k.as_bytes()));
            }
        }
    }
}
