use logring::fs::StdFs;
use logring::{LogRing, RingConfig};

fn ring(dir: &std::path::Path, capacity: usize) -> LogRing<StdFs> {
    let fs = StdFs::new(dir);
    LogRing::open(fs, RingConfig::new("a.log", b'd').with_capacity(capacity)).unwrap()
}

#[test]
fn test_fifo_ordering_insert_then_pop() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = ring(dir.path(), 100);

    const N: usize = 50;
    for _ in 0..N {
        r.insert(None).unwrap();
    }

    let mut popped = 0;
    while let Some(_name) = r.pop().unwrap() {
        popped += 1;
    }
    assert_eq!(popped, N);
    assert_eq!(r.pop().unwrap(), None);
}

#[test]
fn test_interleaved_insert_and_pop_preserves_order() {
    let dir = tempfile::tempdir().unwrap();
    // Capacity must stay above the live-entry high-water mark (inserts minus
    // pops) across the whole run, or the overwrite policy silently evicts
    // entries this test's `live` counter doesn't know about.
    let mut r = ring(dir.path(), 250);

    let mut live = 0usize;
    for round in 0..200 {
        r.insert(None).unwrap();
        live += 1;
        if round % 3 == 0 {
            assert!(r.pop().unwrap().is_some());
            live -= 1;
        }
    }

    let mut drained = 0;
    while r.pop().unwrap().is_some() {
        drained += 1;
    }
    assert_eq!(drained, live);
}

#[test]
fn test_wrap_around_keeps_exactly_capacity_live_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = ring(dir.path(), 16);

    const N: usize = 10_000;
    for _ in 0..N {
        r.insert(None).unwrap();
    }

    let log_files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .collect();
    assert_eq!(log_files.len(), 16);

    let mut received = 0;
    while r.pop().unwrap().is_some() {
        received += 1;
    }
    assert_eq!(received, 16);
}

#[test]
fn test_untracked_names_are_unique_across_many_pops() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = ring(dir.path(), 8);

    let mut seen = std::collections::HashSet::new();
    for _ in 0..500 {
        r.insert(None).unwrap();
        let name = r.pop().unwrap().unwrap();
        assert!(name.ends_with(".bin"));
        assert!(seen.insert(name), "untracked name reused");
    }
}

#[test]
fn test_async_deletion_of_every_entry_yields_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = ring(dir.path(), 10);

    for _ in 0..5 {
        r.insert(None).unwrap();
    }

    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let entry = entry.unwrap();
        if entry.path().extension().is_some_and(|ext| ext == "log") {
            std::fs::remove_file(entry.path()).unwrap();
        }
    }

    assert_eq!(r.pop().unwrap(), None);
    assert!(r.peek_tail().unwrap().is_none());

    // A fresh insert after total external deletion behaves like a clean ring.
    r.insert(None).unwrap();
    assert!(r.pop().unwrap().is_some());
}

#[test]
fn test_capacity_one_overwrites_every_insert() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = ring(dir.path(), 1);

    for _ in 0..25 {
        r.insert(None).unwrap();
    }

    let log_files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .collect();
    assert_eq!(log_files.len(), 1);
}

#[test]
fn test_reopening_an_existing_ring_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut r = ring(dir.path(), 50);
        r.insert(None).unwrap();
        r.insert(None).unwrap();
    }

    let r = ring(dir.path(), 50);
    assert_eq!(r.head(), "002d0002.log");
    assert_eq!(r.tail(), "000d0000.log");
}
