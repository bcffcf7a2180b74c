//! Index scenario tests.
//!
//! End-to-end behavior of `BTreeIndex`: file lifecycle, the split and
//! merge scenarios, typed keys, and failure handling.

use rowindexdb::buffer::replacer::ReplacementPolicy;
use rowindexdb::common::config::{DuplicatePolicy, IndexOptions};
use rowindexdb::index::{BTreeIndex, Key, KeyType, RowLocator};
use rowindexdb::storage::page::Page;
use rowindexdb::storage::DiskManager;
use rowindexdb::{Error, PageId};
use tempfile::{tempdir, TempDir};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn create_index(key_type: KeyType, fanout: usize) -> (BTreeIndex, TempDir) {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.idx");
    BTreeIndex::create(&path, key_type, fanout).unwrap();
    (BTreeIndex::open(&path).unwrap(), dir)
}

fn loc(k: i32) -> RowLocator {
    RowLocator::new(k as u32, k as u32 % 7)
}

fn scan_ints(index: &BTreeIndex) -> Vec<i32> {
    index
        .open_scan()
        .map(|entry| match entry.unwrap().0 {
            Key::Int(v) => *v,
            other => panic!("unexpected key {}", other),
        })
        .collect()
}

// ============================================================================
// Split / merge scenarios
// ============================================================================

#[test]
fn test_split_trigger() {
    let (mut index, _dir) = create_index(KeyType::Int, 3);

    index.insert(Key::Int(10), loc(10)).unwrap();
    index.insert(Key::Int(20), loc(20)).unwrap();
    assert_eq!(index.node_count(), 1);
    assert_eq!(index.height().unwrap(), 1);

    index.insert(Key::Int(30), loc(30)).unwrap();
    // One split: two leaves and a new root.
    assert_eq!(index.node_count(), 3);
    assert_eq!(index.height().unwrap(), 2);
    assert_eq!(scan_ints(&index), [10, 20, 30]);
    index.check_invariants().unwrap();
}

#[test]
fn test_scenario_scan_order() {
    let (mut index, _dir) = create_index(KeyType::Int, 3);
    for k in [10, 20, 5, 6, 12, 30, 7, 17] {
        index.insert(Key::Int(k), loc(k)).unwrap();
        index.check_invariants().unwrap();
    }

    assert_eq!(index.entry_count(), 8);
    assert_eq!(scan_ints(&index), [5, 6, 7, 10, 12, 17, 20, 30]);

    let mut scan = index.open_scan();
    let mut locators = Vec::new();
    loop {
        match scan.next_locator() {
            Ok(l) => locators.push(l),
            Err(Error::NoMoreEntries) => break,
            Err(e) => panic!("scan failed: {}", e),
        }
    }
    scan.close();
    let expected: Vec<RowLocator> = [5, 6, 7, 10, 12, 17, 20, 30].into_iter().map(loc).collect();
    assert_eq!(locators, expected);
}

#[test]
fn test_merge_down_to_single_leaf() {
    let keys = [5, 6, 7, 10, 12, 17, 20, 30];
    let (mut index, _dir) = create_index(KeyType::Int, 3);
    for k in keys {
        index.insert(Key::Int(k), loc(k)).unwrap();
    }
    assert!(index.height().unwrap() > 1);

    for k in keys.into_iter().filter(|&k| k != 12) {
        assert_eq!(index.delete(&Key::Int(k)).unwrap(), loc(k));
        index.check_invariants().unwrap();
    }

    assert_eq!(index.entry_count(), 1);
    assert_eq!(index.node_count(), 1);
    assert_eq!(index.height().unwrap(), 1);
    assert_eq!(index.dump_tree().unwrap(), "(0)[12.5,12]\n");
    assert_eq!(index.find(&Key::Int(12)).unwrap(), loc(12));
}

#[test]
fn test_delete_missing_and_empty() {
    let (mut index, _dir) = create_index(KeyType::Int, 4);
    assert!(matches!(index.find(&Key::Int(1)), Err(Error::EmptyTree)));
    assert!(matches!(index.delete(&Key::Int(1)), Err(Error::EmptyTree)));

    index.insert(Key::Int(1), loc(1)).unwrap();
    assert!(matches!(index.delete(&Key::Int(2)), Err(Error::KeyNotFound)));
    index.delete(&Key::Int(1)).unwrap();
    assert_eq!(index.node_count(), 0);
    assert!(matches!(
        index.open_scan().next_entry(),
        Err(Error::NoMoreEntries)
    ));
}

#[test]
fn test_interleaved_workload_large_fanout() {
    let (mut index, _dir) = create_index(KeyType::Int, 7);
    // Deterministic shuffle of 0..500.
    let keys: Vec<i32> = (0..500).map(|i| (i * 173) % 500).collect();
    for &k in &keys {
        index.insert(Key::Int(k), loc(k)).unwrap();
    }
    index.check_invariants().unwrap();
    assert_eq!(scan_ints(&index), (0..500).collect::<Vec<_>>());

    for &k in keys.iter().filter(|&&k| k % 3 != 0) {
        index.delete(&Key::Int(k)).unwrap();
    }
    index.check_invariants().unwrap();
    assert_eq!(
        scan_ints(&index),
        (0..500).filter(|k| k % 3 == 0).collect::<Vec<_>>()
    );
    for k in 0..500 {
        assert_eq!(index.contains(&Key::Int(k)).unwrap(), k % 3 == 0);
    }
}

// ============================================================================
// Key types
// ============================================================================

#[test]
fn test_string_keys() {
    let (mut index, _dir) = create_index(KeyType::String { max_len: 8 }, 3);
    for (i, word) in ["pear", "apple", "fig", "banana", "kiwi", "Zebra"].iter().enumerate() {
        index.insert(Key::from(*word), RowLocator::new(1, i as u32)).unwrap();
    }

    let words: Vec<String> = index
        .open_scan()
        .map(|e| e.unwrap().0.to_string())
        .collect();
    // Bytewise: uppercase sorts before lowercase.
    assert_eq!(words, ["Zebra", "apple", "banana", "fig", "kiwi", "pear"]);
    assert_eq!(index.find(&Key::from("fig")).unwrap(), RowLocator::new(1, 2));

    assert!(matches!(
        index.insert(Key::from("watermelon"), RowLocator::new(1, 9)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        index.insert(Key::Int(3), RowLocator::new(1, 9)),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(index.entry_count(), 6);
}

#[test]
fn test_float_keys() {
    let (mut index, _dir) = create_index(KeyType::Float, 4);
    let values = [2.5, -1.0, 10.0, 0.0, 3.25, -20.75, 9.5];
    for (i, v) in values.iter().enumerate() {
        index.insert(Key::Float(*v), RowLocator::new(2, i as u32)).unwrap();
    }

    let scanned: Vec<f64> = index
        .open_scan()
        .map(|e| match e.unwrap().0 {
            Key::Float(v) => *v,
            other => panic!("unexpected key {}", other),
        })
        .collect();
    assert_eq!(scanned, [-20.75, -1.0, 0.0, 2.5, 3.25, 9.5, 10.0]);

    index.delete(&Key::Float(3.25)).unwrap();
    assert!(!index.contains(&Key::Float(3.25)).unwrap());
    index.check_invariants().unwrap();
}

#[test]
fn test_bool_keys_with_duplicates() {
    let (mut index, _dir) = create_index(KeyType::Bool, 3);
    for slot in 0..6 {
        index
            .insert(Key::Bool(slot % 2 == 0), RowLocator::new(0, slot))
            .unwrap();
    }

    assert_eq!(index.find_all(&Key::Bool(true)).unwrap().len(), 3);
    assert_eq!(index.find_all(&Key::Bool(false)).unwrap().len(), 3);
    let flags: Vec<String> = index
        .open_scan()
        .map(|e| e.unwrap().0.to_string())
        .collect();
    assert_eq!(flags, ["false", "false", "false", "true", "true", "true"]);

    // Removing one duplicate leaves the others findable.
    index.delete(&Key::Bool(true)).unwrap();
    assert!(index.contains(&Key::Bool(true)).unwrap());
    assert_eq!(index.find_all(&Key::Bool(true)).unwrap().len(), 2);
    index.check_invariants().unwrap();
}

// ============================================================================
// Persistence and options
// ============================================================================

#[test]
fn test_metadata_survives_reopen() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("meta.idx");

    BTreeIndex::create(&path, KeyType::String { max_len: 20 }, 9).unwrap();
    let mut index = BTreeIndex::open(&path).unwrap();
    index.insert(Key::from("k"), RowLocator::new(1, 1)).unwrap();
    index.close().unwrap();

    let index = BTreeIndex::open(&path).unwrap();
    assert_eq!(index.key_type(), KeyType::String { max_len: 20 });
    assert_eq!(index.fanout(), 9);
    // Only the header is persistent.
    assert_eq!(index.entry_count(), 0);
    index.close().unwrap();

    let disk = DiskManager::open(&path).unwrap();
    assert_eq!(disk.page_count(), 1);
}

#[test]
fn test_corrupted_header_is_reported() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.idx");
    BTreeIndex::create(&path, KeyType::Int, 4).unwrap();

    {
        let mut disk = DiskManager::open(&path).unwrap();
        let mut page = disk.read_page(PageId::new(0)).unwrap();
        page.as_mut_slice()[10] ^= 0xFF;
        disk.write_page(PageId::new(0), &page).unwrap();
        disk.close().unwrap();
    }

    assert!(matches!(
        BTreeIndex::open(&path),
        Err(Error::CorruptedPage { page_id: 0, .. })
    ));

    // A zeroed first page is not an index header either.
    let path = dir.path().join("zero.idx");
    let mut disk = DiskManager::create(&path).unwrap();
    disk.ensure_capacity(1).unwrap();
    disk.write_page(PageId::new(0), &Page::new()).unwrap();
    disk.close().unwrap();
    assert!(matches!(
        BTreeIndex::open(&path),
        Err(Error::CorruptedPage { .. })
    ));
}

#[test]
fn test_indexes_are_independent() {
    let (mut a, _dir_a) = create_index(KeyType::Int, 3);
    let (mut b, _dir_b) = create_index(KeyType::Int, 5);

    for k in 0..20 {
        a.insert(Key::Int(k), loc(k)).unwrap();
    }
    b.insert(Key::Int(100), loc(100)).unwrap();

    assert_eq!(a.entry_count(), 20);
    assert_eq!(b.entry_count(), 1);
    assert!(!b.contains(&Key::Int(5)).unwrap());
    assert!(!a.contains(&Key::Int(100)).unwrap());
    a.close().unwrap();
    b.close().unwrap();
}

#[test]
fn test_open_with_options() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("opts.idx");
    BTreeIndex::create_with_policy(&path, KeyType::Int, 3, DuplicatePolicy::Reject).unwrap();

    let options = IndexOptions::default()
        .with_pool_size(2)
        .with_replacement(ReplacementPolicy::LruK(3));
    let mut index = BTreeIndex::open_with_options(&path, &options).unwrap();

    assert_eq!(index.buffer_pool().pool_size(), 2);
    assert_eq!(index.buffer_pool().policy(), ReplacementPolicy::LruK(3));
    assert_eq!(index.tree().duplicate_policy(), DuplicatePolicy::Reject);

    index.insert(Key::Int(1), loc(1)).unwrap();
    assert!(matches!(
        index.insert(Key::Int(1), loc(1)),
        Err(Error::InvalidArgument(_))
    ));
    index.close().unwrap();
}

#[test]
fn test_node_budget_failure_keeps_tree_valid() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("budget.idx");
    BTreeIndex::create(&path, KeyType::Int, 3).unwrap();
    let options = IndexOptions::default().with_max_nodes(6);
    let mut index = BTreeIndex::open_with_options(&path, &options).unwrap();

    let mut inserted = Vec::new();
    for k in 0..100 {
        match index.insert(Key::Int(k), loc(k)) {
            Ok(()) => inserted.push(k),
            Err(Error::AllocationFailure(_)) => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert!(index.node_count() <= 6);
    assert_eq!(index.entry_count(), inserted.len());
    index.check_invariants().unwrap();
    assert_eq!(scan_ints(&index), inserted);
}
