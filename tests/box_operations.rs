//! Box read/write operation tests
//!
//! Every call opens its own transaction, so these exercise the full
//! resolve-then-operate path against a real store file.

use nestbox::{KeyBox, NestboxError, Store};
use tempfile::TempDir;

fn temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(temp_dir.path().join("boxes.nbox")).unwrap();
    (temp_dir, store)
}

#[test]
fn test_put_get_delete() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "basic");

    b.put("k1", "v1").unwrap();
    assert_eq!(b.get("k1"), Some(b"v1".to_vec()));

    // Overwrite replaces the value
    b.put("k1", "v2").unwrap();
    assert_eq!(b.get("k1"), Some(b"v2".to_vec()));

    b.delete("k1").unwrap();
    assert_eq!(b.get("k1"), None);

    // Deleting an absent key is fine
    b.delete("k1").unwrap();
    b.delete("never-there").unwrap();
}

#[test]
fn test_empty_value_is_distinct_from_absent() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "empty");

    b.put("blank", "").unwrap();
    assert_eq!(b.get("blank"), Some(Vec::new()));
    assert_eq!(b.get("missing"), None);
}

#[test]
fn test_delete_returning() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "returning");

    assert_eq!(b.delete_returning("help").unwrap(), None);

    b.put("help", "no").unwrap();
    assert_eq!(b.delete_returning("help").unwrap(), Some(b"no".to_vec()));
    assert_eq!(b.get("help"), None);
    assert_eq!(b.delete_returning("help").unwrap(), None);
}

#[test]
fn test_get_all_in_key_order() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "ordered");

    b.put("c", "3").unwrap();
    b.put("a", "1").unwrap();
    b.put("b", "2").unwrap();

    assert_eq!(
        b.get_all(),
        vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]
    );
    assert_eq!(
        b.get_all_entries(),
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );
}

#[test]
fn test_byte_order_not_numeric_order() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "bytes");

    b.put("10", "ten").unwrap();
    b.put("9", "nine").unwrap();
    b.put("1", "one").unwrap();

    assert_eq!(
        b.get_all(),
        vec![b"one".to_vec(), b"ten".to_vec(), b"nine".to_vec()]
    );
}

#[test]
fn test_prefix_scan() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "prefix");

    assert!(b.prefix_scan("prefix").is_empty());

    b.put("prefix1.a", "x").unwrap();
    b.put("prefix2.a", "y").unwrap();

    let cases: Vec<(&str, Vec<&str>)> = vec![
        ("prefix1", vec!["x"]),
        ("prefix2", vec!["y"]),
        ("prefix", vec!["x", "y"]),
        ("prefix3", vec![]),
        ("p", vec!["x", "y"]),
        ("prefix1.a", vec!["x"]),
        ("prefix1.ab", vec![]),
        ("q", vec![]),
    ];

    for (prefix, expected) in cases {
        let expected: Vec<Vec<u8>> = expected
            .into_iter()
            .map(|v| v.as_bytes().to_vec())
            .collect();
        assert_eq!(b.prefix_scan(prefix), expected, "prefix {:?}", prefix);
    }
}

#[test]
fn test_prefix_scan_stops_at_first_mismatch() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "stop");

    b.put_many(vec![
        ("aa", "1"),
        ("ab", "2"),
        ("b", "3"),
        ("ba", "4"),
    ])
    .unwrap();

    assert_eq!(b.prefix_scan("a"), vec![b"1".to_vec(), b"2".to_vec()]);
    assert_eq!(b.prefix_scan("b"), vec![b"3".to_vec(), b"4".to_vec()]);
}

#[test]
fn test_next_sequence() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "seq");

    for expected in 1..=5u64 {
        assert_eq!(b.next_sequence().unwrap(), expected);
    }

    // Each namespace has its own counter
    let other = KeyBox::new(&store, "seq-other");
    assert_eq!(other.next_sequence().unwrap(), 1);
}

#[test]
fn test_set_sequence() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "seq-set");

    b.set_sequence(100).unwrap();
    assert_eq!(b.next_sequence().unwrap(), 101);
}

#[test]
fn test_sequence_overflow() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "seq-max");

    b.set_sequence(u64::MAX).unwrap();
    assert!(matches!(
        b.next_sequence(),
        Err(NestboxError::SequenceOverflow)
    ));
}

#[test]
fn test_put_many_is_all_or_nothing() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "batch");

    let result = b.put_many(vec![("ok", "1"), ("", "bad")]);
    assert!(matches!(result, Err(NestboxError::KeyRequired)));
    assert_eq!(b.get("ok"), None);
    assert!(!b.exists());
}

#[test]
fn test_invalid_keys_rejected() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "invalid");

    assert!(matches!(b.put("", "v"), Err(NestboxError::KeyRequired)));

    let huge_key = vec![b'k'; nestbox::validation::MAX_KEY_SIZE + 1];
    assert!(matches!(
        b.put(&huge_key, "v"),
        Err(NestboxError::KeyTooLarge { .. })
    ));
}

#[test]
fn test_empty_box_name_rejected() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "");

    assert!(matches!(b.put("k", "v"), Err(NestboxError::NameRequired)));
    assert_eq!(b.get("k"), None);
}

#[test]
fn test_scoped_update_sees_own_writes() {
    let (_dir, store) = temp_store();
    let b = KeyBox::new(&store, "scoped");

    let count = b
        .update(|tx| {
            tx.put("a", "1")?;
            tx.put("b", "2")?;
            let seq = tx.next_sequence()?;
            assert_eq!(tx.get("a"), Some(b"1".to_vec()));
            Ok(tx.get_all().len() as u64 + seq)
        })
        .unwrap();

    assert_eq!(count, 3);
    assert_eq!(b.view(|v| Ok(v.sequence())).unwrap(), 1);
    assert_eq!(b.view(|v| Ok(v.len())).unwrap(), 2);
}

#[test]
fn test_store_stats_track_boxes() {
    let (_dir, store) = temp_store();
    let a = KeyBox::new(&store, "a");
    let b = a.nested("b");

    a.put("k1", "v1").unwrap();
    b.put("k2", "v2").unwrap();
    b.put("k3", "v3").unwrap();

    let stats = store.stats();
    assert_eq!(stats.namespaces, 2);
    assert_eq!(stats.keys, 3);
    assert_eq!(stats.commit_id, 3);
    assert_eq!(store.namespaces(), vec![b"a".to_vec()]);
}
