//! Concurrent lifecycle events

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_introduction_creates_one_index() {
    let index = Arc::new(TestIndex::new());
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                index.manager.introduce_type(&station_type()).unwrap();
                index.manager.type_index("Station").unwrap()
            })
        })
        .collect();
    let indexes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for other in &indexes[1..] {
        assert!(Arc::ptr_eq(&indexes[0], other));
    }
    assert_eq!(index.manager.introduced_types(), vec!["Station"]);
}

#[test]
fn concurrent_inserts_flush_per_threshold() {
    let index = Arc::new(
        TestIndex::with(&[("storage.max-uncommitted-changes", "10")]).with_stations(),
    );
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..25 {
                    let uid = format!("t{}-{}", t, i);
                    let point = Shape::point(t as f64, i as f64);
                    index.manager.insert_entry(&station(&uid, 1, point), false).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let type_index = index.manager.type_index("Station").unwrap();
    assert_eq!(type_index.flush_count(), 10);
    assert_eq!(type_index.uncommitted_changes(), 0);
    let all = index.scan("INTERSECTS", Shape::rectangle(-1.0, 5.0, -1.0, 30.0));
    assert_eq!(all.len(), 100);
}

#[test]
fn types_are_independent() {
    let index = Arc::new(TestIndex::in_memory());
    let handles: Vec<_> = ["North", "South", "East"]
        .into_iter()
        .enumerate()
        .map(|(n, name)| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let descriptor = TypeDescriptor::builder(name).spatial_index("location").build();
                index.manager.introduce_type(&descriptor).unwrap();
                for i in 0..20 {
                    let entry = SpaceEntry::new(name, format!("{}-{}", name, i), 1)
                        .with_property("location", Shape::point(n as f64 * 10.0, i as f64));
                    index.manager.insert_entry(&entry, false).unwrap();
                }
                let everything = Value::from(Shape::rectangle(-1.0, 30.0, -1.0, 30.0));
                index
                    .manager
                    .scan_index(name, "location", "WITHIN", &everything)
                    .unwrap()
                    .len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 20);
    }
    assert_eq!(index.manager.introduced_types(), vec!["East", "North", "South"]);
}

#[test]
fn iterators_read_stable_snapshots() {
    let index = TestIndex::in_memory().with_stations();
    let area = Value::from(Shape::rectangle(-1.0, 1.0, -1.0, 1.0));
    index
        .manager
        .insert_entry(&station("a", 1, Shape::point(0.0, 0.0)), false)
        .unwrap();
    let mut before = index
        .manager
        .scan_index("Station", "location", "WITHIN", &area)
        .unwrap();

    index
        .manager
        .insert_entry(&station("b", 1, Shape::point(0.5, 0.5)), false)
        .unwrap();
    index.manager.remove_entry("Station", "a", 1).unwrap();

    assert_eq!(before.len(), 1);
    assert_eq!(before.next_uid().unwrap(), "a");
    assert!(!before.has_next());
    assert_eq!(index.scan("WITHIN", Shape::rectangle(-1.0, 1.0, -1.0, 1.0)), vec!["b"]);
}
