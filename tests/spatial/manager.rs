//! Entry lifecycle and queries through the index manager

use crate::common::*;

fn around(x: f64, y: f64) -> Shape {
    Shape::rectangle(x - 0.5, x + 0.5, y - 0.5, y + 0.5)
}

// ============================================================================
// Commit threshold
// ============================================================================

#[test]
fn flushes_once_at_threshold() {
    let index = TestIndex::with(&[("storage.max-uncommitted-changes", "5")]).with_stations();
    let type_index = index.manager.type_index("Station").unwrap();

    for i in 0..4 {
        let entry = station(&format!("s{}", i), 1, Shape::point(i as f64, 0.0));
        index.manager.insert_entry(&entry, false).unwrap();
    }
    assert_eq!(type_index.flush_count(), 0);

    let entry = station("s4", 1, Shape::point(4.0, 0.0));
    index.manager.insert_entry(&entry, false).unwrap();
    assert_eq!(type_index.flush_count(), 1);
    assert_eq!(type_index.uncommitted_changes(), 0);
}

#[test]
fn scan_sees_unflushed_entries() {
    let index = TestIndex::new().with_stations();
    index
        .manager
        .insert_entry(&station("s1", 1, Shape::point(3.0, 4.0)), false)
        .unwrap();
    assert_eq!(index.scan("INTERSECTS", around(3.0, 4.0)), vec!["s1"]);
}

// ============================================================================
// Insert, update, remove
// ============================================================================

#[test]
fn update_replaces_previous_version() {
    let index = TestIndex::new().with_stations();
    let v1 = station("s1", 1, Shape::point(1.0, 1.0));
    assert!(index.manager.insert_entry(&v1, false).unwrap());
    assert_eq!(index.scan("WITHIN", around(1.0, 1.0)), vec!["s1"]);

    let v2 = station("s1", 2, Shape::point(50.0, 50.0));
    assert!(index.manager.insert_entry(&v2, true).unwrap());
    assert!(index.scan("WITHIN", around(1.0, 1.0)).is_empty());
    assert_eq!(index.scan("WITHIN", around(50.0, 50.0)), vec!["s1"]);
}

#[test]
fn remove_excludes_entry() {
    let index = TestIndex::new().with_stations();
    for (uid, x) in [("a", 10.0), ("b", 10.2)] {
        index
            .manager
            .insert_entry(&station(uid, 1, Shape::point(x, 10.0)), false)
            .unwrap();
    }
    assert_eq!(index.scan("WITHIN", around(10.0, 10.0)), vec!["a", "b"]);

    index.manager.remove_entry("Station", "a", 1).unwrap();
    assert_eq!(index.scan("WITHIN", around(10.0, 10.0)), vec!["b"]);
}

#[test]
fn remove_of_other_version_is_noop() {
    let index = TestIndex::in_memory().with_stations();
    index
        .manager
        .insert_entry(&station("a", 3, Shape::point(0.0, 0.0)), false)
        .unwrap();
    index.manager.remove_entry("Station", "a", 2).unwrap();
    assert_eq!(index.scan("INTERSECTS", around(0.0, 0.0)), vec!["a"]);
}

#[test]
fn entry_without_shapes_is_not_indexed() {
    let index = TestIndex::new().with_stations();
    let entry = SpaceEntry::new("Station", "s1", 1)
        .with_property("location", "52.5, 13.4")
        .with_property("name", "Alexanderplatz");
    assert!(!index.manager.insert_entry(&entry, false).unwrap());

    let type_index = index.manager.type_index("Station").unwrap();
    assert_eq!(type_index.uncommitted_changes(), 0);
    assert!(index
        .scan("INTERSECTS", Shape::rectangle(-180.0, 180.0, -90.0, 90.0))
        .is_empty());
}

#[test]
fn nested_path_is_indexed() {
    let index = TestIndex::in_memory();
    let descriptor = TypeDescriptor::builder("Shop")
        .spatial_index_at("address", "point")
        .build();
    index.manager.introduce_type(&descriptor).unwrap();

    let address: Value = [("point".to_string(), Value::from(Shape::point(5.0, 5.0)))]
        .into_iter()
        .collect::<std::collections::BTreeMap<_, _>>()
        .into();
    let entry = SpaceEntry::new("Shop", "shop-1", 1).with_property("address", address);
    assert!(index.manager.insert_entry(&entry, false).unwrap());

    let ids: Vec<String> = index
        .manager
        .scan_index("Shop", "address.point", "WITHIN", &Value::from(around(5.0, 5.0)))
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(ids, vec!["shop-1"]);
}

#[test]
fn invalid_shape_is_rejected() {
    let index = TestIndex::in_memory().with_stations();
    let entry = station("bad", 1, Shape::point(200.0, 0.0));
    assert!(matches!(
        index.manager.insert_entry(&entry, false),
        Err(SpatialError::InvalidShape(_))
    ));
}

#[test]
fn unknown_type() {
    let index = TestIndex::in_memory();
    let err = index
        .manager
        .insert_entry(&station("s1", 1, Shape::point(0.0, 0.0)), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "Type [Station] is not introduced to the spatial index");
}

// ============================================================================
// Strategies
// ============================================================================

fn strategy_scans(strategy: &str) {
    let index = TestIndex::with(&[("strategy", strategy)]).with_stations();
    let entries = [
        station("park", 1, Shape::rectangle(0.0, 2.0, 0.0, 2.0)),
        station("kiosk", 1, Shape::point(1.0, 1.0)),
        station("far", 1, Shape::point(40.0, 40.0)),
    ];
    for entry in &entries {
        index.manager.insert_entry(entry, false).unwrap();
    }

    let district = Shape::rectangle(-1.0, 3.0, -1.0, 3.0);
    assert_eq!(index.scan("WITHIN", district.clone()), vec!["kiosk", "park"]);
    assert_eq!(index.scan("INTERSECTS", district), vec!["kiosk", "park"]);
    assert_eq!(index.scan("CONTAINS", Shape::point(0.5, 1.5)), vec!["park"]);
    assert_eq!(index.scan("intersects", around(40.0, 40.0)), vec!["far"]);
}

#[test]
fn recursive_prefix_tree_scans() {
    strategy_scans("RecursivePrefixTree");
}

#[test]
fn bbox_scans() {
    strategy_scans("BBox");
}

#[test]
fn composite_scans() {
    strategy_scans("Composite");
}

#[test]
fn quad_tree_scans() {
    let index = TestIndex::with(&[
        ("strategy.spatial-prefix-tree", "QuadPrefixTree"),
        ("strategy.spatial-prefix-tree.max-levels", "16"),
    ])
    .with_stations();
    index
        .manager
        .insert_entry(&station("q", 1, Shape::point(-20.0, 30.0)), false)
        .unwrap();
    assert_eq!(index.scan("WITHIN", around(-20.0, 30.0)), vec!["q"]);
    assert!(index.scan("WITHIN", around(20.0, 30.0)).is_empty());
}

// ============================================================================
// Filter
// ============================================================================

#[test]
fn filter_point_in_unit_square() {
    let index = TestIndex::in_memory();
    let point = Value::from(Shape::point(0.5, 0.5));
    let square = Value::from(Shape::rectangle(0.0, 1.0, 0.0, 1.0));

    assert!(index.manager.filter("WITHIN", &point, &square).unwrap());
    assert!(!index.manager.filter("CONTAINS", &point, &square).unwrap());
    assert!(index.manager.filter("CONTAINS", &square, &point).unwrap());
    assert!(index.manager.filter("INTERSECTS", &point, &square).unwrap());

    let outside = Value::from(Shape::point(1.5, 0.5));
    assert!(!index.manager.filter("INTERSECTS", &outside, &square).unwrap());
}

#[test]
fn filter_rejects_non_shapes_and_unknown_operations() {
    let index = TestIndex::in_memory();
    let square = Value::from(Shape::rectangle(0.0, 1.0, 0.0, 1.0));
    assert!(matches!(
        index.manager.filter("WITHIN", &Value::from("POINT(0 0)"), &square),
        Err(SpatialError::InvalidArgument(_))
    ));
    let err = index.manager.filter("DISJOINT", &square, &square).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operation DISJOINT not found - supported operations: [WITHIN, CONTAINS, INTERSECTS]"
    );
}

// ============================================================================
// Storage footprint and covering cost
// ============================================================================

fn segment_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".sps"))
        .count()
}

#[test]
fn repeated_updates_keep_segment_files_bounded() {
    let index = TestIndex::new().with_stations();
    let entries = index.root().join("Station").join("entries");
    for version in 1..=50u64 {
        let x = version as f64 / 10.0;
        let entry = station("s1", version, Shape::point(x, 0.0));
        index.manager.insert_entry(&entry, true).unwrap();
        assert_eq!(index.scan("INTERSECTS", around(x, 0.0)), vec!["s1"]);
        assert!(segment_files(&entries) <= 2, "version {}", version);
    }

    let type_index = index.manager.type_index("Station").unwrap();
    let reader = spatia::storage::IndexReader::open(type_index.directory()).unwrap();
    assert_eq!(reader.num_docs(), 1);
    assert_eq!(reader.segment_count(), 1);
}

#[test]
fn many_small_commits_are_merged() {
    let index = TestIndex::new().with_stations();
    let entries = index.root().join("Station").join("entries");
    for i in 0..40 {
        let entry = station(&format!("s{:02}", i), 1, Shape::point(i as f64, 1.0));
        index.manager.insert_entry(&entry, false).unwrap();
        index.scan("INTERSECTS", around(i as f64, 1.0));
        assert!(segment_files(&entries) <= spatia::storage::MERGE_SEGMENT_THRESHOLD);
    }
    let all = index.scan("WITHIN", Shape::rectangle(-1.0, 40.0, 0.0, 2.0));
    let expected: Vec<String> = (0..40).map(|i| format!("s{:02}", i)).collect();
    assert_eq!(all, expected);
}

#[test]
fn fine_distance_error_keeps_coverings_bounded() {
    let index = TestIndex::with(&[
        ("storage.directory-type", "RAMDirectory"),
        ("strategy.distance-error-pct", "0"),
    ])
    .with_stations();
    let started = std::time::Instant::now();
    index
        .manager
        .insert_entry(&station("wide", 1, Shape::circle(0.0, 0.0, 10.0)), false)
        .unwrap();
    let area = Shape::polygon(&[
        (-10.0, -10.0),
        (10.0, -10.0),
        (12.0, 5.0),
        (0.0, 12.0),
        (-12.0, 5.0),
    ]);
    index
        .manager
        .insert_entry(&station("area", 1, area.clone()), false)
        .unwrap();
    assert_eq!(index.scan("INTERSECTS", Shape::circle(5.0, 5.0, 10.0)), vec!["area", "wide"]);
    assert_eq!(index.scan("INTERSECTS", area), vec!["area", "wide"]);
    assert!(started.elapsed() < std::time::Duration::from_secs(120));
}

// ============================================================================
// Close
// ============================================================================

#[test]
fn close_deletes_storage_root() {
    let index = TestIndex::new().with_stations();
    index
        .manager
        .insert_entry(&station("s1", 1, Shape::point(1.0, 1.0)), false)
        .unwrap();
    assert!(index.root().join("Station").exists());

    index.manager.close().unwrap();
    assert!(!index.root().exists());
}

#[test]
fn closed_manager_rejects_index_calls() {
    let index = TestIndex::new().with_stations();
    index.manager.close().unwrap();
    index.manager.close().unwrap();

    let entry = station("s1", 1, Shape::point(1.0, 1.0));
    assert!(matches!(index.manager.insert_entry(&entry, false), Err(SpatialError::Closed)));
    assert!(matches!(index.manager.remove_entry("Station", "s1", 1), Err(SpatialError::Closed)));
    assert!(matches!(
        index
            .manager
            .scan_index("Station", "location", "WITHIN", &Value::from(around(1.0, 1.0))),
        Err(SpatialError::Closed)
    ));
    let err = index.manager.introduce_type(&station_type()).unwrap_err();
    assert_eq!(err.to_string(), "Spatial index manager is closed");
}

#[test]
fn start_clears_stale_storage() {
    let first = TestIndex::new().with_stations();
    let root = first.root();
    let stale = root.join("Leftover").join("entries");
    std::fs::create_dir_all(&stale).unwrap();

    let config = ManagerConfig::new(Properties::new()).with_work_dir(first.dir.path());
    let _second = SpatialIndexManager::from_manager_config(&config).unwrap();
    assert!(!stale.exists());
}
