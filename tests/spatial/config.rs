//! Configuration resolution through the public surface
//!
//! Messages are asserted literally; hosts surface them to operators.

use crate::common::*;
use spatia::{ContextKind, DirectoryKind, PrefixTreeKind, SpatialConfig, StrategyKind};
use std::path::Path;

fn resolve(pairs: &[(&str, &str)]) -> Result<SpatialConfig> {
    SpatialConfig::new(&ManagerConfig::new(spatial_properties(pairs)).with_work_dir("/srv/space"))
}

fn message(pairs: &[(&str, &str)]) -> String {
    resolve(pairs).unwrap_err().to_string()
}

// ============================================================================
// Defaults and accepted values
// ============================================================================

#[test]
fn defaults() {
    let config = resolve(&[]).unwrap();
    assert_eq!(config.strategy_kind(), StrategyKind::RecursivePrefixTree);
    let grid = config.grid().unwrap();
    assert_eq!(grid.kind(), PrefixTreeKind::GeohashPrefixTree);
    assert_eq!(grid.max_levels(), 11);
    assert_eq!(config.distance_error_pct(), Some(0.025));
    assert_eq!(config.context().kind(), ContextKind::Jts);
    assert!(config.context().is_geo());
    assert_eq!(config.directory_kind(), DirectoryKind::MMapDirectory);
    assert_eq!(config.location(), Path::new("/srv/space/spatial-index"));
    assert_eq!(config.max_uncommitted_changes(), 1000);
    assert!(config.always_rematch());
}

#[test]
fn explicit_values_are_case_insensitive() {
    let config = resolve(&[
        ("strategy", "composite"),
        ("strategy.spatial-prefix-tree", "quadprefixtree"),
        ("strategy.spatial-prefix-tree.max-levels", "20"),
        ("strategy.distance-error-pct", "0.1"),
        ("context", "spatial4j"),
        ("context.geo", "FALSE"),
        ("context.world-bounds", "-100, 100, -50, 50"),
        ("storage.directory-type", "ramdirectory"),
        ("storage.max-uncommitted-changes", "7"),
    ])
    .unwrap();
    assert_eq!(config.strategy_kind(), StrategyKind::Composite);
    let grid = config.grid().unwrap();
    assert_eq!(grid.kind(), PrefixTreeKind::QuadPrefixTree);
    assert_eq!(grid.max_levels(), 20);
    assert_eq!(config.distance_error_pct(), Some(0.1));
    assert_eq!(config.context().kind(), ContextKind::Spatial4J);
    assert!(!config.context().is_geo());
    let bounds = config.context().world_bounds();
    assert_eq!((bounds.min().x, bounds.max().x), (-100.0, 100.0));
    assert_eq!((bounds.min().y, bounds.max().y), (-50.0, 50.0));
    assert_eq!(config.directory_kind(), DirectoryKind::RAMDirectory);
    assert_eq!(config.max_uncommitted_changes(), 7);
}

#[test]
fn bbox_has_no_grid() {
    let config = resolve(&[("strategy", "BBox")]).unwrap();
    assert_eq!(config.strategy_kind(), StrategyKind::BBox);
    assert!(config.grid().is_none());
    assert_eq!(config.distance_error_pct(), None);
}

#[test]
fn config_loads_from_toml() {
    let properties = Properties::from_toml_str(
        r#"
        [spatial]
        strategy = "BBox"

        [spatial.storage]
        directory-type = "RAMDirectory"
        "#,
    )
    .unwrap();
    let config = SpatialConfig::new(&ManagerConfig::new(properties)).unwrap();
    assert_eq!(config.strategy_kind(), StrategyKind::BBox);
    assert_eq!(config.directory_kind(), DirectoryKind::RAMDirectory);
}

// ============================================================================
// Unsupported values
// ============================================================================

#[test]
fn unsupported_strategy() {
    assert_eq!(
        message(&[("strategy", "RTree")]),
        "Unsupported Spatial strategy: RTree - supported values: [RecursivePrefixTree, BBox, Composite]"
    );
}

#[test]
fn unsupported_prefix_tree() {
    assert_eq!(
        message(&[("strategy.spatial-prefix-tree", "S2")]),
        "Unsupported spatial prefix tree: S2 - supported values: [GeohashPrefixTree, QuadPrefixTree]"
    );
}

#[test]
fn unsupported_directory() {
    assert_eq!(
        message(&[("storage.directory-type", "NIOFSDirectory")]),
        "Unsupported directory: NIOFSDirectory - supported values: [MMapDirectory, RAMDirectory]"
    );
}

#[test]
fn unsupported_context() {
    assert_eq!(
        message(&[("context", "GeoTools")]),
        "Unsupported spatial context: GeoTools - supported values: [Spatial4J, JTS]"
    );
}

#[test]
fn manager_creation_fails_with_config_error() {
    let config = ManagerConfig::new(spatial_properties(&[("strategy", "RTree")]));
    let err = SpatialIndexManager::from_manager_config(&config).unwrap_err();
    assert!(err.is_configuration());
}

// ============================================================================
// World bounds
// ============================================================================

#[test]
fn world_bounds_wrong_token_count() {
    assert_eq!(
        message(&[("context.world-bounds", "0, 10, 0")]),
        "World bounds [0, 10, 0] must be of format: minX, maxX, minY, maxY"
    );
}

#[test]
fn world_bounds_non_numeric_token() {
    assert_eq!(
        message(&[("context.world-bounds", "0, 10, south, 10")]),
        "Invalid world bounds [0, 10, south, 10] - token #3 is not a number"
    );
}

#[test]
fn world_bounds_inverted() {
    assert_eq!(
        message(&[("context.world-bounds", "10, 0, 0, 10")]),
        "Values of world bounds [minX, maxX, minY, maxY]=[10, 0, 0, 10] must meet: minX<=maxX, minY<=maxY"
    );
}

// ============================================================================
// Storage location
// ============================================================================

#[test]
fn explicit_location_wins() {
    let config = resolve(&[("storage.location", "/data/idx")]).unwrap();
    assert_eq!(config.location(), Path::new("/data/idx"));
}

#[test]
fn location_without_work_dir_uses_current_dir() {
    let config = SpatialConfig::new(&ManagerConfig::new(Properties::new())).unwrap();
    let expected = std::env::current_dir().unwrap().join("spatial-index");
    assert_eq!(config.location(), expected.as_path());
}

#[test]
fn sub_directory_is_below_root() {
    let tmp = tempfile::tempdir().unwrap();
    let config = SpatialConfig::new(&ManagerConfig::new(Properties::new()).with_work_dir(tmp.path()))
        .unwrap();
    let directory = config.directory("A").unwrap();
    assert_eq!(directory.path(), Some(tmp.path().join("spatial-index").join("A").as_path()));
}
