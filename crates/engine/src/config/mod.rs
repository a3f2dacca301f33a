//! Spatial index configuration
//!
//! [`SpatialConfig`] resolves every setting eagerly from a
//! [`PropertySource`] when it is built. Keys live under the manager's
//! namespace (`spatial` by default):
//!
//! | Key | Values | Default |
//! |-----|--------|---------|
//! | `strategy` | RecursivePrefixTree, BBox, Composite | RecursivePrefixTree |
//! | `strategy.spatial-prefix-tree` | GeohashPrefixTree, QuadPrefixTree | GeohashPrefixTree |
//! | `strategy.spatial-prefix-tree.max-levels` | integer | 11 |
//! | `strategy.distance-error-pct` | number in [0, 0.5] | 0.025 |
//! | `storage.directory-type` | MMapDirectory, RAMDirectory | MMapDirectory |
//! | `storage.location` | path | `<work dir>/spatial-index` |
//! | `storage.max-uncommitted-changes` | positive integer | 1000 |
//! | `context` | Spatial4J, JTS | JTS |
//! | `context.geo` | true, false | true |
//! | `context.world-bounds` | `minX, maxX, minY, maxY` | context default |
//! | `query.always-rematch` | true, false | true |
//!
//! Settings are resolved in this order: context, strategy, storage, query.
//! The first invalid setting fails construction.

mod kinds;
mod properties;

pub use kinds::{DirectoryKind, PrefixTreeKind, StrategyKind, SupportedValue};
pub use properties::{Properties, PropertySource};

use crate::grid::SpatialPrefixTree;
use crate::location::resolve_location;
use crate::strategy::{SpatialStrategy, StrategyFactory};
use dashmap::DashMap;
use geo_types::{Coord, Rect};
use spatia_core::{ContextKind, Result, SpatialContext, SpatialError, SPATIAL_NAMESPACE};
use spatia_storage::Directory;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Keys and defaults
// ============================================================================

/// Strategy kind key
pub const STRATEGY: &str = "strategy";
/// Prefix tree kind key
pub const SPATIAL_PREFIX_TREE: &str = "strategy.spatial-prefix-tree";
/// Prefix tree depth key
pub const MAX_LEVELS: &str = "strategy.spatial-prefix-tree.max-levels";
/// Distance error tolerance key
pub const DIST_ERR_PCT: &str = "strategy.distance-error-pct";
/// Directory kind key
pub const DIRECTORY_TYPE: &str = "storage.directory-type";
/// Storage root key
pub const LOCATION: &str = "storage.location";
/// Commit threshold key
pub const MAX_UNCOMMITTED_CHANGES: &str = "storage.max-uncommitted-changes";
/// Context kind key
pub const CONTEXT: &str = "context";
/// Geo flag key
pub const CONTEXT_GEO: &str = "context.geo";
/// World bounds key
pub const WORLD_BOUNDS: &str = "context.world-bounds";
/// Rematch policy key
pub const ALWAYS_REMATCH: &str = "query.always-rematch";

/// Default prefix tree depth
pub const DEFAULT_MAX_LEVELS: usize = 11;
/// Default distance error tolerance
pub const DEFAULT_DIST_ERR_PCT: f64 = 0.025;
/// Default commit threshold
pub const DEFAULT_MAX_UNCOMMITTED_CHANGES: usize = 1000;

const MAX_DIST_ERR_PCT: f64 = 0.5;

// ============================================================================
// ManagerConfig
// ============================================================================

/// Inputs a manager is created from
pub struct ManagerConfig {
    namespace: String,
    properties: Box<dyn PropertySource + Send + Sync>,
    work_dir: Option<PathBuf>,
}

impl ManagerConfig {
    /// Read settings from `properties` under the `spatial` namespace
    pub fn new(properties: impl PropertySource + Send + Sync + 'static) -> Self {
        ManagerConfig {
            namespace: SPATIAL_NAMESPACE.to_string(),
            properties: Box::new(properties),
            work_dir: None,
        }
    }

    /// Read settings under another namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Working directory of the host, used to place the storage root
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    /// Namespace keys are read under
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Host working directory
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// Raw value of a key relative to the namespace
    pub fn property(&self, key: &str) -> Option<String> {
        self.properties
            .property(&format!("{}.{}", self.namespace, key))
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("namespace", &self.namespace)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SpatialConfig
// ============================================================================

/// Resolved, immutable spatial index configuration
#[derive(Debug)]
pub struct SpatialConfig {
    context: Arc<SpatialContext>,
    factory: StrategyFactory,
    strategies: DashMap<String, Arc<SpatialStrategy>>,
    directory_kind: DirectoryKind,
    location: PathBuf,
    max_uncommitted_changes: usize,
    always_rematch: bool,
}

impl SpatialConfig {
    /// Resolve every setting
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid setting.
    pub fn new(config: &ManagerConfig) -> Result<Self> {
        let context = Arc::new(resolve_context(config)?);
        let factory = resolve_strategy(config, &context)?;
        let directory_kind = resolve_enum(config, DIRECTORY_TYPE, DirectoryKind::MMapDirectory)?;
        let location = resolve_location(config.property(LOCATION).as_deref(), config.work_dir());
        let max_uncommitted_changes =
            resolve_number(config, MAX_UNCOMMITTED_CHANGES, DEFAULT_MAX_UNCOMMITTED_CHANGES)?;
        if max_uncommitted_changes == 0 {
            return Err(invalid_value(
                config,
                MAX_UNCOMMITTED_CHANGES,
                "0",
                "a positive integer",
            ));
        }
        let always_rematch = resolve_bool(config, ALWAYS_REMATCH, true)?;

        info!(
            target: "spatia::config",
            strategy = %factory.kind(),
            context = %context.kind(),
            geo = context.is_geo(),
            directory = %directory_kind,
            location = %location.display(),
            max_uncommitted_changes,
            "Resolved spatial configuration"
        );

        Ok(SpatialConfig {
            context,
            factory,
            strategies: DashMap::new(),
            directory_kind,
            location,
            max_uncommitted_changes,
            always_rematch,
        })
    }

    /// Coordinate context shared by all strategies
    pub fn context(&self) -> &SpatialContext {
        &self.context
    }

    /// Strategy kind
    pub fn strategy_kind(&self) -> StrategyKind {
        self.factory.kind()
    }

    /// Strategy for a field, built once per field name
    pub fn strategy(&self, field: &str) -> Arc<SpatialStrategy> {
        if let Some(strategy) = self.strategies.get(field) {
            return Arc::clone(strategy.value());
        }
        let entry = self
            .strategies
            .entry(field.to_string())
            .or_insert_with(|| Arc::new(self.factory.create(field)));
        Arc::clone(entry.value())
    }

    /// Grid of prefix tree strategies
    pub fn grid(&self) -> Option<&SpatialPrefixTree> {
        match &self.factory {
            StrategyFactory::RecursivePrefixTree { grid, .. }
            | StrategyFactory::Composite { grid, .. } => Some(grid.as_ref()),
            StrategyFactory::BBox { .. } => None,
        }
    }

    /// Distance error tolerance of prefix tree strategies
    pub fn distance_error_pct(&self) -> Option<f64> {
        match &self.factory {
            StrategyFactory::RecursivePrefixTree { dist_err_pct, .. }
            | StrategyFactory::Composite { dist_err_pct, .. } => Some(*dist_err_pct),
            StrategyFactory::BBox { .. } => None,
        }
    }

    /// Storage medium
    pub fn directory_kind(&self) -> DirectoryKind {
        self.directory_kind
    }

    /// Open storage at `root/<relative>`, or a fresh in-memory directory
    pub fn directory(&self, relative: impl AsRef<Path>) -> spatia_storage::Result<Directory> {
        match self.directory_kind {
            DirectoryKind::MMapDirectory => Directory::mmap(self.location.join(relative)),
            DirectoryKind::RAMDirectory => Ok(Directory::ram()),
        }
    }

    /// Storage root
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Number of non-forced mutations per flush
    pub fn max_uncommitted_changes(&self) -> usize {
        self.max_uncommitted_changes
    }

    /// Whether matches are always re-verified by the caller
    pub fn always_rematch(&self) -> bool {
        self.always_rematch
    }

    /// Whether matches on `path` need re-verification by the caller
    ///
    /// Always true unless rematching was switched off, in which case only
    /// the exact Composite strategy skips it.
    pub fn rematch_already_matched_index_path(&self, _path: &str) -> bool {
        self.always_rematch || self.factory.kind() != StrategyKind::Composite
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn resolve_context(config: &ManagerConfig) -> Result<SpatialContext> {
    let kind = resolve_enum(config, CONTEXT, ContextKind::Jts)?;
    let geo = resolve_bool(config, CONTEXT_GEO, true)?;
    let world_bounds = config
        .property(WORLD_BOUNDS)
        .map(|raw| parse_world_bounds(&raw))
        .transpose()?;
    Ok(SpatialContext::new(kind, geo, world_bounds))
}

fn resolve_strategy(config: &ManagerConfig, context: &Arc<SpatialContext>) -> Result<StrategyFactory> {
    let kind = resolve_enum(config, STRATEGY, StrategyKind::RecursivePrefixTree)?;
    if kind == StrategyKind::BBox {
        return Ok(StrategyFactory::BBox {
            context: Arc::clone(context),
        });
    }

    let tree_kind = resolve_enum(config, SPATIAL_PREFIX_TREE, PrefixTreeKind::GeohashPrefixTree)?;
    if tree_kind == PrefixTreeKind::GeohashPrefixTree && !context.is_geo() {
        return Err(SpatialError::configuration(format!(
            "{} requires a geo spatial context - set {}.{}=true or use {}",
            tree_kind,
            config.namespace(),
            CONTEXT_GEO,
            PrefixTreeKind::QuadPrefixTree
        )));
    }
    let max_levels = resolve_number(config, MAX_LEVELS, DEFAULT_MAX_LEVELS)?;
    let supported = tree_kind.max_supported_levels();
    if !(1..=supported).contains(&max_levels) {
        return Err(invalid_value(
            config,
            MAX_LEVELS,
            &max_levels.to_string(),
            &format!("an integer in [1, {}]", supported),
        ));
    }
    let dist_err_pct: f64 = resolve_number(config, DIST_ERR_PCT, DEFAULT_DIST_ERR_PCT)?;
    if !(0.0..=MAX_DIST_ERR_PCT).contains(&dist_err_pct) {
        return Err(invalid_value(
            config,
            DIST_ERR_PCT,
            &dist_err_pct.to_string(),
            &format!("a number in [0, {}]", MAX_DIST_ERR_PCT),
        ));
    }

    let grid = Arc::new(SpatialPrefixTree::new(tree_kind, max_levels, context));
    let context = Arc::clone(context);
    Ok(match kind {
        StrategyKind::Composite => StrategyFactory::Composite {
            context,
            grid,
            dist_err_pct,
        },
        _ => StrategyFactory::RecursivePrefixTree {
            context,
            grid,
            dist_err_pct,
        },
    })
}

fn resolve_enum<T: SupportedValue>(config: &ManagerConfig, key: &str, default: T) -> Result<T> {
    match config.property(key) {
        Some(value) => T::by_name(&value),
        None => Ok(default),
    }
}

fn resolve_number<T: FromStr>(config: &ManagerConfig, key: &str, default: T) -> Result<T> {
    match config.property(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| invalid_value(config, key, &value, "a number")),
        None => Ok(default),
    }
}

fn resolve_bool(config: &ManagerConfig, key: &str, default: bool) -> Result<bool> {
    match config.property(key) {
        Some(value) if value.eq_ignore_ascii_case("true") => Ok(true),
        Some(value) if value.eq_ignore_ascii_case("false") => Ok(false),
        Some(value) => Err(invalid_value(config, key, &value, "true or false")),
        None => Ok(default),
    }
}

fn invalid_value(config: &ManagerConfig, key: &str, value: &str, expected: &str) -> SpatialError {
    SpatialError::configuration(format!(
        "Invalid value for {}.{}: {} - expected {}",
        config.namespace(),
        key,
        value,
        expected
    ))
}

/// Parse `minX, maxX, minY, maxY`
pub fn parse_world_bounds(raw: &str) -> Result<Rect<f64>> {
    let tokens: Vec<&str> = raw.split(',').collect();
    if tokens.len() != 4 {
        return Err(SpatialError::configuration(format!(
            "World bounds [{}] must be of format: minX, maxX, minY, maxY",
            raw
        )));
    }
    let mut values = [0.0f64; 4];
    for (i, token) in tokens.iter().enumerate() {
        values[i] = token.trim().parse().map_err(|_| {
            SpatialError::configuration(format!(
                "Invalid world bounds [{}] - token #{} is not a number",
                raw,
                i + 1
            ))
        })?;
    }
    let [min_x, max_x, min_y, max_y] = values;
    if !(min_x <= max_x && min_y <= max_y) {
        return Err(SpatialError::configuration(format!(
            "Values of world bounds [minX, maxX, minY, maxY]=[{}] must meet: minX<=maxX, minY<=maxY",
            raw
        )));
    }
    Ok(Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }))
}
