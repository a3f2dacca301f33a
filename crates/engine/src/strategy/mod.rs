//! Spatial strategies
//!
//! A strategy turns a shape into index fields and a predicate into a query
//! over those fields. Three strategies exist:
//!
//! | Strategy | Indexed | Stored | Exact |
//! |----------|---------|--------|-------|
//! | RecursivePrefixTree | covering cells and ancestors | leaf cells | no |
//! | BBox | nothing | bounding box | box predicates only |
//! | Composite | covering cells and ancestors | leaf cells, WKT | yes |
//!
//! The strategy kind is fixed when configuration is resolved; the field name
//! only varies the column the strategy writes to.

mod bbox;
mod composite;
mod prefix_tree;

pub use bbox::BBoxStrategy;
pub use composite::CompositeStrategy;
pub use prefix_tree::PrefixTreeStrategy;

use crate::config::StrategyKind;
use crate::grid::SpatialPrefixTree;
use crate::operation::SpatialOperation;
use spatia_core::{Result, Shape, SpatialContext};
use spatia_storage::{Field, Query};
use std::sync::Arc;

/// Strategy bound to one indexed field
#[derive(Debug, Clone)]
pub enum SpatialStrategy {
    /// Prefix tree cells
    RecursivePrefixTree(PrefixTreeStrategy),
    /// Bounding boxes
    BBox(BBoxStrategy),
    /// Prefix tree cells verified against the stored shape
    Composite(CompositeStrategy),
}

impl SpatialStrategy {
    /// Strategy kind
    pub fn kind(&self) -> StrategyKind {
        match self {
            SpatialStrategy::RecursivePrefixTree(_) => StrategyKind::RecursivePrefixTree,
            SpatialStrategy::BBox(_) => StrategyKind::BBox,
            SpatialStrategy::Composite(_) => StrategyKind::Composite,
        }
    }

    /// Indexed field
    pub fn field_name(&self) -> &str {
        match self {
            SpatialStrategy::RecursivePrefixTree(s) => s.field_name(),
            SpatialStrategy::BBox(s) => s.field_name(),
            SpatialStrategy::Composite(s) => s.field_name(),
        }
    }

    /// Grid of prefix tree strategies
    pub fn grid(&self) -> Option<&SpatialPrefixTree> {
        match self {
            SpatialStrategy::RecursivePrefixTree(s) => Some(s.grid()),
            SpatialStrategy::BBox(_) => None,
            SpatialStrategy::Composite(s) => Some(s.prefix_tree().grid()),
        }
    }

    /// Distance error tolerance of prefix tree strategies
    pub fn distance_error_pct(&self) -> Option<f64> {
        match self {
            SpatialStrategy::RecursivePrefixTree(s) => Some(s.distance_error_pct()),
            SpatialStrategy::BBox(_) => None,
            SpatialStrategy::Composite(s) => Some(s.prefix_tree().distance_error_pct()),
        }
    }

    /// Check if query results need no re-verification
    pub fn is_exact(&self) -> bool {
        matches!(self, SpatialStrategy::Composite(_))
    }

    /// Index fields representing `shape`
    pub fn create_indexable_fields(&self, shape: &Shape) -> Result<Vec<Field>> {
        match self {
            SpatialStrategy::RecursivePrefixTree(s) => s.create_indexable_fields(shape),
            SpatialStrategy::BBox(s) => s.create_indexable_fields(shape),
            SpatialStrategy::Composite(s) => s.create_indexable_fields(shape),
        }
    }

    /// Query selecting documents whose shape satisfies `<op> shape`
    pub fn make_query(&self, operation: SpatialOperation, shape: &Shape) -> Result<Query> {
        match self {
            SpatialStrategy::RecursivePrefixTree(s) => s.make_query(operation, shape),
            SpatialStrategy::BBox(s) => s.make_query(operation, shape),
            SpatialStrategy::Composite(s) => s.make_query(operation, shape),
        }
    }
}

// ============================================================================
// StrategyFactory
// ============================================================================

/// Builds per-field strategies sharing one context and grid
#[derive(Debug, Clone)]
pub(crate) enum StrategyFactory {
    RecursivePrefixTree {
        context: Arc<SpatialContext>,
        grid: Arc<SpatialPrefixTree>,
        dist_err_pct: f64,
    },
    BBox {
        context: Arc<SpatialContext>,
    },
    Composite {
        context: Arc<SpatialContext>,
        grid: Arc<SpatialPrefixTree>,
        dist_err_pct: f64,
    },
}

impl StrategyFactory {
    pub(crate) fn kind(&self) -> StrategyKind {
        match self {
            StrategyFactory::RecursivePrefixTree { .. } => StrategyKind::RecursivePrefixTree,
            StrategyFactory::BBox { .. } => StrategyKind::BBox,
            StrategyFactory::Composite { .. } => StrategyKind::Composite,
        }
    }

    pub(crate) fn create(&self, field: &str) -> SpatialStrategy {
        match self {
            StrategyFactory::RecursivePrefixTree {
                context,
                grid,
                dist_err_pct,
            } => SpatialStrategy::RecursivePrefixTree(PrefixTreeStrategy::new(
                field,
                Arc::clone(context),
                Arc::clone(grid),
                *dist_err_pct,
            )),
            StrategyFactory::BBox { context } => {
                SpatialStrategy::BBox(BBoxStrategy::new(field, Arc::clone(context)))
            }
            StrategyFactory::Composite {
                context,
                grid,
                dist_err_pct,
            } => SpatialStrategy::Composite(CompositeStrategy::new(PrefixTreeStrategy::new(
                field,
                Arc::clone(context),
                Arc::clone(grid),
                *dist_err_pct,
            ))),
        }
    }
}
