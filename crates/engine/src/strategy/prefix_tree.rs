//! Recursive prefix tree strategy
//!
//! A shape is indexed as the tokens of its covering cells: every leaf, every
//! ancestor of a leaf, and each leaf again with a `+` suffix. The plain token
//! of a cell therefore matches every document with a leaf at or below it,
//! while the suffixed token matches only documents whose leaf is that cell.
//!
//! An intersects query for a covering `Q` selects the plain tokens of `Q`
//! and the suffixed tokens of the strict ancestors of `Q`. Within and
//! contains narrow those candidates by comparing the stored leaf cells
//! against the query's cells.

use crate::grid::{CellSet, CoverShape, SpatialPrefixTree};
use crate::operation::SpatialOperation;
use spatia_core::{Result, Shape, SpatialContext};
use spatia_storage::{DocFilter, Field, Query, StoredDocument, StoredValue};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Suffix marking a leaf cell token
pub(crate) const LEAF_MARKER: char = '+';

/// Prefix tree strategy for one field
#[derive(Debug, Clone)]
pub struct PrefixTreeStrategy {
    field: String,
    cells_field: String,
    context: Arc<SpatialContext>,
    grid: Arc<SpatialPrefixTree>,
    dist_err_pct: f64,
}

impl PrefixTreeStrategy {
    /// Create the strategy for `field`
    pub fn new(
        field: &str,
        context: Arc<SpatialContext>,
        grid: Arc<SpatialPrefixTree>,
        dist_err_pct: f64,
    ) -> Self {
        PrefixTreeStrategy {
            field: field.to_string(),
            cells_field: format!("{}__cells", field),
            context,
            grid,
            dist_err_pct,
        }
    }

    /// Indexed field
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// Grid shared by all fields
    pub fn grid(&self) -> &SpatialPrefixTree {
        &self.grid
    }

    /// Distance error tolerance
    pub fn distance_error_pct(&self) -> f64 {
        self.dist_err_pct
    }

    pub(crate) fn context(&self) -> &Arc<SpatialContext> {
        &self.context
    }

    /// Leaf cells approximating `shape`
    ///
    /// Circles are covered by distance rather than through their polygon
    /// approximation, so no point of the circle falls outside the cells.
    pub fn leaf_cells(&self, shape: &Shape) -> Result<Vec<String>> {
        let geometry = self.context.to_geometry(shape)?;
        let level = self.grid.detail_level(&self.context, shape, self.dist_err_pct);
        let cover = match shape {
            Shape::Circle(circle) => CoverShape::circle(&self.context, circle),
            _ => CoverShape::geometry(&geometry),
        };
        Ok(self.grid.covering(&cover, level))
    }

    /// Cell tokens of `shape` plus its stored leaf cells
    pub fn create_indexable_fields(&self, shape: &Shape) -> Result<Vec<Field>> {
        let leaves = self.leaf_cells(shape)?;
        let mut tokens = BTreeSet::new();
        for leaf in &leaves {
            for end in 1..=leaf.len() {
                tokens.insert(leaf[..end].to_string());
            }
            tokens.insert(format!("{}{}", leaf, LEAF_MARKER));
        }
        Ok(vec![
            Field::indexed(self.field.clone(), tokens.into_iter().collect()),
            Field::stored(self.cells_field.clone(), StoredValue::Texts(leaves)),
        ])
    }

    /// Query selecting documents whose cells intersect `shape`'s cells
    pub(crate) fn intersects_query(&self, leaves: &[String]) -> Query {
        let mut texts = BTreeSet::new();
        for leaf in leaves {
            texts.insert(leaf.clone());
            for end in 1..leaf.len() {
                texts.insert(format!("{}{}", &leaf[..end], LEAF_MARKER));
            }
        }
        Query::AnyTerm {
            field: self.field.clone(),
            texts: texts.into_iter().collect(),
        }
    }

    /// Candidate query, narrowed by a cell check for within and contains
    pub fn make_query(&self, operation: SpatialOperation, shape: &Shape) -> Result<Query> {
        let leaves = self.leaf_cells(shape)?;
        let candidates = self.intersects_query(&leaves);
        if operation == SpatialOperation::Intersects {
            return Ok(candidates);
        }
        let filter = CellFilter {
            cells_field: self.cells_field.clone(),
            operation,
            query_cells: CellSet::new(&self.grid, leaves.iter().cloned()),
            query_leaves: leaves,
            grid: Arc::clone(&self.grid),
        };
        Ok(Query::filtered(candidates, filter))
    }
}

/// Cell level within / contains check against stored leaf cells
#[derive(Debug)]
struct CellFilter {
    cells_field: String,
    operation: SpatialOperation,
    query_cells: CellSet,
    query_leaves: Vec<String>,
    grid: Arc<SpatialPrefixTree>,
}

impl DocFilter for CellFilter {
    fn matches(&self, doc: &StoredDocument) -> bool {
        let Some(doc_leaves) = doc.get_texts(&self.cells_field) else {
            return false;
        };
        match self.operation {
            SpatialOperation::Within => doc_leaves.iter().all(|leaf| self.query_cells.covers(leaf)),
            SpatialOperation::Contains => {
                let doc_cells = CellSet::new(&self.grid, doc_leaves.iter().cloned());
                self.query_leaves.iter().all(|leaf| doc_cells.covers(leaf))
            }
            SpatialOperation::Intersects => true,
        }
    }
}
