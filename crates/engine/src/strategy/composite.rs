//! Composite strategy: prefix tree candidates, exact verification
//!
//! The shape is additionally stored as WKT. A query selects intersecting
//! candidates through the prefix tree and evaluates the predicate exactly
//! against each candidate's stored shape.

use super::prefix_tree::PrefixTreeStrategy;
use crate::operation::SpatialOperation;
use spatia_core::{Result, Shape, ShapeFormat, SpatialContext};
use spatia_storage::{DocFilter, Field, Query, StoredDocument, StoredValue};
use std::sync::Arc;
use tracing::warn;

/// Composite strategy for one field
#[derive(Debug, Clone)]
pub struct CompositeStrategy {
    tree: PrefixTreeStrategy,
    shape_field: String,
}

impl CompositeStrategy {
    /// Wrap a prefix tree strategy with exact verification
    pub fn new(tree: PrefixTreeStrategy) -> Self {
        let shape_field = format!("{}__shape", tree.field_name());
        CompositeStrategy { tree, shape_field }
    }

    /// Indexed field
    pub fn field_name(&self) -> &str {
        self.tree.field_name()
    }

    /// Candidate selecting strategy
    pub fn prefix_tree(&self) -> &PrefixTreeStrategy {
        &self.tree
    }

    /// Prefix tree fields plus the serialized shape
    pub fn create_indexable_fields(&self, shape: &Shape) -> Result<Vec<Field>> {
        let mut fields = self.tree.create_indexable_fields(shape)?;
        fields.push(Field::stored(
            self.shape_field.clone(),
            StoredValue::Text(shape.to_format_string(ShapeFormat::Wkt)),
        ));
        Ok(fields)
    }

    /// Intersecting candidates filtered by the exact predicate
    pub fn make_query(&self, operation: SpatialOperation, shape: &Shape) -> Result<Query> {
        let leaves = self.tree.leaf_cells(shape)?;
        let candidates = self.tree.intersects_query(&leaves);
        Ok(Query::filtered(
            candidates,
            ExactFilter {
                shape_field: self.shape_field.clone(),
                operation,
                operand: shape.clone(),
                context: Arc::clone(self.tree.context()),
            },
        ))
    }
}

#[derive(Debug)]
struct ExactFilter {
    shape_field: String,
    operation: SpatialOperation,
    operand: Shape,
    context: Arc<SpatialContext>,
}

impl DocFilter for ExactFilter {
    fn matches(&self, doc: &StoredDocument) -> bool {
        let Some(text) = doc.get_text(&self.shape_field) else {
            return false;
        };
        let result = Shape::parse(text, ShapeFormat::Wkt)
            .and_then(|stored| self.operation.evaluate(&self.context, &stored, &self.operand));
        match result {
            Ok(matched) => matched,
            Err(e) => {
                warn!(
                    target: "spatia::strategy",
                    field = %self.shape_field,
                    error = %e,
                    "Skipping document with unreadable stored shape"
                );
                false
            }
        }
    }
}
