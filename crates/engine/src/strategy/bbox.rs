//! Bounding box strategy
//!
//! Stores each shape's bounding box as `[minX, maxX, minY, maxY]` and
//! answers every predicate by comparing boxes.

use crate::operation::SpatialOperation;
use geo_types::{Coord, Rect};
use spatia_core::{Result, Shape, SpatialContext};
use spatia_storage::{DocFilter, Field, Query, StoredDocument, StoredValue};
use std::sync::Arc;

/// Bounding box strategy for one field
#[derive(Debug, Clone)]
pub struct BBoxStrategy {
    field: String,
    bbox_field: String,
    context: Arc<SpatialContext>,
}

impl BBoxStrategy {
    /// Create the strategy for `field`
    pub fn new(field: &str, context: Arc<SpatialContext>) -> Self {
        BBoxStrategy {
            field: field.to_string(),
            bbox_field: format!("{}__bbox", field),
            context,
        }
    }

    /// Indexed field
    pub fn field_name(&self) -> &str {
        &self.field
    }

    fn bounding_rect(&self, shape: &Shape) -> Result<Rect<f64>> {
        self.context.to_geometry(shape)?;
        Ok(self.context.bounding_rect(shape))
    }

    /// Stored bounding box of `shape`
    pub fn create_indexable_fields(&self, shape: &Shape) -> Result<Vec<Field>> {
        let rect = self.bounding_rect(shape)?;
        Ok(vec![Field::stored(
            self.bbox_field.clone(),
            StoredValue::Doubles(vec![rect.min().x, rect.max().x, rect.min().y, rect.max().y]),
        )])
    }

    /// Full scan filtered by box comparison
    pub fn make_query(&self, operation: SpatialOperation, shape: &Shape) -> Result<Query> {
        let rect = self.bounding_rect(shape)?;
        Ok(Query::filtered(
            Query::MatchAll,
            BoxFilter {
                bbox_field: self.bbox_field.clone(),
                operation,
                rect,
            },
        ))
    }
}

#[derive(Debug)]
struct BoxFilter {
    bbox_field: String,
    operation: SpatialOperation,
    rect: Rect<f64>,
}

impl DocFilter for BoxFilter {
    fn matches(&self, doc: &StoredDocument) -> bool {
        let Some(&[min_x, max_x, min_y, max_y]) = doc.get_doubles(&self.bbox_field) else {
            return false;
        };
        let stored = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });
        match self.operation {
            SpatialOperation::Within => rect_contains(&self.rect, &stored),
            SpatialOperation::Contains => rect_contains(&stored, &self.rect),
            SpatialOperation::Intersects => {
                stored.min().x <= self.rect.max().x
                    && stored.max().x >= self.rect.min().x
                    && stored.min().y <= self.rect.max().y
                    && stored.max().y >= self.rect.min().y
            }
        }
    }
}

fn rect_contains(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.max().x <= outer.max().x
        && inner.min().y >= outer.min().y
        && inner.max().y <= outer.max().y
}
