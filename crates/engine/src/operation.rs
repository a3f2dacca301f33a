//! Spatial predicates
//!
//! `DISJOINT` is not offered: over an unbounded world its result set is the
//! complement of an intersects query and cannot be verified by the cell
//! strategies.

use geo::{Contains, Intersects, Within};
use spatia_core::{Circle, Result, Shape, SpatialContext, SpatialError};
use std::fmt;

/// Named geometric predicate between an indexed shape and an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialOperation {
    /// Indexed shape lies within the operand
    Within,
    /// Indexed shape contains the operand
    Contains,
    /// Indexed shape and operand share at least one point
    Intersects,
}

impl SpatialOperation {
    /// Supported operations
    pub const ALL: [SpatialOperation; 3] = [
        SpatialOperation::Within,
        SpatialOperation::Contains,
        SpatialOperation::Intersects,
    ];

    /// Upper-case operation name
    pub fn name(&self) -> &'static str {
        match self {
            SpatialOperation::Within => "WITHIN",
            SpatialOperation::Contains => "CONTAINS",
            SpatialOperation::Intersects => "INTERSECTS",
        }
    }

    /// Resolve an operation by name, ignoring case
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SpatialError::UnsupportedOperation {
                operation: name.to_string(),
                supported: Self::ALL
                    .iter()
                    .map(SpatialOperation::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Evaluate `left <op> right` exactly
    ///
    /// Circles against points and circles are compared by distance in the
    /// context; every other pair goes through the canonical geometries.
    pub fn evaluate(&self, context: &SpatialContext, left: &Shape, right: &Shape) -> Result<bool> {
        match (left, right) {
            (Shape::Circle(c), Shape::Point(p)) | (Shape::Point(p), Shape::Circle(c)) => {
                context.to_geometry(left)?;
                context.to_geometry(right)?;
                let inside = context.distance(c.center(), *p) <= c.radius();
                Ok(match self {
                    SpatialOperation::Intersects => inside,
                    // a circle lies within a point only when both collapse to it
                    SpatialOperation::Within if left.is_point() => inside,
                    SpatialOperation::Contains if right.is_point() => inside,
                    _ => c.radius() == 0.0 && inside,
                })
            }
            (Shape::Circle(a), Shape::Circle(b)) => {
                context.to_geometry(left)?;
                context.to_geometry(right)?;
                Ok(circle_relation(context, *self, a, b))
            }
            _ => {
                let l = context.to_geometry(left)?;
                let r = context.to_geometry(right)?;
                Ok(match self {
                    SpatialOperation::Within => l.is_within(&r),
                    SpatialOperation::Contains => l.contains(&r),
                    SpatialOperation::Intersects => l.intersects(&r),
                })
            }
        }
    }
}

fn circle_relation(context: &SpatialContext, op: SpatialOperation, a: &Circle, b: &Circle) -> bool {
    let d = context.distance(a.center(), b.center());
    match op {
        SpatialOperation::Intersects => d <= a.radius() + b.radius(),
        SpatialOperation::Within => d + a.radius() <= b.radius(),
        SpatialOperation::Contains => d + b.radius() <= a.radius(),
    }
}

impl fmt::Display for SpatialOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
