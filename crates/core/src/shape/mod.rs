//! Shapes handled by the spatial index
//!
//! A [`Shape`] is the opaque geometric value carried by indexed entry
//! properties. Shapes are plain coordinate data; validation against a
//! coordinate system happens when a [`SpatialContext`](crate::SpatialContext)
//! converts them to their canonical `geo_types::Geometry`.
//!
//! Shapes round-trip through two text formats (see [`ShapeFormat`]):
//!
//! - WKT, extended with `ENVELOPE(minX, maxX, maxY, minY)` for rectangles and
//!   `BUFFER(POINT(x y), r)` for circles
//! - GeoJSON, extended with `Envelope` and `Circle` geometry types

mod geojson;
mod wkt;

use crate::error::Result;
use geo_types::{Coord, LineString, Point, Polygon, Rect};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Circle
// ============================================================================

/// Circle given by a center and a radius in coordinate units
///
/// In a geo context the radius is measured in degrees of arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    center: Point<f64>,
    radius: f64,
}

impl Circle {
    /// Create a circle
    pub fn new(center: Point<f64>, radius: f64) -> Self {
        Circle { center, radius }
    }

    /// Circle center
    pub fn center(&self) -> Point<f64> {
        self.center
    }

    /// Circle radius
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Geometric value that can be indexed and queried
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Single position
    Point(Point<f64>),
    /// Axis aligned rectangle
    Rectangle(Rect<f64>),
    /// Circle around a position
    Circle(Circle),
    /// Open polyline
    LineString(LineString<f64>),
    /// Polygon; the exterior ring is closed on construction
    Polygon(Polygon<f64>),
}

impl Shape {
    /// Point at `(x, y)`
    pub fn point(x: f64, y: f64) -> Self {
        Shape::Point(Point::new(x, y))
    }

    /// Rectangle given in `minX, maxX, minY, maxY` order
    pub fn rectangle(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Shape::Rectangle(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }

    /// Circle around `(x, y)`
    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Shape::Circle(Circle::new(Point::new(x, y), radius))
    }

    /// Polyline through the given positions
    pub fn line_string(positions: &[(f64, f64)]) -> Self {
        Shape::LineString(LineString::from(positions.to_vec()))
    }

    /// Polygon with the given exterior ring
    ///
    /// The ring is closed if the last position differs from the first.
    pub fn polygon(positions: &[(f64, f64)]) -> Self {
        Shape::Polygon(Polygon::new(LineString::from(positions.to_vec()), vec![]))
    }

    /// Name of the shape kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Point(_) => "Point",
            Shape::Rectangle(_) => "Rectangle",
            Shape::Circle(_) => "Circle",
            Shape::LineString(_) => "LineString",
            Shape::Polygon(_) => "Polygon",
        }
    }

    /// Check if this shape is a single point
    pub fn is_point(&self) -> bool {
        matches!(self, Shape::Point(_))
    }

    /// Render this shape in the given text format
    pub fn to_format_string(&self, format: ShapeFormat) -> String {
        match format {
            ShapeFormat::Wkt => wkt::write(self),
            ShapeFormat::GeoJson => geojson::write(self),
        }
    }

    /// Parse a shape from text in the given format
    pub fn parse(text: &str, format: ShapeFormat) -> Result<Self> {
        match format {
            ShapeFormat::Wkt => wkt::parse(text),
            ShapeFormat::GeoJson => geojson::parse(text),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_format_string(ShapeFormat::Wkt))
    }
}

impl FromStr for Shape {
    type Err = crate::error::SpatialError;

    fn from_str(s: &str) -> Result<Self> {
        Shape::parse(s, ShapeFormat::Wkt)
    }
}

// ============================================================================
// ShapeFormat
// ============================================================================

/// Text formats shapes can be written in and parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeFormat {
    /// Well-known text
    Wkt,
    /// GeoJSON geometry object
    GeoJson,
}

impl ShapeFormat {
    /// All supported formats
    pub const ALL: [ShapeFormat; 2] = [ShapeFormat::Wkt, ShapeFormat::GeoJson];

    /// Display name of the format
    pub fn name(&self) -> &'static str {
        match self {
            ShapeFormat::Wkt => "WKT",
            ShapeFormat::GeoJson => "GeoJSON",
        }
    }
}

impl fmt::Display for ShapeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
