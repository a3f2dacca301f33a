//! Coordinate contexts
//!
//! A [`SpatialContext`] fixes the coordinate system shapes live in: either
//! geodetic (longitude/latitude degrees on a sphere) or planar, bounded by a
//! world rectangle. It validates shapes and converts them to the canonical
//! `geo_types::Geometry` the spatial predicates run on.
//!
//! Two context families exist. `Spatial4J` handles points, rectangles,
//! circles and line strings. `JTS` additionally handles polygons and checks
//! them for self-intersection.

use crate::error::{Result, SpatialError};
use crate::shape::{Circle, Shape};
use geo::{BoundingRect, Distance, Euclidean, Haversine, Intersects};
use geo_types::{Coord, Geometry, Line, LineString, Point, Polygon, Rect};
use std::f64::consts::PI;
use std::fmt;

/// Mean earth radius used to turn great-circle meters into degrees of arc
const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.8;

/// Number of edges used to approximate a circle as a polygon
const CIRCLE_SEGMENTS: usize = 64;

// ============================================================================
// ContextKind
// ============================================================================

/// Family of spatial context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Basic shapes only
    Spatial4J,
    /// Basic shapes plus validated polygons
    Jts,
}

impl ContextKind {
    /// Configuration name of the context family
    pub fn name(&self) -> &'static str {
        match self {
            ContextKind::Spatial4J => "Spatial4J",
            ContextKind::Jts => "JTS",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SpatialContext
// ============================================================================

/// Coordinate system shapes are validated and compared in
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialContext {
    kind: ContextKind,
    geo: bool,
    world_bounds: Rect<f64>,
}

impl SpatialContext {
    /// Create a context
    ///
    /// Without explicit world bounds a geo context spans the whole globe and a
    /// planar context spans the full `f64` range.
    pub fn new(kind: ContextKind, geo: bool, world_bounds: Option<Rect<f64>>) -> Self {
        let world_bounds = world_bounds.unwrap_or_else(|| {
            if geo {
                Self::geo_world()
            } else {
                Rect::new(
                    Coord { x: -f64::MAX, y: -f64::MAX },
                    Coord { x: f64::MAX, y: f64::MAX },
                )
            }
        });
        SpatialContext {
            kind,
            geo,
            world_bounds,
        }
    }

    /// The longitude/latitude world: `[-180, 180] x [-90, 90]`
    pub fn geo_world() -> Rect<f64> {
        Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 })
    }

    /// Family of this context
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Check if coordinates are longitude/latitude degrees
    pub fn is_geo(&self) -> bool {
        self.geo
    }

    /// Rectangle all shapes must lie in
    pub fn world_bounds(&self) -> Rect<f64> {
        self.world_bounds
    }

    /// Validate a shape and convert it to its canonical geometry
    ///
    /// Circles are approximated by a polygon. Errors:
    /// - `InvalidArgument` if a polygon ring has fewer than 3 distinct vertices
    /// - `InvalidShape` for self-intersecting polygons, polygons outside the
    ///   JTS context, negative radii and shapes outside the world bounds
    pub fn to_geometry(&self, shape: &Shape) -> Result<Geometry<f64>> {
        self.check_world_bounds(shape)?;
        match shape {
            Shape::Point(p) => Ok(Geometry::Point(*p)),
            Shape::Rectangle(r) => Ok(Geometry::Rect(*r)),
            Shape::Circle(c) => {
                if c.radius().is_nan() || c.radius() < 0.0 {
                    return Err(SpatialError::invalid_shape(format!(
                        "Circle radius must be non-negative, instead given: {}",
                        c.radius()
                    )));
                }
                Ok(Geometry::Polygon(self.circle_polygon(c)))
            }
            Shape::LineString(ls) => {
                if ls.0.len() < 2 {
                    return Err(SpatialError::invalid_shape(
                        "LineString requires at least 2 points",
                    ));
                }
                Ok(Geometry::LineString(ls.clone()))
            }
            Shape::Polygon(p) => {
                if self.kind != ContextKind::Jts {
                    return Err(SpatialError::invalid_shape(format!(
                        "Polygons are not supported by the {} context",
                        self.kind
                    )));
                }
                validate_ring(p.exterior())?;
                for interior in p.interiors() {
                    validate_ring(interior)?;
                }
                Ok(Geometry::Polygon(p.clone()))
            }
        }
    }

    /// Distance between two points in coordinate units
    ///
    /// Geo contexts return the great-circle distance in degrees of arc;
    /// planar contexts return the euclidean distance.
    pub fn distance(&self, a: Point<f64>, b: Point<f64>) -> f64 {
        if self.geo {
            let meters = Haversine::distance(a, b);
            (meters / EARTH_MEAN_RADIUS_METERS) * (180.0 / PI)
        } else {
            Euclidean::distance(a, b)
        }
    }

    /// Shortest distance from `point` to any point of `rect`, in coordinate units
    pub fn min_distance_to_rect(&self, point: Point<f64>, rect: &Rect<f64>) -> f64 {
        let (min, max) = (rect.min(), rect.max());
        if !self.geo {
            let nearest = Point::new(point.x().clamp(min.x, max.x), point.y().clamp(min.y, max.y));
            return Euclidean::distance(point, nearest);
        }
        let (lon, lat) = (point.x(), point.y());
        if lon >= min.x && lon <= max.x {
            return (min.y - lat).max(lat - max.y).max(0.0);
        }
        meridian_edge_extremes(point, rect)
            .map(|candidate| self.distance(point, candidate))
            .fold(f64::INFINITY, f64::min)
    }

    /// Longest distance from `point` to any point of `rect`, in coordinate units
    pub fn max_distance_to_rect(&self, point: Point<f64>, rect: &Rect<f64>) -> f64 {
        let (min, max) = (rect.min(), rect.max());
        if !self.geo {
            let dx = (point.x() - min.x).abs().max((point.x() - max.x).abs());
            let dy = (point.y() - min.y).abs().max((point.y() - max.y).abs());
            return dx.hypot(dy);
        }
        let antipode_lons: Vec<f64> = [point.x() - 180.0, point.x() + 180.0]
            .into_iter()
            .filter(|lon| *lon >= min.x && *lon <= max.x)
            .collect();
        let antipode_lat = -point.y();
        if !antipode_lons.is_empty() && antipode_lat >= min.y && antipode_lat <= max.y {
            return 180.0;
        }
        // along a parallel the distance peaks at the antipodal meridian
        let parallel_peaks = antipode_lons
            .into_iter()
            .flat_map(|lon| [Point::new(lon, min.y), Point::new(lon, max.y)]);
        meridian_edge_extremes(point, rect)
            .chain(parallel_peaks)
            .map(|candidate| self.distance(point, candidate))
            .fold(0.0, f64::max)
    }

    /// Bounding rectangle of a shape, clipped to the world bounds
    pub fn bounding_rect(&self, shape: &Shape) -> Rect<f64> {
        let rect = match shape {
            Shape::Point(p) => Rect::new(p.0, p.0),
            Shape::Rectangle(r) => *r,
            Shape::Circle(c) => {
                let (dx, dy) = self.circle_extent(c);
                let center = c.center();
                Rect::new(
                    Coord { x: center.x() - dx, y: center.y() - dy },
                    Coord { x: center.x() + dx, y: center.y() + dy },
                )
            }
            Shape::LineString(ls) => match ls.bounding_rect() {
                Some(r) => r,
                None => return self.world_bounds,
            },
            Shape::Polygon(p) => match p.bounding_rect() {
                Some(r) => r,
                None => return self.world_bounds,
            },
        };
        self.clip(rect)
    }

    fn clip(&self, rect: Rect<f64>) -> Rect<f64> {
        let world = self.world_bounds;
        Rect::new(
            Coord {
                x: rect.min().x.max(world.min().x),
                y: rect.min().y.max(world.min().y),
            },
            Coord {
                x: rect.max().x.min(world.max().x),
                y: rect.max().y.min(world.max().y),
            },
        )
    }

    /// Half extents of a circle's bounding box
    ///
    /// In a geo context the horizontal extent is the widest longitude span
    /// of the spherical cap, `asin(sin r / cos lat)`, or the whole globe once
    /// the cap reaches a pole.
    fn circle_extent(&self, circle: &Circle) -> (f64, f64) {
        let radius = circle.radius();
        if !self.geo {
            return (radius, radius);
        }
        let cos_lat = circle.center().y().to_radians().cos();
        let ratio = radius.to_radians().sin() / cos_lat;
        if radius >= 90.0 || cos_lat <= 1e-9 || ratio >= 1.0 {
            (180.0, radius)
        } else {
            (ratio.asin().to_degrees(), radius)
        }
    }

    fn circle_polygon(&self, circle: &Circle) -> Polygon<f64> {
        let (dx, dy) = self.circle_extent(circle);
        let center = circle.center();
        let ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let angle = 2.0 * PI * (i as f64) / (CIRCLE_SEGMENTS as f64);
                let c = Coord {
                    x: center.x() + dx * angle.cos(),
                    y: center.y() + dy * angle.sin(),
                };
                self.clamp(c)
            })
            .collect();
        Polygon::new(LineString::from(ring), vec![])
    }

    fn clamp(&self, c: Coord<f64>) -> Coord<f64> {
        let world = self.world_bounds;
        Coord {
            x: c.x.clamp(world.min().x, world.max().x),
            y: c.y.clamp(world.min().y, world.max().y),
        }
    }

    fn contains_coord(&self, c: Coord<f64>) -> bool {
        let world = self.world_bounds;
        c.x >= world.min().x && c.x <= world.max().x && c.y >= world.min().y && c.y <= world.max().y
    }

    fn check_world_bounds(&self, shape: &Shape) -> Result<()> {
        let outside = match shape {
            Shape::Point(p) => !self.contains_coord(p.0),
            Shape::Rectangle(r) => !(self.contains_coord(r.min()) && self.contains_coord(r.max())),
            Shape::Circle(c) => !self.contains_coord(c.center().0),
            Shape::LineString(ls) => ls.coords().any(|c| !self.contains_coord(*c)),
            Shape::Polygon(p) => p.exterior().coords().any(|c| !self.contains_coord(*c)),
        };
        if outside {
            let world = self.world_bounds;
            return Err(SpatialError::invalid_shape(format!(
                "{} is outside of world bounds [{}, {}, {}, {}]",
                shape.kind_name(),
                world.min().x,
                world.max().x,
                world.min().y,
                world.max().y
            )));
        }
        Ok(())
    }
}

impl Default for SpatialContext {
    fn default() -> Self {
        SpatialContext::new(ContextKind::Jts, true, None)
    }
}

/// Points of the meridian edges of a geo rectangle where the distance to
/// `point` can be extremal
///
/// Along a meridian `cos d = sin(lat0) sin(lat) + cos(lat0) cos(lat) cos(dlon)`
/// is a sinusoid in `lat`, so it peaks at `atan2(sin(lat0), cos(lat0) cos(dlon))`
/// and bottoms out half a turn away. The edge endpoints cover the rest.
fn meridian_edge_extremes(
    point: Point<f64>,
    rect: &Rect<f64>,
) -> impl Iterator<Item = Point<f64>> {
    let (min, max) = (rect.min(), rect.max());
    let (sin_lat, cos_lat) = point.y().to_radians().sin_cos();
    [min.x, max.x].into_iter().flat_map(move |edge_lon| {
        let b = cos_lat * (edge_lon - point.x()).to_radians().cos();
        let nearest = sin_lat.atan2(b).to_degrees();
        let farthest = if nearest > 0.0 { nearest - 180.0 } else { nearest + 180.0 };
        [nearest, farthest, min.y, max.y].map(|lat| Point::new(edge_lon, lat.clamp(min.y, max.y)))
    })
}

// ============================================================================
// Polygon validation
// ============================================================================

fn validate_ring(ring: &LineString<f64>) -> Result<()> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in ring.coords() {
        if coords.last() != Some(c) {
            coords.push(*c);
        }
    }
    // The ring is closed, so the last coordinate repeats the first
    let distinct = coords.len().saturating_sub(1);
    if distinct < 3 {
        let given: Vec<String> = ring
            .coords()
            .map(|c| format!("({} {})", c.x, c.y))
            .collect();
        return Err(SpatialError::invalid_argument(format!(
            "Polygon ring requires at least 3 distinct points, instead given: {}",
            given.join(", ")
        )));
    }

    let edges: Vec<Line<f64>> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let n = edges.len();
    for i in 0..n {
        for j in (i + 2)..n {
            // first and last edges share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return Err(SpatialError::invalid_shape(format!(
                    "Self-intersection at or near edge ({} {}, {} {})",
                    edges[j].start.x, edges[j].start.y, edges[j].end.x, edges[j].end.y
                )));
            }
        }
    }
    Ok(())
}
