//! Prefix tree grids
//!
//! A grid recursively subdivides the world into cells. Every cell has a
//! token; a child's token is its parent's token plus one character, so
//! ancestry is string prefix.
//!
//! - Geohash: base-32, 32 children per cell, always over the geo world.
//!   Bits alternate between longitude and latitude, longitude first.
//! - Quad: 4 children per cell over the context's world bounds.
//!   `A` = south-west, `B` = south-east, `C` = north-west, `D` = north-east.
//!
//! Shapes are approximated by a covering: the cells intersecting the shape,
//! stopping at cells fully inside the shape or at the detail level. Circles
//! are related to cells by distance, so the covering holds every point of
//! the circle. The covering is refined one level at a time and stops early
//! once the next level would relate more than [`MAX_COVERING_CELLS`] cells;
//! the cells reached so far then become leaves.

use crate::config::PrefixTreeKind;
use geo::{BoundingRect, Contains, Intersects};
use geo_types::{Coord, Geometry, Point, Polygon, Rect};
use spatia_core::{Circle, Shape, SpatialContext};
use std::collections::BTreeSet;
use tracing::debug;

const GEOHASH_ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";
const QUAD_ALPHABET: &[u8; 4] = b"ABCD";

/// Most cells related to a shape while refining one level of a covering
pub const MAX_COVERING_CELLS: usize = 1 << 16;

/// Relative slack on circle radii so cells holding boundary points are kept
const RADIUS_SLACK: f64 = 1e-9;

// ============================================================================
// CoverShape
// ============================================================================

/// How a cell relates to a shape being covered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRelation {
    /// No common point
    Disjoint,
    /// Some common point, cell not fully inside
    Intersects,
    /// Cell fully inside the shape
    Within,
}

/// Shape a covering is computed for
#[derive(Debug, Clone, Copy)]
pub enum CoverShape<'a> {
    /// Canonical geometry, compared with geo predicates
    Geometry {
        /// Geometry to cover
        geometry: &'a Geometry<f64>,
        /// Its bounding rectangle, `None` for an empty geometry
        bounds: Option<Rect<f64>>,
    },
    /// Circle, compared by distance in its context
    Circle {
        /// Context distances are measured in
        context: &'a SpatialContext,
        /// Circle to cover
        circle: &'a Circle,
    },
}

impl<'a> CoverShape<'a> {
    /// Cover a geometry
    pub fn geometry(geometry: &'a Geometry<f64>) -> Self {
        CoverShape::Geometry {
            geometry,
            bounds: geometry.bounding_rect(),
        }
    }

    /// Cover a circle
    pub fn circle(context: &'a SpatialContext, circle: &'a Circle) -> Self {
        CoverShape::Circle { context, circle }
    }

    fn as_point(&self) -> Option<Point<f64>> {
        match self {
            CoverShape::Geometry {
                geometry: Geometry::Point(point),
                ..
            } => Some(*point),
            _ => None,
        }
    }

    /// Relation of a cell to the shape
    pub fn relate(&self, cell: &Rect<f64>) -> CellRelation {
        match self {
            CoverShape::Geometry { geometry, bounds } => {
                let Some(bounds) = bounds else {
                    return CellRelation::Disjoint;
                };
                if !rects_intersect(cell, bounds) {
                    return CellRelation::Disjoint;
                }
                if let Geometry::Rect(_) = geometry {
                    return if rect_within(cell, bounds) {
                        CellRelation::Within
                    } else {
                        CellRelation::Intersects
                    };
                }
                if !geometry.intersects(&Geometry::Rect(*cell)) {
                    return CellRelation::Disjoint;
                }
                let within = rect_within(cell, bounds)
                    && match geometry {
                        Geometry::Polygon(polygon) => polygon_holds_cell(polygon, cell),
                        _ => false,
                    };
                if within {
                    CellRelation::Within
                } else {
                    CellRelation::Intersects
                }
            }
            CoverShape::Circle { context, circle } => {
                let center = circle.center();
                let radius = circle.radius();
                let reach = radius * (1.0 + RADIUS_SLACK) + f64::MIN_POSITIVE;
                if context.min_distance_to_rect(center, cell) > reach {
                    CellRelation::Disjoint
                } else if context.max_distance_to_rect(center, cell) <= radius {
                    CellRelation::Within
                } else {
                    CellRelation::Intersects
                }
            }
        }
    }
}

// ============================================================================
// SpatialPrefixTree
// ============================================================================

/// Hierarchical grid used by prefix tree strategies
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPrefixTree {
    kind: PrefixTreeKind,
    max_levels: usize,
    world: Rect<f64>,
}

impl SpatialPrefixTree {
    /// Create a grid over the context's world
    ///
    /// Geohash grids always span the geo world.
    pub fn new(kind: PrefixTreeKind, max_levels: usize, context: &SpatialContext) -> Self {
        let world = match kind {
            PrefixTreeKind::GeohashPrefixTree => SpatialContext::geo_world(),
            PrefixTreeKind::QuadPrefixTree => context.world_bounds(),
        };
        SpatialPrefixTree {
            kind,
            max_levels,
            world,
        }
    }

    /// Grid kind
    pub fn kind(&self) -> PrefixTreeKind {
        self.kind
    }

    /// Deepest level of the grid
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Rectangle the grid subdivides
    pub fn world(&self) -> Rect<f64> {
        self.world
    }

    fn alphabet(&self) -> &'static [u8] {
        match self.kind {
            PrefixTreeKind::GeohashPrefixTree => GEOHASH_ALPHABET,
            PrefixTreeKind::QuadPrefixTree => QUAD_ALPHABET,
        }
    }

    /// Tokens of the children of a cell, empty at the deepest level
    pub fn child_tokens(&self, token: &str) -> Vec<String> {
        if token.len() >= self.max_levels {
            return Vec::new();
        }
        self.alphabet()
            .iter()
            .map(|&c| {
                let mut child = String::with_capacity(token.len() + 1);
                child.push_str(token);
                child.push(c as char);
                child
            })
            .collect()
    }

    /// Rectangle of a cell, `None` for a malformed token
    pub fn cell_rect(&self, token: &str) -> Option<Rect<f64>> {
        match self.kind {
            PrefixTreeKind::GeohashPrefixTree => geohash_rect(self.world, token),
            PrefixTreeKind::QuadPrefixTree => quad_rect(self.world, token),
        }
    }

    /// Token of the cell holding a point at `level`
    pub fn point_token(&self, point: Point<f64>, level: usize) -> String {
        match self.kind {
            PrefixTreeKind::GeohashPrefixTree => geohash_encode(self.world, point, level),
            PrefixTreeKind::QuadPrefixTree => quad_encode(self.world, point, level),
        }
    }

    /// Width and height of the cells at `level`
    pub fn cell_size(&self, level: usize) -> (f64, f64) {
        let width = self.world.width();
        let height = self.world.height();
        match self.kind {
            PrefixTreeKind::GeohashPrefixTree => {
                let bits = 5 * level;
                let lon_bits = (bits + 1) / 2;
                let lat_bits = bits / 2;
                (width / 2f64.powi(lon_bits as i32), height / 2f64.powi(lat_bits as i32))
            }
            PrefixTreeKind::QuadPrefixTree => {
                let divisor = 2f64.powi(level as i32);
                (width / divisor, height / divisor)
            }
        }
    }

    /// Shallowest level whose cells are no larger than `distance` on either side
    ///
    /// A distance of zero or less, or one finer than the deepest level,
    /// selects the deepest level.
    pub fn level_for_distance(&self, distance: f64) -> usize {
        if distance <= 0.0 {
            return self.max_levels;
        }
        (1..=self.max_levels)
            .find(|&level| {
                let (w, h) = self.cell_size(level);
                w <= distance && h <= distance
            })
            .unwrap_or(self.max_levels)
    }

    /// Level a shape is approximated at for a distance error tolerance
    ///
    /// The tolerance is a fraction of the distance from the center of the
    /// shape's bounding box to its corner. Points always use the deepest level.
    pub fn detail_level(&self, context: &SpatialContext, shape: &Shape, dist_err_pct: f64) -> usize {
        if shape.is_point() || dist_err_pct <= 0.0 {
            return self.max_levels;
        }
        let bounds = context.bounding_rect(shape);
        let center = Point::from(bounds.center());
        let corner = Point::from(bounds.max());
        let distance = context.distance(center, corner) * dist_err_pct;
        self.level_for_distance(distance)
    }

    /// Tokens of the cells covering a shape down to `detail_level`
    ///
    /// Each returned cell either lies within the shape, sits at the detail
    /// level, or sits at the level where the cell budget ran out. Tokens come
    /// out coarsest level first.
    pub fn covering(&self, shape: &CoverShape<'_>, detail_level: usize) -> Vec<String> {
        let detail_level = detail_level.clamp(1, self.max_levels);
        if let Some(point) = shape.as_point() {
            return vec![self.point_token(point, detail_level)];
        }
        let branching = self.alphabet().len();
        let mut cells = Vec::new();
        let mut frontier = vec![String::new()];
        for level in 1..=detail_level {
            if level > 1 && frontier.len() * branching > MAX_COVERING_CELLS {
                debug!(
                    target: "spatia::index",
                    level = level - 1,
                    detail_level,
                    frontier = frontier.len(),
                    "Covering cell budget reached"
                );
                break;
            }
            let mut next = Vec::new();
            for token in &frontier {
                for child in self.child_tokens(token) {
                    let Some(rect) = self.cell_rect(&child) else {
                        continue;
                    };
                    match shape.relate(&rect) {
                        CellRelation::Disjoint => {}
                        CellRelation::Within => cells.push(child),
                        CellRelation::Intersects => next.push(child),
                    }
                }
            }
            frontier = next;
        }
        cells.extend(frontier);
        cells
    }
}

// No ring touches the cell, so the cell is inside iff its center is
fn polygon_holds_cell(polygon: &Polygon<f64>, cell: &Rect<f64>) -> bool {
    let touches_boundary = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .any(|ring| ring.intersects(cell));
    !touches_boundary && polygon.contains(&Point::from(cell.center()))
}

fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}

fn rect_within(inner: &Rect<f64>, outer: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.max().x <= outer.max().x
        && inner.min().y >= outer.min().y
        && inner.max().y <= outer.max().y
}

// Midpoint that cannot overflow on a full-range world
fn midpoint(min: f64, max: f64) -> f64 {
    min / 2.0 + max / 2.0
}

fn geohash_rect(world: Rect<f64>, token: &str) -> Option<Rect<f64>> {
    let (mut min_x, mut max_x) = (world.min().x, world.max().x);
    let (mut min_y, mut max_y) = (world.min().y, world.max().y);
    let mut is_lon = true;
    for byte in token.bytes() {
        let value = GEOHASH_ALPHABET.iter().position(|&c| c == byte)?;
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1 == 1;
            if is_lon {
                let mid = midpoint(min_x, max_x);
                if bit {
                    min_x = mid;
                } else {
                    max_x = mid;
                }
            } else {
                let mid = midpoint(min_y, max_y);
                if bit {
                    min_y = mid;
                } else {
                    max_y = mid;
                }
            }
            is_lon = !is_lon;
        }
    }
    Some(Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }))
}

fn geohash_encode(world: Rect<f64>, point: Point<f64>, level: usize) -> String {
    let (mut min_x, mut max_x) = (world.min().x, world.max().x);
    let (mut min_y, mut max_y) = (world.min().y, world.max().y);
    let mut is_lon = true;
    let mut token = String::with_capacity(level);
    for _ in 0..level {
        let mut value = 0usize;
        for _ in 0..5 {
            value <<= 1;
            if is_lon {
                let mid = midpoint(min_x, max_x);
                if point.x() >= mid {
                    value |= 1;
                    min_x = mid;
                } else {
                    max_x = mid;
                }
            } else {
                let mid = midpoint(min_y, max_y);
                if point.y() >= mid {
                    value |= 1;
                    min_y = mid;
                } else {
                    max_y = mid;
                }
            }
            is_lon = !is_lon;
        }
        token.push(GEOHASH_ALPHABET[value] as char);
    }
    token
}

fn quad_rect(world: Rect<f64>, token: &str) -> Option<Rect<f64>> {
    let (mut min_x, mut max_x) = (world.min().x, world.max().x);
    let (mut min_y, mut max_y) = (world.min().y, world.max().y);
    for byte in token.bytes() {
        let mid_x = midpoint(min_x, max_x);
        let mid_y = midpoint(min_y, max_y);
        let (east, north) = match byte {
            b'A' => (false, false),
            b'B' => (true, false),
            b'C' => (false, true),
            b'D' => (true, true),
            _ => return None,
        };
        if east {
            min_x = mid_x;
        } else {
            max_x = mid_x;
        }
        if north {
            min_y = mid_y;
        } else {
            max_y = mid_y;
        }
    }
    Some(Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }))
}

fn quad_encode(world: Rect<f64>, point: Point<f64>, level: usize) -> String {
    let (mut min_x, mut max_x) = (world.min().x, world.max().x);
    let (mut min_y, mut max_y) = (world.min().y, world.max().y);
    let mut token = String::with_capacity(level);
    for _ in 0..level {
        let mid_x = midpoint(min_x, max_x);
        let mid_y = midpoint(min_y, max_y);
        let east = point.x() >= mid_x;
        let north = point.y() >= mid_y;
        if east {
            min_x = mid_x;
        } else {
            max_x = mid_x;
        }
        if north {
            min_y = mid_y;
        } else {
            max_y = mid_y;
        }
        token.push(match (east, north) {
            (false, false) => 'A',
            (true, false) => 'B',
            (false, true) => 'C',
            (true, true) => 'D',
        });
    }
    token
}

// ============================================================================
// CellSet
// ============================================================================

/// Set of cells answering coverage questions
///
/// A cell is covered if the set holds it or one of its ancestors, or if
/// every one of its children is covered.
#[derive(Debug, Clone)]
pub struct CellSet {
    grid: SpatialPrefixTree,
    tokens: BTreeSet<String>,
}

impl CellSet {
    /// Build a set from cell tokens
    pub fn new<I, S>(grid: &SpatialPrefixTree, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CellSet {
            grid: grid.clone(),
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of cells in the set
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the set holds no cell
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Check if a cell is covered by the set
    pub fn covers(&self, token: &str) -> bool {
        if (0..=token.len()).any(|end| self.tokens.contains(&token[..end])) {
            return true;
        }
        if !self.has_descendant(token) {
            return false;
        }
        let children = self.grid.child_tokens(token);
        !children.is_empty() && children.iter().all(|child| self.covers(child))
    }

    fn has_descendant(&self, token: &str) -> bool {
        self.tokens
            .range::<str, _>((std::ops::Bound::Excluded(token), std::ops::Bound::Unbounded))
            .next()
            .is_some_and(|next| next.starts_with(token))
    }
}
