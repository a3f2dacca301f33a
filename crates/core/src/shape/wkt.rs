//! WKT reading and writing
//!
//! Standard geometries go through the `wkt` crate. Rectangles and circles use
//! the `ENVELOPE` and `BUFFER` extensions, which are handled here.

use super::{Circle, Shape};
use crate::error::{Result, SpatialError};
use geo_types::Geometry;
use std::str::FromStr;
use wkt::ToWkt;

const FORMAT: &str = "WKT";

fn parse_error(message: impl Into<String>) -> SpatialError {
    SpatialError::ShapeParse {
        format: FORMAT,
        message: message.into(),
    }
}

pub(super) fn write(shape: &Shape) -> String {
    match shape {
        Shape::Point(p) => Geometry::Point(*p).wkt_string(),
        Shape::Rectangle(r) => format!(
            "ENVELOPE({}, {}, {}, {})",
            r.min().x,
            r.max().x,
            r.max().y,
            r.min().y
        ),
        Shape::Circle(c) => format!(
            "BUFFER({}, {})",
            Geometry::Point(c.center()).wkt_string(),
            c.radius()
        ),
        Shape::LineString(ls) => Geometry::LineString(ls.clone()).wkt_string(),
        Shape::Polygon(p) => Geometry::Polygon(p.clone()).wkt_string(),
    }
}

pub(super) fn parse(text: &str) -> Result<Shape> {
    let text = text.trim();

    if let Some(args) = call_args(text, "ENVELOPE") {
        let values = parse_numbers(args)?;
        if values.len() != 4 {
            return Err(parse_error(format!(
                "ENVELOPE expects 4 values, got {}",
                values.len()
            )));
        }
        // ENVELOPE(minX, maxX, maxY, minY)
        return Ok(Shape::rectangle(values[0], values[1], values[3], values[2]));
    }

    if let Some(args) = call_args(text, "BUFFER") {
        let (point_text, radius_text) = args
            .rsplit_once(',')
            .ok_or_else(|| parse_error("BUFFER expects a point and a radius"))?;
        let center = match parse_geometry(point_text.trim())? {
            Geometry::Point(p) => p,
            _ => return Err(parse_error("BUFFER is only supported around a POINT")),
        };
        let radius = parse_number(radius_text)?;
        return Ok(Shape::Circle(Circle::new(center, radius)));
    }

    match parse_geometry(text)? {
        Geometry::Point(p) => Ok(Shape::Point(p)),
        Geometry::LineString(ls) => Ok(Shape::LineString(ls)),
        Geometry::Polygon(p) => Ok(Shape::Polygon(p)),
        Geometry::Rect(r) => Ok(Shape::Rectangle(r)),
        other => Err(parse_error(format!(
            "unsupported geometry type {}",
            geometry_name(&other)
        ))),
    }
}

fn parse_geometry(text: &str) -> Result<Geometry<f64>> {
    wkt::Wkt::<f64>::from_str(text)
        .map_err(|e| parse_error(format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| parse_error(format!("{:?}", e)))
        })
}

/// Returns the text between the parentheses of `NAME( ... )`, matching the
/// name case-insensitively.
fn call_args<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let head = text.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let rest = text[name.len()..].trim();
    rest.strip_prefix('(')?.strip_suffix(')')
}

fn parse_numbers(args: &str) -> Result<Vec<f64>> {
    args.split(',').map(parse_number).collect()
}

fn parse_number(token: &str) -> Result<f64> {
    let token = token.trim();
    token
        .parse::<f64>()
        .map_err(|_| parse_error(format!("'{}' is not a number", token)))
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
