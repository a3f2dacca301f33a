//! GeoJSON reading and writing
//!
//! Rectangles are written as `{"type":"Envelope","coordinates":[[minX,maxY],[maxX,minY]]}`
//! and circles as `{"type":"Circle","coordinates":[x,y],"radius":r}`.

use super::{Circle, Shape};
use crate::error::{Result, SpatialError};
use geo_types::{Coord, LineString, Point, Polygon, Rect};
use serde_json::{json, Value as JsonValue};

const FORMAT: &str = "GeoJSON";

fn parse_error(message: impl Into<String>) -> SpatialError {
    SpatialError::ShapeParse {
        format: FORMAT,
        message: message.into(),
    }
}

pub(super) fn write(shape: &Shape) -> String {
    let value = match shape {
        Shape::Point(p) => json!({ "type": "Point", "coordinates": [p.x(), p.y()] }),
        Shape::Rectangle(r) => json!({
            "type": "Envelope",
            "coordinates": [[r.min().x, r.max().y], [r.max().x, r.min().y]],
        }),
        Shape::Circle(c) => json!({
            "type": "Circle",
            "coordinates": [c.center().x(), c.center().y()],
            "radius": c.radius(),
        }),
        Shape::LineString(ls) => json!({ "type": "LineString", "coordinates": positions(ls) }),
        Shape::Polygon(p) => {
            let mut rings = vec![positions(p.exterior())];
            rings.extend(p.interiors().iter().map(positions));
            json!({ "type": "Polygon", "coordinates": rings })
        }
    };
    value.to_string()
}

fn positions(ls: &LineString<f64>) -> Vec<[f64; 2]> {
    ls.coords().map(|c| [c.x, c.y]).collect()
}

pub(super) fn parse(text: &str) -> Result<Shape> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| parse_error("missing \"type\" member"))?;
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| parse_error("missing \"coordinates\" member"))?;

    match kind {
        "Point" => Ok(Shape::Point(Point::from(position(coordinates)?))),
        "Envelope" => {
            let corners = position_list(coordinates)?;
            if corners.len() != 2 {
                return Err(parse_error("Envelope expects two corner positions"));
            }
            // [[minX, maxY], [maxX, minY]]
            Ok(Shape::Rectangle(Rect::new(
                Coord { x: corners[0].x, y: corners[1].y },
                Coord { x: corners[1].x, y: corners[0].y },
            )))
        }
        "Circle" => {
            let center = Point::from(position(coordinates)?);
            let radius = value
                .get("radius")
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| parse_error("Circle requires a numeric \"radius\""))?;
            Ok(Shape::Circle(Circle::new(center, radius)))
        }
        "LineString" => Ok(Shape::LineString(LineString::from(position_list(
            coordinates,
        )?))),
        "Polygon" => {
            let rings = coordinates
                .as_array()
                .ok_or_else(|| parse_error("Polygon coordinates must be an array of rings"))?;
            let mut rings = rings
                .iter()
                .map(|ring| position_list(ring).map(LineString::from));
            let exterior = rings
                .next()
                .ok_or_else(|| parse_error("Polygon requires an exterior ring"))??;
            let interiors = rings.collect::<Result<Vec<_>>>()?;
            Ok(Shape::Polygon(Polygon::new(exterior, interiors)))
        }
        other => Err(parse_error(format!("unsupported geometry type {}", other))),
    }
}

fn position(value: &JsonValue) -> Result<Coord<f64>> {
    let array = value
        .as_array()
        .ok_or_else(|| parse_error(format!("position must be an array, got {}", value)))?;
    match (
        array.first().and_then(JsonValue::as_f64),
        array.get(1).and_then(JsonValue::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(parse_error(format!(
            "position must hold two numbers, got {}",
            value
        ))),
    }
}

fn position_list(value: &JsonValue) -> Result<Vec<Coord<f64>>> {
    value
        .as_array()
        .ok_or_else(|| parse_error(format!("expected an array of positions, got {}", value)))?
        .iter()
        .map(position)
        .collect()
}
