//! Scans agree with filter near shape boundaries
//!
//! The exact strategy matches `filter` point for point. The prefix tree
//! strategy may add matches from its cell approximation but never drops one.

use crate::common::*;
use proptest::prelude::*;
use std::f64::consts::PI;

const OPERATIONS: [&str; 2] = ["INTERSECTS", "WITHIN"];

fn unit_circle() -> Shape {
    Shape::circle(0.0, 0.0, 1.0)
}

fn pentagon_vertices() -> [(f64, f64); 5] {
    [(-1.0, -1.0), (2.0, -1.0), (2.5, 1.0), (0.5, 2.0), (-1.0, 1.0)]
}

fn pentagon() -> Shape {
    Shape::polygon(&pentagon_vertices())
}

/// Point at `scale` times the unit circle radius in direction `angle`
fn near_circle(angle: f64, scale: f64) -> Shape {
    Shape::point(scale * angle.cos(), scale * angle.sin())
}

/// Point `t` along pentagon edge `edge`, pushed `offset` along its normal
fn near_pentagon(edge: usize, t: f64, offset: f64) -> Shape {
    let vertices = pentagon_vertices();
    let (x0, y0) = vertices[edge];
    let (x1, y1) = vertices[(edge + 1) % vertices.len()];
    let (dx, dy) = (x1 - x0, y1 - y0);
    let length = dx.hypot(dy);
    Shape::point(
        x0 + t * dx + offset * dy / length,
        y0 + t * dy - offset * dx / length,
    )
}

/// Index `points` and compare each scan of `area` with `filter`
fn check_agreement(
    strategy: &str,
    points: &[Shape],
    area: &Shape,
) -> std::result::Result<(), TestCaseError> {
    let index = TestIndex::with(&[
        ("storage.directory-type", "RAMDirectory"),
        ("strategy", strategy),
        ("strategy.distance-error-pct", "0.01"),
    ])
    .with_stations();
    for (i, point) in points.iter().enumerate() {
        index
            .manager
            .insert_entry(&station(&format!("p{}", i), 1, point.clone()), false)
            .unwrap();
    }

    let area_value = Value::from(area.clone());
    for operation in OPERATIONS {
        let hits = index.scan(operation, area.clone());
        for (i, point) in points.iter().enumerate() {
            let uid = format!("p{}", i);
            let expected = index
                .manager
                .filter(operation, &Value::from(point.clone()), &area_value)
                .unwrap();
            let scanned = hits.contains(&uid);
            if strategy == "Composite" {
                prop_assert_eq!(scanned, expected, "{} {} {}", operation, point, area);
            } else if expected {
                prop_assert!(scanned, "{} missed {} {}", strategy, point, operation);
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn circle_scans_agree_with_filter(
        samples in prop::collection::vec((0.0f64..2.0 * PI, 0.97f64..1.03), 24)
    ) {
        let points: Vec<Shape> = samples
            .into_iter()
            .map(|(angle, scale)| near_circle(angle, scale))
            .collect();
        for strategy in ["RecursivePrefixTree", "Composite"] {
            check_agreement(strategy, &points, &unit_circle())?;
        }
    }

    #[test]
    fn polygon_scans_agree_with_filter(
        samples in prop::collection::vec((0usize..5, 0.0f64..=1.0, -0.03f64..0.03), 24)
    ) {
        let points: Vec<Shape> = samples
            .into_iter()
            .map(|(edge, t, offset)| near_pentagon(edge, t, offset))
            .collect();
        for strategy in ["RecursivePrefixTree", "Composite"] {
            check_agreement(strategy, &points, &pentagon())?;
        }
    }
}

#[test]
fn points_beyond_circle_chords_are_scanned() {
    let angle = PI / 64.0;
    let gap = near_circle(angle, 0.99995);
    for strategy in ["RecursivePrefixTree", "Composite"] {
        let index = TestIndex::with(&[
            ("strategy", strategy),
            ("strategy.distance-error-pct", "0.0001"),
        ])
        .with_stations();
        index.manager.insert_entry(&station("gap", 1, gap.clone()), false).unwrap();

        let matched = index
            .manager
            .filter("INTERSECTS", &Value::from(gap.clone()), &Value::from(unit_circle()))
            .unwrap();
        assert!(matched);
        assert_eq!(index.scan("INTERSECTS", unit_circle()), vec!["gap"], "{}", strategy);
        assert_eq!(index.scan("WITHIN", unit_circle()), vec!["gap"], "{}", strategy);
    }
}
