//! Shape text formats and validation

use crate::common::*;
use spatia::{ContextKind, SpatialContext};

#[test]
fn round_trip_all_formats() {
    for format in ShapeFormat::ALL {
        for shape in sample_shapes() {
            let text = shape.to_format_string(format);
            let parsed = Shape::parse(&text, format)
                .unwrap_or_else(|e| panic!("{} text {} failed to parse: {}", format, text, e));
            assert_eq!(parsed, shape, "{} round trip of {}", format, text);
        }
    }
}

#[test]
fn wkt_extensions() {
    assert_eq!(
        Shape::rectangle(-10.0, 10.0, -5.0, 5.0).to_string(),
        "ENVELOPE(-10, 10, 5, -5)"
    );
    assert_eq!(Shape::circle(3.0, 4.0, 1.5).to_string(), "BUFFER(POINT(3 4), 1.5)");
    assert_eq!(
        "envelope(0, 2, 3, 1)".parse::<Shape>().unwrap(),
        Shape::rectangle(0.0, 2.0, 1.0, 3.0)
    );
}

#[test]
fn stored_shapes_round_trip_through_index() {
    let index = TestIndex::with(&[("strategy", "Composite")]).with_stations();
    for (i, shape) in sample_shapes().into_iter().enumerate() {
        index
            .manager
            .insert_entry(&station(&format!("s{}", i), 1, shape), false)
            .unwrap();
    }
    let everything = Shape::rectangle(-50.0, 50.0, -50.0, 50.0);
    assert_eq!(index.scan("WITHIN", everything).len(), sample_shapes().len());
}

#[test]
fn polygon_rules_depend_on_context() {
    let jts = SpatialContext::new(ContextKind::Jts, true, None);
    let spatial4j = SpatialContext::new(ContextKind::Spatial4J, true, None);
    let square = Shape::polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    assert!(jts.to_geometry(&square).is_ok());
    assert!(matches!(
        spatial4j.to_geometry(&square),
        Err(SpatialError::InvalidShape(_))
    ));

    let bowtie = Shape::polygon(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);
    assert!(matches!(jts.to_geometry(&bowtie), Err(SpatialError::InvalidShape(_))));

    let degenerate = Shape::polygon(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
    assert!(matches!(
        jts.to_geometry(&degenerate),
        Err(SpatialError::InvalidArgument(_))
    ));
}

#[test]
fn manager_converts_to_geometry() {
    let index = TestIndex::in_memory();
    let geometry = index
        .manager
        .to_geometry(&Shape::rectangle(0.0, 1.0, 0.0, 1.0))
        .unwrap();
    assert!(matches!(geometry, geo_types::Geometry::Rect(_)));
}
