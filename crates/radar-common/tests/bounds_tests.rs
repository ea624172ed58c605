//! Tests for GeoBounds serialization and overlay corner output.

use radar_common::GeoBounds;

#[test]
fn test_bounds_serialize_field_names() {
    let bounds = GeoBounds::new(37.5, -123.0, 38.0, -122.0);
    let json = serde_json::to_value(bounds).unwrap();
    assert_eq!(json["south"], 37.5);
    assert_eq!(json["west"], -123.0);
    assert_eq!(json["north"], 38.0);
    assert_eq!(json["east"], -122.0);
}

#[test]
fn test_bounds_deserialize() {
    let bounds: GeoBounds =
        serde_json::from_str(r#"{"south": 20.0, "west": -130.0, "north": 55.0, "east": -60.0}"#)
            .unwrap();
    assert_eq!(bounds, GeoBounds::new(20.0, -130.0, 55.0, -60.0));
}

#[test]
fn test_corners_match_overlay_shape() {
    // Leaflet-style ImageOverlay bounds: [[south, west], [north, east]]
    let bounds = GeoBounds::new(37.5, -123.0, 38.0, -122.0);
    assert_eq!(bounds.corners(), [[37.5, -123.0], [38.0, -122.0]]);
}

#[test]
fn test_extent() {
    let bounds = GeoBounds::new(20.005, -129.995, 54.995, -60.005);
    assert!((bounds.width() - 69.99).abs() < 1e-9);
    assert!((bounds.height() - 34.99).abs() < 1e-9);
    assert!(bounds.contains_point(37.75, -122.5));
    assert!(!bounds.contains_point(60.0, -122.5));
}
