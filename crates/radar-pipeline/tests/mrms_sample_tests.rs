//! Runs against a real MRMS download when one is available.
//!
//! Drop `MRMS_ReflectivityAtLowestAltitude.latest.grib2.gz` into `testdata/`
//! (or point `TEST_DATA_DIR` at it) to enable.

use radar_pipeline::render;
use test_utils::require_test_file;

#[test]
fn test_render_latest_mrms_reflectivity() {
    let path = require_test_file!("MRMS_ReflectivityAtLowestAltitude.latest.grib2.gz");
    let payload = std::fs::read(path).unwrap();

    let result = render(&payload, None).unwrap();

    // CONUS mosaic: 7000 x 3500 at 0.01°
    assert_eq!((result.width, result.height), (7000, 3500));
    assert!((result.bounds.west - -130.0).abs() < 0.01);
    assert!((result.bounds.east - -60.0).abs() < 0.01);
    assert!((result.bounds.south - 20.0).abs() < 0.01);
    assert!((result.bounds.north - 55.0).abs() < 0.01);
    assert!(result.metadata.reference_time.is_some());
    assert_eq!(&result.image[1..4], b"PNG");
}
