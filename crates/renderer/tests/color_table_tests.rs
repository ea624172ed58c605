//! Tests for color tables: threshold semantics and file loading.

use renderer::{ColorRule, ColorTable, ColorTableError, Rgba};
use std::io::Write;

const TRANSPARENT: Rgba = Rgba::TRANSPARENT;
const PALE: Rgba = Rgba::opaque(230, 230, 255);
const BLUE: Rgba = Rgba::opaque(0, 0, 255);
const SKY: Rgba = Rgba::opaque(0, 128, 255);
const GREEN: Rgba = Rgba::opaque(0, 255, 0);
const YELLOW: Rgba = Rgba::opaque(255, 255, 0);
const ORANGE: Rgba = Rgba::opaque(255, 165, 0);
const RED: Rgba = Rgba::opaque(255, 0, 0);
const PURPLE: Rgba = Rgba::opaque(128, 0, 128);
const PINK: Rgba = Rgba::opaque(255, 20, 147);

// ============================================================================
// Default reflectivity table
// ============================================================================

#[test]
fn test_default_table_bins() {
    let table = ColorTable::default();
    let cases = [
        (-99.0, TRANSPARENT),
        (-0.1, TRANSPARENT),
        (2.5, PALE),
        (7.0, BLUE),
        (15.0, SKY),
        (25.0, GREEN),
        (35.0, YELLOW),
        (45.0, ORANGE),
        (55.0, RED),
        (65.0, PURPLE),
        (75.0, PINK),
        (1e9, PINK),
        (f64::INFINITY, PINK),
    ];
    for (sample, expected) in cases {
        assert_eq!(table.color_for(sample), expected, "sample {sample}");
    }
}

#[test]
fn test_exact_boundaries_fall_into_upper_bin() {
    let table = ColorTable::reflectivity();
    let cases = [
        (0.0, PALE),
        (5.0, BLUE),
        (10.0, SKY),
        (20.0, GREEN),
        (30.0, YELLOW),
        (40.0, ORANGE),
        (50.0, RED),
        (60.0, PURPLE),
        (70.0, PINK),
    ];
    for (sample, expected) in cases {
        assert_eq!(table.color_for(sample), expected, "sample {sample}");
    }
}

#[test]
fn test_first_matching_rule_wins() {
    // Deliberately unsorted: the wide rule shadows the narrow one
    let table = ColorTable::new(
        "shadowed",
        vec![ColorRule::new(100.0, RED), ColorRule::new(10.0, BLUE)],
        GREEN,
    );
    assert_eq!(table.color_for(5.0), RED);
    assert_eq!(table.color_for(150.0), GREEN);

    let reversed = ColorTable::new(
        "sorted",
        vec![ColorRule::new(10.0, BLUE), ColorRule::new(100.0, RED)],
        GREEN,
    );
    assert_eq!(reversed.color_for(5.0), BLUE);
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_from_json() {
    let json = r##"{
        "name": "reflectivity",
        "units": "dBZ",
        "rules": [
            {"below": 0, "color": "#00000000", "label": "no echo"},
            {"below": 5, "color": "#E6E6FF"}
        ],
        "default": "#FF1493"
    }"##;
    let table = ColorTable::from_json(json).unwrap();

    assert_eq!(table.name(), "reflectivity");
    assert_eq!(table.units(), Some("dBZ"));
    assert_eq!(table.rules().len(), 2);
    assert_eq!(table.rules()[0].label.as_deref(), Some("no echo"));
    assert_eq!(table.color_for(-1.0), TRANSPARENT);
    assert_eq!(table.color_for(1.0), PALE);
    assert_eq!(table.color_for(5.0), PINK);
}

#[test]
fn test_from_yaml_with_unbounded_last_rule() {
    let yaml = r##"
name: precip
rules:
  - below: 1
    color: "#00000000"
  - below: 10
    color: "#00FF00"
  - color: "#FF0000"
"##;
    let table = ColorTable::from_yaml(yaml).unwrap();
    assert_eq!(table.rules().len(), 2);
    assert_eq!(table.default_color(), RED);
    assert_eq!(table.color_for(50.0), RED);
}

#[test]
fn test_loaded_rules_keep_file_order() {
    let json = r##"{
        "rules": [
            {"below": 50, "color": "#FF0000"},
            {"below": 10, "color": "#0000FF"}
        ],
        "default": "#00FF00"
    }"##;
    let table = ColorTable::from_json(json).unwrap();
    assert_eq!(table.name(), "custom");
    assert_eq!(table.color_for(5.0), RED);
}

#[test]
fn test_invalid_tables() {
    let bad_color = r##"{"rules": [{"below": 0, "color": "red"}], "default": "#000000"}"##;
    assert!(matches!(
        ColorTable::from_json(bad_color).unwrap_err(),
        ColorTableError::Json(_)
    ));

    let no_default = r##"{"rules": [{"below": 0, "color": "#000000"}]}"##;
    assert!(matches!(
        ColorTable::from_json(no_default).unwrap_err(),
        ColorTableError::MissingDefault
    ));

    let gap = r##"{"rules": [{"color": "#000000"}, {"below": 1, "color": "#FFFFFF"}], "default": "#000000"}"##;
    assert!(matches!(
        ColorTable::from_json(gap).unwrap_err(),
        ColorTableError::InvalidRule { index: 0, .. }
    ));

    let ambiguous = r##"{"rules": [{"color": "#000000"}], "default": "#FFFFFF"}"##;
    assert!(matches!(
        ColorTable::from_json(ambiguous).unwrap_err(),
        ColorTableError::InvalidRule { .. }
    ));

    let nan = "rules:\n  - below: .nan\n    color: '#000000'\ndefault: '#FFFFFF'\n";
    assert!(matches!(
        ColorTable::from_yaml(nan).unwrap_err(),
        ColorTableError::InvalidRule { index: 0, .. }
    ));
}

#[test]
fn test_from_file_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("table.json");
    std::fs::File::create(&json_path)
        .unwrap()
        .write_all(br##"{"rules": [], "default": "#0000FF"}"##)
        .unwrap();
    assert_eq!(ColorTable::from_file(&json_path).unwrap().color_for(0.0), BLUE);

    let yaml_path = dir.path().join("table.yaml");
    std::fs::write(&yaml_path, "default: '#00FF00'\n").unwrap();
    assert_eq!(ColorTable::from_file(&yaml_path).unwrap().color_for(0.0), GREEN);

    assert!(matches!(
        ColorTable::from_file(dir.path().join("missing.yaml")).unwrap_err(),
        ColorTableError::Io(_)
    ));
}

#[test]
fn test_legend_serializes() {
    let legend = ColorTable::reflectivity().legend();
    let json = serde_json::to_value(&legend).unwrap();

    assert_eq!(json[0]["color"], "#00000000");
    assert_eq!(json[0]["label"], "no echo");
    assert_eq!(json[1]["lower"], 0.0);
    assert_eq!(json[9]["color"], "#FF1493");
    assert!(json[9]["upper"].is_null());
}
