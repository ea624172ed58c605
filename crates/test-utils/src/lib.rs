//! Shared test utilities for the mrms-radar workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A builder for synthetic GRIB2 messages
//! - gzip / zlib / raw deflate wrappers
//! - Reflectivity-like grid generators
//! - Skip macro for optional real MRMS samples
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod compress;
pub mod generators;
pub mod grib2;

use std::path::PathBuf;

// Re-export commonly used items at the crate root
pub use compress::*;
pub use generators::*;
pub use grib2::{Grib2Builder, Packing};

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Look for a sample file in `$TEST_DATA_DIR`, then `<workspace>/testdata/`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(dir).join(name));
    }
    candidates.push(workspace_root().join("testdata").join(name));
    candidates.into_iter().find(|p| p.is_file())
}

/// Macro to skip a test if the required file is not found.
///
/// Real MRMS downloads are large and not checked in, so tests over them
/// run only when a sample has been dropped into `testdata/` or
/// `TEST_DATA_DIR`.
///
/// ```ignore
/// let path = require_test_file!("MRMS_ReflectivityAtLowestAltitude.latest.grib2.gz");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Download test data or set TEST_DATA_DIR.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
