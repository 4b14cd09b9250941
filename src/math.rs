//! Double-precision vector types and periodic-image helpers.
//!
//! All simulation state uses `f64`; cell indices use `i32` triples with
//! `(-1, -1, -1)` reserved for the outside sentinel cell.

pub use glam::{DVec3, IVec3, UVec3};

/// Sentinel extent for an unbounded simulation domain.
pub const MAX_EXTENT: f64 = f64::MAX;

/// Sentinel origin component meaning "center the domain on zero".
///
/// Resolved to `-extent / 2` during [`crate::Environment::build`].
pub const CENTER_BOUNDARY_ORIGIN: f64 = f64::MAX;

/// Sentinel grid constant meaning "derive the cell size from the force cutoff".
pub const GRID_CONSTANT_AUTO: f64 = 0.0;

/// Periodic minimum-image displacement along one axis.
///
/// Returns the coordinate difference `x2 - x1` translated by one domain
/// length so that the pair interacts through the boundary instead of across
/// the interior. Note that `wrap_diff(x, x, extent) == extent`: a pair
/// flagged periodic on an axis always interacts through its image on that
/// axis, which is exactly what degenerate one-cell-thick periodic axes rely
/// on.
#[inline]
pub fn wrap_diff(x1: f64, x2: f64, extent: f64) -> f64 {
    if x2 > x1 {
        x2 - (x1 + extent)
    } else {
        (x2 + extent) - x1
    }
}
