#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera pose primitives.
pub mod camera;

/// Validity checks shared by the triangulation solvers.
pub mod checks;

/// Epipolar consistency between two bearing sets.
pub mod epipolar;

/// Nonlinear refinement of triangulated points.
pub mod refine;

/// Triangulation solvers.
pub mod triangulation;

pub(crate) mod utils;
