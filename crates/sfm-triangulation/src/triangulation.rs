//! Triangulation of 3D points from bearing observations.
//!
//! Two multi-view solvers plus a vectorized two-view variant:
//!
//! - [`triangulate_bearings_dlt`] — homogeneous linear least squares over
//!   camera poses (direct linear transform).
//! - [`triangulate_bearings_midpoint`] — minimizes the summed squared
//!   perpendicular distance to every observation ray.
//! - [`triangulate_two_bearings_midpoint`] / the `_many` batch form — the
//!   closed-form two-ray specialization for a fixed relative pose.
//!
//! Every solver validates its result through the policy in [`crate::checks`]
//! and reports geometric failures as routine `Err` values; callers are
//! expected to skip the point and move on.

use glam::{DMat3, DVec3};
use log::debug;
use thiserror::Error;

use crate::camera::Pose;
use crate::checks::{max_pairwise_angle, point_is_valid};
use crate::utils::{mat3_from_rows, outer3, vec3};

/// Determinant magnitude below which a linear system is rank deficient.
const DEGENERACY_EPS: f64 = 1e-10;

/// Homogeneous scale magnitude below which a solution is a point at infinity.
const HOMOGENEOUS_EPS: f64 = 1e-12;

/// Errors returned by the triangulation solvers.
#[derive(Debug, Error)]
pub enum TriangulationError {
    /// Input slices disagree in length.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedArrayLengths {
        /// Label for the left-hand slice.
        left_name: &'static str,
        /// Length of the left-hand slice.
        left_len: usize,
        /// Label for the right-hand slice.
        right_name: &'static str,
        /// Length of the right-hand slice.
        right_len: usize,
    },

    /// Not enough observations to constrain a 3D point.
    #[error("triangulation requires at least {required} observations, got {actual}")]
    InsufficientObservations {
        /// Minimum number of observations required.
        required: usize,
        /// Actual number of observations provided.
        actual: usize,
    },

    /// The observation rays do not determine a finite point: insufficient
    /// parallax, a rank-deficient system, or a solution at infinity.
    #[error("observation rays do not determine a finite 3D point")]
    DegenerateGeometry,

    /// A point was computed but failed the depth or reprojection checks.
    #[error("triangulated point failed the validity checks")]
    RejectedPoint,
}

/// Triangulate one 3D point from camera poses and camera-frame bearings.
///
/// Each observation contributes the three rank-deficient rows
/// `skew(bearing) * [R|t]` to a homogeneous least-squares system whose
/// solution is the right singular vector of the smallest singular value.
/// The dehomogenized point is then validated against the shared angular
/// reprojection `threshold`, the parallax gate `min_angle` and the signed
/// depth bound `min_depth` (negative disables the depth guard).
///
/// # Arguments
///
/// * `poses` - World-to-camera transform per observation.
/// * `bearings` - Unit observation direction per camera, in that camera's frame.
/// * `threshold` - Angular reprojection tolerance in radians, shared by all views.
/// * `min_angle` - Minimum parallax angle in radians.
/// * `min_depth` - Minimum signed depth along each viewing ray.
pub fn triangulate_bearings_dlt(
    poses: &[Pose],
    bearings: &[[f64; 3]],
    threshold: f64,
    min_angle: f64,
    min_depth: f64,
) -> Result<[f64; 3], TriangulationError> {
    if poses.len() != bearings.len() {
        return Err(TriangulationError::MismatchedArrayLengths {
            left_name: "poses",
            left_len: poses.len(),
            right_name: "bearings",
            right_len: bearings.len(),
        });
    }
    if poses.len() < 2 {
        return Err(TriangulationError::InsufficientObservations {
            required: 2,
            actual: poses.len(),
        });
    }

    let world_bearings: Vec<[f64; 3]> = poses
        .iter()
        .zip(bearings)
        .map(|(pose, bearing)| pose.rotate_to_world(bearing))
        .collect();
    if max_pairwise_angle(&world_bearings) < min_angle {
        debug!("DLT rejected: parallax below {} rad", min_angle);
        return Err(TriangulationError::DegenerateGeometry);
    }

    let point = triangulate_bearings_dlt_solve(poses, bearings)?;

    let centers: Vec<[f64; 3]> = poses.iter().map(Pose::center).collect();
    let thresholds = vec![threshold; bearings.len()];
    if !point_is_valid(
        &centers,
        &world_bearings,
        &point,
        &thresholds,
        min_angle,
        min_depth,
    ) {
        return Err(TriangulationError::RejectedPoint);
    }
    Ok(point)
}

/// Homogeneous least-squares solve of the stacked `skew(bearing) * [R|t]` rows.
fn triangulate_bearings_dlt_solve(
    poses: &[Pose],
    bearings: &[[f64; 3]],
) -> Result<[f64; 3], TriangulationError> {
    let mut a = faer::Mat::<f64>::zeros(3 * poses.len(), 4);
    for (i, (pose, bearing)) in poses.iter().zip(bearings).enumerate() {
        let r = &pose.rotation;
        let t = &pose.translation;
        let rt = [
            [r[0][0], r[0][1], r[0][2], t[0]],
            [r[1][0], r[1][1], r[1][2], t[1]],
            [r[2][0], r[2][1], r[2][2], t[2]],
        ];
        let [bx, by, bz] = *bearing;
        for j in 0..4 {
            a.write(3 * i, j, -bz * rt[1][j] + by * rt[2][j]);
            a.write(3 * i + 1, j, bz * rt[0][j] - bx * rt[2][j]);
            a.write(3 * i + 2, j, -by * rt[0][j] + bx * rt[1][j]);
        }
    }

    let svd = a.svd();
    let v = svd.v();
    let xh = v.col(3);
    let w = xh[3];
    if w.abs() < HOMOGENEOUS_EPS {
        debug!("DLT rejected: homogeneous solution at infinity");
        return Err(TriangulationError::DegenerateGeometry);
    }
    Ok([xh[0] / w, xh[1] / w, xh[2] / w])
}

/// Triangulate one 3D point from camera centers and world-frame bearings.
///
/// Finds the point minimizing the sum of squared perpendicular distances to
/// the rays `center_i + s * bearing_i` via the 3x3 normal equations built
/// from the projectors `I - b * b^T`. A rank-deficient normal matrix (all
/// rays parallel) is reported as degenerate instead of returning an
/// arbitrary least-squares artifact.
///
/// # Arguments
///
/// * `centers` - Camera center per observation, in world coordinates.
/// * `bearings` - Unit observation direction per camera, in world coordinates.
/// * `thresholds` - Angular reprojection tolerance in radians, per observation.
/// * `min_angle` - Minimum parallax angle in radians.
/// * `min_depth` - Minimum signed depth along each viewing ray; negative
///   disables the depth guard.
///
/// Example:
///
/// ```
/// use sfm_triangulation::triangulation::triangulate_bearings_midpoint;
///
/// let centers = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
/// let s = 0.5f64.sqrt();
/// let bearings = [[0.0, 0.0, 1.0], [-s, 0.0, s]];
/// let point = triangulate_bearings_midpoint(
///     &centers, &bearings, &[0.01, 0.01], 0.035, 1e-6,
/// ).unwrap();
/// assert!((point[0].powi(2) + point[1].powi(2) + (point[2] - 1.0).powi(2)).sqrt() < 1e-6);
/// ```
pub fn triangulate_bearings_midpoint(
    centers: &[[f64; 3]],
    bearings: &[[f64; 3]],
    thresholds: &[f64],
    min_angle: f64,
    min_depth: f64,
) -> Result<[f64; 3], TriangulationError> {
    if centers.len() != bearings.len() {
        return Err(TriangulationError::MismatchedArrayLengths {
            left_name: "centers",
            left_len: centers.len(),
            right_name: "bearings",
            right_len: bearings.len(),
        });
    }
    if bearings.len() != thresholds.len() {
        return Err(TriangulationError::MismatchedArrayLengths {
            left_name: "bearings",
            left_len: bearings.len(),
            right_name: "thresholds",
            right_len: thresholds.len(),
        });
    }
    if centers.len() < 2 {
        return Err(TriangulationError::InsufficientObservations {
            required: 2,
            actual: centers.len(),
        });
    }

    if max_pairwise_angle(bearings) < min_angle {
        debug!("midpoint rejected: parallax below {} rad", min_angle);
        return Err(TriangulationError::DegenerateGeometry);
    }

    let point = triangulate_bearings_midpoint_solve(centers, bearings)?;

    if !point_is_valid(centers, bearings, &point, thresholds, min_angle, min_depth) {
        return Err(TriangulationError::RejectedPoint);
    }
    Ok(point)
}

/// Normal-equations solve for the point closest to all rays.
fn triangulate_bearings_midpoint_solve(
    centers: &[[f64; 3]],
    bearings: &[[f64; 3]],
) -> Result<[f64; 3], TriangulationError> {
    let mut m = DMat3::ZERO;
    let mut rhs = DVec3::ZERO;
    for (center, bearing) in centers.iter().zip(bearings) {
        let b = vec3(bearing);
        let projector = DMat3::IDENTITY - outer3(b, b);
        m += projector;
        rhs += projector * vec3(center);
    }
    if m.determinant().abs() < DEGENERACY_EPS {
        debug!("midpoint rejected: normal matrix is rank deficient");
        return Err(TriangulationError::DegenerateGeometry);
    }
    Ok((m.inverse() * rhs).to_array())
}

/// Triangulate a single correspondence seen by two cameras with a known
/// relative pose.
///
/// Camera 1 sits at the origin; camera 2 at `translation_1_2` with its
/// bearing mapped through `rotation_1_2`. The result is the midpoint of the
/// closest point pair between the two rays, in camera-1 coordinates. No
/// angle/depth/reprojection thresholds apply at this level; the only failure
/// mode is a pair of (nearly) parallel rays, which includes the zero-baseline
/// pure-rotation case.
pub fn triangulate_two_bearings_midpoint(
    bearing1: &[f64; 3],
    bearing2: &[f64; 3],
    rotation_1_2: &[[f64; 3]; 3],
    translation_1_2: &[f64; 3],
) -> Result<[f64; 3], TriangulationError> {
    let b2 = mat3_from_rows(rotation_1_2) * vec3(bearing2);
    two_bearings_midpoint(vec3(bearing1), b2, vec3(translation_1_2))
        .map(|point| point.to_array())
        .ok_or(TriangulationError::DegenerateGeometry)
}

/// Triangulate many independent correspondences sharing one relative pose.
///
/// Lazy counterpart of [`triangulate_two_bearings_midpoint`]: returns an
/// exact-size, cloneable iterator yielding one result per correspondence
/// index, in input order. Indices are fully independent, so callers may
/// also evaluate items concurrently without affecting the results.
pub fn triangulate_two_bearings_midpoint_many<'a>(
    bearings1: &'a [[f64; 3]],
    bearings2: &'a [[f64; 3]],
    rotation_1_2: &[[f64; 3]; 3],
    translation_1_2: &[f64; 3],
) -> Result<
    impl ExactSizeIterator<Item = Result<[f64; 3], TriangulationError>> + Clone + 'a,
    TriangulationError,
> {
    if bearings1.len() != bearings2.len() {
        return Err(TriangulationError::MismatchedArrayLengths {
            left_name: "bearings1",
            left_len: bearings1.len(),
            right_name: "bearings2",
            right_len: bearings2.len(),
        });
    }
    let rotation = mat3_from_rows(rotation_1_2);
    let translation = vec3(translation_1_2);
    Ok(bearings1.iter().zip(bearings2).map(move |(b1, b2)| {
        two_bearings_midpoint(vec3(b1), rotation * vec3(b2), translation)
            .map(|point| point.to_array())
            .ok_or(TriangulationError::DegenerateGeometry)
    }))
}

/// Midpoint of the closest point pair between the ray through the origin
/// along `b1` and the ray from `t` along `b2`. `None` when the 2x2 normal
/// system of the two ray parameters is singular (parallel rays).
fn two_bearings_midpoint(b1: DVec3, b2: DVec3, t: DVec3) -> Option<DVec3> {
    let a11 = b1.length_squared();
    let a22 = b2.length_squared();
    let a12 = b1.dot(b2);
    // det = |b1|^2 |b2|^2 sin^2(angle between the rays)
    let det = a11 * a22 - a12 * a12;
    if det.abs() < DEGENERACY_EPS {
        return None;
    }
    let r1 = b1.dot(t);
    let r2 = b2.dot(t);
    let s = (a22 * r1 - a12 * r2) / det;
    let u = (a12 * r1 - a11 * r2) / det;
    Some((s * b1 + t + u * b2) * 0.5)
}
