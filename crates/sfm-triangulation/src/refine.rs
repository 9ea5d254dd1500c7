//! Nonlinear refinement of triangulated points.

use glam::{DMat3, DVec3};

use crate::utils::{outer3, vec3};

/// Ray length below which an observation is skipped for one iteration.
const MIN_RAY_NORM: f64 = 1e-12;

/// Hessian determinant magnitude below which iteration stops.
const MIN_HESSIAN_DET: f64 = 1e-12;

/// Iteratively refine a 3D point against all observation rays.
///
/// Runs a fixed number of Gauss-Newton steps on the bearing residuals
/// `normalize(point - center_i) - bearing_i`, which reduces the total
/// angular reprojection error for starting points already close to the
/// optimum. Always returns the current best estimate: there is no success
/// flag, and callers decide acceptance afterwards (typically via
/// [`crate::checks::point_is_valid`]). Iteration stops early when the
/// normal matrix loses rank or the estimate lands on a camera center.
///
/// PRECONDITION: `centers` and `bearings` have equal lengths.
///
/// Example:
///
/// ```
/// use sfm_triangulation::refine::refine_point;
///
/// let centers = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
/// let s = 0.5f64.sqrt();
/// let bearings = [[0.0, 0.0, 1.0], [-s, 0.0, s]];
/// let refined = refine_point(&centers, &bearings, &[0.1, 0.2, 1.3], 10);
/// let err = (refined[0].powi(2) + refined[1].powi(2) + (refined[2] - 1.0).powi(2)).sqrt();
/// assert!(err < 1e-6);
/// ```
pub fn refine_point(
    centers: &[[f64; 3]],
    bearings: &[[f64; 3]],
    initial_point: &[f64; 3],
    iterations: usize,
) -> [f64; 3] {
    assert_eq!(centers.len(), bearings.len());

    let mut point = vec3(initial_point);
    for _ in 0..iterations {
        let mut hessian = DMat3::ZERO;
        let mut gradient = DVec3::ZERO;
        for (center, bearing) in centers.iter().zip(bearings) {
            let ray = point - vec3(center);
            let norm = ray.length();
            if norm < MIN_RAY_NORM {
                continue;
            }
            let dir = ray / norm;
            // d normalize(ray) / d point, a scaled projector and symmetric,
            // so J^T folds away below
            let jacobian = (DMat3::IDENTITY - outer3(dir, dir)) * (1.0 / norm);
            let residual = dir - vec3(bearing);
            gradient += jacobian * residual;
            hessian += jacobian * jacobian;
        }
        if hessian.determinant().abs() < MIN_HESSIAN_DET {
            break;
        }
        point -= hessian.inverse() * gradient;
    }
    point.to_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::angle_between_vectors;

    fn two_camera_fixture() -> (Vec<[f64; 3]>, Vec<[f64; 3]>, [f64; 3]) {
        let gt_point = [0.0, 0.0, 1.0];
        let centers = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let bearings = centers
            .iter()
            .map(|c| (vec3(&gt_point) - vec3(c)).normalize().to_array())
            .collect();
        (centers, bearings, gt_point)
    }

    fn total_angular_error(
        centers: &[[f64; 3]],
        bearings: &[[f64; 3]],
        point: &[f64; 3],
    ) -> f64 {
        centers
            .iter()
            .zip(bearings)
            .map(|(c, b)| {
                let ray = (vec3(point) - vec3(c)).to_array();
                angle_between_vectors(&ray, b)
            })
            .sum()
    }

    #[test]
    fn test_refine_point_recovers_ground_truth() {
        let (centers, bearings, gt_point) = two_camera_fixture();
        let initial = [
            gt_point[0] + 0.1,
            gt_point[1] + 0.2,
            gt_point[2] + 0.3,
        ];
        let refined = refine_point(&centers, &bearings, &initial, 10);
        let err = (vec3(&refined) - vec3(&gt_point)).length();
        assert!(err < 1e-6);
    }

    #[test]
    fn test_refine_point_keeps_exact_solution() {
        let (centers, bearings, gt_point) = two_camera_fixture();
        let refined = refine_point(&centers, &bearings, &gt_point, 3);
        assert!((vec3(&refined) - vec3(&gt_point)).length() < 1e-9);
    }

    #[test]
    fn test_refine_point_single_step_improves() {
        let (centers, bearings, gt_point) = two_camera_fixture();
        let initial = [
            gt_point[0] + 0.1,
            gt_point[1] + 0.2,
            gt_point[2] + 0.3,
        ];
        let before = total_angular_error(&centers, &bearings, &initial);
        let stepped = refine_point(&centers, &bearings, &initial, 1);
        let after = total_angular_error(&centers, &bearings, &stepped);
        assert!(after < before);
    }

    #[test]
    fn test_refine_point_zero_iterations_is_identity() {
        let (centers, bearings, _) = two_camera_fixture();
        let initial = [0.4, -0.3, 2.0];
        assert_eq!(refine_point(&centers, &bearings, &initial, 0), initial);
    }
}
