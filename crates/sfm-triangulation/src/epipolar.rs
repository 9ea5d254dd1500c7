//! Epipolar consistency between two bearing sets under a known relative pose.

use glam::DVec3;
use thiserror::Error;

use crate::utils::{mat3_from_rows, vec3};

/// Squared-norm product below which a plane normal cannot define an angle.
const MIN_NORM_PRODUCT: f64 = 1e-12;

/// Errors returned by the epipolar consistency routines.
#[derive(Debug, Error)]
pub enum EpipolarError {
    /// Input slices disagree in length.
    #[error("Mismatched array lengths: bearings1 ({left_len}) != bearings2 ({right_len})")]
    MismatchedArrayLengths {
        /// Length of the first bearing set.
        left_len: usize,
        /// Length of the second bearing set.
        right_len: usize,
    },
}

/// Pairwise angular deviation from the epipolar constraint.
///
/// Returns an NxN matrix where entry `(i, j)` is the angle between
/// `bearings1[i]` and the epipolar plane spanned by the baseline
/// `translation_1_2` and `rotation_1_2 * bearings2[j]`. True correspondences
/// sit in their epipolar plane, so diagonal entries are near zero while
/// mismatched pairs measure strictly larger; this validates correspondences
/// without estimating any 3D point.
///
/// Bearings parallel to the baseline leave the plane normal undefined and
/// measure as angle 0.
pub fn epipolar_angles_two_bearings_many(
    bearings1: &[[f64; 3]],
    bearings2: &[[f64; 3]],
    rotation_1_2: &[[f64; 3]; 3],
    translation_1_2: &[f64; 3],
) -> Result<faer::Mat<f64>, EpipolarError> {
    if bearings1.len() != bearings2.len() {
        return Err(EpipolarError::MismatchedArrayLengths {
            left_len: bearings1.len(),
            right_len: bearings2.len(),
        });
    }

    let rotation = mat3_from_rows(rotation_1_2);
    let translation = vec3(translation_1_2);
    let normals: Vec<DVec3> = bearings2
        .iter()
        .map(|b2| translation.cross(rotation * vec3(b2)))
        .collect();

    let n = bearings1.len();
    let mut angles = faer::Mat::<f64>::zeros(n, n);
    for (i, b1) in bearings1.iter().enumerate() {
        let b1 = vec3(b1);
        for (j, normal) in normals.iter().enumerate() {
            angles.write(i, j, bearing_to_plane_angle(b1, *normal));
        }
    }
    Ok(angles)
}

/// Angle between a bearing and the plane with the given (unnormalized)
/// normal; 0 when the normal is degenerate.
fn bearing_to_plane_angle(bearing: DVec3, normal: DVec3) -> f64 {
    let denom = (bearing.length_squared() * normal.length_squared()).sqrt();
    if denom < MIN_NORM_PRODUCT {
        return 0.0;
    }
    (bearing.dot(normal).abs() / denom).min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epipolar_angles_separate_true_and_false_matches() {
        let gt_points = [[0.0, 0.0, 1.0], [1.0, 2.0, 3.0]];
        let (sin, cos) = 0.1f64.sin_cos();
        let rotation = [[cos, 0.0, sin], [0.0, 1.0, 0.0], [-sin, 0.0, cos]];
        let translation = [-1.0, 2.0, 0.2];

        let r = mat3_from_rows(&rotation);
        let t = vec3(&translation);
        let bearings1: Vec<[f64; 3]> = gt_points
            .iter()
            .map(|p| vec3(p).normalize().to_array())
            .collect();
        let bearings2: Vec<[f64; 3]> = gt_points
            .iter()
            .map(|p| (r.transpose() * (vec3(p) - t)).normalize().to_array())
            .collect();

        let angles =
            epipolar_angles_two_bearings_many(&bearings1, &bearings2, &rotation, &translation)
                .unwrap();
        assert_eq!(angles.nrows(), gt_points.len());
        assert_eq!(angles.ncols(), gt_points.len());
        for i in 0..gt_points.len() {
            for j in 0..gt_points.len() {
                if i == j {
                    assert!(angles.read(i, j) < 1e-6);
                } else {
                    assert!(angles.read(i, j) > 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_epipolar_angles_length_mismatch() {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let result = epipolar_angles_two_bearings_many(
            &[[0.0, 0.0, 1.0]],
            &[],
            &identity,
            &[1.0, 0.0, 0.0],
        );
        assert!(matches!(
            result,
            Err(EpipolarError::MismatchedArrayLengths { .. })
        ));
    }
}
