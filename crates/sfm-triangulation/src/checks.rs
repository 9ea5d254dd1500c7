use crate::utils::vec3;

/// Squared-norm product below which two vectors cannot define an angle.
const MIN_NORM_PRODUCT: f64 = 1e-12;

/// Angle in radians between two 3D vectors.
///
/// Returns `0.0` when either vector is too short to define a direction, so
/// zero-length rays compare as aligned instead of poisoning a threshold test
/// with NaN.
pub fn angle_between_vectors(u: &[f64; 3], v: &[f64; 3]) -> f64 {
    let (u, v) = (vec3(u), vec3(v));
    let denom = (u.length_squared() * v.length_squared()).sqrt();
    if denom < MIN_NORM_PRODUCT {
        return 0.0;
    }
    let cosine = u.dot(v) / denom;
    if cosine >= 1.0 {
        0.0
    } else if cosine <= -1.0 {
        std::f64::consts::PI
    } else {
        cosine.acos()
    }
}

/// Largest angle subtended by any pair of bearings, in radians.
///
/// This is the parallax diagnostic used to gate the solvers: configurations
/// where every pair of rays is nearly parallel have no depth information.
/// Returns `0.0` for fewer than two bearings.
pub fn max_pairwise_angle(bearings: &[[f64; 3]]) -> f64 {
    let mut max_angle = 0.0f64;
    for (i, a) in bearings.iter().enumerate() {
        for b in &bearings[i + 1..] {
            max_angle = max_angle.max(angle_between_vectors(a, b));
        }
    }
    max_angle
}

/// Acceptance policy shared by the triangulation solvers.
///
/// `centers` and `bearings` must be expressed in one common frame; the
/// candidate `point` is accepted when all of the following hold:
///
/// 1. some pair of bearings subtends at least `min_angle` radians,
/// 2. for every observation the signed depth along the viewing ray,
///    `(point - center) . bearing`, reaches `min_depth` (pass a negative
///    `min_depth` to disable this guard),
/// 3. for every observation the angle between `point - center` and the
///    observed bearing stays within that observation's threshold.
///
/// The reprojection metric is angular (radians) since observations are unit
/// bearings. The verdict is a plain bool; which condition failed is not
/// reported.
///
/// PRECONDITION: `centers`, `bearings` and `thresholds` have equal lengths.
pub fn point_is_valid(
    centers: &[[f64; 3]],
    bearings: &[[f64; 3]],
    point: &[f64; 3],
    thresholds: &[f64],
    min_angle: f64,
    min_depth: f64,
) -> bool {
    assert_eq!(centers.len(), bearings.len());
    assert_eq!(centers.len(), thresholds.len());

    if max_pairwise_angle(bearings) < min_angle {
        return false;
    }

    for ((center, bearing), threshold) in centers.iter().zip(bearings).zip(thresholds) {
        let ray = vec3(point) - vec3(center);
        if ray.dot(vec3(bearing)) < min_depth {
            return false;
        }
        if angle_between_vectors(&ray.to_array(), bearing) > *threshold {
            return false;
        }
    }
    true
}
