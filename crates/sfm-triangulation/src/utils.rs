use glam::{DMat3, DVec3};

/// Convert a 3D array into a glam vector.
pub(crate) fn vec3(v: &[f64; 3]) -> DVec3 {
    DVec3::from_array(*v)
}

/// Convert a row-major 3x3 array into a glam matrix.
///
/// Poses and relative rotations are row-major, glam is column-major.
pub(crate) fn mat3_from_rows(m: &[[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m[0][0], m[1][0], m[2][0]),
        DVec3::new(m[0][1], m[1][1], m[2][1]),
        DVec3::new(m[0][2], m[1][2], m[2][2]),
    )
}

/// Outer product `a * b^T` as a glam matrix.
pub(crate) fn outer3(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mat3_from_rows_applies_rows() {
        let m = [[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let v = mat3_from_rows(&m) * DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(v, DVec3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn test_outer3_rank_one() {
        let a = DVec3::new(1.0, 2.0, 3.0);
        let b = DVec3::new(4.0, 5.0, 6.0);
        let m = outer3(a, b);
        assert_eq!(m.determinant(), 0.0);
        // column j is a * b[j]
        assert_eq!(m.x_axis, a * 4.0);
        assert_eq!(m.z_axis, a * 6.0);
    }
}
