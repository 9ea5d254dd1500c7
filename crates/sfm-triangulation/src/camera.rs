use crate::utils::{mat3_from_rows, vec3};

/// Rigid world-to-camera transform of a single observation.
///
/// The rotation is row-major and maps a world point `X` into the camera
/// frame as `R * X + t`, the usual `[R|t]` layout of calibration pipelines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Row-major rotation matrix.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Pose {
    /// Create a pose from a row-major rotation matrix and a translation.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pose of a camera sitting at `center` with identity orientation.
    pub fn from_center(center: &[f64; 3]) -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [-center[0], -center[1], -center[2]],
        }
    }

    /// Camera center in world coordinates, `-R^T * t`.
    pub fn center(&self) -> [f64; 3] {
        let r = mat3_from_rows(&self.rotation);
        (-(r.transpose() * vec3(&self.translation))).to_array()
    }

    /// Map a world point into the camera frame, `R * X + t`.
    pub fn transform(&self, point: &[f64; 3]) -> [f64; 3] {
        let r = mat3_from_rows(&self.rotation);
        (r * vec3(point) + vec3(&self.translation)).to_array()
    }

    /// Map a camera-frame direction into the world frame, `R^T * v`.
    pub fn rotate_to_world(&self, direction: &[f64; 3]) -> [f64; 3] {
        let r = mat3_from_rows(&self.rotation);
        (r.transpose() * vec3(direction)).to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // rotation of 90 degrees around z, camera shifted along x
    fn sample_pose() -> Pose {
        Pose::new(
            [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            [0.0, 2.0, 0.0],
        )
    }

    #[test]
    fn test_center_inverts_translation() {
        let pose = sample_pose();
        let center = pose.center();
        assert_relative_eq!(center[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(center[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(center[2], 0.0, epsilon = 1e-12);

        // the center must map to the camera origin
        let origin = pose.transform(&center);
        for c in origin {
            assert_relative_eq!(c, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotate_to_world_roundtrip() {
        let pose = sample_pose();
        let direction = [0.3, -0.2, 0.9];
        let world = pose.rotate_to_world(&direction);
        let back = [
            pose.rotation[0][0] * world[0] + pose.rotation[0][1] * world[1]
                + pose.rotation[0][2] * world[2],
            pose.rotation[1][0] * world[0] + pose.rotation[1][1] * world[1]
                + pose.rotation[1][2] * world[2],
            pose.rotation[2][0] * world[0] + pose.rotation[2][1] * world[1]
                + pose.rotation[2][2] * world[2],
        ];
        for i in 0..3 {
            assert_relative_eq!(back[i], direction[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_from_center_looks_along_world_axes() {
        let pose = Pose::from_center(&[1.0, -2.0, 3.0]);
        assert_eq!(pose.center(), [1.0, -2.0, 3.0]);
        assert_eq!(pose.transform(&[1.0, -2.0, 4.0]), [0.0, 0.0, 1.0]);
    }
}
