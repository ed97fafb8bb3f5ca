// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::math::{Mat4, Vec3};

/// A first-person camera.
///
/// Left-handed: +X right, +Y up, +Z forward at zero yaw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Rotation around X in radians, positive looks up.
    pub pitch: f32,
    /// Rotation around Y in radians, positive turns right.
    pub yaw: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            fov_degrees: 90.0,
        }
    }
}

impl Camera {
    /// Unit view direction.
    pub fn forward(&self) -> Vec3 {
        let (sp, cp) = self.pitch.sin_cos();
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cp * sy, sp, cp * cy)
    }

    /// World-to-view matrix.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_lh(self.position, self.position + self.forward(), Vec3::Y)
    }

    /// View matrix without translation, used for the sky.
    pub fn rotation_only_view(&self) -> Mat4 {
        Mat4::look_at_lh(Vec3::ZERO, self.forward(), Vec3::Y)
    }

    /// Perspective projection with zero-to-one depth.
    pub fn projection(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_lh(self.fov_degrees.to_radians(), aspect, near, far)
    }

    /// Projection times view.
    pub fn view_projection(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        self.projection(aspect, near, far) * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_at_zero_is_plus_z() {
        let camera = Camera::default();
        let forward = camera.forward();
        assert_relative_eq!(forward.z, 1.0);
        assert_relative_eq!(forward.x, 0.0);
    }

    #[test]
    fn test_point_ahead_projects_to_center() {
        let camera = Camera {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Camera::default()
        };
        let clip = camera.view_projection(1.0, 0.1, 100.0) * Vec3::new(1.0, 2.0, 13.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
