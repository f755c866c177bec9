//! # Picking camera
//!
//! Perspective camera owned by the root state. It exists so pointer
//! coordinates can be turned into world-space picking rays; rendering is the
//! graphics collaborator's business.
//!
//! ## Coordinate System
//! Right-handed, Y-up. NDC spans [-1, 1] on both axes with +Y at the top of the
//! viewport and Z from -1 (near) to +1 (far).

use crate::foundation::math::{utils, Mat4, Point3, Vec3, Vec4};
use crate::scene::Ray;
use serde::{Deserialize, Serialize};

/// Perspective camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use scene_reconciler::foundation::math::Vec3;
    /// use scene_reconciler::root::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 75.0, 16.0 / 9.0, 0.1, 1000.0);
    /// assert_eq!(camera.target, Vec3::zeros());
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {target:?}, up: {up:?}");
    }

    /// Update the aspect ratio after a viewport change
    ///
    /// Only logs when the difference is significant (> 0.01) to keep resize
    /// storms quiet.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World → view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// View → clip transform
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Combined `P × V`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space picking ray through an NDC position
    ///
    /// # Mathematical Process
    /// 1. Build NDC points on the near (Z = -1) and far (Z = +1) planes
    /// 2. Unproject both through the inverse view-projection matrix
    /// 3. Perspective divide and take the direction near → far
    ///
    /// Returns `None` when the camera matrices are degenerate.
    pub fn screen_to_world_ray(&self, ndc_x: f32, ndc_y: f32) -> Option<Ray> {
        let inverse = self.view_projection_matrix().try_inverse()?;
        let unproject = |z: f32| {
            let h = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            (h.w.abs() > f32::EPSILON).then(|| Vec3::new(h.x / h.w, h.y / h.w, h.z / h.w))
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        let direction = far - near;
        (direction.norm() > f32::EPSILON).then(|| Ray::new(near, direction))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 5.0), 75.0, 1.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 1.0, 0.1, 100.0);
        let ray = camera.screen_to_world_ray(0.0, 0.0).unwrap();

        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-4);
        assert_relative_eq!(ray.origin.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(ray.origin.z, 4.9, epsilon = 1e-3);
    }

    #[test]
    fn test_top_right_ray_diverges() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 2.0, 0.1, 100.0);
        let ray = camera.screen_to_world_ray(1.0, 1.0).unwrap();

        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.y > 0.0);
        // Horizontal spread is twice the vertical one at aspect 2.
        assert_relative_eq!(ray.direction.x / ray.direction.y, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_aspect_update() {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(2.5);
        assert_relative_eq!(camera.aspect, 2.5);
    }
}
