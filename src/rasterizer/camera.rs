//! Camera for 3D rendering
//!
//! Perspective camera that yaws about the world Y axis. At zero yaw it looks
//! down -Z with +Y up.

use super::math::Vec3;

/// Camera state for 3D rendering
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub rotation_y: f32, // Yaw, radians
    /// Vertical field of view, degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    // Computed basis vectors
    pub basis_x: Vec3, // Right
    pub basis_y: Vec3, // Up
    pub basis_z: Vec3, // Forward (into the scene)
}

impl Camera {
    pub fn new(fov: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            position: Vec3::ZERO,
            rotation_y: 0.0,
            fov,
            near,
            far,
            basis_x: Vec3::new(1.0, 0.0, 0.0),
            basis_y: Vec3::UP,
            basis_z: Vec3::new(0.0, 0.0, -1.0),
        };
        cam.update_basis();
        cam
    }

    pub fn update_basis(&mut self) {
        let (s, c) = self.rotation_y.sin_cos();
        self.basis_z = Vec3::new(-s, 0.0, -c);
        self.basis_x = Vec3::new(c, 0.0, -s);
        self.basis_y = Vec3::UP;
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.rotation_y = yaw;
        self.update_basis();
    }

    /// World point to camera space (x right, y up, z depth in front)
    pub fn to_view(&self, p: Vec3) -> Vec3 {
        let rel = p - self.position;
        Vec3::new(rel.dot(self.basis_x), rel.dot(self.basis_y), rel.dot(self.basis_z))
    }

    /// Focal length in pixels for a viewport of the given height
    pub fn focal_px(&self, height: usize) -> f32 {
        let half_fov = (self.fov.to_radians() * 0.5).tan();
        height as f32 * 0.5 / half_fov
    }

    /// Camera-space point to (screen x, screen y, depth). Callers clip first.
    pub fn project(&self, view: Vec3, width: usize, height: usize) -> Vec3 {
        let f = self.focal_px(height);
        Vec3::new(
            width as f32 * 0.5 + view.x / view.z * f,
            height as f32 * 0.5 - view.y / view.z * f,
            view.z,
        )
    }

    /// World-space direction through the centre of pixel (x, y)
    pub fn ray_dir(&self, x: f32, y: f32, width: usize, height: usize) -> Vec3 {
        let f = self.focal_px(height);
        let vx = (x - width as f32 * 0.5) / f;
        let vy = (height as f32 * 0.5 - y) / f;
        (self.basis_x * vx + self.basis_y * vy + self.basis_z).normalize()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(75.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_at_zero_yaw() {
        let cam = Camera::default();
        assert!((cam.basis_z.z + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_positive_yaw_turns_left() {
        let mut cam = Camera::default();
        cam.set_yaw(std::f32::consts::FRAC_PI_2);
        assert!((cam.basis_z.x + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_center_projects_to_screen_center() {
        let mut cam = Camera::default();
        cam.position = Vec3::new(0.0, 0.0, 10.0);
        let view = cam.to_view(Vec3::ZERO);
        assert!((view.z - 10.0).abs() < 0.001);
        let s = cam.project(view, 320, 240);
        assert!((s.x - 160.0).abs() < 0.001);
        assert!((s.y - 120.0).abs() < 0.001);
    }

    #[test]
    fn test_ray_through_center_is_forward() {
        let cam = Camera::default();
        let d = cam.ray_dir(160.0, 120.0, 320, 240);
        assert!((d.dot(cam.basis_z) - 1.0).abs() < 0.001);
    }
}
