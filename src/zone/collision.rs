//! Collision volumes
//!
//! Axis-aligned boxes for the camera and the portal. The camera box is
//! rebuilt from the camera position every frame; the portal box is fixed
//! for the life of a zone.

use crate::config::PortalConfig;
use crate::rasterizer::Vec3;

/// Portal box size at scale 1
pub const PORTAL_VOLUME_SIZE: Vec3 = Vec3::new(4.0, 4.0, 2.0);

/// Camera box size
pub const CAMERA_VOLUME_SIZE: Vec3 = Vec3::new(0.5, 0.8, 0.5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Touching faces count as intersecting
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

pub fn portal_volume(portal: &PortalConfig) -> Aabb {
    Aabb::from_center_size(portal.position, PORTAL_VOLUME_SIZE * portal.scale)
}

pub fn camera_volume(position: Vec3) -> Aabb {
    Aabb::from_center_size(position, CAMERA_VOLUME_SIZE)
}
