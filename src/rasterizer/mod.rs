//! Software rasterizer
//!
//! Features:
//! - Perspective-correct texturing with near-plane clipping
//! - Gouraud lighting with ambient, directional, point and hemisphere lights
//! - Panorama reflections and backgrounds
//! - ACES tone mapping with per-zone exposure
//!
//! # Module Organization
//!
//! - `types` - Color, Texture, Light, Material, Vertex, Mesh
//! - `math` - Vec3, Vec2, Quat, Mat4
//! - `camera` - Camera struct for 3D rendering
//! - `render` - Framebuffer and mesh rendering functions
//! - `constants` - Internal resolution

// Sub-modules (exposed for namespaced access)
pub mod camera;
pub mod constants;
pub mod math;
pub mod render;
pub mod types;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use types::{tone_map, Color, Light, Material, Mesh, Texture, Vertex};

pub use math::{
    Vec2, Vec3, Quat, Mat4,
    mat4_identity, mat4_from_trs, mat4_mul, mat4_transform_point,
};

pub use camera::Camera;

pub use render::{Framebuffer, ShadingContext, render_mesh};

pub use constants::scene_size;
