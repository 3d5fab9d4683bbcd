//! Core types for the rasterizer
//!
//! Display colors, linear-light textures, lights, materials and meshes.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use super::math::{Vec2, Vec3};

/// 8-bit display color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// From a 0xRRGGBB literal
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Linear interpolation between two colors (t = 0.0 returns self, t = 1.0 returns other)
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    /// Decode sRGB to linear light
    pub fn to_linear(self) -> Vec3 {
        Vec3::new(
            srgb_to_linear(self.r as f32 / 255.0),
            srgb_to_linear(self.g as f32 / 255.0),
            srgb_to_linear(self.b as f32 / 255.0),
        )
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// ACES filmic curve (Narkowicz fit)
fn aces(x: f32) -> f32 {
    let x = x.max(0.0);
    ((x * (2.51 * x + 0.03)) / (x * (2.43 * x + 0.59) + 0.14)).clamp(0.0, 1.0)
}

/// Expose, tone map and encode a linear HDR value for display
pub fn tone_map(hdr: Vec3, exposure: f32) -> Color {
    let encode = |c: f32| (linear_to_srgb(aces(c * exposure)) * 255.0 + 0.5) as u8;
    Color::new(encode(hdr.x), encode(hdr.y), encode(hdr.z))
}

/// Linear-light RGB texture. Used for model albedo maps and panoramas.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub texels: Vec<Vec3>,
}

impl Texture {
    pub fn new(width: usize, height: usize, fill: Vec3) -> Self {
        Self {
            width,
            height,
            texels: vec![fill; width * height],
        }
    }

    pub fn from_texels(width: usize, height: usize, texels: Vec<Vec3>) -> Self {
        debug_assert_eq!(texels.len(), width * height);
        Self { width, height, texels }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Vec3 {
        self.texels[y * self.width + x]
    }

    /// Nearest-neighbour sample with repeat wrapping
    pub fn sample(&self, u: f32, v: f32) -> Vec3 {
        if self.texels.is_empty() {
            return Vec3::ONE;
        }
        let u = u - u.floor();
        let v = v - v.floor();
        let x = ((u * self.width as f32) as usize).min(self.width - 1);
        let y = ((v * self.height as f32) as usize).min(self.height - 1);
        self.get(x, y)
    }

    /// Sample treating the texture as an equirectangular panorama
    pub fn sample_equirect(&self, dir: Vec3) -> Vec3 {
        let (u, v) = equirect_uv(dir);
        // Image rows run top to bottom
        self.sample(u, 1.0 - v)
    }
}

/// Direction to panorama coordinates (v = 1 at the zenith)
pub fn equirect_uv(dir: Vec3) -> (f32, f32) {
    use std::f32::consts::PI;
    let u = dir.z.atan2(dir.x) / (2.0 * PI) + 0.5;
    let v = dir.y.clamp(-1.0, 1.0).asin() / PI + 0.5;
    (u, v)
}

/// Light source, colors in linear light
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    /// Shines from `position` toward the origin
    Directional {
        color: Vec3,
        intensity: f32,
        position: Vec3,
    },
    Point {
        color: Vec3,
        intensity: f32,
        position: Vec3,
        range: f32,
    },
    Hemisphere {
        sky: Vec3,
        ground: Vec3,
        intensity: f32,
    },
}

impl Light {
    /// Irradiance reaching a surface point with normal `n`
    pub fn irradiance(&self, n: Vec3, world_pos: Vec3) -> Vec3 {
        match *self {
            Light::Ambient { color, intensity } => color * intensity,
            Light::Directional { color, intensity, position } => {
                let l = position.normalize();
                color * (n.dot(l).max(0.0) * intensity)
            }
            Light::Point { color, intensity, position, range } => {
                let to_light = position - world_pos;
                let dist = to_light.len();
                if dist >= range || dist < 0.0001 {
                    return Vec3::ZERO;
                }
                let falloff = 1.0 - dist / range;
                let n_dot_l = n.dot(to_light * (1.0 / dist)).max(0.0);
                color * (n_dot_l * intensity * falloff * falloff)
            }
            Light::Hemisphere { sky, ground, intensity } => {
                let w = n.y * 0.5 + 0.5;
                ground.lerp(sky, w) * intensity
            }
        }
    }
}

/// Surface description consumed by the triangle filler
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    /// Linear RGB base color
    pub base_color: Vec3,
    pub base_texture: Option<Arc<Texture>>,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub env_intensity: f32,
    pub opacity: f32,
    /// Unlit materials skip lighting and output base color directly
    pub lit: bool,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Vec3::ONE,
            base_texture: None,
            metalness: 0.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 1.0,
            env_intensity: 1.0,
            opacity: 1.0,
            lit: true,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Mesh vertex in model space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(pos: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { pos, normal, uv }
    }
}

/// Indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
