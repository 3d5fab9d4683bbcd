//! Portal ring and its orbiting glow particles

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{LightingProfile, PortalConfig};
use crate::rasterizer::{
    mat4_from_trs, tone_map, Camera, Color, Framebuffer, Light, Mat4, Material, Mesh, Quat, Vec2, Vec3,
    Vertex,
};

pub const RING_RADIUS: f32 = 2.0;
pub const TUBE_RADIUS: f32 = 0.2;
pub const RADIAL_SEGMENTS: usize = 16;
pub const TUBULAR_SEGMENTS: usize = 100;

const PORTAL_COLOR: Color = Color::from_hex(0x00ff00);
const PORTAL_GLOW: Color = Color::from_hex(0x00ff99);
const LIGHT_RANGE: f32 = 10.0;

/// Vertical travel of particles either side of the portal centre
pub const PARTICLE_BAND: f32 = 2.0;
pub const PARTICLE_RADIUS: f32 = 0.05;

/// Torus in the XY plane around +Z, CCW front faces
pub fn torus_mesh(radius: f32, tube: f32, radial: usize, tubular: usize) -> Mesh {
    let mut vertices = Vec::with_capacity((radial + 1) * (tubular + 1));
    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let ring = radius + tube * v.cos();
            let pos = Vec3::new(ring * u.cos(), ring * u.sin(), tube * v.sin());
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            vertices.push(Vertex::new(
                pos,
                (pos - center).normalize(),
                Vec2::new(i as f32 / tubular as f32, j as f32 / radial as f32),
            ));
        }
    }

    let stride = (tubular + 1) as u32;
    let mut indices = Vec::with_capacity(radial * tubular * 6);
    for j in 1..=radial as u32 {
        for i in 1..=tubular as u32 {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    Mesh { vertices, indices }
}

/// Torus, its glow and its point light
pub struct Portal {
    pub config: PortalConfig,
    pub mesh: Mesh,
    pub material: Material,
    pub transform: Mat4,
    profile: LightingProfile,
    light_intensity: f32,
}

impl Portal {
    pub fn new(config: PortalConfig, profile: LightingProfile) -> Self {
        let material = Material {
            name: "portal".into(),
            base_color: PORTAL_COLOR.to_linear(),
            emissive: PORTAL_GLOW.to_linear(),
            emissive_intensity: 0.5,
            opacity: profile.portal_opacity(0.0),
            ..Material::default()
        };
        let transform = mat4_from_trs(
            config.position,
            Quat::from_axis_angle(Vec3::UP, config.rotation_y),
            Vec3::ONE * config.scale,
        );
        Self {
            config,
            mesh: torus_mesh(RING_RADIUS, TUBE_RADIUS, RADIAL_SEGMENTS, TUBULAR_SEGMENTS),
            material,
            transform,
            profile,
            light_intensity: 2.0,
        }
    }

    /// Pulse glow, opacity and light at time `t` seconds
    pub fn pulse(&mut self, t: f32) {
        self.material.opacity = self.profile.portal_opacity(t);
        self.material.emissive_intensity = 0.5 + (t * 3.0).sin() * 0.3;
        self.light_intensity = 1.5 + (t * 2.5).sin() * 0.5;
    }

    pub fn light(&self) -> Light {
        Light::Point {
            color: PORTAL_GLOW.to_linear(),
            intensity: self.light_intensity,
            position: self.config.position,
            range: LIGHT_RANGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowParticle {
    pub position: Vec3,
    pub angle: f32,
    pub radius: f32,
    /// Radians per tick
    pub speed: f32,
    pub direction: f32,
    pub y_speed: f32,
    pub glow: f32,
}

/// Particles circling the portal on the XZ plane
pub struct PortalParticles {
    pub particles: Vec<GlowParticle>,
    center: Vec3,
}

impl PortalParticles {
    pub fn new(count: usize, center: Vec3) -> Self {
        Self::with_rng(count, center, StdRng::from_entropy())
    }

    pub fn with_rng<R: Rng>(count: usize, center: Vec3, mut rng: R) -> Self {
        let particles = (0..count)
            .map(|_| {
                let angle = rng.gen::<f32>() * TAU;
                let radius = 2.0 + rng.gen::<f32>() * 0.2;
                GlowParticle {
                    position: Vec3::new(
                        angle.cos() * radius + center.x,
                        (rng.gen::<f32>() - 0.5) * PARTICLE_BAND * 2.0 + center.y,
                        angle.sin() * radius + center.z,
                    ),
                    angle,
                    radius,
                    speed: 0.01 + rng.gen::<f32>() * 0.02,
                    direction: if rng.gen::<bool>() { 1.0 } else { -1.0 },
                    y_speed: (rng.gen::<f32>() - 0.5) * 0.05,
                    glow: 1.0,
                }
            })
            .collect();
        Self { particles, center }
    }

    /// One tick of orbit, vertical drift with wrap, and glow pulse
    pub fn update(&mut self, t: f32) {
        let c = self.center;
        for p in &mut self.particles {
            p.angle += p.speed * p.direction;
            p.position.x = p.angle.cos() * p.radius + c.x;
            p.position.z = p.angle.sin() * p.radius + c.z;
            p.position.y += p.y_speed;
            if p.position.y > c.y + PARTICLE_BAND {
                p.position.y = c.y - PARTICLE_BAND;
            }
            if p.position.y < c.y - PARTICLE_BAND {
                p.position.y = c.y + PARTICLE_BAND;
            }
            p.glow = 0.7 + (t * 2.0 + p.angle).sin() * 0.3;
        }
    }

    /// Depth-tested squares sized to the projected sphere
    pub fn render(&self, fb: &mut Framebuffer, camera: &Camera, exposure: f32) {
        let base = PORTAL_GLOW.to_linear();
        let focal = camera.focal_px(fb.height);
        for p in &self.particles {
            let view = camera.to_view(p.position);
            if view.z < camera.near {
                continue;
            }
            let screen = camera.project(view, fb.width, fb.height);
            let color = tone_map(base * (1.0 + p.glow), exposure);

            let size = ((PARTICLE_RADIUS * 2.0 * focal / view.z).round() as i32).clamp(1, 8);
            let half = size / 2;
            let (sx, sy) = (screen.x as i32, screen.y as i32);
            for dy in -half..(size - half) {
                for dx in -half..(size - half) {
                    let (px, py) = (sx + dx, sy + dy);
                    if px >= 0 && py >= 0 && (px as usize) < fb.width && (py as usize) < fb.height {
                        fb.set_pixel_with_depth(px as usize, py as usize, view.z, color);
                    }
                }
            }
        }
    }
}
