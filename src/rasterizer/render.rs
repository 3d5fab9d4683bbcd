//! Core rendering functions
//! Framebuffer primitives, panorama background and lit triangle rasterization

use super::camera::Camera;
use super::math::{mat4_transform_dir, mat4_transform_point, Mat4, Vec2, Vec3};
use super::types::{tone_map, Color, Light, Material, Mesh, Texture};

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>,    // RGBA, 4 bytes per pixel, straight alpha
    pub zbuffer: Vec<f32>,  // Depth buffer
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![f32::MAX; width * height],
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height * 4];
            self.zbuffer = vec![f32::MAX; width * height];
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.zbuffer.fill(f32::MAX);
    }

    /// Clear framebuffer with transparent black (for alpha compositing)
    pub fn clear_transparent(&mut self) {
        self.pixels.fill(0);
        self.zbuffer.fill(f32::MAX);
    }

    /// Fill every pixel with a panorama seen through the camera
    pub fn render_background(&mut self, camera: &Camera, panorama: &Texture, exposure: f32) {
        for y in 0..self.height {
            for x in 0..self.width {
                let dir = camera.ray_dir(x as f32 + 0.5, y as f32 + 0.5, self.width, self.height);
                let color = tone_map(panorama.sample_equirect(dir), exposure);
                self.set_pixel(x, y, color);
            }
        }
        self.zbuffer.fill(f32::MAX);
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    /// Set pixel only if it is nearer than what is already there
    #[inline]
    pub fn set_pixel_with_depth(&mut self, x: usize, y: usize, z: f32, color: Color) {
        if x < self.width && y < self.height {
            let i = y * self.width + x;
            if z < self.zbuffer[i] {
                self.zbuffer[i] = z;
                self.pixels[i * 4..i * 4 + 4].copy_from_slice(&color.to_bytes());
            }
        }
    }

    /// Composite a color over the pixel (source-over, straight alpha)
    #[inline]
    pub fn set_pixel_alpha(&mut self, x: usize, y: usize, color: Color, alpha: f32) {
        if x >= self.width || y >= self.height || alpha <= 0.0 {
            return;
        }
        let idx = (y * self.width + x) * 4;
        let src_a = alpha.min(1.0);
        let dst_a = self.pixels[idx + 3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            return;
        }
        let mix = |src: u8, dst: u8| {
            ((src as f32 * src_a + dst as f32 * dst_a * (1.0 - src_a)) / out_a).round() as u8
        };
        self.pixels[idx] = mix(color.r, self.pixels[idx]);
        self.pixels[idx + 1] = mix(color.g, self.pixels[idx + 1]);
        self.pixels[idx + 2] = mix(color.b, self.pixels[idx + 2]);
        self.pixels[idx + 3] = (out_a * 255.0).round() as u8;
    }

    /// Composite a translucent rectangle over the whole buffer
    pub fn fill_alpha(&mut self, color: Color, alpha: f32) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_pixel_alpha(x, y, color, alpha);
            }
        }
    }

    /// Draw a line with alpha blending (Bresenham)
    pub fn draw_line_alpha(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color, alpha: f32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
                self.set_pixel_alpha(x as usize, y as usize, color, alpha);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw a thick line as a filled quad with butt ends.
    /// Widths under two pixels fall back to a 1px line with proportional alpha.
    pub fn draw_thick_line_alpha(
        &mut self,
        x0: f32, y0: f32,
        x1: f32, y1: f32,
        width: f32,
        color: Color,
        alpha: f32,
    ) {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        if width < 2.0 {
            let a = alpha * width.clamp(0.0, 1.0);
            self.draw_line_alpha(x0 as i32, y0 as i32, x1 as i32, y1 as i32, color, a);
            return;
        }

        // Perpendicular offset vector
        let dx = x1 - x0;
        let dy = y1 - y0;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 0.001 {
            return;
        }

        let half = width * 0.5;
        let px = -dy / len * half;
        let py = dx / len * half;

        let corners = [
            (x0 + px, y0 + py),
            (x0 - px, y0 - py),
            (x1 - px, y1 - py),
            (x1 + px, y1 + py),
        ];

        // Bounding box clamped to screen
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min).max(0.0) as i32;
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max).min(self.width as f32 - 1.0) as i32;
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min).max(0.0) as i32;
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max).min(self.height as f32 - 1.0) as i32;

        if min_x > max_x || min_y > max_y {
            return;
        }

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                // Point-in-convex-quad: all edge cross products share a sign
                let p = (px as f32 + 0.5, py as f32 + 0.5);
                let mut pos = false;
                let mut neg = false;
                for i in 0..4 {
                    let a = corners[i];
                    let b = corners[(i + 1) % 4];
                    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
                    pos |= cross > 0.0;
                    neg |= cross < 0.0;
                }
                if !(pos && neg) {
                    self.set_pixel_alpha(px as usize, py as usize, color, alpha);
                }
            }
        }
    }
}

/// Per-frame shading inputs shared by every mesh
pub struct ShadingContext<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    /// Low-resolution panorama used for reflections and image-based diffuse
    pub reflection: Option<&'a Texture>,
    pub exposure: f32,
}

/// Vertex after lighting, in camera space
#[derive(Clone, Copy)]
struct ClipVert {
    view: Vec3,
    uv: Vec2,
    diffuse: Vec3,
    additive: Vec3,
}

impl ClipVert {
    fn lerp(&self, other: &ClipVert, t: f32) -> ClipVert {
        ClipVert {
            view: self.view.lerp(other.view, t),
            uv: Vec2::new(
                self.uv.x + (other.uv.x - self.uv.x) * t,
                self.uv.y + (other.uv.y - self.uv.y) * t,
            ),
            diffuse: self.diffuse.lerp(other.diffuse, t),
            additive: self.additive.lerp(other.additive, t),
        }
    }
}

/// Clip a triangle against the near plane. Produces 0, 3 or 4 vertices.
fn clip_near(tri: [ClipVert; 3], near: f32) -> Vec<ClipVert> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let a_in = a.view.z >= near;
        let b_in = b.view.z >= near;
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = (near - a.view.z) / (b.view.z - a.view.z);
            out.push(a.lerp(&b, t));
        }
    }
    out
}

/// Per-vertex lighting split into a term multiplied by albedo and an additive term
fn shade_vertex(ctx: &ShadingContext, material: &Material, world_pos: Vec3, n: Vec3) -> (Vec3, Vec3) {
    let emissive = material.emissive * material.emissive_intensity;
    if !material.lit {
        return (Vec3::ONE, emissive);
    }

    let kd = 1.0 - material.metalness;
    let mut irradiance = Vec3::ZERO;
    for light in ctx.lights {
        irradiance = irradiance + light.irradiance(n, world_pos);
    }
    let mut diffuse = irradiance * (kd / std::f32::consts::PI);
    let mut additive = emissive;

    if let Some(env) = ctx.reflection {
        let v = (ctx.camera.position - world_pos).normalize();
        let r = n * (2.0 * n.dot(v)) - v;
        let f0 = Vec3::new(0.04, 0.04, 0.04).lerp(material.base_color, material.metalness);
        let gloss = 1.0 - material.roughness * 0.7;
        let specular = env.sample_equirect(r).mul_elem(f0) * (gloss * material.env_intensity);
        diffuse = diffuse + env.sample_equirect(n) * (kd * material.env_intensity);
        additive = additive + specular;
    }

    (diffuse, additive)
}

/// Render an indexed mesh with Gouraud lighting and perspective-correct texturing
pub fn render_mesh(
    fb: &mut Framebuffer,
    ctx: &ShadingContext,
    mesh: &Mesh,
    transform: &Mat4,
    material: &Material,
) {
    if material.opacity <= 0.0 {
        return;
    }
    let camera = ctx.camera;

    let shaded: Vec<ClipVert> = mesh
        .vertices
        .iter()
        .map(|v| {
            let world = mat4_transform_point(transform, v.pos);
            let normal = mat4_transform_dir(transform, v.normal);
            let (diffuse, additive) = shade_vertex(ctx, material, world, normal);
            ClipVert {
                view: camera.to_view(world),
                uv: v.uv,
                diffuse,
                additive,
            }
        })
        .collect();

    for tri in mesh.indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (
            shaded.get(tri[0] as usize),
            shaded.get(tri[1] as usize),
            shaded.get(tri[2] as usize),
        ) else {
            continue;
        };
        // Entirely behind the near plane or beyond the far plane
        if a.view.z < camera.near && b.view.z < camera.near && c.view.z < camera.near {
            continue;
        }
        if a.view.z > camera.far && b.view.z > camera.far && c.view.z > camera.far {
            continue;
        }

        let poly = clip_near([*a, *b, *c], camera.near);
        for i in 1..poly.len().saturating_sub(1) {
            rasterize_triangle(fb, ctx, material, [poly[0], poly[i], poly[i + 1]]);
        }
    }
}

/// Rasterize a single clipped triangle
fn rasterize_triangle(fb: &mut Framebuffer, ctx: &ShadingContext, material: &Material, tri: [ClipVert; 3]) {
    let p: Vec<Vec3> = tri
        .iter()
        .map(|v| ctx.camera.project(v.view, fb.width, fb.height))
        .collect();

    // Screen-space winding: front faces come out negative
    let signed_area = (p[1].x - p[0].x) * (p[2].y - p[0].y) - (p[2].x - p[0].x) * (p[1].y - p[0].y);
    if signed_area.abs() < 0.0001 {
        return;
    }
    if signed_area > 0.0 && !material.double_sided {
        return;
    }

    let min_x = p[0].x.min(p[1].x).min(p[2].x).max(0.0) as usize;
    let max_x = p[0].x.max(p[1].x).max(p[2].x).min(fb.width as f32 - 1.0);
    let min_y = p[0].y.min(p[1].y).min(p[2].y).max(0.0) as usize;
    let max_y = p[0].y.max(p[1].y).max(p[2].y).min(fb.height as f32 - 1.0);
    if max_x < 0.0 || max_y < 0.0 {
        return;
    }
    let (max_x, max_y) = (max_x as usize, max_y as usize);

    let inv_denom = 1.0 / signed_area;
    let inv_z = [1.0 / p[0].z, 1.0 / p[1].z, 1.0 / p[2].z];
    let transparent = material.is_transparent();

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            // Barycentric coordinates (sign-agnostic)
            let w0 = ((p[1].x - px) * (p[2].y - py) - (p[2].x - px) * (p[1].y - py)) * inv_denom;
            let w1 = ((p[2].x - px) * (p[0].y - py) - (p[0].x - px) * (p[2].y - py)) * inv_denom;
            let w2 = 1.0 - w0 - w1;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            // Perspective-correct weights
            let iz = w0 * inv_z[0] + w1 * inv_z[1] + w2 * inv_z[2];
            let z = 1.0 / iz;
            let depth_idx = y * fb.width + x;
            if z >= fb.zbuffer[depth_idx] {
                continue;
            }
            let (b0, b1, b2) = (w0 * inv_z[0] * z, w1 * inv_z[1] * z, w2 * inv_z[2] * z);

            let mut albedo = material.base_color;
            if let Some(tex) = &material.base_texture {
                let u = tri[0].uv.x * b0 + tri[1].uv.x * b1 + tri[2].uv.x * b2;
                let v = tri[0].uv.y * b0 + tri[1].uv.y * b1 + tri[2].uv.y * b2;
                albedo = albedo.mul_elem(tex.sample(u, v));
            }
            let diffuse = tri[0].diffuse * b0 + tri[1].diffuse * b1 + tri[2].diffuse * b2;
            let additive = tri[0].additive * b0 + tri[1].additive * b1 + tri[2].additive * b2;
            let color = tone_map(albedo.mul_elem(diffuse) + additive, ctx.exposure);

            if transparent {
                fb.set_pixel_alpha(x, y, color, material.opacity);
            } else {
                fb.zbuffer[depth_idx] = z;
                fb.set_pixel(x, y, color);
            }
        }
    }
}
