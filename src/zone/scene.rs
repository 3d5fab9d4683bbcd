//! Scene and camera controller
//!
//! Owns everything drawn in a live zone: camera, lights, environment, the
//! placed model with its mixer, the portal and its particles. Pointer x
//! steers a bounded yaw that is eased toward every tick; the wheel moves a
//! distance target that the camera reaches through a short tween.

use tracing::debug;

use crate::assets::{Background, EnvironmentMap, LoadedAssets, Mixer, Model};
use crate::config::{CameraBounds, EngineTuning, LightingProfile, ModelPlacement, ZoneConfig};
use crate::rasterizer::{
    mat4_from_trs, render_mesh, Camera, Color, Framebuffer, Light, Mat4, Quat, ShadingContext, Vec3,
};
use super::collision::{camera_volume, Aabb};
use super::portal::{Portal, PortalParticles};

/// Ease with decelerating quadratic
pub fn power1_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// One-shot eased value animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub start: f64,
    pub duration: f32,
}

impl Tween {
    fn fraction(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) as f32 / self.duration).clamp(0.0, 1.0)
    }

    pub fn value(&self, now: f64) -> f32 {
        self.from + (self.to - self.from) * power1_out(self.fraction(now))
    }

    pub fn finished(&self, now: f64) -> bool {
        self.fraction(now) >= 1.0
    }
}

/// A loaded model at its zone placement
pub struct ModelInstance {
    pub model: Model,
    pub base: Mat4,
    pub mixer: Option<Mixer>,
}

impl ModelInstance {
    pub fn new(model: Model, placement: &ModelPlacement) -> Self {
        let base = mat4_from_trs(placement.position, Quat::IDENTITY, Vec3::ONE * placement.scale);
        let mixer = (!model.clips.is_empty()).then(|| Mixer::new(0));
        Self { model, base, mixer }
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(dt, &self.model.clips, &mut self.model.nodes);
        }
    }
}

pub struct SceneController {
    pub camera: Camera,
    bounds: CameraBounds,
    max_yaw: f32,
    target_yaw: f32,
    smoothing: f32,
    scroll: f32,
    sensitivity: f32,
    tween_secs: f32,
    tween: Option<Tween>,
    exposure: f32,
    lights: Vec<Light>,
    placement: ModelPlacement,
    pub portal: Portal,
    pub particles: PortalParticles,
    model: Option<ModelInstance>,
    environment: Option<EnvironmentMap>,
}

impl SceneController {
    pub fn new(config: &ZoneConfig, tuning: &EngineTuning) -> Self {
        let profile: LightingProfile = config.lighting;
        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, config.camera.start_z);
        Self {
            camera,
            bounds: config.camera,
            max_yaw: config.camera.max_yaw_deg.to_radians(),
            target_yaw: 0.0,
            smoothing: tuning.yaw_smoothing,
            scroll: 0.0,
            sensitivity: tuning.scroll_sensitivity,
            tween_secs: tuning.tween_secs,
            tween: None,
            exposure: profile.exposure(),
            lights: profile.lights(),
            placement: config.model,
            portal: Portal::new(config.portal, profile),
            particles: PortalParticles::new(profile.particle_count(), config.portal.position),
            model: None,
            environment: None,
        }
    }

    /// Take over loaded assets. The fallback environment brings its own
    /// hemisphere light.
    pub fn install(&mut self, assets: LoadedAssets) {
        let LoadedAssets { environment, model } = assets;
        if let Some(light) = environment.hemisphere {
            self.lights.push(light);
        }
        self.environment = Some(environment);
        self.model = model.map(|m| {
            debug!("placing model with {} triangles", m.triangle_count());
            ModelInstance::new(m, &self.placement)
        });
    }

    /// Pointer x in -1..1 (left to right) sets the yaw target
    pub fn set_pointer(&mut self, x: f32) {
        self.target_yaw = -x.clamp(-1.0, 1.0) * self.max_yaw;
    }

    /// Wheel delta in pixels; retargets the tween toward the new distance,
    /// starting from wherever the running tween has reached at `now`
    pub fn scroll(&mut self, delta_px: f32, now: f64) {
        if delta_px == 0.0 || !delta_px.is_finite() {
            return;
        }
        self.update_tween(now);
        let b = &self.bounds;
        self.scroll = (self.scroll + delta_px * self.sensitivity)
            .clamp(b.min_distance - b.base_distance, b.max_distance - b.base_distance);
        let to = (b.base_distance + self.scroll).clamp(b.min_distance, b.max_distance);
        self.tween = Some(Tween {
            from: self.camera.position.z,
            to,
            start: now,
            duration: self.tween_secs,
        });
    }

    pub fn update_tween(&mut self, now: f64) {
        if let Some(tween) = self.tween {
            self.camera.position.z = tween.value(now);
            if tween.finished(now) {
                self.tween = None;
            }
        }
    }

    pub fn smooth_yaw(&mut self) {
        let yaw = self.camera.rotation_y + (self.target_yaw - self.camera.rotation_y) * self.smoothing;
        self.camera.set_yaw(yaw);
    }

    pub fn camera_volume(&self) -> Aabb {
        camera_volume(self.camera.position)
    }

    pub fn advance_animation(&mut self, dt: f32) {
        if let Some(instance) = self.model.as_mut() {
            instance.advance(dt);
        }
    }

    pub fn pulse(&mut self, t: f32) {
        self.portal.pulse(t);
        self.particles.update(t);
    }

    /// Background, opaque model parts, particles, then translucent parts
    /// and the portal
    pub fn render(&self, fb: &mut Framebuffer) {
        match self.environment.as_ref().map(|e| &e.background) {
            Some(Background::Panorama(pano)) => fb.render_background(&self.camera, pano, self.exposure),
            Some(Background::Solid(color)) => fb.clear(*color),
            None => fb.clear(Color::BLACK),
        }

        let mut lights = self.lights.clone();
        lights.push(self.portal.light());
        let ctx = ShadingContext {
            camera: &self.camera,
            lights: &lights,
            reflection: self.environment.as_ref().map(|e| e.reflection.as_ref()),
            exposure: self.exposure,
        };

        let model_pass = |fb: &mut Framebuffer, transparent: bool| {
            let Some(instance) = self.model.as_ref() else {
                return;
            };
            let model = &instance.model;
            let world = model.world_transforms(&instance.base);
            for (node, transform) in model.nodes.iter().zip(&world) {
                for prim in &node.primitives {
                    let Some(material) = model.materials.get(prim.material) else {
                        continue;
                    };
                    if material.is_transparent() == transparent {
                        render_mesh(fb, &ctx, &prim.mesh, transform, material);
                    }
                }
            }
        };

        model_pass(fb, false);
        self.particles.render(fb, &self.camera, self.exposure);
        model_pass(fb, true);
        render_mesh(fb, &ctx, &self.portal.mesh, &self.portal.transform, &self.portal.material);
    }
}

#[cfg(test)]
impl SceneController {
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn environment(&self) -> Option<&EnvironmentMap> {
        self.environment.as_ref()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn target_yaw(&self) -> f32 {
        self.target_yaw
    }

    pub fn target_distance(&self) -> f32 {
        (self.bounds.base_distance + self.scroll).clamp(self.bounds.min_distance, self.bounds.max_distance)
    }
}
