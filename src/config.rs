//! Zone configuration
//!
//! Everything that differs between zones lives in a `ZoneConfig`: asset
//! paths, portal placement, model placement, camera bounds and a named
//! lighting profile. The ordered list of zones comes from a RON manifest,
//! with a built-in four-zone manifest when the file is absent or broken.
//! `EngineTuning` holds the timing constants shared by every zone.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::app::ZoneId;
use crate::rasterizer::{Color, Light, Vec3};

/// Default manifest location, relative to the working directory
pub const DEFAULT_MANIFEST: &str = "assets/zones.ron";

const ASSET_DIR: &str = "assets";
const SKY_FILE: &str = "kloofendal_48d_partly_cloudy_puresky_1k.exr";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid zone manifest: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("zone manifest lists no zones")]
    EmptyManifest,

    #[error("zone {0:?} is not in the manifest")]
    UnknownZone(ZoneId),

    #[error("zone {id:?}: {reason}")]
    InvalidZone { id: ZoneId, reason: String },
}

/// Portal placement. Also defines the portal's collision volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub position: Vec3,
    pub scale: f32,
    /// Radians about +Y
    pub rotation_y: f32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
            rotation_y: PI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPlacement {
    pub position: Vec3,
    pub scale: f32,
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, -2.0, 5.0),
            scale: 1.0,
        }
    }
}

/// Scroll-driven distance limits and pointer-driven yaw limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraBounds {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Distance at zero accumulated scroll
    pub base_distance: f32,
    pub start_z: f32,
    pub max_yaw_deg: f32,
}

impl Default for CameraBounds {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 15.0,
            base_distance: 8.0,
            start_z: 10.0,
            max_yaw_deg: 60.0,
        }
    }
}

/// Named lighting variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightingProfile {
    /// Low orange ambient, strong golden key, invisible portal body
    Warm,
    /// Bright white light, translucent portal and orbiting particles
    Daylight,
}

fn directional(hex: u32, intensity: f32, position: Vec3) -> Light {
    Light::Directional {
        color: Color::from_hex(hex).to_linear(),
        intensity,
        position,
    }
}

impl LightingProfile {
    /// Ambient, key, fill and rim lights
    pub fn lights(self) -> Vec<Light> {
        let rim = directional(0xaaccff, 0.5, Vec3::new(0.0, -5.0, -5.0));
        match self {
            LightingProfile::Warm => vec![
                Light::Ambient {
                    color: Color::from_hex(0xffa500).to_linear(),
                    intensity: 0.1,
                },
                directional(0xffd500, 3.0, Vec3::new(5.0, 10.0, 5.0)),
                directional(0xffa500, 0.3, Vec3::new(-5.0, 3.0, -5.0)),
                rim,
            ],
            LightingProfile::Daylight => vec![
                Light::Ambient {
                    color: Vec3::ONE,
                    intensity: 0.6,
                },
                directional(0xffffff, 1.2, Vec3::new(5.0, 5.0, 5.0)),
                directional(0xffffcc, 0.7, Vec3::new(-5.0, 3.0, -5.0)),
                rim,
            ],
        }
    }

    pub fn exposure(self) -> f32 {
        match self {
            LightingProfile::Warm => 0.6,
            LightingProfile::Daylight => 1.5,
        }
    }

    /// Glow particles orbiting the portal
    pub fn particle_count(self) -> usize {
        match self {
            LightingProfile::Warm => 0,
            LightingProfile::Daylight => 50,
        }
    }

    /// Opacity of the portal torus at time `t` seconds
    pub fn portal_opacity(self, t: f32) -> f32 {
        match self {
            LightingProfile::Warm => 0.0,
            LightingProfile::Daylight => 0.5 + (t * 2.0).sin() * 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub model_path: PathBuf,
    pub environment_path: PathBuf,
    #[serde(default)]
    pub portal: PortalConfig,
    pub lighting: LightingProfile,
    #[serde(default)]
    pub model: ModelPlacement,
    #[serde(default)]
    pub camera: CameraBounds,
}

fn finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

impl ZoneConfig {
    /// Reject placements and bounds the scene controller cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidZone {
            id: self.id,
            reason: reason.to_string(),
        };
        let c = &self.camera;
        if !finite(&[c.min_distance, c.max_distance, c.base_distance, c.start_z, c.max_yaw_deg]) {
            return Err(invalid("camera bounds must be finite"));
        }
        if c.min_distance > c.max_distance {
            return Err(invalid("camera min_distance exceeds max_distance"));
        }
        if c.max_yaw_deg < 0.0 {
            return Err(invalid("camera max_yaw_deg is negative"));
        }
        let p = &self.portal;
        if !finite(&[p.position.x, p.position.y, p.position.z, p.rotation_y]) {
            return Err(invalid("portal placement must be finite"));
        }
        if !(p.scale.is_finite() && p.scale > 0.0) {
            return Err(invalid("portal scale must be positive"));
        }
        let m = &self.model;
        if !finite(&[m.position.x, m.position.y, m.position.z]) || !(m.scale.is_finite() && m.scale > 0.0) {
            return Err(invalid("model placement must be finite with a positive scale"));
        }
        Ok(())
    }

    fn builtin(id: ZoneId) -> Self {
        let (model_file, lighting, model_z, max_distance, max_yaw_deg) = match id {
            ZoneId::Zone1 => ("Stone Age_Revised.glb", LightingProfile::Daylight, 5.0, 15.0, 60.0),
            ZoneId::Zone2 => ("Medivial_Revised.glb", LightingProfile::Warm, 5.0, 12.0, 55.0),
            ZoneId::Zone3 => ("Industrial_Revised.glb", LightingProfile::Daylight, 28.0, 15.0, 60.0),
            ZoneId::Zone4 => ("Modern_Revised.glb", LightingProfile::Warm, 5.0, 12.0, 55.0),
        };
        let dir = Path::new(ASSET_DIR);
        Self {
            id,
            model_path: dir.join(model_file),
            environment_path: dir.join(SKY_FILE),
            portal: PortalConfig::default(),
            lighting,
            model: ModelPlacement {
                position: Vec3::new(0.0, -2.0, model_z),
                scale: 1.0,
            },
            camera: CameraBounds {
                max_distance,
                max_yaw_deg,
                ..CameraBounds::default()
            },
        }
    }
}

/// Ordered list of zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub zones: Vec<ZoneConfig>,
}

impl Manifest {
    pub fn builtin() -> Self {
        Self {
            zones: ZoneId::ALL.iter().map(|&id| ZoneConfig::builtin(id)).collect(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let manifest: Manifest = ron::from_str(text)?;
        if manifest.zones.is_empty() {
            return Err(ConfigError::EmptyManifest);
        }
        for zone in &manifest.zones {
            zone.validate()?;
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load `path`, falling back to the built-in manifest on any error
    pub fn load_or_builtin(path: &Path) -> Self {
        match Self::load(path) {
            Ok(manifest) => {
                info!("loaded {} zones from {}", manifest.zones.len(), path.display());
                manifest
            }
            Err(e) => {
                warn!("{e}; using built-in zones");
                Self::builtin()
            }
        }
    }

    pub fn zone(&self, id: ZoneId) -> Result<&ZoneConfig, ConfigError> {
        self.zones
            .iter()
            .find(|z| z.id == id)
            .ok_or(ConfigError::UnknownZone(id))
    }
}

/// Timing and animation constants shared by every zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineTuning {
    /// Loading overlay stays up at least this long
    pub min_loading_secs: f64,
    /// Synthetic progress step while real progress stalls
    pub progress_step: f32,
    pub progress_interval_secs: f64,
    /// Synthetic progress never goes past this
    pub synthetic_ceiling: f32,
    pub transition_secs: f64,
    pub warp_start_speed: f32,
    pub warp_end_speed: f32,
    /// Loading warp speed is `warp_start_speed + min(progress, cap)`
    pub loading_speed_cap: f32,
    pub star_count: usize,
    pub yaw_smoothing: f32,
    pub tween_secs: f32,
    pub overlay_fade_secs: f64,
    /// Distance units per pixel of wheel delta
    pub scroll_sensitivity: f32,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            min_loading_secs: 5.0,
            progress_step: 0.3,
            progress_interval_secs: 0.1,
            synthetic_ceiling: 89.9,
            transition_secs: 0.1,
            warp_start_speed: 5.0,
            warp_end_speed: 50.0,
            loading_speed_cap: 30.0,
            star_count: 1000,
            yaw_smoothing: 0.05,
            tween_secs: 0.5,
            overlay_fade_secs: 0.5,
            scroll_sensitivity: 0.05,
        }
    }
}

impl EngineTuning {
    /// Apply millisecond overrides from the command line
    pub fn with_overrides(mut self, transition_ms: Option<u64>, min_loading_ms: Option<u64>) -> Self {
        if let Some(ms) = transition_ms {
            self.transition_secs = ms as f64 / 1000.0;
        }
        if let Some(ms) = min_loading_ms {
            self.min_loading_secs = ms as f64 / 1000.0;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_zone_in_order() {
        let manifest = Manifest::builtin();
        let ids: Vec<ZoneId> = manifest.zones.iter().map(|z| z.id).collect();
        assert_eq!(ids, ZoneId::ALL.to_vec());
        let zone3 = manifest.zone(ZoneId::Zone3).expect("zone3");
        assert!((zone3.model.position.z - 28.0).abs() < 0.001);
        assert_eq!(zone3.lighting, LightingProfile::Daylight);
    }

    #[test]
    fn test_warm_bounds() {
        let manifest = Manifest::builtin();
        let zone2 = manifest.zone(ZoneId::Zone2).expect("zone2");
        assert!((zone2.camera.max_distance - 12.0).abs() < 0.001);
        assert!((zone2.camera.max_yaw_deg - 55.0).abs() < 0.001);
    }

    #[test]
    fn test_bundled_manifest_matches_builtin() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/zones.ron"));
        assert_eq!(Manifest::load(path).expect("bundled manifest"), Manifest::builtin());
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let text = r#"(zones: [(
            id: Zone2,
            model_path: "m.glb",
            environment_path: "sky.hdr",
            lighting: Warm,
        )])"#;
        let manifest = Manifest::parse(text).expect("parse");
        let zone = &manifest.zones[0];
        assert!((zone.portal.rotation_y - PI).abs() < 0.001);
        assert!((zone.portal.scale - 1.0).abs() < 0.001);
        assert!((zone.camera.base_distance - 8.0).abs() < 0.001);
    }

    fn zone_with(fields: &str) -> String {
        format!(
            r#"(zones: [(id: Zone1, model_path: "m.glb", environment_path: "sky.hdr", lighting: Daylight, {fields})])"#
        )
    }

    #[test]
    fn test_inverted_camera_bounds_rejected() {
        let text = zone_with("camera: (min_distance: 5.0, max_distance: 2.0)");
        assert!(matches!(
            Manifest::parse(&text),
            Err(ConfigError::InvalidZone { id: ZoneId::Zone1, .. })
        ));
    }

    #[test]
    fn test_non_finite_and_degenerate_zones_rejected() {
        for fields in [
            "camera: (max_distance: inf)",
            "camera: (base_distance: NaN)",
            "portal: (scale: 0.0)",
            "portal: (scale: -2.0)",
            "model: (scale: 0.0)",
        ] {
            let text = zone_with(fields);
            assert!(
                matches!(Manifest::parse(&text), Err(ConfigError::InvalidZone { .. })),
                "accepted {fields}"
            );
        }
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("zones.ron");
        std::fs::write(&path, zone_with("camera: (min_distance: 5.0, max_distance: 2.0)")).expect("write");
        assert_eq!(Manifest::load_or_builtin(&path), Manifest::builtin());
    }

    #[test]
    fn test_builtin_zones_are_valid() {
        for zone in &Manifest::builtin().zones {
            assert!(zone.validate().is_ok(), "{:?}", zone.id);
        }
    }

    #[test]
    fn test_empty_manifest_rejected() {
        assert!(matches!(Manifest::parse("(zones: [])"), Err(ConfigError::EmptyManifest)));
    }

    #[test]
    fn test_unknown_zone() {
        let mut manifest = Manifest::builtin();
        manifest.zones.retain(|z| z.id != ZoneId::Zone4);
        assert!(matches!(manifest.zone(ZoneId::Zone4), Err(ConfigError::UnknownZone(ZoneId::Zone4))));
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("zones.ron");
        std::fs::write(&path, "(zones: [").expect("write");
        assert!(matches!(Manifest::load(&path), Err(ConfigError::Parse(_))));
        assert_eq!(Manifest::load_or_builtin(&path), Manifest::builtin());
        assert!(matches!(
            Manifest::load(&dir.path().join("missing.ron")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_profile_portal_opacity() {
        assert!(LightingProfile::Warm.portal_opacity(1.0).abs() < 0.001);
        let o = LightingProfile::Daylight.portal_opacity(0.0);
        assert!((o - 0.5).abs() < 0.001);
        for i in 0..50 {
            let o = LightingProfile::Daylight.portal_opacity(i as f32 * 0.13);
            assert!((0.3 - 0.001..=0.7 + 0.001).contains(&o));
        }
    }

    #[test]
    fn test_tuning_overrides() {
        let tuning = EngineTuning::default().with_overrides(Some(250), None);
        assert!((tuning.transition_secs - 0.25).abs() < 1e-9);
        assert!((tuning.min_loading_secs - 5.0).abs() < 1e-9);
    }
}
