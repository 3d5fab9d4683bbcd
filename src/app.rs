//! Application state and zone cycling
//!
//! Fixed set of zones visited in order. The app owns the one mounted
//! `ZoneEngine`; when its portal notifier fires, the engine is torn down
//! and the next zone is mounted fresh.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::{ConfigError, EngineTuning, Manifest};
use crate::input::FrameInput;
use crate::zone::{FrameView, ZoneEngine};

/// The zones (fixed set, visited in this order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum ZoneId {
    Zone1,
    Zone2,
    Zone3,
    Zone4,
}

impl ZoneId {
    pub const ALL: [ZoneId; 4] = [ZoneId::Zone1, ZoneId::Zone2, ZoneId::Zone3, ZoneId::Zone4];

    pub fn label(&self) -> &'static str {
        match self {
            ZoneId::Zone1 => "Stone Age",
            ZoneId::Zone2 => "Medieval",
            ZoneId::Zone3 => "Industrial",
            ZoneId::Zone4 => "Modern",
        }
    }
}

/// Zone after `current`, wrapping from the last back to the first
pub fn next_zone(current: ZoneId) -> ZoneId {
    match current {
        ZoneId::Zone1 => ZoneId::Zone2,
        ZoneId::Zone2 => ZoneId::Zone3,
        ZoneId::Zone3 => ZoneId::Zone4,
        ZoneId::Zone4 => ZoneId::Zone1,
    }
}

pub struct AppState {
    manifest: Manifest,
    tuning: EngineTuning,
    current: ZoneId,
    engine: Option<ZoneEngine>,
    /// Set by the mounted engine's notifier, consumed by `tick`
    portal_entered: Rc<Cell<bool>>,
}

impl AppState {
    pub fn new(manifest: Manifest, tuning: EngineTuning, start: ZoneId, now: f64) -> Result<Self, ConfigError> {
        let mut app = Self {
            manifest,
            tuning,
            current: start,
            engine: None,
            portal_entered: Rc::new(Cell::new(false)),
        };
        app.mount(start, now)?;
        Ok(app)
    }

    fn mount(&mut self, id: ZoneId, now: f64) -> Result<(), ConfigError> {
        let config = self.manifest.zone(id)?.clone();
        // Tear the old zone down before the new one starts loading
        self.engine = None;
        self.portal_entered.set(false);
        let flag = self.portal_entered.clone();
        self.engine = Some(ZoneEngine::mount(
            config,
            self.tuning,
            now,
            Some(Box::new(move || flag.set(true))),
        ));
        self.current = id;
        info!("zone {:?} ({}) mounted", id, id.label());
        Ok(())
    }

    /// Mount the next zone listed in the manifest
    fn advance(&mut self, now: f64) {
        let mut next = next_zone(self.current);
        for _ in 0..ZoneId::ALL.len() {
            match self.mount(next, now) {
                Ok(()) => return,
                Err(e) => {
                    warn!("skipping {next:?}: {e}");
                    next = next_zone(next);
                }
            }
        }
        error!("no zone could be mounted after {:?}", self.current);
    }

    pub fn tick(&mut self, now: f64, input: &FrameInput) {
        if let Some(engine) = self.engine.as_mut() {
            engine.tick(now, input);
        }
        if self.portal_entered.replace(false) {
            self.advance(now);
        }
    }

    pub fn view(&self, now: f64) -> Option<FrameView<'_>> {
        self.engine.as_ref().map(|e| e.view(now))
    }
}

#[cfg(test)]
impl AppState {
    pub fn current(&self) -> ZoneId {
        self.current
    }

    pub fn engine(&self) -> Option<&ZoneEngine> {
        self.engine.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::state::TransitionState;

    #[test]
    fn test_next_zone_cycles() {
        assert_eq!(next_zone(ZoneId::Zone1), ZoneId::Zone2);
        assert_eq!(next_zone(ZoneId::Zone2), ZoneId::Zone3);
        assert_eq!(next_zone(ZoneId::Zone3), ZoneId::Zone4);
        assert_eq!(next_zone(ZoneId::Zone4), ZoneId::Zone1);
    }

    #[test]
    fn test_full_cycle_returns_home() {
        for start in ZoneId::ALL {
            let mut z = start;
            for _ in 0..ZoneId::ALL.len() {
                z = next_zone(z);
            }
            assert_eq!(z, start);
        }
    }

    #[test]
    fn test_unknown_start_zone() {
        let mut manifest = Manifest::builtin();
        manifest.zones.retain(|z| z.id == ZoneId::Zone1);
        let result = AppState::new(manifest, EngineTuning::default(), ZoneId::Zone3, 0.0);
        assert!(matches!(result, Err(ConfigError::UnknownZone(ZoneId::Zone3))));
    }

    #[test]
    fn test_portal_advances_to_next_zone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manifest = Manifest::builtin();
        for zone in &mut manifest.zones {
            zone.model_path = dir.path().join("missing.glb");
            zone.environment_path = dir.path().join("missing.hdr");
        }
        // Zone3 is absent, so Zone2 leads to Zone4
        manifest.zones.retain(|z| z.id != ZoneId::Zone3);
        let tuning = EngineTuning::default().with_overrides(Some(0), Some(0));
        let mut app = AppState::new(manifest, tuning, ZoneId::Zone2, 0.0).expect("app");

        let mut now = 0.0;
        let mut input = FrameInput {
            pointer: None,
            scroll_delta: 0.0,
            viewport: (64.0, 48.0),
        };
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(20);
        while app.current() == ZoneId::Zone2 {
            assert!(std::time::Instant::now() < deadline, "never left zone 2");
            let active = app.engine().map(|e| e.state()) == Some(TransitionState::Active);
            input.scroll_delta = if active { -1000.0 } else { 0.0 };
            app.tick(now, &input);
            now += 1.0 / 60.0;
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(app.current(), ZoneId::Zone4);
        let engine = app.engine().expect("engine");
        assert_eq!(engine.id(), ZoneId::Zone4);
        assert_eq!(engine.state(), TransitionState::Loading);
    }
}
