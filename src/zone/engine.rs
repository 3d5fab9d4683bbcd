//! Zone engine
//!
//! One instance per mounted zone. Loads the zone's assets in the
//! background, shows the loading warp until the zone is ready, runs the
//! render loop while the zone is live and plays the portal warp before
//! handing control back through the notifier. Dropping the engine cancels
//! its timers and render loop and abandons any load still in flight.

use tracing::info;

use crate::assets::AssetLoader;
use crate::config::{EngineTuning, ZoneConfig};
use crate::input::FrameInput;
use crate::rasterizer::{scene_size, Color, Framebuffer};
use crate::warp::{draw_warp_frame, Starfield, LOADING_SIZES, TRANSITION_SIZES};
use super::collision::portal_volume;
use super::render_loop::{FrameOutcome, RenderLoop};
use super::scene::SceneController;
use super::state::{PortalNotifier, TransitionMachine, TransitionState};
use super::timers::{TimerId, TimerKind, Timers};

/// What the overlay layer currently shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    /// Loading warp, fully opaque
    Loading,
    /// Loading warp fading out over the live scene
    Fading { start: f64 },
    Hidden,
    /// Portal warp composited over the last scene frame
    Transition,
}

/// Layers to present this frame, bottom to top
pub struct FrameView<'a> {
    pub scene: Option<&'a Framebuffer>,
    pub overlay: Option<(&'a Framebuffer, f32)>,
    /// Whole-percent loading progress while the loading overlay is up
    pub progress_label: Option<u32>,
}

pub struct ZoneEngine {
    config: ZoneConfig,
    tuning: EngineTuning,
    machine: TransitionMachine,
    timers: Timers,
    progress_timer: Option<TimerId>,
    loader: Option<AssetLoader>,
    scene: SceneController,
    render_loop: RenderLoop,
    loading_warp: Starfield,
    transition_warp: Option<Starfield>,
    scene_fb: Framebuffer,
    overlay_fb: Framebuffer,
    overlay: Overlay,
    mounted_at: f64,
    last_tick: f64,
    scene_drawn: bool,
    torn_down: bool,
}

impl ZoneEngine {
    /// Mount a zone and start loading its assets
    pub fn mount(config: ZoneConfig, tuning: EngineTuning, now: f64, notifier: Option<PortalNotifier>) -> Self {
        let loader = AssetLoader::start(config.model_path.clone(), config.environment_path.clone());
        Self::with_loader(config, tuning, now, notifier, loader)
    }

    pub fn with_loader(
        config: ZoneConfig,
        tuning: EngineTuning,
        now: f64,
        notifier: Option<PortalNotifier>,
        loader: AssetLoader,
    ) -> Self {
        info!("mounting zone {:?}", config.id);
        let mut timers = Timers::new();
        let progress_timer = timers.schedule_every(TimerKind::ProgressTick, now, tuning.progress_interval_secs);

        let mut overlay_fb = Framebuffer::new(1, 1);
        overlay_fb.clear(Color::BLACK);

        Self {
            scene: SceneController::new(&config, &tuning),
            render_loop: RenderLoop::new(portal_volume(&config.portal)),
            machine: TransitionMachine::new(now, tuning, notifier),
            loading_warp: Starfield::new(tuning.star_count, LOADING_SIZES),
            transition_warp: None,
            scene_fb: Framebuffer::new(1, 1),
            overlay_fb,
            overlay: Overlay::Loading,
            timers,
            progress_timer: Some(progress_timer),
            loader: Some(loader),
            config,
            tuning,
            mounted_at: now,
            last_tick: now,
            scene_drawn: false,
            torn_down: false,
        }
    }

    pub fn progress(&self) -> f32 {
        self.machine.progress()
    }

    fn resize(&mut self, viewport: (f32, f32)) {
        let (sw, sh) = scene_size(viewport.0, viewport.1);
        self.scene_fb.resize(sw, sh);

        let ow = (viewport.0.round() as usize).max(1);
        let oh = (viewport.1.round() as usize).max(1);
        if self.overlay_fb.width != ow || self.overlay_fb.height != oh {
            self.overlay_fb.resize(ow, oh);
            if self.overlay == Overlay::Transition {
                self.overlay_fb.clear_transparent();
            } else {
                self.overlay_fb.clear(Color::BLACK);
            }
        }
    }

    fn poll_assets(&mut self, now: f64) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let progress = loader.poll();
        self.machine.report_progress(progress);
        if let Some(assets) = loader.take_assets() {
            self.loader = None;
            self.scene.install(assets);
            let at = self.machine.assets_ready(now);
            self.timers.schedule_once(TimerKind::LoadingComplete, at);
        }
    }

    fn run_timers(&mut self, now: f64) {
        for kind in self.timers.due(now) {
            match kind {
                TimerKind::ProgressTick => self.machine.synthetic_tick(),
                TimerKind::LoadingComplete => {
                    if self.machine.complete_loading(now) {
                        if let Some(id) = self.progress_timer.take() {
                            self.timers.cancel(id);
                        }
                        self.overlay = Overlay::Fading { start: now };
                        self.timers
                            .schedule_once(TimerKind::OverlayHidden, now + self.tuning.overlay_fade_secs);
                        self.render_loop.start();
                    }
                }
                TimerKind::OverlayHidden => {
                    if matches!(self.overlay, Overlay::Fading { .. }) {
                        self.overlay = Overlay::Hidden;
                    }
                }
            }
        }
    }

    fn begin_transition(&mut self) {
        self.transition_warp = Some(Starfield::new(self.tuning.star_count, TRANSITION_SIZES));
        self.overlay = Overlay::Transition;
        self.overlay_fb.clear_transparent();
        self.timers.cancel_all();
        self.progress_timer = None;
    }

    /// Advance the zone by one display frame
    pub fn tick(&mut self, now: f64, input: &FrameInput) {
        if self.torn_down {
            return;
        }
        let dt = (now - self.last_tick).max(0.0) as f32;
        self.last_tick = now;
        let elapsed = (now - self.mounted_at) as f32;

        self.resize(input.viewport);
        self.poll_assets(now);
        self.run_timers(now);

        if self.machine.state() <= TransitionState::Active {
            if let Some(x) = input.pointer_x() {
                self.scene.set_pointer(x);
            }
            self.scene.scroll(input.scroll_delta, now);
            self.scene.update_tween(now);
        }

        let outcome = self
            .render_loop
            .frame(&mut self.scene, &mut self.machine, &mut self.scene_fb, now, elapsed, dt);
        if matches!(outcome, FrameOutcome::Rendered | FrameOutcome::PortalEntered) {
            self.scene_drawn = true;
        }
        if outcome == FrameOutcome::PortalEntered {
            self.begin_transition();
        }

        match self.overlay {
            Overlay::Loading | Overlay::Fading { .. } => {
                let speed = self.machine.loading_speed();
                self.loading_warp.advance(speed);
                draw_warp_frame(&mut self.overlay_fb, &self.loading_warp.stars, speed, elapsed);
            }
            Overlay::Transition => {
                if self.machine.state() == TransitionState::Transitioning {
                    self.machine.advance_transition(now);
                    let speed = self.machine.transition_speed();
                    if let Some(warp) = self.transition_warp.as_mut() {
                        warp.advance(speed);
                        draw_warp_frame(&mut self.overlay_fb, &warp.stars, speed, elapsed);
                    }
                }
            }
            Overlay::Hidden => {}
        }
    }

    /// Layers for presentation at time `now`
    pub fn view(&self, now: f64) -> FrameView<'_> {
        let (overlay, progress_label) = match self.overlay {
            Overlay::Loading => (Some((&self.overlay_fb, 1.0)), Some(self.progress().floor() as u32)),
            Overlay::Fading { start } => {
                let fade = self.tuning.overlay_fade_secs;
                let alpha = if fade > 0.0 {
                    (1.0 - (now - start) / fade).clamp(0.0, 1.0) as f32
                } else {
                    0.0
                };
                (Some((&self.overlay_fb, alpha)), Some(self.progress().floor() as u32))
            }
            Overlay::Hidden => (None, None),
            Overlay::Transition => (Some((&self.overlay_fb, 1.0)), None),
        };
        FrameView {
            scene: self.scene_drawn.then_some(&self.scene_fb),
            overlay,
            progress_label,
        }
    }

    /// Cancel timers and the render loop and drop any pending load
    pub fn teardown(&mut self) {
        if std::mem::replace(&mut self.torn_down, true) {
            return;
        }
        self.timers.cancel_all();
        self.progress_timer = None;
        self.render_loop.cancel();
        self.loader = None;
        info!("zone {:?} torn down in state {:?}", self.config.id, self.machine.state());
    }

}

impl Drop for ZoneEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
impl ZoneEngine {
    pub fn id(&self) -> crate::app::ZoneId {
        self.config.id
    }

    pub fn state(&self) -> TransitionState {
        self.machine.state()
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    pub fn scene(&self) -> &SceneController {
        &self.scene
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn machine(&self) -> &TransitionMachine {
        &self.machine
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
