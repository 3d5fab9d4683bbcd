//! Zone lifecycle
//!
//! `Loading -> Active -> Transitioning -> Done`, never backwards. Loading
//! progress only ever rises. The portal notifier fires once, on the tick
//! the transition warp reaches the end.

use tracing::{error, info};

use crate::config::EngineTuning;

/// Synthetic increments only apply below this
const SYNTHETIC_LIMIT: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransitionState {
    Loading,
    Active,
    Transitioning,
    Done,
}

/// Called once when the camera has gone through the portal
pub type PortalNotifier = Box<dyn FnMut()>;

/// Displayed loading progress, 0..=100
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingState {
    progress: f32,
    assets_loaded: bool,
    start_time: f64,
}

impl LoadingState {
    pub fn new(start_time: f64) -> Self {
        Self {
            progress: 0.0,
            assets_loaded: false,
            start_time,
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn assets_loaded(&self) -> bool {
        self.assets_loaded
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    fn raise(&mut self, value: f32) {
        if value.is_finite() {
            self.progress = self.progress.max(value.clamp(0.0, 100.0));
        }
    }

    /// Real progress from the asset loader
    pub fn report(&mut self, progress: f32) {
        if !self.assets_loaded {
            self.raise(progress);
        }
    }

    /// Nudge a stalled indicator forward without reaching `ceiling`
    pub fn synthetic_tick(&mut self, step: f32, ceiling: f32) {
        if self.assets_loaded || self.progress >= SYNTHETIC_LIMIT {
            return;
        }
        let next = (self.progress + step).min(ceiling.min(SYNTHETIC_LIMIT));
        self.raise(next);
    }

    /// Assets are in: pin the indicator at 100
    pub fn mark_loaded(&mut self) {
        self.assets_loaded = true;
        self.progress = 100.0;
    }
}

pub struct TransitionMachine {
    state: TransitionState,
    loading: LoadingState,
    tuning: EngineTuning,
    transition_start: Option<f64>,
    transition_progress: f32,
    notifier: Option<PortalNotifier>,
    notified: bool,
}

impl TransitionMachine {
    pub fn new(now: f64, tuning: EngineTuning, notifier: Option<PortalNotifier>) -> Self {
        Self {
            state: TransitionState::Loading,
            loading: LoadingState::new(now),
            tuning,
            transition_start: None,
            transition_progress: 0.0,
            notifier,
            notified: false,
        }
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn progress(&self) -> f32 {
        self.loading.progress()
    }

    pub fn report_progress(&mut self, progress: f32) {
        if self.state == TransitionState::Loading {
            self.loading.report(progress);
        }
    }

    pub fn synthetic_tick(&mut self) {
        if self.state == TransitionState::Loading {
            self.loading
                .synthetic_tick(self.tuning.progress_step, self.tuning.synthetic_ceiling);
        }
    }

    /// Earliest time `Loading` may end
    pub fn ready_at(&self) -> f64 {
        self.loading.start_time() + self.tuning.min_loading_secs
    }

    /// Record that assets are in. Returns when to complete loading, which
    /// the caller schedules instead of polling.
    pub fn assets_ready(&mut self, now: f64) -> f64 {
        self.loading.mark_loaded();
        let at = self.ready_at().max(now);
        info!(
            "assets loaded after {:.2}s, activating at +{:.2}s",
            now - self.loading.start_time(),
            at - self.loading.start_time()
        );
        at
    }

    /// `Loading -> Active` once assets are in and the minimum time is over
    pub fn complete_loading(&mut self, now: f64) -> bool {
        if self.state != TransitionState::Loading || !self.loading.assets_loaded() || now < self.ready_at() {
            return false;
        }
        self.state = TransitionState::Active;
        info!("zone active");
        true
    }

    /// First portal hit while `Active` starts the transition. Later calls
    /// change nothing.
    pub fn portal_hit(&mut self, now: f64) -> bool {
        if self.state != TransitionState::Active {
            return false;
        }
        self.state = TransitionState::Transitioning;
        self.transition_start = Some(now);
        self.transition_progress = 0.0;
        info!("portal entered, starting transition warp");
        true
    }

    /// Advance the transition warp. On the tick it completes, moves to `Done`
    /// and fires the notifier.
    pub fn advance_transition(&mut self, now: f64) -> f32 {
        let Some(start) = self.transition_start else {
            return self.transition_progress;
        };
        if self.state != TransitionState::Transitioning {
            return self.transition_progress;
        }

        let duration = self.tuning.transition_secs;
        let progress = if duration > 0.0 {
            ((now - start) / duration).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
        self.transition_progress = self.transition_progress.max(progress);

        if self.transition_progress >= 1.0 {
            self.state = TransitionState::Done;
            self.notify();
        }
        self.transition_progress
    }

    /// Warp speed ramping linearly over the transition
    pub fn transition_speed(&self) -> f32 {
        let t = &self.tuning;
        t.warp_start_speed + self.transition_progress * (t.warp_end_speed - t.warp_start_speed)
    }

    /// Loading warp speed follows displayed progress
    pub fn loading_speed(&self) -> f32 {
        let t = &self.tuning;
        t.warp_start_speed + self.loading.progress().min(t.loading_speed_cap)
    }

    fn notify(&mut self) {
        if std::mem::replace(&mut self.notified, true) {
            return;
        }
        match self.notifier.as_mut() {
            Some(notify) => {
                info!("transition complete, notifying");
                notify();
            }
            None => error!("transition complete but no portal notifier is set; staying in this zone"),
        }
    }
}

#[cfg(test)]
impl TransitionMachine {
    pub fn transition_progress(&self) -> f32 {
        self.transition_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, PortalNotifier) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Box::new(move || c.set(c.get() + 1)))
    }

    #[test]
    fn test_synthetic_never_reaches_ninety() {
        let mut loading = LoadingState::new(0.0);
        for _ in 0..1000 {
            loading.synthetic_tick(0.3, 89.9);
        }
        assert!((loading.progress() - 89.9).abs() < 0.001);
    }

    #[test]
    fn test_synthetic_stops_above_limit() {
        let mut loading = LoadingState::new(0.0);
        loading.report(95.0);
        loading.synthetic_tick(0.3, 89.9);
        assert!((loading.progress() - 95.0).abs() < 0.001);
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut loading = LoadingState::new(0.0);
        loading.report(40.0);
        loading.report(10.0);
        assert!((loading.progress() - 40.0).abs() < 0.001);
        loading.report(250.0);
        assert!((loading.progress() - 100.0).abs() < 0.001);
        loading.report(f32::NAN);
        assert!((loading.progress() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_loaded_pins_hundred() {
        let mut loading = LoadingState::new(0.0);
        loading.report(20.0);
        loading.mark_loaded();
        loading.report(30.0);
        loading.synthetic_tick(0.3, 89.9);
        assert!((loading.progress() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_no_active_before_minimum() {
        let mut machine = TransitionMachine::new(1.0, EngineTuning::default(), None);
        let at = machine.assets_ready(1.2);
        assert!((at - 6.0).abs() < 1e-9);
        assert!(!machine.complete_loading(5.99));
        assert_eq!(machine.state(), TransitionState::Loading);
        assert!(machine.complete_loading(at));
        assert_eq!(machine.state(), TransitionState::Active);
    }

    #[test]
    fn test_late_assets_activate_immediately() {
        let mut machine = TransitionMachine::new(0.0, EngineTuning::default(), None);
        let at = machine.assets_ready(8.0);
        assert!((at - 8.0).abs() < 1e-9);
        assert!(machine.complete_loading(8.0));
    }

    #[test]
    fn test_no_active_without_assets() {
        let mut machine = TransitionMachine::new(0.0, EngineTuning::default(), None);
        assert!(!machine.complete_loading(100.0));
        assert!(!machine.portal_hit(100.0));
        assert_eq!(machine.state(), TransitionState::Loading);
    }

    #[test]
    fn test_notifier_fires_once_after_completion() {
        let (count, notifier) = counter();
        let mut machine = TransitionMachine::new(0.0, EngineTuning::default(), Some(notifier));
        machine.assets_ready(0.0);
        machine.complete_loading(5.0);
        assert!(machine.portal_hit(6.0));
        assert!(!machine.portal_hit(6.01));

        machine.advance_transition(6.05);
        assert_eq!(count.get(), 0);
        assert!(machine.transition_progress() < 1.0);
        assert_eq!(machine.state(), TransitionState::Transitioning);

        machine.advance_transition(6.15);
        assert_eq!(count.get(), 1);
        assert_eq!(machine.state(), TransitionState::Done);
        assert!((machine.transition_progress() - 1.0).abs() < 0.001);

        machine.advance_transition(7.0);
        assert!(!machine.portal_hit(7.0));
        assert_eq!(count.get(), 1);
        assert_eq!(machine.state(), TransitionState::Done);
    }

    #[test]
    fn test_speed_ramp() {
        let mut machine = TransitionMachine::new(0.0, EngineTuning::default(), None);
        machine.assets_ready(0.0);
        machine.complete_loading(5.0);
        machine.portal_hit(10.0);
        assert!((machine.transition_speed() - 5.0).abs() < 0.001);
        machine.advance_transition(10.05);
        assert!((machine.transition_speed() - 27.5).abs() < 0.01);
        machine.advance_transition(10.2);
        assert!((machine.transition_speed() - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_missing_notifier_still_finishes() {
        let mut machine = TransitionMachine::new(0.0, EngineTuning::default(), None);
        machine.assets_ready(0.0);
        machine.complete_loading(5.0);
        machine.portal_hit(5.0);
        machine.advance_transition(6.0);
        assert_eq!(machine.state(), TransitionState::Done);
        machine.advance_transition(7.0);
        assert_eq!(machine.state(), TransitionState::Done);
        assert!((machine.transition_progress() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_loading_speed_caps() {
        let mut machine = TransitionMachine::new(0.0, EngineTuning::default(), None);
        assert!((machine.loading_speed() - 5.0).abs() < 0.001);
        machine.report_progress(20.0);
        assert!((machine.loading_speed() - 25.0).abs() < 0.001);
        machine.report_progress(80.0);
        assert!((machine.loading_speed() - 35.0).abs() < 0.001);
    }
}
