//! Live-zone frame driver
//!
//! Runs once per display frame while the zone is `Active`, in a fixed order:
//! smooth yaw, rebuild the camera volume, test the portal, advance the
//! model animation, pulse the portal and particles, render. Once the state
//! leaves `Active` the loop cancels itself and can never be started again.

use tracing::debug;

use crate::rasterizer::Framebuffer;
use super::collision::Aabb;
use super::scene::SceneController;
use super::state::{TransitionMachine, TransitionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Loop not running
    Idle,
    Rendered,
    /// Rendered, and the camera reached the portal this frame
    PortalEntered,
    /// State had already left `Active`; nothing drawn
    Cancelled,
}

#[derive(Debug)]
pub struct RenderLoop {
    portal: Aabb,
    running: bool,
    cancelled: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn new(portal: Aabb) -> Self {
        Self {
            portal,
            running: false,
            cancelled: false,
            frames: 0,
        }
    }

    /// Returns false if already running or cancelled
    pub fn start(&mut self) -> bool {
        if self.running || self.cancelled {
            return false;
        }
        self.running = true;
        debug!("render loop started");
        true
    }

    pub fn cancel(&mut self) {
        if self.running {
            debug!("render loop cancelled after {} frames", self.frames);
        }
        self.running = false;
        self.cancelled = true;
    }

    /// One frame. `t` is the pulse clock in seconds, `dt` the wall-clock
    /// delta since the previous frame.
    pub fn frame(
        &mut self,
        scene: &mut SceneController,
        machine: &mut TransitionMachine,
        fb: &mut Framebuffer,
        now: f64,
        t: f32,
        dt: f32,
    ) -> FrameOutcome {
        if !self.running {
            return FrameOutcome::Idle;
        }
        if machine.state() != TransitionState::Active {
            self.cancel();
            return FrameOutcome::Cancelled;
        }

        scene.smooth_yaw();
        let camera_box = scene.camera_volume();
        let entered = camera_box.intersects(&self.portal) && machine.portal_hit(now);
        scene.advance_animation(dt);
        scene.pulse(t);
        scene.render(fb);
        self.frames += 1;

        if entered {
            self.cancel();
            FrameOutcome::PortalEntered
        } else {
            FrameOutcome::Rendered
        }
    }
}

#[cfg(test)]
impl RenderLoop {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn portal_volume(&self) -> &Aabb {
        &self.portal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ZoneId;
    use crate::config::{EngineTuning, Manifest};
    use crate::rasterizer::Vec3;
    use crate::zone::collision::portal_volume;

    fn setup() -> (RenderLoop, SceneController, TransitionMachine, Framebuffer) {
        let manifest = Manifest::builtin();
        let config = manifest.zone(ZoneId::Zone2).expect("zone");
        let tuning = EngineTuning::default();
        let scene = SceneController::new(config, &tuning);
        let mut machine = TransitionMachine::new(0.0, tuning, None);
        machine.assets_ready(0.0);
        machine.complete_loading(5.0);
        (RenderLoop::new(portal_volume(&config.portal)), scene, machine, Framebuffer::new(32, 24))
    }

    #[test]
    fn test_idle_until_started() {
        let (mut lp, mut scene, mut machine, mut fb) = setup();
        assert_eq!(lp.frame(&mut scene, &mut machine, &mut fb, 5.0, 0.0, 0.016), FrameOutcome::Idle);
        assert!(lp.start());
        assert!(!lp.start());
        assert_eq!(lp.frame(&mut scene, &mut machine, &mut fb, 5.0, 0.0, 0.016), FrameOutcome::Rendered);
        assert_eq!(lp.frames(), 1);
    }

    #[test]
    fn test_portal_hit_cancels_loop() {
        let (mut lp, mut scene, mut machine, mut fb) = setup();
        lp.start();
        scene.camera.position = Vec3::new(0.0, 0.0, 0.5);
        let outcome = lp.frame(&mut scene, &mut machine, &mut fb, 6.0, 1.0, 0.016);
        assert_eq!(outcome, FrameOutcome::PortalEntered);
        assert_eq!(machine.state(), TransitionState::Transitioning);
        assert!(!lp.is_running());
        assert_eq!(lp.frame(&mut scene, &mut machine, &mut fb, 6.1, 1.1, 0.016), FrameOutcome::Idle);
        assert!(!lp.start());
    }

    #[test]
    fn test_cancels_when_state_moved_on() {
        let (mut lp, mut scene, mut machine, mut fb) = setup();
        lp.start();
        machine.portal_hit(5.5);
        assert_eq!(lp.frame(&mut scene, &mut machine, &mut fb, 5.6, 0.0, 0.016), FrameOutcome::Cancelled);
        assert!(!lp.is_running());
    }

    #[test]
    fn test_yaw_smoothed_each_frame() {
        let (mut lp, mut scene, mut machine, mut fb) = setup();
        lp.start();
        scene.set_pointer(-1.0);
        lp.frame(&mut scene, &mut machine, &mut fb, 5.0, 0.0, 0.016);
        let expected = 55f32.to_radians() * 0.05;
        assert!((scene.camera.rotation_y - expected).abs() < 0.0001);
    }
}
