//! Per-frame input sample
//!
//! The zone engine only sees a pointer position, a wheel delta and the
//! viewport size. Wheel deltas use the browser convention: pixels,
//! positive when scrolling toward the user.

use macroquad::prelude::*;

/// Pixels of wheel delta per notch
pub const WHEEL_NOTCH_PX: f32 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Pointer position in window pixels
    pub pointer: Option<(f32, f32)>,
    pub scroll_delta: f32,
    pub viewport: (f32, f32),
}

impl FrameInput {
    /// Read this frame's input from macroquad
    pub fn sample() -> Self {
        let (_, wheel_y) = mouse_wheel();
        Self {
            pointer: Some(mouse_position()),
            scroll_delta: wheel_to_pixels(wheel_y),
            viewport: (screen_width(), screen_height()),
        }
    }

    /// Pointer x mapped to -1 (left edge) ..= 1 (right edge)
    pub fn pointer_x(&self) -> Option<f32> {
        let (x, _) = self.pointer?;
        let width = self.viewport.0;
        if width <= 0.0 {
            return None;
        }
        Some((x / width * 2.0 - 1.0).clamp(-1.0, 1.0))
    }
}

/// macroquad reports wheel-up as positive notches
pub fn wheel_to_pixels(wheel_y: f32) -> f32 {
    if wheel_y.is_finite() {
        -wheel_y * WHEEL_NOTCH_PX
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_normalization() {
        let mut input = FrameInput {
            pointer: Some((0.0, 10.0)),
            scroll_delta: 0.0,
            viewport: (800.0, 600.0),
        };
        assert!((input.pointer_x().unwrap_or(0.0) + 1.0).abs() < 0.001);
        input.pointer = Some((400.0, 10.0));
        assert!(input.pointer_x().unwrap_or(1.0).abs() < 0.001);
        input.pointer = Some((1200.0, 10.0));
        assert!((input.pointer_x().unwrap_or(0.0) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_no_pointer_or_viewport() {
        assert!(FrameInput::default().pointer_x().is_none());
        let input = FrameInput {
            pointer: Some((5.0, 5.0)),
            ..FrameInput::default()
        };
        assert!(input.pointer_x().is_none());
    }

    #[test]
    fn test_wheel_direction() {
        assert!((wheel_to_pixels(1.0) + 100.0).abs() < 0.001);
        assert!((wheel_to_pixels(-2.0) - 200.0).abs() < 0.001);
        assert!(wheel_to_pixels(f32::NAN).abs() < 0.001);
    }
}
