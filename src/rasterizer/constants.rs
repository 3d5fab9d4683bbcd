//! Rasterizer constants
//!
//! Internal render resolution. Width follows the window aspect ratio.

/// Internal scene height in pixels
pub const SCENE_HEIGHT: usize = 240;

/// Widest internal scene buffer allowed
pub const MAX_SCENE_WIDTH: usize = 640;

/// Scene buffer size for a window, preserving its aspect ratio
pub fn scene_size(window_w: f32, window_h: f32) -> (usize, usize) {
    if window_w <= 0.0 || window_h <= 0.0 {
        return (SCENE_HEIGHT * 4 / 3, SCENE_HEIGHT);
    }
    let w = (SCENE_HEIGHT as f32 * window_w / window_h).round() as usize;
    (w.clamp(1, MAX_SCENE_WIDTH), SCENE_HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_size_follows_aspect() {
        assert_eq!(scene_size(1920.0, 1080.0), (427, 240));
        assert_eq!(scene_size(0.0, 0.0), (320, 240));
    }
}
