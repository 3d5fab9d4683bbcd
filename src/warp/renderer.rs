//! Warp renderer
//!
//! Projects stars onto a 2D surface and draws each as a streak pointing
//! toward the screen centre. Every frame first darkens what is already on
//! the surface, which leaves trails behind the streaks.

use crate::rasterizer::{Color, Framebuffer};
use super::starfield::Star;

/// Perspective scale constant: screen offset = world offset * PERSPECTIVE / depth
pub const PERSPECTIVE: f32 = 600.0;

/// Streak length per unit of speed and projected scale
pub const STREAK_FACTOR: f32 = 0.2;

/// Alpha of the black fill composited before each frame
pub const TRAIL_FADE: f32 = 0.1;

/// 2D drawing target for the warp
pub trait WarpSurface {
    /// Surface size in pixels
    fn size(&self) -> (f32, f32);
    /// Composite black at `alpha` over the whole surface
    fn fade(&mut self, alpha: f32);
    /// Stroke an opaque line with butt ends
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color);
}

impl WarpSurface for Framebuffer {
    fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn fade(&mut self, alpha: f32) {
        self.fill_alpha(Color::BLACK, alpha);
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        self.draw_thick_line_alpha(from.0, from.1, to.0, to.1, width, color, 1.0);
    }
}

/// Draw one warp frame. Streak geometry depends only on the stars and speed;
/// elapsed time is currently unused.
pub fn draw_warp_frame<S: WarpSurface + ?Sized>(surface: &mut S, stars: &[Star], speed: f32, _elapsed: f32) {
    let (w, h) = surface.size();
    let (cx, cy) = (w * 0.5, h * 0.5);

    surface.fade(TRAIL_FADE);

    for star in stars {
        if star.z <= 0.0 {
            continue;
        }
        let scale = PERSPECTIVE / star.z;
        let sx = star.x() * scale + cx;
        let sy = star.y() * scale + cy;

        let streak = speed * scale * STREAK_FACTOR;
        let dx = sx - cx;
        let dy = sy - cy;
        let len = (dx * dx + dy * dy).sqrt();
        if len < f32::EPSILON {
            continue;
        }
        let end = (sx - dx / len * streak, sy - dy / len * streak);

        surface.stroke_line((sx, sy), end, star.size * scale, star.color);
    }
}
