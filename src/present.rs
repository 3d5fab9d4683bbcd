//! Screen presentation
//!
//! Uploads the zone's framebuffers to GPU textures and stretches them over
//! the window: the scene first, then the warp overlay at its current
//! opacity, then the loading percentage.

use macroquad::prelude::*;

use crate::rasterizer::Framebuffer;
use crate::zone::FrameView;

const LABEL_SIZE: f32 = 24.0;
/// Distance of the label baseline from the bottom edge
const LABEL_MARGIN: f32 = 48.0;

/// Reused GPU textures, one per layer
#[derive(Default)]
pub struct Presenter {
    scene: Option<Texture2D>,
    overlay: Option<Texture2D>,
}

fn upload<'a>(slot: &'a mut Option<Texture2D>, fb: &Framebuffer, filter: FilterMode) -> &'a Texture2D {
    let fits = slot
        .as_ref()
        .is_some_and(|t| t.width() as usize == fb.width && t.height() as usize == fb.height);
    if fits {
        if let Some(tex) = slot.as_ref() {
            tex.update_from_bytes(fb.width as u32, fb.height as u32, &fb.pixels);
        }
    } else {
        let tex = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        tex.set_filter(filter);
        *slot = Some(tex);
    }
    slot.get_or_insert_with(Texture2D::empty)
}

fn stretch(tex: &Texture2D, tint: Color) {
    draw_texture_ex(
        tex,
        0.0,
        0.0,
        tint,
        DrawTextureParams {
            dest_size: Some(vec2(screen_width(), screen_height())),
            ..Default::default()
        },
    );
}

pub fn progress_text(percent: u32) -> String {
    format!("{}%", percent.min(100))
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, view: &FrameView) {
        clear_background(BLACK);

        if let Some(fb) = view.scene {
            // Low-res scene, kept blocky
            let tex = upload(&mut self.scene, fb, FilterMode::Nearest);
            stretch(tex, WHITE);
        }

        if let Some((fb, alpha)) = view.overlay {
            if alpha > 0.0 {
                let tex = upload(&mut self.overlay, fb, FilterMode::Linear);
                stretch(tex, Color::new(1.0, 1.0, 1.0, alpha.min(1.0)));
            }
        }

        if let Some(percent) = view.progress_label {
            let text = progress_text(percent);
            let alpha = view.overlay.map_or(1.0, |(_, a)| a);
            let dims = measure_text(&text, None, LABEL_SIZE as u16, 1.0);
            draw_text(
                &text,
                (screen_width() - dims.width) * 0.5,
                screen_height() - LABEL_MARGIN,
                LABEL_SIZE,
                Color::new(1.0, 1.0, 1.0, alpha),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_text() {
        assert_eq!(progress_text(0), "0%");
        assert_eq!(progress_text(42), "42%");
        assert_eq!(progress_text(250), "100%");
    }
}
