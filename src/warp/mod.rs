//! Warp tunnel
//!
//! The radiating starfield shown while a zone loads and again when the
//! camera passes through its portal. Both phases share one generator and one
//! renderer; only the star sizes and the speed schedule differ.

pub mod renderer;
pub mod starfield;

pub use renderer::draw_warp_frame;
pub use starfield::{Starfield, LOADING_SIZES, TRANSITION_SIZES};
