//! Zone engine
//!
//! Everything that runs while one zone is mounted: frame timers, collision
//! volumes, the lifecycle state machine, the scene and camera controller
//! with its portal, the live render loop, and the `ZoneEngine` that ties
//! them to the warp overlay.

pub mod collision;
pub mod engine;
pub mod portal;
pub mod render_loop;
pub mod scene;
pub mod state;
pub mod timers;

pub use engine::{FrameView, ZoneEngine};
