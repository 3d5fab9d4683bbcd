//! Zone assets
//!
//! Environment panoramas and glTF models, loaded off the frame loop and
//! polled once per frame.

pub mod animation;
pub mod environment;
pub mod error;
pub mod loader;
pub mod model;
pub mod task;

pub use animation::Mixer;
pub use environment::{Background, EnvironmentMap};
pub use loader::{AssetLoader, LoadedAssets};
pub use model::Model;
