//! WARPGATE: walk through portals between immersive 3D zones
//!
//! Each zone loads a model and a panoramic sky behind a starfield warp,
//! then lets you look around and scroll toward a glowing portal. Passing
//! through it plays the warp again and loads the next zone.
//! - Software-rendered scene at 240 lines
//! - glTF models with looping animation
//! - HDR / EXR / PNG / JPEG environment maps with a procedural fallback

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod app;
mod assets;
mod config;
mod input;
mod present;
mod rasterizer;
mod warp;
mod zone;

use std::path::PathBuf;

use clap::Parser;
use macroquad::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::{AppState, ZoneId};
use config::{EngineTuning, Manifest, DEFAULT_MANIFEST};
use input::FrameInput;
use present::Presenter;

/// Log filter used when neither --log nor RUST_LOG is set
const DEFAULT_LOG_FILTER: &str = "warpgate=info";

#[derive(Parser, Debug)]
#[command(name = "warpgate", version, about = "Walk through portals between 3D zones")]
struct Args {
    /// Zone manifest (RON); built-in zones are used if it cannot be read
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    zones: PathBuf,

    /// Zone to start in
    #[arg(long, value_enum, default_value_t = ZoneId::Zone1)]
    start: ZoneId,

    /// Portal warp duration in milliseconds
    #[arg(long)]
    transition_ms: Option<u64>,

    /// Minimum time the loading warp stays up, in milliseconds
    #[arg(long)]
    min_loading_ms: Option<u64>,

    /// Log filter, e.g. "warpgate=debug"
    #[arg(long)]
    log: Option<String>,
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn window_conf() -> Conf {
    Conf {
        window_title: format!("WARPGATE v{}", VERSION),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    let args = Args::parse();
    init_logging(args.log.as_deref());
    info!("warpgate v{VERSION}");

    let manifest = Manifest::load_or_builtin(&args.zones);
    let tuning = EngineTuning::default().with_overrides(args.transition_ms, args.min_loading_ms);

    let mut app = match AppState::new(manifest, tuning, args.start, get_time()) {
        Ok(app) => app,
        Err(e) => {
            error!("cannot start in {:?}: {e}", args.start);
            return;
        }
    };

    show_mouse(false);
    let mut presenter = Presenter::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("escape pressed, quitting");
            break;
        }

        let now = get_time();
        let input = FrameInput::sample();
        app.tick(now, &input);
        if let Some(view) = app.view(now) {
            presenter.draw(&view);
        }

        next_frame().await;
    }
}
