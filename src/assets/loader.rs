//! Zone asset loader
//!
//! Loads the environment map and the model in parallel and folds their
//! progress into one percentage: the environment covers 0..50, the model
//! 50..100. The reported value never decreases.

use std::path::PathBuf;

use tracing::{error, info, warn};

use super::environment::{fallback_environment, load_environment, EnvironmentMap};
use super::model::{load_model, Model};
use super::task::{LoadTask, TaskStatus};

/// Share of overall progress owned by the environment map
const ENV_WEIGHT: f32 = 50.0;
/// Progress floor once the model has been parsed
const MODEL_LOADED_FLOOR: f32 = 75.0;

/// Everything a zone needs from disk
#[derive(Debug, Clone)]
pub struct LoadedAssets {
    pub environment: EnvironmentMap,
    /// None when the model failed to load; the zone runs without it
    pub model: Option<Model>,
}

pub struct AssetLoader {
    env_task: LoadTask<EnvironmentMap>,
    model_task: LoadTask<Model>,
    environment: Option<EnvironmentMap>,
    model: Option<Option<Model>>,
    progress: f32,
}

impl AssetLoader {
    /// Start loading both assets on background threads
    pub fn start(model_path: PathBuf, environment_path: PathBuf) -> Self {
        info!(
            "loading zone assets: model={} environment={}",
            model_path.display(),
            environment_path.display()
        );
        let env_task = LoadTask::spawn("environment", move |progress| {
            load_environment(&environment_path, |f| progress.report(f))
        });
        let model_task = LoadTask::spawn("model", move |progress| {
            load_model(&model_path, |f| progress.report(f))
        });
        Self::from_tasks(env_task, model_task)
    }

    pub fn from_tasks(env_task: LoadTask<EnvironmentMap>, model_task: LoadTask<Model>) -> Self {
        Self {
            env_task,
            model_task,
            environment: None,
            model: None,
            progress: 0.0,
        }
    }

    fn raise(&mut self, candidate: f32) {
        self.progress = self.progress.max(candidate.clamp(0.0, 100.0));
    }

    /// Drain both tasks. Returns the combined progress, 0..=100.
    pub fn poll(&mut self) -> f32 {
        if self.environment.is_none() {
            let mut reported = Vec::new();
            let status = self.env_task.poll(|f| reported.push(f * ENV_WEIGHT));
            for p in reported {
                self.raise(p);
            }
            match status {
                TaskStatus::Pending => {}
                TaskStatus::Ready(env) => {
                    info!("environment ready");
                    self.raise(ENV_WEIGHT);
                    self.environment = Some(env);
                }
                TaskStatus::Failed(e) => {
                    warn!("environment failed ({e}); using fallback gradient");
                    self.environment = Some(fallback_environment());
                }
            }
        }

        if self.model.is_none() {
            let mut reported = Vec::new();
            let status = self.model_task.poll(|f| reported.push(ENV_WEIGHT + f * (100.0 - ENV_WEIGHT)));
            for p in reported {
                self.raise(p);
            }
            match status {
                TaskStatus::Pending => {}
                TaskStatus::Ready(model) => {
                    info!("model ready");
                    self.raise(MODEL_LOADED_FLOOR);
                    self.model = Some(Some(model));
                }
                TaskStatus::Failed(e) => {
                    error!("model failed to load ({e}); continuing without it");
                    self.model = Some(None);
                }
            }
        }

        self.progress
    }

    /// Both assets resolved, successfully or through their fallbacks
    pub fn is_complete(&self) -> bool {
        self.environment.is_some() && self.model.is_some()
    }

    /// Hand the assets over once both are resolved
    pub fn take_assets(&mut self) -> Option<LoadedAssets> {
        if !self.is_complete() {
            return None;
        }
        let environment = self.environment.take()?;
        let model = self.model.take().flatten();
        Some(LoadedAssets { environment, model })
    }
}

#[cfg(test)]
impl AssetLoader {
    pub fn progress(&self) -> f32 {
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::error::AssetError;

    fn loader() -> (
        AssetLoader,
        crate::assets::task::ProgressSender<EnvironmentMap>,
        crate::assets::task::ProgressSender<Model>,
    ) {
        let (env_task, env_tx) = LoadTask::channel();
        let (model_task, model_tx) = LoadTask::channel();
        (AssetLoader::from_tasks(env_task, model_task), env_tx, model_tx)
    }

    #[test]
    fn test_progress_weights() {
        let (mut loader, env_tx, model_tx) = loader();
        env_tx.report(0.5);
        assert!((loader.poll() - 25.0).abs() < 0.001);
        model_tx.report(0.5);
        assert!((loader.poll() - 75.0).abs() < 0.001);
    }

    #[test]
    fn test_progress_never_regresses() {
        let (mut loader, env_tx, model_tx) = loader();
        model_tx.report(0.8);
        let high = loader.poll();
        env_tx.report(0.1);
        let after = loader.poll();
        assert!(after >= high);
        assert!(after <= 100.0);
    }

    #[test]
    fn test_model_failure_still_completes() {
        let (mut loader, env_tx, model_tx) = loader();
        env_tx.finish(Ok(fallback_environment()));
        model_tx.finish(Err(AssetError::Decode("broken".into())));
        loader.poll();
        assert!(loader.is_complete());
        let assets = loader.take_assets().expect("assets");
        assert!(assets.model.is_none());
    }

    #[test]
    fn test_environment_failure_installs_fallback() {
        let (mut loader, env_tx, model_tx) = loader();
        env_tx.finish(Err(AssetError::UnsupportedFormat("tga".into())));
        model_tx.finish(Ok(Model::default()));
        loader.poll();
        let assets = loader.take_assets().expect("assets");
        assert!(assets.environment.is_fallback);
        assert!(assets.model.is_some());
        assert!(loader.progress() >= MODEL_LOADED_FLOOR);
    }

    #[test]
    fn test_not_complete_until_both_resolve() {
        let (mut loader, env_tx, _model_tx) = loader();
        env_tx.finish(Ok(fallback_environment()));
        loader.poll();
        assert!(!loader.is_complete());
        assert!(loader.take_assets().is_none());
    }

    #[test]
    fn test_unsupported_extension_on_disk_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sky = dir.path().join("sky.tga");
        std::fs::write(&sky, b"not really a targa").expect("write");
        let mut loader = AssetLoader::start(dir.path().join("missing.glb"), sky);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !loader.is_complete() {
            loader.poll();
            assert!(std::time::Instant::now() < deadline, "loader timed out");
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        let assets = loader.take_assets().expect("assets");
        assert!(assets.environment.is_fallback);
        assert!(assets.model.is_none());
    }
}
