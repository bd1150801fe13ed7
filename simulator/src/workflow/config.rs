use crate::generator::scene::{build_scene, ScenePreset};
use anyhow::Context;
use scancore::hardware::sim::Scene;
use scancore::prelude::AlertMode;
use scancore::render::CanvasSize;
use scancore::ScanConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub scan: ScanConfig,
    /// Used when no explicit `scene` is given.
    pub scene_preset: ScenePreset,
    pub seed: u64,
    pub scene: Option<Scene>,
    pub canvas: CanvasSize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            scene_preset: ScenePreset::default(),
            seed: 0,
            scene: None,
            canvas: CanvasSize::new(800.0, 600.0),
        }
    }
}

/// Command-line overrides applied on top of the defaults.
#[derive(Clone, Debug)]
pub struct ScanArgs {
    pub scene: ScenePreset,
    pub seed: u64,
    pub step_degrees: u16,
    pub near_threshold_cm: f32,
    pub max_passes: Option<u64>,
    pub blocking_alerts: bool,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .scan
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        config
            .resolve_scene()
            .validate()
            .with_context(|| format!("validating scene in {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(args: &ScanArgs) -> Self {
        let scan = ScanConfig {
            step_degrees: args.step_degrees,
            near_threshold_cm: args.near_threshold_cm,
            max_passes: args.max_passes,
            alert_mode: if args.blocking_alerts {
                AlertMode::Blocking
            } else {
                AlertMode::Deferred
            },
            ..Default::default()
        };
        Self {
            scan,
            scene_preset: args.scene,
            seed: args.seed,
            ..Default::default()
        }
    }

    pub fn resolve_scene(&self) -> Scene {
        match &self.scene {
            Some(scene) => scene.clone(),
            None => build_scene(self.scene_preset, self.seed),
        }
    }
}
