use clap::ValueEnum;
use rand::{rngs::StdRng, Rng, SeedableRng};
use scancore::hardware::sim::{Obstacle, Scene};
use serde::{Deserialize, Serialize};

/// Canned surroundings for the simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScenePreset {
    /// Nothing within 200 cm.
    #[default]
    Clear,
    /// One 8 cm obstacle straight at 50°.
    CloseCall,
    /// Walls on both flanks, open ahead.
    Corridor,
    /// Seeded random obstacles with one dead angle.
    Cluttered,
}

pub fn build_scene(preset: ScenePreset, seed: u64) -> Scene {
    match preset {
        ScenePreset::Clear => Scene::uniform(200.0),
        ScenePreset::CloseCall => Scene::uniform(200.0).with_obstacle(Obstacle::new(50, 50, 8.0)),
        ScenePreset::Corridor => Scene {
            background_cm: 300.0,
            obstacles: vec![Obstacle::new(0, 40, 35.0), Obstacle::new(140, 180, 35.0)],
            noise_cm: 0.5,
            seed,
            ..Default::default()
        },
        ScenePreset::Cluttered => cluttered(seed),
    }
}

fn cluttered(seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = rng.gen_range(3..=6);
    let obstacles = (0..count)
        .map(|_| {
            let from = rng.gen_range(0..=170u16);
            let width = rng.gen_range(5..=25u16);
            let distance = rng.gen_range(6.0..150.0f32);
            Obstacle::new(from, (from + width).min(180), distance)
        })
        .collect();
    let silent = rng.gen_range(0..=18u16) * 10;

    Scene {
        background_cm: 250.0,
        obstacles,
        silent_angles: vec![silent],
        noise_cm: 1.0,
        seed,
    }
}
