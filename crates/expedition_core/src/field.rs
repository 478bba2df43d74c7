//! Procedural asteroid fields.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::{
    ArtifactDef, Asteroid, AsteroidId, Constants, Counters, FieldArtifact, FieldBounds,
    ResourceKind, Vec2,
};

const ASTEROID_MIN_SIZE: f64 = 15.0;
const ASTEROID_MAX_SIZE: f64 = 35.0;
const MAX_ROTATION_SPEED: f64 = 0.02;
/// Placement retries before accepting a spot inside the spawn clearance.
const PLACEMENT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct GeneratedField {
    pub asteroids: Vec<Asteroid>,
    pub artifact: Option<FieldArtifact>,
}

pub fn asteroid_count(difficulty: u32) -> usize {
    6 + difficulty as usize
}

pub fn rare_probability(difficulty: u32) -> f64 {
    (0.15 + 0.08 * f64::from(difficulty)).clamp(0.0, 1.0)
}

pub fn asteroid_health(difficulty: u32) -> f64 {
    20.0 + 8.0 * f64::from(difficulty)
}

pub fn resource_yield(kind: ResourceKind, difficulty: u32) -> u32 {
    match kind {
        ResourceKind::Rare => 3 + difficulty,
        ResourceKind::Common => 1 + difficulty / 2,
    }
}

pub fn artifact_probability(difficulty: u32) -> f64 {
    (0.25 + 0.15 * f64::from(difficulty)).clamp(0.0, 1.0)
}

/// Populate a field for `difficulty` (>= 1). Never fails; the artifact slot
/// may come back empty.
pub fn generate_field(
    difficulty: u32,
    bounds: FieldBounds,
    constants: &Constants,
    artifact_catalog: &[ArtifactDef],
    counters: &mut Counters,
    rng: &mut impl Rng,
) -> GeneratedField {
    let difficulty = difficulty.max(1);
    let asteroids = (0..asteroid_count(difficulty))
        .map(|_| spawn_asteroid(difficulty, bounds, constants, counters, rng))
        .collect::<Vec<_>>();

    let artifact = if rng.gen::<f64>() < artifact_probability(difficulty) {
        pick_artifact(difficulty, artifact_catalog, rng).map(|def| FieldArtifact {
            def: def.clone(),
            position: random_point(bounds, constants.field_margin, rng),
            discovered: false,
            pulse_phase: 0.0,
        })
    } else {
        None
    };

    debug!(
        difficulty,
        asteroids = asteroids.len(),
        rare = asteroids.iter().filter(|a| a.kind == ResourceKind::Rare).count(),
        artifact = artifact.as_ref().map(|a| a.def.id.0.as_str()),
        "field generated"
    );

    GeneratedField {
        asteroids,
        artifact,
    }
}

/// Uniform pick among catalog entries whose rarity gate `difficulty` meets.
pub fn pick_artifact<'a>(
    difficulty: u32,
    catalog: &'a [ArtifactDef],
    rng: &mut impl Rng,
) -> Option<&'a ArtifactDef> {
    let eligible: Vec<&ArtifactDef> = catalog
        .iter()
        .filter(|def| difficulty >= def.rarity.min_difficulty())
        .collect();
    eligible.choose(rng).copied()
}

fn spawn_asteroid(
    difficulty: u32,
    bounds: FieldBounds,
    constants: &Constants,
    counters: &mut Counters,
    rng: &mut impl Rng,
) -> Asteroid {
    let id = AsteroidId(format!("ast_{:04}", counters.next_asteroid_id));
    counters.next_asteroid_id += 1;

    let kind = if rng.gen::<f64>() < rare_probability(difficulty) {
        ResourceKind::Rare
    } else {
        ResourceKind::Common
    };
    let health = asteroid_health(difficulty);

    let start = bounds.center();
    let mut position = random_point(bounds, constants.field_margin, rng);
    for _ in 0..PLACEMENT_ATTEMPTS {
        if position.distance(start) >= constants.spawn_clearance {
            break;
        }
        position = random_point(bounds, constants.field_margin, rng);
    }

    Asteroid {
        id,
        position,
        size: rng.gen_range(ASTEROID_MIN_SIZE..=ASTEROID_MAX_SIZE),
        health,
        max_health: health,
        kind,
        resources: resource_yield(kind, difficulty),
        rotation: rng.gen_range(0.0..std::f64::consts::TAU),
        rotation_speed: rng.gen_range(-MAX_ROTATION_SPEED..=MAX_ROTATION_SPEED),
    }
}

fn random_point(bounds: FieldBounds, margin: f64, rng: &mut impl Rng) -> Vec2 {
    let margin_x = margin.min(bounds.width / 2.0);
    let margin_y = margin.min(bounds.height / 2.0);
    Vec2::new(
        rng.gen_range(margin_x..=bounds.width - margin_x),
        rng.gen_range(margin_y..=bounds.height - margin_y),
    )
}
