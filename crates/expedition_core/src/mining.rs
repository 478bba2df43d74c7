//! Beam-to-asteroid collision, damage, and reward spawning.

use rand::Rng;

use crate::{Asteroid, Counters, Pickup, PickupId, Vec2};

#[derive(Debug, Default)]
pub struct BeamOutcome {
    /// Asteroids hit this tick that survived.
    pub damaged: Vec<Asteroid>,
    /// Asteroids hit this tick that were removed from the field.
    pub destroyed: Vec<Asteroid>,
}

impl BeamOutcome {
    pub fn hit_anything(&self) -> bool {
        !self.damaged.is_empty() || !self.destroyed.is_empty()
    }
}

/// Shortest distance from `point` to the segment `a`-`b`.
pub fn point_segment_distance(point: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let length_sq = ab.x * ab.x + ab.y * ab.y;
    if length_sq <= f64::EPSILON {
        return point.distance(a);
    }
    let ap = point - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / length_sq).clamp(0.0, 1.0);
    point.distance(a + ab.scale(t))
}

/// Apply one tick of beam damage. Every asteroid whose center lies closer to
/// the segment than its radius takes `power` once. Asteroids at or below zero
/// health leave `asteroids`.
pub fn apply_beam(
    origin: Vec2,
    target: Vec2,
    asteroids: &mut Vec<Asteroid>,
    power: f64,
) -> BeamOutcome {
    let mut outcome = BeamOutcome::default();
    let mut survivors = Vec::with_capacity(asteroids.len());

    for mut asteroid in asteroids.drain(..) {
        if point_segment_distance(asteroid.position, origin, target) < asteroid.size {
            asteroid.health -= power;
            if asteroid.health <= 0.0 {
                outcome.destroyed.push(asteroid);
                continue;
            }
            outcome.damaged.push(asteroid.clone());
        }
        survivors.push(asteroid);
    }

    *asteroids = survivors;
    outcome
}

/// Exactly `asteroid.resources` pickups scattered around its last position.
pub fn spawn_rewards(
    asteroid: &Asteroid,
    jitter: f64,
    counters: &mut Counters,
    rng: &mut impl Rng,
) -> Vec<Pickup> {
    (0..asteroid.resources)
        .map(|_| {
            let id = PickupId(format!("pickup_{:05}", counters.next_pickup_id));
            counters.next_pickup_id += 1;
            let offset = if jitter > 0.0 {
                Vec2::new(rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
            } else {
                Vec2::ZERO
            };
            Pickup {
                id,
                kind: asteroid.kind,
                position: asteroid.position + offset,
                velocity: Vec2::ZERO,
            }
        })
        .collect()
}
