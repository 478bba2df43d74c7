//! Auto-aim: nearest-asteroid target selection and smoothed turning.

use std::f64::consts::{PI, TAU};

use crate::{Asteroid, AsteroidId, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub target: Option<AsteroidId>,
    pub heading: f64,
    pub indicator_visible: bool,
}

/// Wrap an angle into (-π, π].
pub fn normalize_angle(radians: f64) -> f64 {
    let mut wrapped = radians % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Nearest asteroid strictly inside `search_radius`, with its distance.
/// Ties keep the first asteroid in field order.
pub fn nearest_in_range(ship: Vec2, asteroids: &[Asteroid], search_radius: f64) -> Option<&Asteroid> {
    asteroids
        .iter()
        .map(|asteroid| (asteroid, ship.distance(asteroid.position)))
        .filter(|(_, distance)| *distance < search_radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(asteroid, _)| asteroid)
}

/// One first-order low-pass step from `current` toward `desired`, along the
/// shorter way round. The result is wrapped into (-π, π].
pub fn smooth_heading(current: f64, desired: f64, factor: f64) -> f64 {
    normalize_angle(current + normalize_angle(desired - current) * factor)
}

/// Select the auto-mining target and advance the heading one tick.
pub fn resolve(
    ship: Vec2,
    asteroids: &[Asteroid],
    search_radius: f64,
    current_heading: f64,
    smoothing: f64,
) -> Resolution {
    match nearest_in_range(ship, asteroids, search_radius) {
        Some(target) => Resolution {
            target: Some(target.id.clone()),
            heading: smooth_heading(current_heading, ship.angle_to(target.position), smoothing),
            indicator_visible: true,
        },
        None => Resolution {
            target: None,
            heading: current_heading,
            indicator_visible: false,
        },
    }
}

/// Manual control: heading snaps straight at the pointer.
pub fn pointer_heading(ship: Vec2, pointer: Vec2) -> f64 {
    ship.angle_to(pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceKind;

    fn asteroid(id: &str, x: f64, y: f64) -> Asteroid {
        Asteroid {
            id: AsteroidId(id.to_string()),
            position: Vec2::new(x, y),
            size: 20.0,
            health: 28.0,
            max_health: 28.0,
            kind: ResourceKind::Common,
            resources: 1,
            rotation: 0.0,
            rotation_speed: 0.0,
        }
    }

    #[test]
    fn quarter_turn_advances_ten_percent() {
        let ship = Vec2::ZERO;
        let field = vec![asteroid("a", 0.0, 100.0)];
        let resolution = resolve(ship, &field, 200.0, 0.0, 0.1);
        assert_eq!(resolution.target, Some(AsteroidId("a".to_string())));
        assert!((resolution.heading - 0.1 * PI / 2.0).abs() < 1e-12);
        assert!((resolution.heading - 0.157).abs() < 1e-3);
        assert!(resolution.indicator_visible);
    }

    #[test]
    fn picks_nearest_in_range() {
        let ship = Vec2::ZERO;
        let field = vec![
            asteroid("far", 150.0, 0.0),
            asteroid("near", 0.0, -50.0),
            asteroid("outside", 500.0, 0.0),
        ];
        let resolution = resolve(ship, &field, 200.0, 0.0, 0.1);
        assert_eq!(resolution.target, Some(AsteroidId("near".to_string())));
    }

    #[test]
    fn range_boundary_is_exclusive() {
        let ship = Vec2::ZERO;
        let field = vec![asteroid("edge", 200.0, 0.0)];
        let resolution = resolve(ship, &field, 200.0, 1.0, 0.1);
        assert!(resolution.target.is_none());
        assert!(!resolution.indicator_visible);
        assert!((resolution.heading - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn turns_the_short_way_across_pi() {
        // Facing just under +π, target just past -π: the short turn is positive.
        let current = PI - 0.1;
        let desired = -PI + 0.1;
        let next = smooth_heading(current, desired, 0.1);
        assert!(next > current);
        assert!((next - (current + 0.02)).abs() < 1e-9);
    }

    #[test]
    fn heading_wraps_when_a_turn_crosses_pi() {
        let current = PI - 0.01;
        let desired = -PI + 0.1;
        let mut heading = smooth_heading(current, desired, 0.1);
        assert!((heading - (-PI + 0.001)).abs() < 1e-9);

        for _ in 0..200 {
            heading = smooth_heading(heading, desired, 0.1);
            assert!(heading > -PI && heading <= PI);
        }
        assert!((heading - desired).abs() < 1e-6);
    }

    #[test]
    fn normalize_stays_in_half_open_range() {
        assert!((normalize_angle(PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-9);
        assert!((normalize_angle(-1.75 * PI) - PI / 4.0).abs() < 1e-9);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pointer_heading_is_direct() {
        let heading = pointer_heading(Vec2::new(10.0, 10.0), Vec2::new(10.0, 20.0));
        assert!((heading - PI / 2.0).abs() < 1e-12);
    }
}
