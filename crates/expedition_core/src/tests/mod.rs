use super::*;
use crate::test_fixtures::{base_content, base_state, fixed_now, make_rng};
use rand_chacha::ChaCha8Rng;

mod station_build;

// --- Shared test helpers ------------------------------------------------

fn test_content() -> GameContent {
    base_content()
}

fn envelope(state: &GameState, index: usize, command: Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{:06}", state.meta.tick * 100 + index as u64)),
        issued_tick: state.meta.tick,
        execute_at_tick: state.meta.tick,
        command,
    }
}

/// One tick with the given commands and no continuous input.
fn step(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut ChaCha8Rng,
    commands: &[Command],
) -> Vec<EventEnvelope> {
    step_with_input(state, content, rng, commands, &FrameInput::default())
}

fn step_with_input(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut ChaCha8Rng,
    commands: &[Command],
    input: &FrameInput,
) -> Vec<EventEnvelope> {
    let envelopes: Vec<CommandEnvelope> = commands
        .iter()
        .enumerate()
        .map(|(i, command)| envelope(state, i, command.clone()))
        .collect();
    tick(state, &envelopes, input, content, rng, fixed_now())
}

/// A session that has just launched into field 1.
fn launched(content: &GameContent, rng: &mut ChaCha8Rng) -> GameState {
    let mut state = base_state(content);
    step(&mut state, content, rng, &[Command::Launch]);
    assert_eq!(state.mode, Mode::Mining);
    state
}

/// Replace the field with one asteroid at `offset` from the craft.
fn lone_asteroid(state: &mut GameState, offset: Vec2, health: f64) -> AsteroidId {
    let id = AsteroidId::from("ast_test");
    state.field.asteroids = vec![Asteroid {
        id: id.clone(),
        position: state.craft.position + offset,
        size: 20.0,
        health,
        max_health: health,
        kind: ResourceKind::Common,
        resources: 1,
        rotation: 0.0,
        rotation_speed: 0.01,
    }];
    state.field.artifacts.clear();
    state.field.pickups.clear();
    id
}

/// An asteroid parked outside auto-aim range so the field never clears.
fn distant_asteroid(state: &mut GameState) {
    lone_asteroid(state, Vec2::new(-350.0, -250.0), 1000.0);
}

fn has(events: &[EventEnvelope], pred: impl Fn(&Event) -> bool) -> bool {
    events.iter().any(|e| pred(&e.event))
}

fn count(events: &[EventEnvelope], pred: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| pred(&e.event)).count()
}

fn rejection(events: &[EventEnvelope]) -> Option<&str> {
    events.iter().find_map(|e| match &e.event {
        Event::CommandRejected { reason, .. } => Some(reason.as_str()),
        _ => None,
    })
}
