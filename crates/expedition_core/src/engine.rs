use std::f64::consts::TAU;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use crate::controller::{
    build_module, check_field_clear, check_low_fuel, launch, report_master_collection,
    resolve_decision, return_to_station, toggle_auto_mining,
};
use crate::economy::{absorb_artifact, activate_scanner, advance_scanner, collect_proximity};
use crate::mining::{apply_beam, spawn_rewards};
use crate::targeting::{pointer_heading, resolve};
use crate::{
    BeamState, Command, CommandEnvelope, Constants, Craft, Event, EventEnvelope, ExpeditionError,
    FieldBounds, FrameInput, GameContent, GameState, Mode, MovementIntent, Vec2,
};

/// Radians per tick for the artifact beacon pulse.
const ARTIFACT_PULSE_STEP: f64 = 0.1;

/// Advance the simulation by one tick.
///
/// Order of operations:
/// 1. Latch this frame's continuous input.
/// 2. Apply commands scheduled for this tick.
/// 3. While mining: move, aim, fire, collect, scan, then check field clear
///    and low fuel.
/// 4. Increment tick counter.
///
/// Returns all events produced this tick.
pub fn tick(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    input: &FrameInput,
    content: &GameContent,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();

    state.controls = input.clone();
    apply_commands(state, commands, content, rng, &mut events);
    if state.mode == Mode::Mining {
        simulate_frame(state, content, rng, now, &mut events);
    }

    state.meta.tick += 1;
    events
}

fn apply_commands(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;
    for envelope in commands {
        if envelope.execute_at_tick != current_tick {
            continue;
        }
        let result = apply_command(state, &envelope.command, content, rng, events);
        if let Err(reason) = result {
            debug!(command = envelope.command.label(), %reason, "command rejected");
            events.push(crate::emit(
                &mut state.counters,
                current_tick,
                Event::CommandRejected {
                    command: envelope.command.label().to_string(),
                    reason: reason.to_string(),
                },
            ));
        }
    }
}

/// Apply a single command outside the tick loop. Failures leave state as it was.
pub fn apply_command(
    state: &mut GameState,
    command: &Command,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), ExpeditionError> {
    match command {
        Command::Launch => launch(state, content, rng, events),
        Command::ReturnToStation => return_to_station(state, content, rng, events),
        Command::ToggleAutoMining => {
            toggle_auto_mining(state, events);
            Ok(())
        }
        Command::ActivateScanner => {
            if state.mode != Mode::Mining {
                return Err(ExpeditionError::WrongMode {
                    expected: Mode::Mining,
                });
            }
            activate_scanner(&mut state.craft, &mut state.scanner, &content.constants)?;
            events.push(crate::emit(
                &mut state.counters,
                state.meta.tick,
                Event::ScannerActivated {
                    fuel_cost: content.constants.scan_fuel_cost,
                },
            ));
            Ok(())
        }
        Command::ResolveDecision { accept } => {
            resolve_decision(state, *accept, content, rng, events)
        }
        Command::Build { pos, module } => build_module(state, *pos, module, content, events),
        Command::ReportMasterCollection { complete } => {
            report_master_collection(state, *complete, content, events);
            Ok(())
        }
    }
}

fn simulate_frame(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
    events: &mut Vec<EventEnvelope>,
) {
    let constants = &content.constants;
    let movement = state.controls.movement;
    move_craft(&mut state.craft, movement, constants, state.field.bounds);
    aim(state, constants, events);
    fire_beam(state, constants, rng, events);
    collect(state, constants, now, events);
    scan(state, events);
    advance_cosmetics(state);
    check_field_clear(state, content, rng, events);
    check_low_fuel(state, content, events);
}

/// Thrust from the movement intent, then drag, speed cap, and bounds clamp.
/// Screen coordinates: "up" is -y.
pub fn move_craft(
    craft: &mut Craft,
    intent: MovementIntent,
    constants: &Constants,
    bounds: FieldBounds,
) {
    let axis = |neg: bool, pos: bool| f64::from(i8::from(pos) - i8::from(neg));
    let thrust = Vec2::new(axis(intent.left, intent.right), axis(intent.up, intent.down))
        .scale(constants.craft_thrust);

    let mut velocity = (craft.velocity + thrust).scale(constants.craft_drag);
    let speed = velocity.length();
    if speed > constants.craft_max_speed {
        velocity = velocity.scale(constants.craft_max_speed / speed);
    }
    craft.velocity = velocity;
    craft.position = bounds.clamp(craft.position + velocity);
}

fn aim(state: &mut GameState, constants: &Constants, events: &mut Vec<EventEnvelope>) {
    if !state.targeting.auto_mining {
        state.craft.heading = pointer_heading(state.craft.position, state.controls.pointer);
        return;
    }

    let resolution = resolve(
        state.craft.position,
        &state.field.asteroids,
        constants.search_radius,
        state.craft.heading,
        constants.heading_smoothing,
    );
    if resolution.target != state.targeting.target {
        let event = match &resolution.target {
            Some(asteroid_id) => Event::TargetAcquired {
                asteroid_id: asteroid_id.clone(),
            },
            None => Event::TargetLost,
        };
        events.push(crate::emit(&mut state.counters, state.meta.tick, event));
    }
    state.craft.heading = resolution.heading;
    state.targeting.target = resolution.target;
    state.targeting.indicator_visible = resolution.indicator_visible;
}

fn fire_beam(
    state: &mut GameState,
    constants: &Constants,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    // Auto mode beams straight at the locked target; the heading only turns
    // the hull.
    let end = if state.targeting.auto_mining {
        locked_target_position(state)
    } else {
        state.controls.mining_held.then_some(state.controls.pointer)
    };
    let Some(end) = end.filter(|_| state.craft.fuel > 0.0) else {
        state.beam = BeamState::default();
        return;
    };

    let origin = state.craft.position;
    state.beam = BeamState {
        active: true,
        origin,
        end,
    };
    state.craft.fuel = (state.craft.fuel - constants.beam_fuel_per_tick).max(0.0);

    let outcome = apply_beam(origin, end, &mut state.field.asteroids, state.craft.mining_power);
    for asteroid in outcome.destroyed {
        let rewards = spawn_rewards(&asteroid, constants.reward_jitter, &mut state.counters, rng);
        state.field.pickups.extend(rewards);
        if state.targeting.target.as_ref() == Some(&asteroid.id) {
            state.targeting.target = None;
            state.targeting.indicator_visible = false;
        }
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::AsteroidDestroyed {
                asteroid_id: asteroid.id,
                kind: asteroid.kind,
                resources: asteroid.resources,
            },
        ));
    }
}

fn locked_target_position(state: &GameState) -> Option<Vec2> {
    let target = state.targeting.target.as_ref()?;
    state
        .field
        .asteroids
        .iter()
        .find(|asteroid| &asteroid.id == target)
        .map(|asteroid| asteroid.position)
}

fn collect(
    state: &mut GameState,
    constants: &Constants,
    now: DateTime<Utc>,
    events: &mut Vec<EventEnvelope>,
) {
    let was_full = state.craft.cargo_full();
    let collection = collect_proximity(
        &mut state.craft,
        &mut state.field.pickups,
        &mut state.field.artifacts,
        constants,
    );
    let cargo = state.craft.cargo.len();
    for pickup in &collection.picked_up {
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::ResourceCollected {
                kind: pickup.kind,
                cargo,
            },
        ));
    }
    if !was_full && state.craft.cargo_full() {
        events.push(crate::emit(&mut state.counters, state.meta.tick, Event::CargoFull));
    }
    for artifact in &collection.artifacts {
        absorb_artifact(&mut state.ledger, artifact, now);
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::ArtifactCollected {
                artifact_id: artifact.def.id.clone(),
                value: artifact.def.value,
            },
        ));
    }
}

fn scan(state: &mut GameState, events: &mut Vec<EventEnvelope>) {
    let step = advance_scanner(&mut state.scanner, &state.craft, &mut state.field.artifacts);
    for index in step.discovered {
        let def = &state.field.artifacts[index].def;
        let event = Event::ArtifactDiscovered {
            artifact_id: def.id.clone(),
            rarity: def.rarity,
        };
        events.push(crate::emit(&mut state.counters, state.meta.tick, event));
    }
    if step.expired {
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::ScannerExpired,
        ));
    }
}

fn advance_cosmetics(state: &mut GameState) {
    for asteroid in &mut state.field.asteroids {
        asteroid.rotation = (asteroid.rotation + asteroid.rotation_speed).rem_euclid(TAU);
    }
    for artifact in &mut state.field.artifacts {
        artifact.pulse_phase = (artifact.pulse_phase + ARTIFACT_PULSE_STEP).rem_euclid(TAU);
    }
}
