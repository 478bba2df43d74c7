//! Expedition state machine: launch, field progression, return and dock.
//!
//! `Station -> Mining` on launch. `Mining -> Station` on a plain return
//! (manual or accepted low-fuel prompt) or a forced dock (declined or
//! unaffordable field advance, or the last field cleared).

use rand::Rng;
use tracing::{debug, info};

use crate::economy::settle_cargo;
use crate::field::generate_field;
use crate::station::{build, evaluate_unlocks, project_capabilities, GridPos};
use crate::{
    BeamState, Constants, Craft, Event, EventEnvelope, Expedition, ExpeditionError, FieldState,
    GameContent, GameState, Mode, ModuleKey, PendingDecision, SettleMode, Vec2,
};

pub fn new_craft(constants: &Constants) -> Craft {
    Craft {
        position: constants.bounds().center(),
        heading: 0.0,
        velocity: Vec2::ZERO,
        fuel: constants.base_max_fuel,
        max_fuel: constants.base_max_fuel,
        cargo: Vec::new(),
        max_cargo: constants.base_max_cargo,
        mining_power: constants.base_mining_power,
        scanner_speed: constants.base_scanner_speed,
        scanner_range: constants.base_scanner_range,
    }
}

pub fn new_expedition(constants: &Constants) -> Expedition {
    Expedition {
        current_field: 1,
        max_fields: constants.max_fields,
        fields_cleared: 0,
        return_to_station: false,
        low_fuel_warned: false,
    }
}

pub fn empty_field(constants: &Constants) -> FieldState {
    FieldState {
        bounds: constants.bounds(),
        difficulty: 1,
        asteroids: Vec::new(),
        artifacts: Vec::new(),
        pickups: Vec::new(),
    }
}

/// Replace the field contents with a fresh one at the current field's
/// difficulty. Leftover pickups don't carry over.
pub(crate) fn regenerate_field(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    let difficulty = state.expedition.current_field;
    let bounds = content.constants.bounds();
    let generated = generate_field(
        difficulty,
        bounds,
        &content.constants,
        &content.artifacts,
        &mut state.counters,
        rng,
    );
    let artifact = generated.artifact.as_ref().map(|a| a.def.id.clone());
    state.field = FieldState {
        bounds,
        difficulty,
        asteroids: generated.asteroids,
        artifacts: generated.artifact.into_iter().collect(),
        pickups: Vec::new(),
    };
    state.targeting.target = None;
    state.targeting.indicator_visible = false;
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::FieldGenerated {
            field: difficulty,
            asteroid_count: state.field.asteroids.len(),
            artifact,
        },
    ));
}

/// `Station -> Mining`. Needs the launch fuel; otherwise nothing changes.
pub fn launch(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), ExpeditionError> {
    if state.mode != Mode::Station {
        return Err(ExpeditionError::WrongMode {
            expected: Mode::Station,
        });
    }
    let cost = content.constants.launch_fuel_cost;
    if state.craft.fuel < cost {
        return Err(ExpeditionError::InsufficientFuel {
            required: cost,
            available: state.craft.fuel,
        });
    }

    project_capabilities(&mut state.craft, &state.station, content);
    state.craft.fuel -= cost;
    state.craft.position = content.constants.bounds().center();
    state.craft.velocity = Vec2::ZERO;
    state.expedition = new_expedition(&content.constants);
    state.mode = Mode::Mining;
    state.pending = None;
    state.scanner = None;
    state.beam = BeamState::default();

    info!(fuel = state.craft.fuel, "expedition launched");
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::ExpeditionLaunched { fuel_cost: cost },
    ));
    regenerate_field(state, content, rng, events);
    Ok(())
}

/// Manual `Mining -> Station` using the plain return formula.
pub fn return_to_station(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), ExpeditionError> {
    if state.mode != Mode::Mining {
        return Err(ExpeditionError::WrongMode {
            expected: Mode::Mining,
        });
    }
    if state.pending.is_some() {
        return Err(ExpeditionError::DecisionPending);
    }
    finish_expedition(state, SettleMode::Return, content, rng, events);
    Ok(())
}

/// Settle cargo, refuel, and go back to the station. A fresh first field is
/// generated for the next launch.
pub(crate) fn finish_expedition(
    state: &mut GameState,
    mode: SettleMode,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    state.expedition.return_to_station = true;
    let items = state.craft.cargo.len();
    let value_added = settle_cargo(&mut state.craft, &mut state.ledger, mode, &content.constants);
    info!(
        ?mode,
        items,
        value_added,
        total = state.ledger.total_resources,
        "cargo settled"
    );
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::CargoSettled {
            mode,
            items,
            value_added,
        },
    ));

    state.mode = Mode::Station;
    state.pending = None;
    state.scanner = None;
    state.beam = BeamState::default();
    state.controls.mining_held = false;
    state.craft.velocity = Vec2::ZERO;
    state.craft.position = content.constants.bounds().center();
    state.expedition.current_field = 1;
    regenerate_field(state, content, rng, events);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::ReturnedToStation,
    ));
}

/// Runs when the field has no asteroids left. Raises the continue prompt, or
/// docks once the last field is done. Suppressed while returning or while a
/// decision is already open.
pub(crate) fn check_field_clear(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) {
    if state.mode != Mode::Mining
        || !state.field.asteroids.is_empty()
        || state.expedition.return_to_station
        || state.pending.is_some()
    {
        return;
    }

    let field = state.expedition.current_field;
    state.expedition.fields_cleared += 1;
    debug!(field, "field cleared");
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::FieldCleared { field },
    ));

    if field < state.expedition.max_fields {
        let decision = PendingDecision::ContinueToNextField {
            next_field: field + 1,
            travel_cost: content.constants.travel_cost(field),
        };
        request_decision(state, decision, events);
    } else {
        let fields_cleared = state.expedition.fields_cleared;
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::ExpeditionCompleted { fields_cleared },
        ));
        finish_expedition(state, SettleMode::Dock, content, rng, events);
    }
}

/// Raise the low-fuel prompt once per expedition when fuel drops under the
/// threshold.
pub(crate) fn check_low_fuel(
    state: &mut GameState,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) {
    if state.mode != Mode::Mining
        || state.pending.is_some()
        || state.expedition.low_fuel_warned
        || state.craft.fuel >= content.constants.low_fuel_threshold
    {
        return;
    }
    state.expedition.low_fuel_warned = true;
    request_decision(state, PendingDecision::LowFuel, events);
}

fn request_decision(
    state: &mut GameState,
    decision: PendingDecision,
    events: &mut Vec<EventEnvelope>,
) {
    state.pending = Some(decision.clone());
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::DecisionRequested { decision },
    ));
}

/// Answer the open prompt.
///
/// Continuing needs the travel fuel; when it is short the advance is refused
/// and the craft docks instead, same as declining.
pub fn resolve_decision(
    state: &mut GameState,
    accept: bool,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), ExpeditionError> {
    let decision = state
        .pending
        .take()
        .ok_or(ExpeditionError::NoPendingDecision)?;

    match decision {
        PendingDecision::ContinueToNextField {
            next_field,
            travel_cost,
        } => {
            if !accept {
                finish_expedition(state, SettleMode::Dock, content, rng, events);
                return Ok(());
            }
            if state.craft.fuel < travel_cost {
                let err = ExpeditionError::InsufficientFuel {
                    required: travel_cost,
                    available: state.craft.fuel,
                };
                events.push(crate::emit(
                    &mut state.counters,
                    state.meta.tick,
                    Event::CommandRejected {
                        command: "ResolveDecision".to_string(),
                        reason: err.to_string(),
                    },
                ));
                finish_expedition(state, SettleMode::Dock, content, rng, events);
                return Ok(());
            }
            state.craft.fuel -= travel_cost;
            state.expedition.current_field = next_field;
            info!(field = next_field, fuel = state.craft.fuel, "advancing to next field");
            events.push(crate::emit(
                &mut state.counters,
                state.meta.tick,
                Event::FieldAdvanced {
                    field: next_field,
                    fuel_cost: travel_cost,
                },
            ));
            regenerate_field(state, content, rng, events);
        }
        PendingDecision::LowFuel => {
            if accept {
                finish_expedition(state, SettleMode::Return, content, rng, events);
            }
        }
    }
    Ok(())
}

/// Flip auto-mining. Either direction drops the current target; switching it
/// off also kills the beam.
pub fn toggle_auto_mining(state: &mut GameState, events: &mut Vec<EventEnvelope>) {
    let enabled = !state.targeting.auto_mining;
    state.targeting.auto_mining = enabled;
    state.targeting.target = None;
    state.targeting.indicator_visible = false;
    if !enabled {
        state.beam = BeamState::default();
        state.controls.mining_held = false;
    }
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::AutoMiningToggled { enabled },
    ));
}

/// Build from the station screen, then refresh the craft's capabilities.
pub fn build_module(
    state: &mut GameState,
    pos: GridPos,
    module: &ModuleKey,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), ExpeditionError> {
    if state.mode != Mode::Station {
        return Err(ExpeditionError::WrongMode {
            expected: Mode::Station,
        });
    }
    let receipt = build(
        &mut state.station,
        pos,
        module,
        &mut state.ledger.total_resources,
        content,
    )?;
    project_capabilities(&mut state.craft, &state.station, content);

    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::ModuleBuilt {
            module: module.clone(),
            pos,
            cost: receipt.cost,
        },
    ));
    push_unlocks(state, receipt.newly_unlocked, events);
    Ok(())
}

/// Record the artifact-catalog collaborator's master-collection verdict.
pub fn report_master_collection(
    state: &mut GameState,
    complete: bool,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) {
    state.station.master_collection_complete = complete;
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::MasterCollectionReported { complete },
    ));
    let unlocked = evaluate_unlocks(&mut state.station, content);
    push_unlocks(state, unlocked, events);
}

fn push_unlocks(state: &mut GameState, modules: Vec<ModuleKey>, events: &mut Vec<EventEnvelope>) {
    for module in modules {
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::ModuleUnlocked { module },
        ));
    }
}
