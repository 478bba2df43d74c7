use expedition_core::{
    Command, CommandEnvelope, CommandId, FrameInput, GameContent, GameState, Mode,
    MovementIntent, PendingDecision, Vec2,
};
use serde::{Deserialize, Serialize};

pub trait CommandSource {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

/// Produces the per-frame control snapshot a host would read from its input devices.
pub trait InputSource {
    fn frame_input(&mut self, state: &GameState, content: &GameContent) -> FrameInput;
}

/// Plays the game unattended:
/// 1. Docked: build the cheapest affordable module, else launch.
/// 2. Mining: answer prompts, keep auto-mining on, scan for nearby artifacts,
///    and head home once the hold is full.
/// 3. Steering: fly to discovered artifacts, then loose pickups, then the
///    nearest asteroid when nothing is in beam range.
#[derive(Debug, Clone, Default)]
pub struct AutopilotController {
    pub config: AutopilotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotConfig {
    /// Distance under which the craft stops thrusting toward a waypoint.
    pub arrive_radius: f64,
    /// Fraction of the search radius the craft closes to before it stops
    /// approaching an asteroid.
    pub approach_fraction: f64,
    /// Fire scanner pulses when an undiscovered artifact is in range.
    pub scan_enabled: bool,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            arrive_radius: 6.0,
            approach_fraction: 0.5,
            scan_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Allocates a command ID and builds a `CommandEnvelope`.
fn make_cmd(tick: u64, next_id: &mut u64, command: Command) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

/// Cheapest unlocked, unbuilt module the ledger can pay for, placed at the
/// first free cell in row-major order.
fn next_build(state: &GameState, content: &GameContent) -> Option<Command> {
    let pos = *state.station.buildable_cells().first()?;
    content
        .modules
        .iter()
        .filter(|def| state.station.is_unlocked(&def.key) && !state.station.is_built(&def.key))
        .filter(|def| def.cost <= state.ledger.total_resources)
        .min_by_key(|def| def.cost)
        .map(|def| Command::Build {
            pos,
            module: def.key.clone(),
        })
}

fn answer(decision: &PendingDecision, state: &GameState, content: &GameContent) -> Command {
    let accept = match decision {
        PendingDecision::ContinueToNextField { travel_cost, .. } => {
            !state.craft.cargo_full()
                && state.craft.fuel >= travel_cost + content.constants.launch_fuel_cost
        }
        PendingDecision::LowFuel => true,
    };
    Command::ResolveDecision { accept }
}

/// Whether an undiscovered artifact sits within scanner range and the tank
/// can pay for a pulse without dropping under the low-fuel line.
fn worth_scanning(state: &GameState, content: &GameContent) -> bool {
    let c = &content.constants;
    state.scanner.is_none()
        && state.craft.fuel >= c.scan_fuel_cost + c.low_fuel_threshold
        && state.field.artifacts.iter().any(|artifact| {
            !artifact.discovered
                && state.craft.position.distance(artifact.position) <= state.craft.scanner_range
        })
}

fn nearest(from: Vec2, points: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    points.min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
}

/// Holds the thrust keys that point from `from` toward `to`. Screen "up" is -y.
fn steer(from: Vec2, to: Vec2, deadzone: f64) -> MovementIntent {
    let delta = to - from;
    MovementIntent {
        up: delta.y < -deadzone,
        down: delta.y > deadzone,
        left: delta.x < -deadzone,
        right: delta.x > deadzone,
    }
}

impl AutopilotController {
    pub fn new(config: AutopilotConfig) -> Self {
        Self { config }
    }

    /// Where the craft should fly next, if anywhere.
    fn waypoint(&self, state: &GameState, content: &GameContent) -> Option<Vec2> {
        let craft = state.craft.position;

        let artifact = nearest(
            craft,
            state
                .field
                .artifacts
                .iter()
                .filter(|a| a.discovered)
                .map(|a| a.position),
        );
        if artifact.is_some() {
            return artifact;
        }

        if !state.craft.cargo_full() {
            let pickup = nearest(craft, state.field.pickups.iter().map(|p| p.position));
            if pickup.is_some() {
                return pickup;
            }
        }

        let asteroid = nearest(craft, state.field.asteroids.iter().map(|a| a.position))?;
        let approach = content.constants.search_radius * self.config.approach_fraction;
        (craft.distance(asteroid) > approach).then_some(asteroid)
    }
}

impl CommandSource for AutopilotController {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let tick = state.meta.tick;
        let mut commands = Vec::new();

        match state.mode {
            Mode::Station => {
                if let Some(build) = next_build(state, content) {
                    commands.push(make_cmd(tick, next_command_id, build));
                } else if state.craft.fuel >= content.constants.launch_fuel_cost {
                    commands.push(make_cmd(tick, next_command_id, Command::Launch));
                }
            }
            Mode::Mining => {
                // Priority 1: a prompt blocks returning, so answer it first.
                if let Some(decision) = &state.pending {
                    commands.push(make_cmd(
                        tick,
                        next_command_id,
                        answer(decision, state, content),
                    ));
                    return commands;
                }

                // Priority 2: keep the beam working on its own.
                if !state.targeting.auto_mining {
                    commands.push(make_cmd(tick, next_command_id, Command::ToggleAutoMining));
                }

                // Priority 3: a full hold goes home.
                if state.craft.cargo_full() {
                    commands.push(make_cmd(tick, next_command_id, Command::ReturnToStation));
                    return commands;
                }

                // Priority 4: look for artifacts the craft is close to.
                if self.config.scan_enabled && worth_scanning(state, content) {
                    commands.push(make_cmd(tick, next_command_id, Command::ActivateScanner));
                }
            }
        }

        commands
    }
}

impl InputSource for AutopilotController {
    fn frame_input(&mut self, state: &GameState, content: &GameContent) -> FrameInput {
        if state.mode != Mode::Mining {
            return FrameInput::default();
        }
        let craft = state.craft.position;
        match self.waypoint(state, content) {
            Some(target) => FrameInput {
                pointer: target,
                mining_held: false,
                movement: steer(craft, target, self.config.arrive_radius),
            },
            None => FrameInput {
                pointer: craft,
                ..FrameInput::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expedition_core::test_fixtures::{base_content, base_state};
    use expedition_core::{
        ArtifactDef, ArtifactId, Asteroid, AsteroidId, FieldArtifact, GridPos, ModuleKey, Pickup,
        PickupId, Rarity, ResourceKind,
    };

    fn mining_state(content: &GameContent) -> GameState {
        let mut state = base_state(content);
        state.mode = Mode::Mining;
        state.targeting.auto_mining = true;
        state.field.asteroids.clear();
        state.field.artifacts.clear();
        state.field.pickups.clear();
        state.craft.position = Vec2::new(400.0, 300.0);
        state
    }

    fn commands_for(state: &GameState, content: &GameContent) -> Vec<Command> {
        let mut autopilot = AutopilotController::default();
        let mut next_id = 0;
        autopilot
            .generate_commands(state, content, &mut next_id)
            .into_iter()
            .map(|envelope| envelope.command)
            .collect()
    }

    fn asteroid_at(x: f64, y: f64) -> Asteroid {
        Asteroid {
            id: AsteroidId("ast_0001".to_string()),
            position: Vec2::new(x, y),
            size: 30.0,
            health: 100.0,
            max_health: 100.0,
            kind: ResourceKind::Common,
            resources: 1,
            rotation: 0.0,
            rotation_speed: 0.0,
        }
    }

    fn pickup_at(x: f64, y: f64) -> Pickup {
        Pickup {
            id: PickupId("pickup_0001".to_string()),
            kind: ResourceKind::Common,
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
        }
    }

    fn artifact_at(x: f64, y: f64, discovered: bool) -> FieldArtifact {
        FieldArtifact {
            def: ArtifactDef {
                id: ArtifactId("compass".to_string()),
                name: "Compass".to_string(),
                icon: "🧭".to_string(),
                rarity: Rarity::Common,
                value: 25,
            },
            position: Vec2::new(x, y),
            discovered,
            pulse_phase: 0.0,
        }
    }

    #[test]
    fn test_command_ids_are_sequential() {
        let content = base_content();
        let mut state = base_state(&content);
        state.ledger.total_resources = 0;
        let mut autopilot = AutopilotController::default();
        let mut next_id = 7;

        let cmds = autopilot.generate_commands(&state, &content, &mut next_id);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].id, CommandId("cmd_000007".to_string()));
        assert_eq!(next_id, 8);
    }

    #[test]
    fn test_docked_without_funds_launches() {
        let content = base_content();
        let mut state = base_state(&content);
        state.ledger.total_resources = 0;

        let cmds = commands_for(&state, &content);
        assert!(matches!(cmds.as_slice(), [Command::Launch]));
    }

    #[test]
    fn test_docked_builds_cheapest_affordable_module_first() {
        let content = base_content();
        let mut state = base_state(&content);
        state.ledger.total_resources = 100;

        let cmds = commands_for(&state, &content);
        let expected_pos = state.station.buildable_cells()[0];
        match cmds.as_slice() {
            [Command::Build { pos, module }] => {
                assert_eq!(*module, ModuleKey::from("storage"));
                assert_eq!(*pos, expected_pos);
                assert_eq!(*pos, GridPos::new(2, 1));
            }
            other => panic!("expected a single build, got {other:?}"),
        }
    }

    #[test]
    fn test_docked_skips_locked_modules() {
        let content = base_content();
        let mut state = base_state(&content);
        state.ledger.total_resources = 10;
        for status in state.station.modules.values_mut() {
            if status.built {
                continue;
            }
            status.unlocked = false;
        }

        let cmds = commands_for(&state, &content);
        assert!(matches!(cmds.as_slice(), [Command::Launch]));
    }

    #[test]
    fn test_mining_turns_auto_mining_on() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.targeting.auto_mining = false;

        let cmds = commands_for(&state, &content);
        assert!(matches!(cmds.as_slice(), [Command::ToggleAutoMining]));
    }

    #[test]
    fn test_full_hold_returns() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.craft.cargo = vec![ResourceKind::Common; state.craft.max_cargo as usize];

        let cmds = commands_for(&state, &content);
        assert!(matches!(cmds.as_slice(), [Command::ReturnToStation]));
    }

    #[test]
    fn test_advance_accepted_only_with_launch_reserve() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.pending = Some(PendingDecision::ContinueToNextField {
            next_field: 2,
            travel_cost: 7.0,
        });

        state.craft.fuel = 17.0;
        let cmds = commands_for(&state, &content);
        assert!(matches!(
            cmds.as_slice(),
            [Command::ResolveDecision { accept: true }]
        ));

        state.craft.fuel = 16.9;
        let cmds = commands_for(&state, &content);
        assert!(matches!(
            cmds.as_slice(),
            [Command::ResolveDecision { accept: false }]
        ));
    }

    #[test]
    fn test_low_fuel_prompt_is_accepted() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.pending = Some(PendingDecision::LowFuel);
        state.craft.cargo = vec![ResourceKind::Common; state.craft.max_cargo as usize];

        let cmds = commands_for(&state, &content);
        assert!(matches!(
            cmds.as_slice(),
            [Command::ResolveDecision { accept: true }]
        ));
    }

    #[test]
    fn test_scans_only_when_an_artifact_is_in_range() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.field.artifacts = vec![artifact_at(700.0, 300.0, false)];
        assert!(commands_for(&state, &content).is_empty());

        state.field.artifacts = vec![artifact_at(500.0, 300.0, false)];
        let cmds = commands_for(&state, &content);
        assert!(matches!(cmds.as_slice(), [Command::ActivateScanner]));

        state.craft.fuel = content.constants.low_fuel_threshold;
        assert!(commands_for(&state, &content).is_empty());
    }

    #[test]
    fn test_steers_to_discovered_artifact_before_pickups() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.field.artifacts = vec![artifact_at(400.0, 100.0, true)];
        state.field.pickups = vec![pickup_at(450.0, 300.0)];
        let mut autopilot = AutopilotController::default();

        let input = autopilot.frame_input(&state, &content);
        assert!(input.movement.up);
        assert!(!input.movement.down && !input.movement.left && !input.movement.right);
        assert_eq!(input.pointer, Vec2::new(400.0, 100.0));
    }

    #[test]
    fn test_steers_to_pickup_then_ignores_pickups_when_full() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.field.pickups = vec![pickup_at(300.0, 300.0)];
        let mut autopilot = AutopilotController::default();

        let input = autopilot.frame_input(&state, &content);
        assert!(input.movement.left && !input.movement.right);

        state.craft.cargo = vec![ResourceKind::Common; state.craft.max_cargo as usize];
        let input = autopilot.frame_input(&state, &content);
        assert_eq!(input.movement, MovementIntent::default());
    }

    #[test]
    fn test_approaches_distant_asteroid_and_holds_when_close() {
        let content = base_content();
        let mut state = mining_state(&content);
        state.field.asteroids = vec![asteroid_at(750.0, 550.0)];
        let mut autopilot = AutopilotController::default();

        let input = autopilot.frame_input(&state, &content);
        assert!(input.movement.right && input.movement.down);

        state.field.asteroids = vec![asteroid_at(450.0, 300.0)];
        let input = autopilot.frame_input(&state, &content);
        assert_eq!(input.movement, MovementIntent::default());
    }

    #[test]
    fn test_docked_input_is_idle() {
        let content = base_content();
        let state = base_state(&content);
        let mut autopilot = AutopilotController::default();
        let input = autopilot.frame_input(&state, &content);
        assert_eq!(input.movement, MovementIntent::default());
        assert!(!input.mining_held);
    }
}
