//! Shared test fixtures for expedition_core and downstream crates.
//!
//! `base_content()` mirrors the shipped catalog: the full module unlock graph,
//! one artifact per rarity, and the standard constants. `base_state()` is a
//! fresh session docked at the station.

use chrono::{DateTime, TimeZone, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::controller::{empty_field, new_craft, new_expedition};
use crate::station::new_station;
use crate::{
    ArtifactDef, ArtifactId, BeamState, Constants, Counters, FrameInput, GameContent, GameState,
    Ledger, MetaState, Mode, ModuleDef, ModuleEffect, ModuleKey, Rarity, TargetingState,
    UnlockRule,
};

fn module(key: &str, cost: u64, unlock: UnlockRule, effects: Vec<ModuleEffect>) -> ModuleDef {
    ModuleDef {
        key: ModuleKey::from(key),
        name: key.replace('_', " "),
        icon: key.to_string(),
        cost,
        unlock,
        effects,
    }
}

fn artifact(id: &str, name: &str, rarity: Rarity, value: u64) -> ArtifactDef {
    ArtifactDef {
        id: ArtifactId::from(id),
        name: name.to_string(),
        icon: id.trim_start_matches("art_").to_string(),
        rarity,
        value,
    }
}

pub fn base_constants() -> Constants {
    Constants {
        field_width: 800.0,
        field_height: 600.0,
        field_margin: 50.0,
        spawn_clearance: 80.0,
        max_fields: 5,
        grid_size: 5,
        base_max_fuel: 100.0,
        base_max_cargo: 10,
        base_mining_power: 1.0,
        base_scanner_speed: 4.0,
        base_scanner_range: 250.0,
        launch_fuel_cost: 10.0,
        beam_fuel_per_tick: 0.2,
        travel_cost_base: 5.0,
        travel_cost_per_field: 2.0,
        low_fuel_threshold: 15.0,
        search_radius: 200.0,
        heading_smoothing: 0.1,
        craft_thrust: 0.5,
        craft_drag: 0.95,
        craft_max_speed: 5.0,
        magnet_radius: 30.0,
        magnet_pull: 0.2,
        collect_radius: 15.0,
        artifact_pickup_radius: 40.0,
        reward_jitter: 10.0,
        scan_fuel_cost: 5.0,
        scan_lifetime_ticks: 90,
        common_value: 1,
        return_rare_value: 3,
        dock_rare_value: 4,
    }
}

pub fn base_content() -> GameContent {
    GameContent {
        content_version: "test".to_string(),
        modules: vec![
            module("command", 0, UnlockRule::Always, vec![]),
            module(
                "storage",
                8,
                UnlockRule::Always,
                vec![ModuleEffect::CargoCapacity { max_cargo: 20 }],
            ),
            module("research", 12, UnlockRule::Always, vec![]),
            module(
                "workshop",
                25,
                UnlockRule::ModulesBuilt {
                    modules: vec![ModuleKey::from("storage"), ModuleKey::from("research")],
                },
                vec![ModuleEffect::MiningPower { power: 2.5 }],
            ),
            module(
                "greenhouse",
                30,
                UnlockRule::ModulesBuilt {
                    modules: vec![ModuleKey::from("workshop")],
                },
                vec![ModuleEffect::FuelCapacity { max_fuel: 150.0 }],
            ),
            module(
                "observatory",
                35,
                UnlockRule::ModulesBuilt {
                    modules: vec![ModuleKey::from("workshop")],
                },
                vec![ModuleEffect::Scanner {
                    speed: 7.0,
                    range: 400.0,
                }],
            ),
            module("guest_quarters", 45, UnlockRule::BuiltCount { count: 6 }, vec![]),
            module("vault", 120, UnlockRule::MasterCollection, vec![]),
        ],
        artifacts: vec![
            artifact("art_shard", "Crystal Shard", Rarity::Common, 10),
            artifact("art_compass", "Drift Compass", Rarity::Uncommon, 25),
            artifact("art_star_chart", "Star Chart", Rarity::Rare, 60),
            artifact("art_core", "Resonant Core", Rarity::Epic, 120),
            artifact("art_crown", "Void Crown", Rarity::Legendary, 250),
        ],
        constants: base_constants(),
    }
}

/// Fresh session: docked, full tank, empty hold, command module only.
pub fn base_state(content: &GameContent) -> GameState {
    let constants = &content.constants;
    GameState {
        meta: MetaState {
            tick: 0,
            seed: Some(42),
        },
        mode: Mode::Station,
        craft: new_craft(constants),
        expedition: new_expedition(constants),
        field: empty_field(constants),
        targeting: TargetingState::default(),
        beam: BeamState::default(),
        scanner: None,
        controls: FrameInput::default(),
        pending: None,
        ledger: Ledger::default(),
        station: new_station(content),
        counters: Counters::default(),
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Fixed wall-clock instant for artifact timestamps.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
}
