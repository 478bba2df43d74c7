//! Type definitions for `expedition_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::station::StationGrid;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(AsteroidId);
string_id!(PickupId);
string_id!(ModuleKey);
string_id!(ArtifactId);
string_id!(CommandId);
string_id!(EventId);

/// The pre-built module at the grid's seed cell.
pub const COMMAND_MODULE: &str = "command";

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Angle of the vector from `self` toward `other`, in radians.
    pub fn angle_to(self, other: Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn from_angle(radians: f64, length: f64) -> Self {
        Self::new(radians.cos() * length, radians.sin() * length)
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBounds {
    pub width: f64,
    pub height: f64,
}

impl FieldBounds {
    pub fn center(self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn clamp(self, point: Vec2) -> Vec2 {
        Vec2::new(point.x.clamp(0.0, self.width), point.y.clamp(0.0, self.height))
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Common,
    Rare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Lowest field difficulty at which an artifact of this rarity may spawn.
    pub fn min_difficulty(self) -> u32 {
        match self {
            Rarity::Common | Rarity::Uncommon => 1,
            Rarity::Rare => 2,
            Rarity::Epic => 3,
            Rarity::Legendary => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Station,
    Mining,
}

/// Which cargo settlement formula applies. Plain returns and full docks
/// value rare cargo differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleMode {
    Return,
    Dock,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// The whole session aggregate. Owned by the host and passed into `tick`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: MetaState,
    pub mode: Mode,
    pub craft: Craft,
    pub expedition: Expedition,
    pub field: FieldState,
    pub targeting: TargetingState,
    pub beam: BeamState,
    pub scanner: Option<ScanPulse>,
    pub controls: FrameInput,
    pub pending: Option<PendingDecision>,
    pub ledger: Ledger,
    pub station: StationState,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_asteroid_id: u64,
    pub next_pickup_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Craft {
    pub position: Vec2,
    /// Radians, 0 points along +x.
    pub heading: f64,
    pub velocity: Vec2,
    pub fuel: f64,
    pub max_fuel: f64,
    pub cargo: Vec<ResourceKind>,
    pub max_cargo: u32,
    pub mining_power: f64,
    pub scanner_speed: f64,
    pub scanner_range: f64,
}

impl Craft {
    pub fn cargo_full(&self) -> bool {
        self.cargo.len() >= self.max_cargo as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expedition {
    /// 1-based index of the field being mined.
    pub current_field: u32,
    pub max_fields: u32,
    pub fields_cleared: u32,
    pub return_to_station: bool,
    /// Set once the low-fuel prompt has been raised this expedition.
    pub low_fuel_warned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: AsteroidId,
    pub position: Vec2,
    /// Collision radius.
    pub size: f64,
    pub health: f64,
    pub max_health: f64,
    pub kind: ResourceKind,
    pub resources: u32,
    pub rotation: f64,
    pub rotation_speed: f64,
}

/// An artifact lying in the current field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldArtifact {
    pub def: ArtifactDef,
    pub position: Vec2,
    pub discovered: bool,
    pub pulse_phase: f64,
}

/// A collected resource entity still floating in the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: PickupId,
    pub kind: ResourceKind,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldState {
    pub bounds: FieldBounds,
    pub difficulty: u32,
    pub asteroids: Vec<Asteroid>,
    pub artifacts: Vec<FieldArtifact>,
    pub pickups: Vec<Pickup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetingState {
    pub auto_mining: bool,
    pub target: Option<AsteroidId>,
    pub indicator_visible: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeamState {
    pub active: bool,
    pub origin: Vec2,
    pub end: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanPulse {
    pub origin: Vec2,
    pub radius: f64,
    pub lifetime: u32,
    pub max_lifetime: u32,
}

/// Continuous inputs sampled once per frame by the input collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameInput {
    pub pointer: Vec2,
    pub mining_held: bool,
    pub movement: MovementIntent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PendingDecision {
    ContinueToNextField { next_field: u32, travel_cost: f64 },
    LowFuel,
}

/// Currency plus the persistent artifact collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub total_resources: u64,
    pub discovered_artifacts: Vec<DiscoveredArtifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredArtifact {
    #[serde(flatten)]
    pub artifact: ArtifactDef,
    #[serde(rename = "discoveredAt")]
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub built: bool,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationState {
    pub grid: StationGrid,
    pub modules: BTreeMap<ModuleKey, ModuleStatus>,
    /// Reported by the artifact-catalog collaborator; never derived here.
    pub master_collection_complete: bool,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    Launch,
    ReturnToStation,
    ToggleAutoMining,
    ActivateScanner,
    ResolveDecision { accept: bool },
    Build { pos: crate::GridPos, module: ModuleKey },
    ReportMasterCollection { complete: bool },
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Launch => "Launch",
            Command::ReturnToStation => "ReturnToStation",
            Command::ToggleAutoMining => "ToggleAutoMining",
            Command::ActivateScanner => "ActivateScanner",
            Command::ResolveDecision { .. } => "ResolveDecision",
            Command::Build { .. } => "Build",
            Command::ReportMasterCollection { .. } => "ReportMasterCollection",
        }
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ExpeditionLaunched {
        fuel_cost: f64,
    },
    FieldGenerated {
        field: u32,
        asteroid_count: usize,
        artifact: Option<ArtifactId>,
    },
    TargetAcquired {
        asteroid_id: AsteroidId,
    },
    TargetLost,
    AsteroidDestroyed {
        asteroid_id: AsteroidId,
        kind: ResourceKind,
        resources: u32,
    },
    ResourceCollected {
        kind: ResourceKind,
        cargo: usize,
    },
    CargoFull,
    ArtifactDiscovered {
        artifact_id: ArtifactId,
        rarity: Rarity,
    },
    ArtifactCollected {
        artifact_id: ArtifactId,
        value: u64,
    },
    ScannerActivated {
        fuel_cost: f64,
    },
    ScannerExpired,
    FieldCleared {
        field: u32,
    },
    DecisionRequested {
        decision: PendingDecision,
    },
    FieldAdvanced {
        field: u32,
        fuel_cost: f64,
    },
    ExpeditionCompleted {
        fields_cleared: u32,
    },
    CargoSettled {
        mode: SettleMode,
        items: usize,
        value_added: u64,
    },
    ReturnedToStation,
    ModuleBuilt {
        module: ModuleKey,
        pos: crate::GridPos,
        cost: u64,
    },
    ModuleUnlocked {
        module: ModuleKey,
    },
    AutoMiningToggled {
        enabled: bool,
    },
    MasterCollectionReported {
        complete: bool,
    },
    CommandRejected {
        command: String,
        reason: String,
    },
}

impl Event {
    /// True when the event alters state covered by the persisted blobs.
    pub fn changes_progress(&self) -> bool {
        matches!(
            self,
            Event::ArtifactCollected { .. }
                | Event::CargoSettled { .. }
                | Event::ModuleBuilt { .. }
                | Event::ModuleUnlocked { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub modules: Vec<ModuleDef>,
    pub artifacts: Vec<ArtifactDef>,
    pub constants: Constants,
}

impl GameContent {
    pub fn module(&self, key: &ModuleKey) -> Option<&ModuleDef> {
        self.modules.iter().find(|def| &def.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDef {
    pub id: ArtifactId,
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub key: ModuleKey,
    pub name: String,
    pub icon: String,
    pub cost: u64,
    pub unlock: UnlockRule,
    #[serde(default)]
    pub effects: Vec<ModuleEffect>,
}

/// Precondition for a module to become buildable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UnlockRule {
    Always,
    /// Every listed module has been built.
    ModulesBuilt { modules: Vec<ModuleKey> },
    /// At least `count` modules (command included) are on the grid.
    BuiltCount { count: usize },
    MasterCollection,
}

/// Absolute override applied to the craft while the module is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModuleEffect {
    CargoCapacity { max_cargo: u32 },
    MiningPower { power: f64 },
    FuelCapacity { max_fuel: f64 },
    Scanner { speed: f64, range: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub field_width: f64,
    pub field_height: f64,
    /// Keeps spawned asteroids off the field edge.
    pub field_margin: f64,
    /// Asteroids avoid spawning this close to the craft's start point.
    pub spawn_clearance: f64,
    pub max_fields: u32,
    pub grid_size: i32,

    pub base_max_fuel: f64,
    pub base_max_cargo: u32,
    pub base_mining_power: f64,
    pub base_scanner_speed: f64,
    pub base_scanner_range: f64,

    pub launch_fuel_cost: f64,
    pub beam_fuel_per_tick: f64,
    pub travel_cost_base: f64,
    pub travel_cost_per_field: f64,
    pub low_fuel_threshold: f64,

    pub search_radius: f64,
    pub heading_smoothing: f64,
    pub craft_thrust: f64,
    pub craft_drag: f64,
    pub craft_max_speed: f64,

    pub magnet_radius: f64,
    pub magnet_pull: f64,
    pub collect_radius: f64,
    pub artifact_pickup_radius: f64,
    pub reward_jitter: f64,

    pub scan_fuel_cost: f64,
    pub scan_lifetime_ticks: u32,

    pub common_value: u64,
    pub return_rare_value: u64,
    pub dock_rare_value: u64,
}

impl Constants {
    pub fn bounds(&self) -> FieldBounds {
        FieldBounds {
            width: self.field_width,
            height: self.field_height,
        }
    }

    /// Fuel needed to travel from `current_field` to the next one.
    pub fn travel_cost(&self, current_field: u32) -> f64 {
        self.travel_cost_base + self.travel_cost_per_field * f64::from(current_field)
    }
}
