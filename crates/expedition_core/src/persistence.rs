//! Progress blobs: currency, artifact collection, station grid, module states.
//!
//! The core only knows named string blobs. Where they live is the host's
//! business (`BlobStore`). Anything missing or unreadable falls back to the
//! fresh-save default for that key alone.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::station::{new_station, reconcile_modules, GridPos, StationGrid};
use crate::{
    DiscoveredArtifact, GameContent, GameState, Ledger, ModuleKey, ModuleStatus, StationState,
};

pub const KEY_TOTAL_RESOURCES: &str = "totalResources";
pub const KEY_DISCOVERED_ARTIFACTS: &str = "discoveredArtifacts";
pub const KEY_STATION_GRID: &str = "stationGrid";
pub const KEY_MODULE_STATES: &str = "moduleStates";

/// Key-value storage for progress blobs.
pub trait BlobStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()>;
}

/// In-process store, used by tests and by hosts that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.blobs.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Progress that survives between sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub ledger: Ledger,
    pub station: StationState,
}

impl Progress {
    pub fn fresh(content: &GameContent) -> Self {
        Self {
            ledger: Ledger::default(),
            station: new_station(content),
        }
    }
}

pub fn encode_total_resources(total: u64) -> String {
    total.to_string()
}

pub fn encode_artifacts(artifacts: &[DiscoveredArtifact]) -> serde_json::Result<String> {
    serde_json::to_string(artifacts)
}

pub fn encode_grid(grid: &StationGrid) -> serde_json::Result<String> {
    serde_json::to_string(&grid.keyed_cells())
}

pub fn encode_module_states(
    modules: &BTreeMap<ModuleKey, ModuleStatus>,
) -> serde_json::Result<String> {
    serde_json::to_string(modules)
}

/// Parse the `"x,y" -> module` object into a grid of `grid_size`.
pub fn decode_grid(raw: &str, grid_size: i32) -> Result<StationGrid, String> {
    let keyed: BTreeMap<String, ModuleKey> =
        serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let mut cells = BTreeMap::new();
    for (key, module) in keyed {
        let pos: GridPos = key.parse()?;
        cells.insert(pos, module);
    }
    StationGrid::from_cells(grid_size, cells)
        .ok_or_else(|| "grid violates placement invariants".to_string())
}

/// Write all four blobs. Stops at the first store failure.
pub fn save_progress(store: &mut impl BlobStore, state: &GameState) -> std::io::Result<()> {
    let to_io = |e: serde_json::Error| std::io::Error::new(std::io::ErrorKind::InvalidData, e);

    store.save(
        KEY_TOTAL_RESOURCES,
        &encode_total_resources(state.ledger.total_resources),
    )?;
    store.save(
        KEY_DISCOVERED_ARTIFACTS,
        &encode_artifacts(&state.ledger.discovered_artifacts).map_err(to_io)?,
    )?;
    store.save(KEY_STATION_GRID, &encode_grid(&state.station.grid).map_err(to_io)?)?;
    store.save(
        KEY_MODULE_STATES,
        &encode_module_states(&state.station.modules).map_err(to_io)?,
    )?;
    Ok(())
}

/// Read progress back. Never fails: each bad or absent blob is replaced by
/// its default, then module states are reconciled with the grid.
pub fn load_progress(store: &impl BlobStore, content: &GameContent) -> Progress {
    let total_resources = read_key(store, KEY_TOTAL_RESOURCES, |raw| {
        raw.trim().parse::<u64>().map_err(|e| e.to_string())
    })
    .unwrap_or(0);

    let discovered_artifacts = read_key(store, KEY_DISCOVERED_ARTIFACTS, |raw| {
        serde_json::from_str::<Vec<DiscoveredArtifact>>(raw).map_err(|e| e.to_string())
    })
    .unwrap_or_default();

    let grid = read_key(store, KEY_STATION_GRID, |raw| {
        decode_grid(raw, content.constants.grid_size)
    })
    .unwrap_or_else(|| StationGrid::new(content.constants.grid_size));

    let modules = read_key(store, KEY_MODULE_STATES, |raw| {
        serde_json::from_str::<BTreeMap<ModuleKey, ModuleStatus>>(raw).map_err(|e| e.to_string())
    })
    .unwrap_or_default();

    let mut station = StationState {
        grid,
        modules,
        master_collection_complete: false,
    };
    reconcile_modules(&mut station, content);

    Progress {
        ledger: Ledger {
            total_resources,
            discovered_artifacts,
        },
        station,
    }
}

fn read_key<T>(
    store: &impl BlobStore,
    key: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<T> {
    let raw = store.load(key)?;
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(reason) => {
            warn!(key, %reason, "discarding unreadable progress blob, using default");
            None
        }
    }
}
