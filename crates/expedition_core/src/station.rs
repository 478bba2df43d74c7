//! Station build grid, module unlocks, and capability projection.
//!
//! The grid is a bounded square plane. The command module sits at the center
//! cell from the start and can never be moved or removed; every other module
//! has to touch an occupied cell orthogonally.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Constants, Craft, ExpeditionError, GameContent, ModuleEffect, ModuleKey, PlacementError,
    StationState, UnlockRule, COMMAND_MODULE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn neighbors(self) -> [GridPos; 4] {
        [
            GridPos::new(self.x + 1, self.y),
            GridPos::new(self.x - 1, self.y),
            GridPos::new(self.x, self.y + 1),
            GridPos::new(self.x, self.y - 1),
        ]
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for GridPos {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("grid key '{s}' is not 'x,y'"))?;
        let x = x.trim().parse().map_err(|_| format!("bad x in '{s}'"))?;
        let y = y.trim().parse().map_err(|_| format!("bad y in '{s}'"))?;
        Ok(GridPos::new(x, y))
    }
}

/// Occupied cells of the station. Serializes as a `"x,y" -> module` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridSnapshot", into = "GridSnapshot")]
pub struct StationGrid {
    size: i32,
    cells: BTreeMap<GridPos, ModuleKey>,
}

impl StationGrid {
    /// A `size` x `size` grid holding only the command module at its center.
    pub fn new(size: i32) -> Self {
        let mut cells = BTreeMap::new();
        let size = size.max(1);
        cells.insert(GridPos::new(size / 2, size / 2), ModuleKey::from(COMMAND_MODULE));
        Self { size, cells }
    }

    /// Rebuild from stored cells. Returns `None` unless the command module is
    /// at the center, every cell is in bounds, no module appears twice, and
    /// every module connects back to the command module orthogonally.
    pub fn from_cells(size: i32, cells: BTreeMap<GridPos, ModuleKey>) -> Option<Self> {
        let grid = Self {
            size: size.max(1),
            cells,
        };
        let seed_ok = grid.module_at(grid.seed()) == Some(&ModuleKey::from(COMMAND_MODULE));
        let bounds_ok = grid.cells.keys().all(|pos| grid.in_bounds(*pos));
        let mut keys: Vec<&ModuleKey> = grid.cells.values().collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        (seed_ok && bounds_ok && keys.len() == total && grid.is_connected()).then_some(grid)
    }

    /// Every occupied cell is reachable from the seed through occupied neighbors.
    fn is_connected(&self) -> bool {
        let mut seen = BTreeSet::from([self.seed()]);
        let mut frontier = vec![self.seed()];
        while let Some(pos) = frontier.pop() {
            for neighbor in pos.neighbors() {
                if self.cells.contains_key(&neighbor) && seen.insert(neighbor) {
                    frontier.push(neighbor);
                }
            }
        }
        seen.len() == self.cells.len()
    }

    /// Cells keyed by `"x,y"`, the shape progress is stored in.
    pub fn keyed_cells(&self) -> BTreeMap<String, ModuleKey> {
        self.cells
            .iter()
            .map(|(pos, key)| (pos.to_string(), key.clone()))
            .collect()
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn seed(&self) -> GridPos {
        GridPos::new(self.size / 2, self.size / 2)
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        (0..self.size).contains(&pos.x) && (0..self.size).contains(&pos.y)
    }

    pub fn module_at(&self, pos: GridPos) -> Option<&ModuleKey> {
        self.cells.get(&pos)
    }

    pub fn contains_module(&self, key: &ModuleKey) -> bool {
        self.cells.values().any(|k| k == key)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&GridPos, &ModuleKey)> {
        self.cells.iter()
    }

    pub fn built_count(&self) -> usize {
        self.cells.len()
    }

    /// Why `pos` can't take a module, if it can't.
    pub fn placement_error(&self, pos: GridPos) -> Option<PlacementError> {
        if !self.in_bounds(pos) {
            return Some(PlacementError::OutOfBounds);
        }
        if self.cells.contains_key(&pos) {
            return Some(PlacementError::Occupied);
        }
        let touches = pos
            .neighbors()
            .iter()
            .any(|neighbor| self.cells.contains_key(neighbor));
        (!touches).then_some(PlacementError::NotAdjacent)
    }

    pub fn can_build_at(&self, pos: GridPos) -> bool {
        self.placement_error(pos).is_none()
    }

    /// Every free cell that can take a module, in row-major order.
    pub fn buildable_cells(&self) -> Vec<GridPos> {
        (0..self.size)
            .flat_map(|y| (0..self.size).map(move |x| GridPos::new(x, y)))
            .filter(|pos| self.can_build_at(*pos))
            .collect()
    }

    /// Largest occupied span along either axis. A lone command module is 1.
    pub fn extent(&self) -> i32 {
        let span = |values: Vec<i32>| match (values.iter().min(), values.iter().max()) {
            (Some(min), Some(max)) => max - min + 1,
            _ => 0,
        };
        let xs: Vec<i32> = self.cells.keys().map(|p| p.x).collect();
        let ys: Vec<i32> = self.cells.keys().map(|p| p.y).collect();
        span(xs).max(span(ys))
    }

    fn place(&mut self, pos: GridPos, key: ModuleKey) {
        self.cells.insert(pos, key);
    }
}

/// Serialized form of a grid inside a state snapshot.
#[derive(Serialize, Deserialize)]
struct GridSnapshot {
    size: i32,
    cells: BTreeMap<String, ModuleKey>,
}

impl From<StationGrid> for GridSnapshot {
    fn from(grid: StationGrid) -> Self {
        Self {
            size: grid.size,
            cells: grid.keyed_cells(),
        }
    }
}

impl TryFrom<GridSnapshot> for StationGrid {
    type Error = String;

    fn try_from(snapshot: GridSnapshot) -> Result<Self, Self::Error> {
        let cells = snapshot
            .cells
            .into_iter()
            .map(|(key, module)| key.parse::<GridPos>().map(|pos| (pos, module)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        StationGrid::from_cells(snapshot.size, cells)
            .ok_or_else(|| "grid violates placement invariants".to_string())
    }
}

/// Step function of built-module count.
pub fn station_tier(built_count: usize) -> u32 {
    match built_count {
        n if n >= 25 => 5,
        n if n >= 16 => 4,
        n if n >= 9 => 3,
        n if n >= 4 => 2,
        _ => 1,
    }
}

/// Fresh station: command module on the grid, catalog unlock defaults applied.
pub fn new_station(content: &GameContent) -> StationState {
    let mut station = StationState {
        grid: StationGrid::new(content.constants.grid_size),
        modules: BTreeMap::new(),
        master_collection_complete: false,
    };
    reconcile_modules(&mut station, content);
    station
}

/// Make module statuses agree with the grid and the catalog: `built` mirrors
/// the grid, missing catalog entries are added, and unlocks are re-evaluated.
/// Returns modules that became unlocked.
pub fn reconcile_modules(station: &mut StationState, content: &GameContent) -> Vec<ModuleKey> {
    station
        .modules
        .retain(|key, _| content.module(key).is_some());
    for def in &content.modules {
        let built = station.grid.contains_module(&def.key);
        let status = station.modules.entry(def.key.clone()).or_default();
        status.built = built;
        status.unlocked |= built;
    }
    evaluate_unlocks(station, content)
}

fn rule_satisfied(rule: &UnlockRule, station: &StationState) -> bool {
    match rule {
        UnlockRule::Always => true,
        UnlockRule::ModulesBuilt { modules } => {
            modules.iter().all(|key| station.grid.contains_module(key))
        }
        UnlockRule::BuiltCount { count } => station.grid.built_count() >= *count,
        UnlockRule::MasterCollection => station.master_collection_complete,
    }
}

/// Flip every module whose precondition now holds to unlocked. Unlocks are
/// sticky. Returns the newly unlocked keys in catalog order.
pub fn evaluate_unlocks(station: &mut StationState, content: &GameContent) -> Vec<ModuleKey> {
    let mut newly_unlocked = Vec::new();
    for def in &content.modules {
        let already = station.modules.get(&def.key).is_some_and(|s| s.unlocked);
        if !already && rule_satisfied(&def.unlock, station) {
            station.modules.entry(def.key.clone()).or_default().unlocked = true;
            newly_unlocked.push(def.key.clone());
        }
    }
    newly_unlocked
}

/// Whether the top-tier vault may be built, per the externally reported
/// master collection.
pub fn vault_available(station: &StationState) -> bool {
    station.master_collection_complete
}

impl StationState {
    /// Visual size of the station: its largest occupied span.
    pub fn station_size(&self) -> i32 {
        self.grid.extent()
    }

    pub fn tier(&self) -> u32 {
        station_tier(self.grid.built_count())
    }

    pub fn built_count(&self) -> usize {
        self.grid.built_count()
    }

    pub fn buildable_cells(&self) -> Vec<GridPos> {
        self.grid.buildable_cells()
    }

    pub fn is_unlocked(&self, key: &ModuleKey) -> bool {
        self.modules.get(key).is_some_and(|status| status.unlocked)
    }

    pub fn is_built(&self, key: &ModuleKey) -> bool {
        self.grid.contains_module(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReceipt {
    pub cost: u64,
    pub balance: u64,
    pub newly_unlocked: Vec<ModuleKey>,
}

/// Place `key` at `pos`, paying from `balance`. Checks everything before
/// touching anything, so a rejection leaves grid and balance untouched.
pub fn build(
    station: &mut StationState,
    pos: GridPos,
    key: &ModuleKey,
    balance: &mut u64,
    content: &GameContent,
) -> Result<BuildReceipt, ExpeditionError> {
    let def = content
        .module(key)
        .ok_or_else(|| ExpeditionError::UnknownModule(key.clone()))?;
    if let Some(err) = station.grid.placement_error(pos) {
        return Err(err.into());
    }
    let status = station.modules.get(key).copied().unwrap_or_default();
    if status.built || station.grid.contains_module(key) {
        return Err(PlacementError::AlreadyBuilt.into());
    }
    if !status.unlocked {
        return Err(PlacementError::Locked.into());
    }
    let new_balance = balance
        .checked_sub(def.cost)
        .ok_or(ExpeditionError::InsufficientFunds {
            cost: def.cost,
            balance: *balance,
        })?;

    *balance = new_balance;
    station.grid.place(pos, key.clone());
    station.modules.entry(key.clone()).or_default().built = true;
    let newly_unlocked = evaluate_unlocks(station, content);

    info!(module = %key, %pos, cost = def.cost, balance = new_balance, "module built");
    Ok(BuildReceipt {
        cost: def.cost,
        balance: new_balance,
        newly_unlocked,
    })
}

/// Reset craft capabilities to base constants, then apply every built
/// module's overrides in catalog order. Never cumulative.
pub fn project_capabilities(craft: &mut Craft, station: &StationState, content: &GameContent) {
    apply_base_capabilities(craft, &content.constants);
    let built_effects = content
        .modules
        .iter()
        .filter(|def| station.grid.contains_module(&def.key))
        .flat_map(|def| &def.effects);
    for effect in built_effects {
        match effect {
            ModuleEffect::CargoCapacity { max_cargo } => craft.max_cargo = *max_cargo,
            ModuleEffect::MiningPower { power } => craft.mining_power = *power,
            ModuleEffect::FuelCapacity { max_fuel } => craft.max_fuel = *max_fuel,
            ModuleEffect::Scanner { speed, range } => {
                craft.scanner_speed = *speed;
                craft.scanner_range = *range;
            }
        }
    }
    craft.fuel = craft.fuel.min(craft.max_fuel);
}

fn apply_base_capabilities(craft: &mut Craft, constants: &Constants) {
    craft.max_fuel = constants.base_max_fuel;
    craft.max_cargo = constants.base_max_cargo;
    craft.mining_power = constants.base_mining_power;
    craft.scanner_speed = constants.base_scanner_speed;
    craft.scanner_range = constants.base_scanner_range;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state};

    fn key(k: &str) -> ModuleKey {
        ModuleKey::from(k)
    }

    #[test]
    fn new_grid_has_command_at_center() {
        let grid = StationGrid::new(5);
        assert_eq!(grid.module_at(GridPos::new(2, 2)), Some(&key(COMMAND_MODULE)));
        assert!(!grid.can_build_at(GridPos::new(2, 2)));
        assert_eq!(grid.extent(), 1);
        assert_eq!(grid.built_count(), 1);
    }

    #[test]
    fn placement_needs_an_orthogonal_neighbor() {
        let grid = StationGrid::new(5);
        assert!(grid.can_build_at(GridPos::new(2, 1)));
        assert!(grid.can_build_at(GridPos::new(3, 2)));
        assert_eq!(
            grid.placement_error(GridPos::new(3, 3)),
            Some(PlacementError::NotAdjacent)
        );
        assert_eq!(
            grid.placement_error(GridPos::new(5, 2)),
            Some(PlacementError::OutOfBounds)
        );
        assert_eq!(grid.buildable_cells().len(), 4);
    }

    #[test]
    fn build_below_cost_is_rejected_untouched() {
        let content = base_content();
        let mut station = new_station(&content);
        let before = station.clone();
        let mut balance = 5;
        let result = build(&mut station, GridPos::new(2, 1), &key("storage"), &mut balance, &content);
        assert_eq!(
            result,
            Err(ExpeditionError::InsufficientFunds { cost: 8, balance: 5 })
        );
        assert_eq!(balance, 5);
        assert_eq!(station, before);
    }

    #[test]
    fn build_spends_and_places() {
        let content = base_content();
        let mut station = new_station(&content);
        let mut balance = 20;
        let receipt =
            build(&mut station, GridPos::new(2, 1), &key("storage"), &mut balance, &content)
                .unwrap();
        assert_eq!(receipt.cost, 8);
        assert_eq!(balance, 12);
        assert_eq!(station.grid.module_at(GridPos::new(2, 1)), Some(&key("storage")));
        assert!(station.modules[&key("storage")].built);
    }

    #[test]
    fn modules_are_singletons() {
        let content = base_content();
        let mut station = new_station(&content);
        let mut balance = 100;
        build(&mut station, GridPos::new(2, 1), &key("storage"), &mut balance, &content).unwrap();
        let again = build(&mut station, GridPos::new(2, 3), &key("storage"), &mut balance, &content);
        assert_eq!(
            again,
            Err(ExpeditionError::InvalidPlacement(PlacementError::AlreadyBuilt))
        );
        assert_eq!(balance, 92);
    }

    #[test]
    fn locked_and_occupied_are_invalid_placements() {
        let content = base_content();
        let mut station = new_station(&content);
        let mut balance = 1000;
        let locked = build(&mut station, GridPos::new(2, 1), &key("workshop"), &mut balance, &content);
        assert_eq!(
            locked,
            Err(ExpeditionError::InvalidPlacement(PlacementError::Locked))
        );
        let occupied = build(&mut station, GridPos::new(2, 2), &key("storage"), &mut balance, &content);
        assert_eq!(
            occupied,
            Err(ExpeditionError::InvalidPlacement(PlacementError::Occupied))
        );
        assert_eq!(balance, 1000);
    }

    #[test]
    fn unlock_graph_follows_builds() {
        let content = base_content();
        let mut station = new_station(&content);
        let mut balance = 1000;
        assert!(station.modules[&key("research")].unlocked);
        assert!(!station.modules[&key("workshop")].unlocked);

        build(&mut station, GridPos::new(2, 1), &key("storage"), &mut balance, &content).unwrap();
        assert!(!station.modules[&key("workshop")].unlocked);
        let receipt =
            build(&mut station, GridPos::new(2, 3), &key("research"), &mut balance, &content)
                .unwrap();
        assert_eq!(receipt.newly_unlocked, vec![key("workshop")]);

        let receipt =
            build(&mut station, GridPos::new(1, 2), &key("workshop"), &mut balance, &content)
                .unwrap();
        assert_eq!(receipt.newly_unlocked, vec![key("greenhouse"), key("observatory")]);

        build(&mut station, GridPos::new(3, 2), &key("greenhouse"), &mut balance, &content)
            .unwrap();
        assert!(!station.modules[&key("guest_quarters")].unlocked);
        let receipt =
            build(&mut station, GridPos::new(1, 1), &key("observatory"), &mut balance, &content)
                .unwrap();
        assert_eq!(receipt.newly_unlocked, vec![key("guest_quarters")]);
        assert!(!station.modules[&key("vault")].unlocked);
    }

    #[test]
    fn vault_waits_for_master_collection() {
        let content = base_content();
        let mut station = new_station(&content);
        assert!(!vault_available(&station));
        station.master_collection_complete = true;
        let unlocked = evaluate_unlocks(&mut station, &content);
        assert_eq!(unlocked, vec![key("vault")]);
        assert!(vault_available(&station));
    }

    #[test]
    fn extent_is_symmetric_max_span() {
        let content = base_content();
        let mut station = new_station(&content);
        let mut balance = 1000;
        build(&mut station, GridPos::new(2, 1), &key("storage"), &mut balance, &content).unwrap();
        assert_eq!(station.grid.extent(), 2);
        build(&mut station, GridPos::new(2, 0), &key("research"), &mut balance, &content).unwrap();
        assert_eq!(station.grid.extent(), 3);
    }

    #[test]
    fn tier_steps() {
        assert_eq!(station_tier(1), 1);
        assert_eq!(station_tier(3), 1);
        assert_eq!(station_tier(4), 2);
        assert_eq!(station_tier(9), 3);
        assert_eq!(station_tier(16), 4);
        assert_eq!(station_tier(25), 5);
    }

    #[test]
    fn capability_projection_is_idempotent() {
        let content = base_content();
        let mut state = base_state(&content);
        let mut balance = 1000;
        build(&mut state.station, GridPos::new(2, 1), &key("storage"), &mut balance, &content)
            .unwrap();
        build(&mut state.station, GridPos::new(2, 3), &key("research"), &mut balance, &content)
            .unwrap();
        build(&mut state.station, GridPos::new(1, 2), &key("workshop"), &mut balance, &content)
            .unwrap();

        project_capabilities(&mut state.craft, &state.station, &content);
        let first = (
            state.craft.max_cargo,
            state.craft.mining_power,
            state.craft.max_fuel,
            state.craft.scanner_range,
        );
        project_capabilities(&mut state.craft, &state.station, &content);
        let second = (
            state.craft.max_cargo,
            state.craft.mining_power,
            state.craft.max_fuel,
            state.craft.scanner_range,
        );
        assert_eq!(first, second);
        assert_eq!(state.craft.max_cargo, 20);
        assert!((state.craft.mining_power - 2.5).abs() < f64::EPSILON);
        assert!((state.craft.max_fuel - content.constants.base_max_fuel).abs() < f64::EPSILON);
    }

    #[test]
    fn grid_snapshot_keeps_its_size() {
        let grid = StationGrid::new(7);
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r#"{"size":7,"cells":{"3,3":"command"}}"#);
        let back: StationGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
        assert_eq!(back.size(), 7);
        assert_eq!(back.seed(), GridPos::new(3, 3));
    }

    #[test]
    fn keyed_cells_use_string_coordinates() {
        let grid = StationGrid::new(5);
        let keyed = grid.keyed_cells();
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed["2,2"], key("command"));
    }

    #[test]
    fn disconnected_cells_are_rejected() {
        let cells = BTreeMap::from([
            (GridPos::new(2, 2), key("command")),
            (GridPos::new(0, 0), key("storage")),
        ]);
        assert!(StationGrid::from_cells(5, cells).is_none());

        let cells = BTreeMap::from([
            (GridPos::new(2, 2), key("command")),
            (GridPos::new(2, 1), key("storage")),
            (GridPos::new(2, 0), key("research")),
        ]);
        assert!(StationGrid::from_cells(5, cells).is_some());
    }

    #[test]
    fn station_queries_track_the_grid() {
        let content = base_content();
        let mut station = new_station(&content);
        assert_eq!(station.tier(), 1);
        assert_eq!(station.station_size(), 1);
        assert!(station.is_unlocked(&key("storage")));
        assert!(!station.is_built(&key("storage")));

        let mut balance = 1000;
        build(&mut station, GridPos::new(2, 1), &key("storage"), &mut balance, &content).unwrap();
        build(&mut station, GridPos::new(2, 3), &key("research"), &mut balance, &content).unwrap();
        build(&mut station, GridPos::new(1, 2), &key("workshop"), &mut balance, &content).unwrap();
        assert_eq!(station.built_count(), 4);
        assert_eq!(station.tier(), 2);
        assert_eq!(station.station_size(), 3);
        assert!(station.is_built(&key("workshop")));
        assert!(!station.buildable_cells().contains(&GridPos::new(2, 2)));
    }

    #[test]
    fn grid_without_command_fails_to_parse() {
        let result: Result<StationGrid, _> =
            serde_json::from_str(r#"{"size":5,"cells":{"1,1":"storage"}}"#);
        assert!(result.is_err());
    }
}
