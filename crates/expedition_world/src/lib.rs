//! Content loading, session setup, and on-disk progress shared by the CLI
//! and any other host.

use anyhow::{Context, Result};
use expedition_core::controller::{empty_field, new_craft, new_expedition};
use expedition_core::station::project_capabilities;
use expedition_core::{
    ArtifactDef, BeamState, BlobStore, Constants, Counters, FrameInput, GameContent, GameState,
    MetaState, Mode, ModuleDef, ModuleKey, Progress, TargetingState, UnlockRule, COMMAND_MODULE,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize)]
struct ModulesFile {
    content_version: String,
    modules: Vec<ModuleDef>,
}

#[derive(Deserialize)]
struct ArtifactsFile {
    artifacts: Vec<ArtifactDef>,
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: an unlock rule naming a module that doesn't exist,
/// the same module or artifact listed twice, or a catalog without the
/// command module the grid is seeded with.
pub fn validate_content(content: &GameContent) {
    let mut module_keys: HashSet<&ModuleKey> = HashSet::new();
    for module in &content.modules {
        assert!(
            module_keys.insert(&module.key),
            "module '{}' is defined more than once",
            module.key,
        );
    }

    let command = content
        .module(&ModuleKey::from(COMMAND_MODULE))
        .unwrap_or_else(|| panic!("module catalog has no '{COMMAND_MODULE}' module"));
    assert!(
        command.unlock == UnlockRule::Always,
        "'{COMMAND_MODULE}' module must be unlocked from the start",
    );

    let grid_cells = usize::try_from(content.constants.grid_size.pow(2)).unwrap_or(0);
    for module in &content.modules {
        match &module.unlock {
            UnlockRule::ModulesBuilt { modules } => {
                for required in modules {
                    assert!(
                        module_keys.contains(required),
                        "module '{}' unlock requires '{}', which is not a known module",
                        module.key,
                        required,
                    );
                    assert!(
                        required != &module.key,
                        "module '{}' requires itself to unlock",
                        module.key,
                    );
                }
            }
            UnlockRule::BuiltCount { count } => {
                assert!(
                    *count <= grid_cells,
                    "module '{}' needs {count} built modules but the grid only has {grid_cells} cells",
                    module.key,
                );
            }
            UnlockRule::Always | UnlockRule::MasterCollection => {}
        }
    }

    let mut artifact_ids = HashSet::new();
    for artifact in &content.artifacts {
        assert!(
            artifact_ids.insert(&artifact.id),
            "artifact '{}' is defined more than once",
            artifact.id,
        );
    }

    validate_constants(&content.constants);
}

fn validate_constants(c: &Constants) {
    assert!(
        c.grid_size > 0 && c.grid_size % 2 == 1,
        "grid_size must be a positive odd number so the command module has a center cell, got {}",
        c.grid_size,
    );
    assert!(c.max_fields >= 1, "max_fields must be at least 1");
    assert!(
        c.field_width > 2.0 * c.field_margin && c.field_height > 2.0 * c.field_margin,
        "field margin leaves no room to spawn asteroids",
    );
    assert!(
        c.collect_radius <= c.magnet_radius,
        "collect_radius {} exceeds magnet_radius {}",
        c.collect_radius,
        c.magnet_radius,
    );
    assert!(
        (0.0..=1.0).contains(&c.heading_smoothing),
        "heading_smoothing must be within [0, 1], got {}",
        c.heading_smoothing,
    );
    assert!(
        c.launch_fuel_cost <= c.base_max_fuel,
        "a full base tank cannot pay the launch cost",
    );
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let modules_file: ModulesFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("modules.json")).context("reading modules.json")?,
    )
    .context("parsing modules.json")?;
    let artifacts_file: ArtifactsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("artifacts.json")).context("reading artifacts.json")?,
    )
    .context("parsing artifacts.json")?;
    let content = GameContent {
        content_version: modules_file.content_version,
        modules: modules_file.modules,
        artifacts: artifacts_file.artifacts,
        constants,
    };
    validate_content(&content);
    debug!(
        version = %content.content_version,
        modules = content.modules.len(),
        artifacts = content.artifacts.len(),
        "content loaded"
    );
    Ok(content)
}

/// A docked session built on top of persisted progress. The craft starts
/// with a full tank and the station's upgrades applied.
pub fn build_initial_state(content: &GameContent, seed: Option<u64>, progress: Progress) -> GameState {
    let c = &content.constants;
    let mut craft = new_craft(c);
    project_capabilities(&mut craft, &progress.station, content);
    craft.fuel = craft.max_fuel;

    GameState {
        meta: MetaState {
            tick: 0,
            seed,
        },
        mode: Mode::Station,
        craft,
        expedition: new_expedition(c),
        field: empty_field(c),
        targeting: TargetingState::default(),
        beam: BeamState::default(),
        scanner: None,
        controls: FrameInput::default(),
        pending: None,
        ledger: progress.ledger,
        station: progress.station,
        counters: Counters::default(),
    }
}

/// Progress blobs stored one file per key under a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Opens `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating save directory: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl BlobStore for DirStore {
    fn load(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    /// Replaces the blob via a temp file and rename.
    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)
    }
}
