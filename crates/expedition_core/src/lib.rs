//! `expedition_core`: deterministic expedition and station simulation.
//!
//! No IO, no network. All randomness via the passed-in Rng, wall-clock time
//! via the passed-in timestamp.

pub mod controller;
pub mod economy;
mod engine;
mod error;
pub mod field;
pub mod mining;
pub mod persistence;
pub mod station;
pub mod targeting;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use engine::{apply_command, move_craft, tick};
pub use error::{ExpeditionError, PlacementError};
pub use persistence::{load_progress, save_progress, BlobStore, MemoryStore, Progress};
pub use station::{station_tier, vault_available, GridPos, StationGrid};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
