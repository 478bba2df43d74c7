//! Cargo, currency, artifact pickup, and the scanner pulse.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    Constants, Craft, DiscoveredArtifact, ExpeditionError, FieldArtifact, Ledger, Pickup,
    ResourceKind, ScanPulse, SettleMode,
};

#[derive(Debug, Default)]
pub struct Collection {
    pub picked_up: Vec<Pickup>,
    pub artifacts: Vec<FieldArtifact>,
    /// Pickups that reached the hold while it had no room.
    pub blocked_by_full_cargo: usize,
}

/// One tick of magnetism and pickup around the craft.
///
/// Resources within the magnet radius drift a fixed fraction of the way in;
/// those inside the collect radius go into cargo while there is room and
/// otherwise stay in the field. Discovered artifacts inside the artifact
/// radius are taken regardless of cargo.
pub fn collect_proximity(
    craft: &mut Craft,
    pickups: &mut Vec<Pickup>,
    artifacts: &mut Vec<FieldArtifact>,
    constants: &Constants,
) -> Collection {
    let mut collection = Collection::default();
    let mut remaining = Vec::with_capacity(pickups.len());

    for mut pickup in pickups.drain(..) {
        let distance = pickup.position.distance(craft.position);
        if distance < constants.magnet_radius {
            let pull = (craft.position - pickup.position).scale(constants.magnet_pull);
            pickup.velocity = pull;
            pickup.position = pickup.position + pull;
        }
        if pickup.position.distance(craft.position) < constants.collect_radius {
            if craft.cargo_full() {
                collection.blocked_by_full_cargo += 1;
            } else {
                craft.cargo.push(pickup.kind);
                collection.picked_up.push(pickup);
                continue;
            }
        }
        remaining.push(pickup);
    }
    *pickups = remaining;

    let (taken, left): (Vec<_>, Vec<_>) = artifacts.drain(..).partition(|artifact| {
        artifact.discovered
            && artifact.position.distance(craft.position) < constants.artifact_pickup_radius
    });
    *artifacts = left;
    collection.artifacts = taken;
    collection
}

/// Move a collected artifact into the persistent collection and credit its value.
pub fn absorb_artifact(ledger: &mut Ledger, artifact: &FieldArtifact, now: DateTime<Utc>) {
    ledger.total_resources += artifact.def.value;
    ledger.discovered_artifacts.push(DiscoveredArtifact {
        artifact: artifact.def.clone(),
        discovered_at: now,
    });
    info!(
        artifact = %artifact.def.id,
        value = artifact.def.value,
        total = ledger.total_resources,
        "artifact collected"
    );
}

/// Currency value of one cargo item under the given settlement formula.
pub fn cargo_value(kind: ResourceKind, mode: SettleMode, constants: &Constants) -> u64 {
    match (kind, mode) {
        (ResourceKind::Common, _) => constants.common_value,
        (ResourceKind::Rare, SettleMode::Return) => constants.return_rare_value,
        (ResourceKind::Rare, SettleMode::Dock) => constants.dock_rare_value,
    }
}

/// Convert the hold into currency, empty it, and refuel. Returns the value added.
pub fn settle_cargo(
    craft: &mut Craft,
    ledger: &mut Ledger,
    mode: SettleMode,
    constants: &Constants,
) -> u64 {
    let value: u64 = craft
        .cargo
        .iter()
        .map(|kind| cargo_value(*kind, mode, constants))
        .sum();
    ledger.total_resources += value;
    craft.cargo.clear();
    craft.fuel = craft.max_fuel;
    value
}

/// Start a scanner pulse at the craft. Rejected while one is running or when
/// the fuel cost can't be paid.
pub fn activate_scanner(
    craft: &mut Craft,
    scanner: &mut Option<ScanPulse>,
    constants: &Constants,
) -> Result<(), ExpeditionError> {
    if scanner.is_some() {
        return Err(ExpeditionError::ScanInProgress);
    }
    if craft.fuel < constants.scan_fuel_cost {
        return Err(ExpeditionError::InsufficientFuel {
            required: constants.scan_fuel_cost,
            available: craft.fuel,
        });
    }
    craft.fuel -= constants.scan_fuel_cost;
    *scanner = Some(ScanPulse {
        origin: craft.position,
        radius: 0.0,
        lifetime: constants.scan_lifetime_ticks,
        max_lifetime: constants.scan_lifetime_ticks,
    });
    Ok(())
}

#[derive(Debug, Default)]
pub struct ScanStep {
    /// Indices into the artifact list that flipped to discovered this tick.
    pub discovered: Vec<usize>,
    pub expired: bool,
}

/// Grow the pulse, age it, and reveal artifacts it now covers. Distance is
/// measured from the craft, so the pulse follows the ship.
pub fn advance_scanner(
    scanner: &mut Option<ScanPulse>,
    craft: &Craft,
    artifacts: &mut [FieldArtifact],
) -> ScanStep {
    let mut step = ScanStep::default();
    let Some(pulse) = scanner.as_mut() else {
        return step;
    };

    pulse.origin = craft.position;
    pulse.radius = (pulse.radius + craft.scanner_speed).min(craft.scanner_range);
    pulse.lifetime = pulse.lifetime.saturating_sub(1);

    for (index, artifact) in artifacts.iter_mut().enumerate() {
        if !artifact.discovered && artifact.position.distance(craft.position) <= pulse.radius {
            artifact.discovered = true;
            step.discovered.push(index);
        }
    }

    if pulse.lifetime == 0 {
        *scanner = None;
        step.expired = true;
    }
    step
}
