use thiserror::Error;

use crate::{Mode, ModuleKey};

/// Every way a mutating operation can be turned down. A rejected operation
/// leaves state exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpeditionError {
    #[error("insufficient funds: need {cost}, have {balance}")]
    InsufficientFunds { cost: u64, balance: u64 },
    #[error("insufficient fuel: need {required:.1}, have {available:.1}")]
    InsufficientFuel { required: f64, available: f64 },
    #[error("invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),
    #[error("a scan is already in progress")]
    ScanInProgress,
    #[error("only allowed in {expected:?} mode")]
    WrongMode { expected: Mode },
    #[error("no decision is pending")]
    NoPendingDecision,
    #[error("waiting for a pending decision")]
    DecisionPending,
    #[error("unknown module '{0}'")]
    UnknownModule(ModuleKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("cell is outside the grid")]
    OutOfBounds,
    #[error("cell is occupied")]
    Occupied,
    #[error("cell has no occupied neighbor")]
    NotAdjacent,
    #[error("module is locked")]
    Locked,
    #[error("module is already built")]
    AlreadyBuilt,
}
