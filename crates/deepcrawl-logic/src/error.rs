//! Error taxonomy for dungeon generation.
//!
//! Errors raised inside one floor's pipeline are caught by the floor loop in
//! [`crate::generator`] and recorded in the run report. Only setup errors
//! (before the loop starts) abort a whole run.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure reported by a [`crate::store::DungeonStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("insert into {table} rejected: {reason}")]
    Rejected { table: &'static str, reason: String },
    #[error("store returned {returned} rows for a batch of {expected}")]
    LengthMismatch { expected: usize, returned: usize },
}

/// Pipeline stage a per-floor error happened in, used for log and report context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lookup,
    Sampling,
    Placement,
    Allocation,
    PersistRooms,
    Connectivity,
    PersistConnections,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lookup => "lookup",
            Stage::Sampling => "sampling",
            Stage::Placement => "placement",
            Stage::Allocation => "allocation",
            Stage::PersistRooms => "persist_rooms",
            Stage::Connectivity => "connectivity",
            Stage::PersistConnections => "persist_connections",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    /// No floor row (or no themed room types) for this floor number.
    #[error("floor {floor_number}: {what} missing from catalog")]
    CatalogMissing {
        floor_number: u32,
        what: &'static str,
    },
    #[error("grid of {capacity} cells cannot hold {requested} rooms")]
    InsufficientSpace { requested: usize, capacity: usize },
    #[error("could not place {what} after {attempts} attempts")]
    PlacementExhausted { what: &'static str, attempts: u32 },
    #[error("persistence failed during {stage}: {source}")]
    PersistenceFailure {
        stage: Stage,
        #[source]
        source: StoreError,
    },
    #[error("setup failed while trying to {action}: {source}")]
    FatalSetupFailure {
        action: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("invalid theme catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

impl GenerationError {
    /// Pipeline stage to attribute this error to in logs and reports.
    pub fn stage(&self) -> Stage {
        match self {
            GenerationError::CatalogMissing { .. } => Stage::Lookup,
            GenerationError::InsufficientSpace { .. } => Stage::Sampling,
            GenerationError::PlacementExhausted { .. } => Stage::Placement,
            GenerationError::PersistenceFailure { stage, .. } => *stage,
            GenerationError::FatalSetupFailure { .. } | GenerationError::Catalog(_) => {
                Stage::Lookup
            }
        }
    }

    /// Whether the floor loop may log this error and move on to the next floor.
    pub fn is_per_floor(&self) -> bool {
        !matches!(
            self,
            GenerationError::FatalSetupFailure { .. } | GenerationError::Catalog(_)
        )
    }
}

pub type Result<T, E = GenerationError> = std::result::Result<T, E>;
