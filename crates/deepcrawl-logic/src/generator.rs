//! Full dungeon generation run.
//!
//! Pipeline per floor:
//!   1. look up the floor row and theme
//!   2. assemble         -- sample cells, place special rooms, theme, allocate territory
//!   3. persist rooms    -- in fixed-size batches, collecting ids
//!   4. connect          -- cardinal adjacency, connectivity repair, dedup
//!   5. persist edges    -- in fixed-size batches
//!
//! A failure inside one floor is logged with its stage and recorded in the
//! report; the loop moves on to the next floor. Only setup failures (reading
//! floors, clearing old data) abort the run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashMap;

use crate::assembler::{connect_rooms, FloorAssembler};
use crate::catalog::ThemeCatalog;
use crate::config::GeneratorConfig;
use crate::connectivity::{ConnectivityRepairStrategy, NearestNeighborRepair};
use crate::error::{GenerationError, Result, Stage, StoreError};
use crate::model::{Faction, Floor, PersistedRoom, RoomKind};
use crate::store::DungeonStore;
use crate::territory::{ContiguousGrowth, TerritoryAllocationStrategy};

/// What one successfully generated floor contains.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloorStats {
    pub rooms: usize,
    pub stairs: usize,
    pub connections: usize,
    pub bridges: usize,
    pub secret_bridges: usize,
    pub factions: usize,
    pub claimed: usize,
    pub unclaimed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FloorOutcome {
    Generated(FloorStats),
    Skipped { reason: String },
    /// `rooms_left` counts this floor's rooms already in the store when the
    /// failure hit. They stay behind, possibly with no connections.
    Failed {
        stage: Stage,
        error: String,
        rooms_left: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorReport {
    pub floor_number: u32,
    pub outcome: FloorOutcome,
}

/// Per-floor outcomes of a run. Partial success is expected and visible here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    pub floors: Vec<FloorReport>,
}

impl GenerationReport {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, FloorOutcome::Generated(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FloorOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FloorOutcome::Failed { .. }))
    }

    /// True when every requested floor was generated.
    pub fn is_complete(&self) -> bool {
        self.generated() == self.floors.len()
    }

    pub fn total_rooms(&self) -> usize {
        self.floors
            .iter()
            .filter_map(|f| match &f.outcome {
                FloorOutcome::Generated(stats) => Some(stats.rooms),
                _ => None,
            })
            .sum()
    }

    pub fn floor(&self, floor_number: u32) -> Option<&FloorOutcome> {
        self.floors
            .iter()
            .find(|f| f.floor_number == floor_number)
            .map(|f| &f.outcome)
    }

    fn count(&self, pred: impl Fn(&FloorOutcome) -> bool) -> usize {
        self.floors.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Independent RNG stream per floor, so skipping or failing one floor
/// never shifts another floor's layout.
pub fn floor_rng(seed: u64, floor_number: u32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ (floor_number as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

pub struct DungeonGenerator<S: DungeonStore> {
    store: S,
    config: GeneratorConfig,
    catalog: ThemeCatalog,
    territory: Box<dyn TerritoryAllocationStrategy>,
    repair: Box<dyn ConnectivityRepairStrategy>,
}

impl<S: DungeonStore> DungeonGenerator<S> {
    /// Generator with the built-in theme catalog and default strategies.
    pub fn new(store: S, config: GeneratorConfig) -> Result<Self> {
        Ok(Self {
            store,
            config,
            catalog: ThemeCatalog::builtin()?,
            territory: Box::new(ContiguousGrowth),
            repair: Box::new(NearestNeighborRepair),
        })
    }

    pub fn with_catalog(mut self, catalog: ThemeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_territory_strategy(
        mut self,
        strategy: Box<dyn TerritoryAllocationStrategy>,
    ) -> Self {
        self.territory = strategy;
        self
    }

    pub fn with_repair_strategy(mut self, strategy: Box<dyn ConnectivityRepairStrategy>) -> Self {
        self.repair = strategy;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Read factions from the store, then rebuild the whole dungeon.
    pub fn regenerate(&mut self) -> Result<GenerationReport> {
        let factions = self
            .store
            .get_factions()
            .map_err(|source| GenerationError::FatalSetupFailure {
                action: "read factions",
                source,
            })?;
        self.generate_full_dungeon(&factions)
    }

    /// Clear all rooms and connections and generate floors `1..=floor_count`.
    ///
    /// Returns `Err` only for setup failures. Per-floor problems are in the
    /// report. A floor that fails after some room batches were inserted is
    /// not rolled back: its rows remain until the next full rebuild, and the
    /// `Failed` outcome says how many.
    ///
    /// The deepest floor that both exists in the store and lies within
    /// `floor_count` is the final floor and gets no stairs.
    pub fn generate_full_dungeon(&mut self, factions: &[Faction]) -> Result<GenerationReport> {
        let floors = self
            .store
            .get_floors()
            .map_err(|source| GenerationError::FatalSetupFailure {
                action: "read floors",
                source,
            })?;
        self.store
            .clear_dungeon_data()
            .map_err(|source| GenerationError::FatalSetupFailure {
                action: "clear dungeon data",
                source,
            })?;

        let by_number: HashMap<u32, Floor> =
            floors.iter().map(|f| (f.floor_number, *f)).collect();
        let last = self.config.floor_count;
        let deepest = by_number
            .keys()
            .copied()
            .filter(|&n| (1..=last).contains(&n))
            .max()
            .unwrap_or(last);
        if deepest < last {
            log::warn!(
                "only {} of {} floors exist in the store; floor {} is the last",
                by_number.len(),
                last,
                deepest
            );
        }
        log::info!(
            "Generating dungeon: {} floors, {} factions, seed {}",
            last,
            factions.len(),
            self.config.seed
        );

        let mut report = GenerationReport::default();
        for floor_number in 1..=last {
            let outcome = match by_number.get(&floor_number) {
                None => {
                    let err = GenerationError::CatalogMissing {
                        floor_number,
                        what: "floor row",
                    };
                    log::warn!("floor {}: skipped: {}", floor_number, err);
                    FloorOutcome::Skipped {
                        reason: err.to_string(),
                    }
                }
                Some(&floor) => self.run_floor(floor, factions, floor_number == deepest),
            };
            report.floors.push(FloorReport {
                floor_number,
                outcome,
            });
        }

        if report.is_complete() {
            log::info!(
                "Dungeon generated: {} floors, {} rooms",
                report.generated(),
                report.total_rooms()
            );
        } else {
            log::warn!(
                "Dungeon partially generated: {}/{} floors ({} skipped, {} failed)",
                report.generated(),
                report.floors.len(),
                report.skipped(),
                report.failed()
            );
        }
        Ok(report)
    }

    /// Generate one floor and turn the result into a report outcome.
    fn run_floor(&mut self, floor: Floor, factions: &[Faction], is_final: bool) -> FloorOutcome {
        let floor_number = floor.floor_number;
        let mut persisted = Vec::new();
        match self.generate_floor(floor, factions, is_final, &mut persisted) {
            Ok(stats) => {
                log::info!(
                    "floor {}: {} rooms, {} connections ({} bridged, {} secret), {} factions",
                    floor_number,
                    stats.rooms,
                    stats.connections,
                    stats.bridges,
                    stats.secret_bridges,
                    stats.factions
                );
                FloorOutcome::Generated(stats)
            }
            Err(err) => {
                log::error!(
                    "floor {}: failed during {}: {}",
                    floor_number,
                    err.stage(),
                    err
                );
                if !persisted.is_empty() {
                    log::warn!(
                        "floor {}: {} rooms left in the store without connections",
                        floor_number,
                        persisted.len()
                    );
                }
                FloorOutcome::Failed {
                    stage: err.stage(),
                    error: err.to_string(),
                    rooms_left: persisted.len(),
                }
            }
        }
    }

    fn generate_floor(
        &mut self,
        floor: Floor,
        factions: &[Faction],
        is_final: bool,
        persisted: &mut Vec<PersistedRoom>,
    ) -> Result<FloorStats> {
        let theme = self
            .catalog
            .theme_for(floor.floor_number)
            .ok_or(GenerationError::CatalogMissing {
                floor_number: floor.floor_number,
                what: "floor theme",
            })?;

        let mut rng = floor_rng(self.config.seed, floor.floor_number);
        let assembler = FloorAssembler::new(&self.config, self.territory.as_ref());
        let plan = assembler.assemble(floor, theme, factions, is_final, &mut rng)?;

        persisted.reserve(plan.rooms.len());
        for batch in plan.rooms.chunks(self.config.batches.rooms.max(1)) {
            let ids = self.store.insert_rooms(batch).map_err(|source| {
                GenerationError::PersistenceFailure {
                    stage: Stage::PersistRooms,
                    source,
                }
            })?;
            let returned = ids.len();
            persisted.extend(ids);
            if returned != batch.len() {
                return Err(GenerationError::PersistenceFailure {
                    stage: Stage::PersistRooms,
                    source: StoreError::LengthMismatch {
                        expected: batch.len(),
                        returned,
                    },
                });
            }
        }

        let entrance = persisted
            .iter()
            .find(|r| r.placement_id == plan.entrance().placement_id)
            .map(|r| r.id)
            .ok_or(GenerationError::PersistenceFailure {
                stage: Stage::Connectivity,
                source: StoreError::LengthMismatch {
                    expected: plan.rooms.len(),
                    returned: persisted.len(),
                },
            })?;
        let connections = connect_rooms(persisted, entrance, self.repair.as_ref());

        for batch in connections.edges.chunks(self.config.batches.connections.max(1)) {
            self.store.insert_connections(batch).map_err(|source| {
                GenerationError::PersistenceFailure {
                    stage: Stage::PersistConnections,
                    source,
                }
            })?;
        }

        Ok(FloorStats {
            rooms: plan.rooms.len(),
            stairs: plan.count_kind(RoomKind::Stairs),
            connections: connections.edges.len(),
            bridges: connections.bridges,
            secret_bridges: connections.secret_bridges,
            factions: plan.assignment.regions.len(),
            claimed: plan.assignment.claimed_count(),
            unclaimed: plan.assignment.unclaimed.len(),
        })
    }
}
