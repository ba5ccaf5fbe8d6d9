//! Per-floor assembly: room placement, theming and territory.
//!
//! `FloorAssembler::assemble` is everything that happens before rooms have
//! database ids. `connect_rooms` is everything after. The generator sits in
//! between and talks to the store.

use rand::Rng;
use std::collections::HashSet;

use crate::catalog::FloorTheme;
use crate::config::GeneratorConfig;
use crate::connectivity::{adjacency_edges, dedupe_edges, ConnectivityRepairStrategy};
use crate::error::{GenerationError, Result};
use crate::grid::GridSampler;
use crate::model::{Cell, ConnectionSpec, Faction, Floor, PersistedRoom, RoomKind, RoomSpec};
use crate::territory::{ClaimableRoom, TerritoryAllocationStrategy, TerritoryAssignment};

pub const ORIGIN: Cell = (0, 0);
const NEUTRAL_SUFFIX: &str = " No faction holds this place.";

/// A floor's rooms, themed and allocated, ready to persist.
#[derive(Debug, Clone)]
pub struct FloorPlan {
    pub floor: Floor,
    pub theme: String,
    /// Indexed by placement id. Index 0 is always the entrance at the origin.
    pub rooms: Vec<RoomSpec>,
    pub assignment: TerritoryAssignment,
}

impl FloorPlan {
    pub fn entrance(&self) -> &RoomSpec {
        &self.rooms[0]
    }

    pub fn count_kind(&self, kind: RoomKind) -> usize {
        self.rooms.iter().filter(|r| r.kind == kind).count()
    }

    pub fn claimable_count(&self) -> usize {
        self.rooms.iter().filter(|r| r.is_claimable()).count()
    }

    /// Stand-in persisted rooms with ids `placement_id + 1`, for running
    /// the connection pass without a store.
    pub fn provisional_rooms(&self) -> Vec<PersistedRoom> {
        self.rooms
            .iter()
            .map(|r| PersistedRoom {
                id: r.placement_id as u64 + 1,
                floor_id: r.floor_id,
                x: r.x,
                y: r.y,
                placement_id: r.placement_id,
            })
            .collect()
    }
}

pub struct FloorAssembler<'a> {
    config: &'a GeneratorConfig,
    territory: &'a dyn TerritoryAllocationStrategy,
}

impl<'a> FloorAssembler<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        territory: &'a dyn TerritoryAllocationStrategy,
    ) -> Self {
        Self { config, territory }
    }

    /// Sample, place, theme and allocate one floor.
    pub fn assemble<R: Rng>(
        &self,
        floor: Floor,
        theme: &FloorTheme,
        factions: &[Faction],
        is_final: bool,
        rng: &mut R,
    ) -> Result<FloorPlan> {
        if theme.room_types.is_empty() {
            return Err(GenerationError::CatalogMissing {
                floor_number: floor.floor_number,
                what: "room types",
            });
        }

        let mut cells = GridSampler::from(&self.config.grid).sample(rng)?;
        match cells.iter().position(|&c| c == ORIGIN) {
            Some(i) => {
                cells.remove(i);
            }
            None => log::debug!("floor {}: origin not sampled, inserting", floor.floor_number),
        }
        cells.insert(0, ORIGIN);

        let staircases = if is_final {
            0
        } else {
            self.config.placement.staircases
        };
        let stairs = self.pick_staircases(&cells, staircases, rng)?;

        let mut rooms = Vec::with_capacity(cells.len());
        for (placement_id, &(x, y)) in cells.iter().enumerate() {
            let room = if placement_id == 0 {
                RoomSpec {
                    floor_id: floor.id,
                    x,
                    y,
                    name: "Entrance".to_string(),
                    description: theme.description.clone(),
                    kind: RoomKind::Entrance,
                    is_safe: floor.floor_number == 1,
                    has_loot: false,
                    faction_id: None,
                    placement_id,
                }
            } else if stairs.contains(&placement_id) {
                RoomSpec {
                    floor_id: floor.id,
                    x,
                    y,
                    name: "Staircase Down".to_string(),
                    description: format!(
                        "Worn steps spiral down toward floor {}.",
                        floor.floor_number + 1
                    ),
                    kind: RoomKind::Stairs,
                    is_safe: false,
                    has_loot: false,
                    faction_id: None,
                    placement_id,
                }
            } else {
                let room_type = theme.sample(rng).ok_or(GenerationError::CatalogMissing {
                    floor_number: floor.floor_number,
                    what: "room types",
                })?;
                RoomSpec {
                    floor_id: floor.id,
                    x,
                    y,
                    name: room_type.name.clone(),
                    description: room_type.description.clone(),
                    kind: RoomKind::Normal,
                    is_safe: room_type.safe,
                    has_loot: rng.gen_bool(self.config.placement.loot_chance.clamp(0.0, 1.0)),
                    faction_id: None,
                    placement_id,
                }
            };
            rooms.push(room);
        }

        let claimable: Vec<ClaimableRoom> = rooms
            .iter()
            .filter(|r| r.is_claimable())
            .map(|r| ClaimableRoom {
                placement_id: r.placement_id,
                cell: r.cell(),
            })
            .collect();
        let assignment = if claimable.is_empty() {
            TerritoryAssignment::default()
        } else {
            self.territory
                .allocate(&claimable, factions, &self.config.territory, rng)
        };
        apply_territory(&mut rooms, &assignment, factions);

        log::debug!(
            "floor {}: {} rooms, {} stairs, {} claimable, {} factions",
            floor.floor_number,
            rooms.len(),
            stairs.len(),
            claimable.len(),
            assignment.regions.len()
        );

        Ok(FloorPlan {
            floor,
            theme: theme.name.clone(),
            rooms,
            assignment,
        })
    }

    /// Rejection-sample distinct non-origin cell indices for staircases.
    fn pick_staircases<R: Rng>(
        &self,
        cells: &[Cell],
        count: usize,
        rng: &mut R,
    ) -> Result<HashSet<usize>> {
        let max_attempts = self.config.placement.max_attempts;
        let mut picked = HashSet::with_capacity(count);
        for _ in 0..count {
            let mut attempts = 0;
            loop {
                if attempts >= max_attempts || cells.len() < 2 {
                    return Err(GenerationError::PlacementExhausted {
                        what: "staircase",
                        attempts,
                    });
                }
                attempts += 1;
                if picked.insert(rng.gen_range(1..cells.len())) {
                    break;
                }
            }
        }
        Ok(picked)
    }
}

/// Rename faction rooms and tag unclaimed claimable rooms as neutral.
fn apply_territory(rooms: &mut [RoomSpec], assignment: &TerritoryAssignment, factions: &[Faction]) {
    let owners = assignment.owners();
    for room in rooms.iter_mut().filter(|r| r.is_claimable()) {
        let faction = owners
            .get(&room.placement_id)
            .and_then(|id| factions.iter().find(|f| f.id == *id));
        match faction {
            Some(f) => {
                room.name = format!("{} {}", f.name, room.name);
                room.description = format!("{} Banners of {} hang here.", room.description, f.name);
                room.faction_id = Some(f.id);
            }
            None => room.description.push_str(NEUTRAL_SUFFIX),
        }
    }
}

/// Edges and repair statistics for one floor.
#[derive(Debug, Clone, Default)]
pub struct FloorConnections {
    pub edges: Vec<ConnectionSpec>,
    pub bridges: usize,
    pub secret_bridges: usize,
}

/// Build cardinal adjacency, repair connectivity, and deduplicate.
pub fn connect_rooms(
    rooms: &[PersistedRoom],
    entrance_id: u64,
    repair: &dyn ConnectivityRepairStrategy,
) -> FloorConnections {
    let outcome = repair.repair(rooms, adjacency_edges(rooms), entrance_id);
    let bridges = outcome.bridges();
    let secret_bridges = outcome.secret_bridges();
    FloorConnections {
        edges: dedupe_edges(outcome.edges),
        bridges,
        secret_bridges,
    }
}
