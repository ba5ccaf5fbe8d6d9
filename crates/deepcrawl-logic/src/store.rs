//! Storage collaborator interface and an in-memory implementation.
//!
//! The generator never names a database. Anything that can hand back floor
//! rows, accept room/connection batches and return room ids in input order
//! can back it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::model::{ConnectionSpec, Faction, Floor, PersistedRoom, RoomSpec};

pub trait DungeonStore {
    fn get_floors(&mut self) -> Result<Vec<Floor>, StoreError>;

    /// Delete every room and connection before a rebuild.
    fn clear_dungeon_data(&mut self) -> Result<(), StoreError>;

    /// Insert a batch of rooms, returning their ids in input order.
    fn insert_rooms(&mut self, batch: &[RoomSpec]) -> Result<Vec<PersistedRoom>, StoreError>;

    fn insert_connections(&mut self, batch: &[ConnectionSpec]) -> Result<(), StoreError>;

    fn get_factions(&mut self) -> Result<Vec<Faction>, StoreError>;
}

/// A persisted room row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRoom {
    pub id: u64,
    #[serde(flatten)]
    pub room: RoomSpec,
}

/// Everything a [`MemoryStore`] holds, in a serializable form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DungeonSnapshot {
    pub floors: Vec<Floor>,
    pub factions: Vec<Faction>,
    pub rooms: Vec<StoredRoom>,
    pub connections: Vec<ConnectionSpec>,
}

impl DungeonSnapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn rooms_on_floor(&self, floor_id: u32) -> Vec<&StoredRoom> {
        self.rooms
            .iter()
            .filter(|r| r.room.floor_id == floor_id)
            .collect()
    }

    /// Connections whose origin room is on `floor_id`.
    pub fn connections_on_floor(&self, floor_id: u32) -> Vec<ConnectionSpec> {
        let ids: HashSet<u64> = self.rooms_on_floor(floor_id).iter().map(|r| r.id).collect();
        self.connections
            .iter()
            .filter(|c| ids.contains(&c.from_room_id))
            .copied()
            .collect()
    }
}

/// Scripted failures for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    pub floors_unavailable: bool,
    pub factions_unavailable: bool,
    pub clear_fails: bool,
    /// Reject room batches for this floor id.
    pub rooms_on_floor: Option<u32>,
    /// Reject connection batches touching rooms of this floor id.
    pub connections_on_floor: Option<u32>,
}

/// In-memory store with sequential room ids starting at 1.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    floors: Vec<Floor>,
    factions: Vec<Faction>,
    rooms: Vec<StoredRoom>,
    connections: Vec<ConnectionSpec>,
    room_floor: HashMap<u64, u32>,
    next_room_id: u64,
    failures: FailurePlan,
    room_batch_sizes: Vec<usize>,
    connection_batch_sizes: Vec<usize>,
}

impl MemoryStore {
    pub fn new(floors: Vec<Floor>, factions: Vec<Faction>) -> Self {
        Self {
            floors,
            factions,
            next_room_id: 1,
            ..Default::default()
        }
    }

    /// `count` floors numbered from 1, with ids `100 + number`.
    pub fn with_floor_count(count: u32, factions: Vec<Faction>) -> Self {
        let floors = (1..=count)
            .map(|n| Floor {
                id: 100 + n,
                floor_number: n,
            })
            .collect();
        Self::new(floors, factions)
    }

    pub fn with_failures(mut self, failures: FailurePlan) -> Self {
        self.failures = failures;
        self
    }

    pub fn rooms(&self) -> &[StoredRoom] {
        &self.rooms
    }

    pub fn connections(&self) -> &[ConnectionSpec] {
        &self.connections
    }

    pub fn room_batch_sizes(&self) -> &[usize] {
        &self.room_batch_sizes
    }

    pub fn connection_batch_sizes(&self) -> &[usize] {
        &self.connection_batch_sizes
    }

    pub fn snapshot(&self) -> DungeonSnapshot {
        DungeonSnapshot {
            floors: self.floors.clone(),
            factions: self.factions.clone(),
            rooms: self.rooms.clone(),
            connections: self.connections.clone(),
        }
    }
}

impl DungeonStore for MemoryStore {
    fn get_floors(&mut self) -> Result<Vec<Floor>, StoreError> {
        if self.failures.floors_unavailable {
            return Err(StoreError::Unavailable("floors table".into()));
        }
        Ok(self.floors.clone())
    }

    fn clear_dungeon_data(&mut self) -> Result<(), StoreError> {
        if self.failures.clear_fails {
            return Err(StoreError::Unavailable("clear rejected".into()));
        }
        self.rooms.clear();
        self.connections.clear();
        self.room_floor.clear();
        self.room_batch_sizes.clear();
        self.connection_batch_sizes.clear();
        Ok(())
    }

    fn insert_rooms(&mut self, batch: &[RoomSpec]) -> Result<Vec<PersistedRoom>, StoreError> {
        if let Some(floor_id) = self.failures.rooms_on_floor {
            if batch.iter().any(|r| r.floor_id == floor_id) {
                return Err(StoreError::Rejected {
                    table: "rooms",
                    reason: format!("floor {} is read-only", floor_id),
                });
            }
        }

        self.room_batch_sizes.push(batch.len());
        let mut persisted = Vec::with_capacity(batch.len());
        for spec in batch {
            let id = self.next_room_id.max(1);
            self.next_room_id = id + 1;
            self.room_floor.insert(id, spec.floor_id);
            self.rooms.push(StoredRoom {
                id,
                room: spec.clone(),
            });
            persisted.push(PersistedRoom {
                id,
                floor_id: spec.floor_id,
                x: spec.x,
                y: spec.y,
                placement_id: spec.placement_id,
            });
        }
        Ok(persisted)
    }

    fn insert_connections(&mut self, batch: &[ConnectionSpec]) -> Result<(), StoreError> {
        for c in batch {
            for id in [c.from_room_id, c.to_room_id] {
                let Some(&floor_id) = self.room_floor.get(&id) else {
                    return Err(StoreError::Rejected {
                        table: "connections",
                        reason: format!("unknown room {}", id),
                    });
                };
                if self.failures.connections_on_floor == Some(floor_id) {
                    return Err(StoreError::Rejected {
                        table: "connections",
                        reason: format!("floor {} is read-only", floor_id),
                    });
                }
            }
        }
        self.connection_batch_sizes.push(batch.len());
        self.connections.extend_from_slice(batch);
        Ok(())
    }

    fn get_factions(&mut self) -> Result<Vec<Faction>, StoreError> {
        if self.failures.factions_unavailable {
            return Err(StoreError::Unavailable("factions table".into()));
        }
        Ok(self.factions.clone())
    }
}
