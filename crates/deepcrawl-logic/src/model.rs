//! Plain data shared by the generator and its storage collaborator.
//!
//! Everything here is built fresh for one floor run and handed to the store
//! as immutable batches. No database types leak in.

use serde::{Deserialize, Serialize};

/// Integer lattice position of a room on its floor.
pub type Cell = (i32, i32);

/// One dungeon level as stored in the floor catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub id: u32,
    pub floor_number: u32,
}

/// A faction competing for territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Relative claim strength. Zero excludes the faction from allocation.
    pub influence: f32,
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Entrance,
    Stairs,
    Normal,
}

/// A room before it has a database id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub floor_id: u32,
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub is_safe: bool,
    pub has_loot: bool,
    pub faction_id: Option<u32>,
    /// Index of this room in its floor's room vector.
    pub placement_id: usize,
}

impl RoomSpec {
    pub fn cell(&self) -> Cell {
        (self.x, self.y)
    }

    /// Entrance, stairs and safe rooms never belong to a faction.
    pub fn is_claimable(&self) -> bool {
        self.kind == RoomKind::Normal && !self.is_safe
    }
}

/// A room after the store assigned it an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRoom {
    pub id: u64,
    pub floor_id: u32,
    pub x: i32,
    pub y: i32,
    pub placement_id: usize,
}

impl PersistedRoom {
    pub fn cell(&self) -> Cell {
        (self.x, self.y)
    }
}

/// Edge label. Cardinal directions follow `north = +y`, `east = +x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Secret,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit lattice offset for a cardinal direction; `None` for `Secret`.
    pub fn offset(self) -> Option<Cell> {
        match self {
            Direction::North => Some((0, 1)),
            Direction::South => Some((0, -1)),
            Direction::East => Some((1, 0)),
            Direction::West => Some((-1, 0)),
            Direction::Secret => None,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Secret => Direction::Secret,
        }
    }

    /// Direction of a single unit step from `from` to `to`, or `Secret`
    /// when the two cells are not axis-adjacent.
    pub fn between(from: Cell, to: Cell) -> Direction {
        match (to.0 - from.0, to.1 - from.1) {
            (0, 1) => Direction::North,
            (0, -1) => Direction::South,
            (1, 0) => Direction::East,
            (-1, 0) => Direction::West,
            _ => Direction::Secret,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub from_room_id: u64,
    pub to_room_id: u64,
    pub direction: Direction,
}

impl ConnectionSpec {
    pub fn new(from_room_id: u64, to_room_id: u64, direction: Direction) -> Self {
        Self {
            from_room_id,
            to_room_id,
            direction,
        }
    }

    /// The same corridor walked the other way.
    pub fn reversed(&self) -> Self {
        Self {
            from_room_id: self.to_room_id,
            to_room_id: self.from_room_id,
            direction: self.direction.opposite(),
        }
    }
}

pub fn manhattan(a: Cell, b: Cell) -> u32 {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}
