//! Integration tests for the full dungeon generation pipeline.
//!
//! Exercises: floor lookup → GridSampler → FloorAssembler → TerritoryAllocator
//! → room persistence → ConnectivityBuilder → connection persistence
//!
//! All tests run against the in-memory store.

use deepcrawl_logic::config::{GeneratorConfig, GridConfig, PlacementConfig};
use deepcrawl_logic::connectivity::{
    is_connected, ConnectivityRepairStrategy, NearestNeighborRepair, RepairOutcome,
};
use deepcrawl_logic::error::{GenerationError, Stage};
use deepcrawl_logic::generator::{DungeonGenerator, FloorOutcome, GenerationReport};
use deepcrawl_logic::model::{
    ConnectionSpec, Direction, Faction, Floor, PersistedRoom, RoomKind,
};
use deepcrawl_logic::store::{DungeonSnapshot, FailurePlan, MemoryStore};
use proptest::prelude::*;
use std::collections::HashSet;

// ── Helpers ────────────────────────────────────────────────────────────

const FACTIONS_JSON: &str = include_str!("../../../data/factions.json");

fn factions() -> Vec<Faction> {
    serde_json::from_str(FACTIONS_JSON).expect("factions.json parses")
}

fn config(floor_count: u32, seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        floor_count,
        seed,
        grid: GridConfig {
            half_extent: 6,
            min_rooms: 60,
            keep_probability: 0.55,
        },
        ..Default::default()
    }
}

fn run(config: GeneratorConfig, store: MemoryStore) -> (GenerationReport, DungeonSnapshot) {
    let mut generator = DungeonGenerator::new(store, config).expect("builtin catalog");
    let report = generator
        .generate_full_dungeon(&factions())
        .expect("setup succeeds");
    (report, generator.store().snapshot())
}

fn floor_rooms(snapshot: &DungeonSnapshot, floor_id: u32) -> Vec<PersistedRoom> {
    snapshot
        .rooms_on_floor(floor_id)
        .into_iter()
        .map(|r| PersistedRoom {
            id: r.id,
            floor_id: r.room.floor_id,
            x: r.room.x,
            y: r.room.y,
            placement_id: r.room.placement_id,
        })
        .collect()
}

fn entrance_id(snapshot: &DungeonSnapshot, floor_id: u32) -> u64 {
    snapshot
        .rooms_on_floor(floor_id)
        .into_iter()
        .find(|r| r.room.kind == RoomKind::Entrance)
        .map(|r| r.id)
        .expect("floor has an entrance")
}

fn assert_floor_connected(snapshot: &DungeonSnapshot, floor_id: u32) {
    let rooms = floor_rooms(snapshot, floor_id);
    let edges = snapshot.connections_on_floor(floor_id);
    assert!(
        is_connected(&rooms, &edges, entrance_id(snapshot, floor_id)),
        "floor {} is not fully connected",
        floor_id
    );
}

// ── Scenario ───────────────────────────────────────────────────────────

#[test]
fn small_grid_scenario() {
    // 8×8 lattice, at least 50 rooms, one staircase.
    let config = GeneratorConfig {
        floor_count: 2,
        seed: 7,
        grid: GridConfig {
            half_extent: 4,
            min_rooms: 50,
            keep_probability: 0.55,
        },
        placement: PlacementConfig {
            staircases: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let (report, snapshot) = run(config, MemoryStore::with_floor_count(2, vec![]));
    assert!(report.is_complete());

    let rooms = snapshot.rooms_on_floor(101);
    assert!(rooms.len() >= 50, "only {} rooms", rooms.len());
    assert!(rooms.len() <= 64);
    let entrances: Vec<_> = rooms
        .iter()
        .filter(|r| r.room.kind == RoomKind::Entrance)
        .collect();
    assert_eq!(entrances.len(), 1);
    assert_eq!((entrances[0].room.x, entrances[0].room.y), (0, 0));
    assert_eq!(
        rooms.iter().filter(|r| r.room.kind == RoomKind::Stairs).count(),
        1
    );
    assert_floor_connected(&snapshot, 101);

    // Final floor has no stairs.
    assert_eq!(
        snapshot
            .rooms_on_floor(102)
            .iter()
            .filter(|r| r.room.kind == RoomKind::Stairs)
            .count(),
        0
    );
}

#[test]
fn every_floor_has_unique_cells_and_origin_entrance() {
    let (report, snapshot) = run(config(4, 99), MemoryStore::with_floor_count(4, factions()));
    assert_eq!(report.generated(), 4);
    for floor in &snapshot.floors {
        let rooms = snapshot.rooms_on_floor(floor.id);
        let cells: HashSet<(i32, i32)> = rooms.iter().map(|r| (r.room.x, r.room.y)).collect();
        assert_eq!(cells.len(), rooms.len(), "duplicate cell on floor {}", floor.id);
        assert!(rooms
            .iter()
            .any(|r| r.room.kind == RoomKind::Entrance && r.room.x == 0 && r.room.y == 0));
        assert_floor_connected(&snapshot, floor.id);
    }
}

#[test]
fn staircases_on_all_but_last_floor() {
    let (_, snapshot) = run(config(3, 5), MemoryStore::with_floor_count(3, vec![]));
    let stairs = |floor_id| {
        snapshot
            .rooms_on_floor(floor_id)
            .iter()
            .filter(|r| r.room.kind == RoomKind::Stairs)
            .count()
    };
    assert_eq!(stairs(101), 3);
    assert_eq!(stairs(102), 3);
    assert_eq!(stairs(103), 0);
}

#[test]
fn only_first_floor_entrance_is_safe() {
    let (_, snapshot) = run(config(3, 5), MemoryStore::with_floor_count(3, vec![]));
    for floor in &snapshot.floors {
        let entrance = snapshot
            .rooms_on_floor(floor.id)
            .into_iter()
            .find(|r| r.room.kind == RoomKind::Entrance)
            .unwrap();
        assert_eq!(entrance.room.is_safe, floor.floor_number == 1);
    }
}

// ── Territory ──────────────────────────────────────────────────────────

#[test]
fn special_rooms_never_carry_a_faction() {
    for seed in 0..8 {
        let (_, snapshot) = run(config(2, seed), MemoryStore::with_floor_count(2, vec![]));
        for stored in &snapshot.rooms {
            let r = &stored.room;
            if r.kind != RoomKind::Normal || r.is_safe {
                assert_eq!(r.faction_id, None, "seed {}: {:?} claimed", seed, r.kind);
            }
            assert!(!r.has_loot || r.kind == RoomKind::Normal);
        }
    }
}

#[test]
fn zero_influence_faction_never_claims() {
    let (_, snapshot) = run(config(5, 3), MemoryStore::with_floor_count(5, vec![]));
    let silent = factions().into_iter().find(|f| f.influence == 0.0).unwrap();
    assert!(snapshot.rooms.iter().all(|r| r.room.faction_id != Some(silent.id)));
    assert!(snapshot.rooms.iter().any(|r| r.room.faction_id.is_some()));
}

#[test]
fn claimed_rooms_are_renamed_for_their_faction() {
    let all = factions();
    let (_, snapshot) = run(config(1, 11), MemoryStore::with_floor_count(1, vec![]));
    for stored in &snapshot.rooms {
        if let Some(id) = stored.room.faction_id {
            let faction = all.iter().find(|f| f.id == id).unwrap();
            assert!(stored.room.name.starts_with(&faction.name));
        }
    }
}

// ── Failure isolation ──────────────────────────────────────────────────

#[test]
fn room_insert_failure_only_fails_that_floor() {
    let store = MemoryStore::with_floor_count(4, vec![]).with_failures(FailurePlan {
        rooms_on_floor: Some(103),
        ..Default::default()
    });
    let (report, snapshot) = run(config(4, 1), store);

    assert_eq!(report.generated(), 3);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_complete());
    assert!(matches!(
        report.floor(3),
        Some(FloorOutcome::Failed {
            stage: Stage::PersistRooms,
            ..
        })
    ));
    assert!(snapshot.rooms_on_floor(103).is_empty());
    assert_floor_connected(&snapshot, 104);
}

#[test]
fn connection_insert_failure_is_reported() {
    let store = MemoryStore::with_floor_count(2, vec![]).with_failures(FailurePlan {
        connections_on_floor: Some(101),
        ..Default::default()
    });
    let (report, _) = run(config(2, 1), store);
    assert!(matches!(
        report.floor(1),
        Some(FloorOutcome::Failed {
            stage: Stage::PersistConnections,
            ..
        })
    ));
    assert!(matches!(report.floor(2), Some(FloorOutcome::Generated(_))));
}

#[test]
fn missing_floor_row_is_skipped() {
    let floors = vec![
        Floor { id: 1, floor_number: 1 },
        Floor { id: 3, floor_number: 3 },
    ];
    let (report, _) = run(config(3, 2), MemoryStore::new(floors, vec![]));
    assert_eq!(report.generated(), 2);
    assert_eq!(report.skipped(), 1);
    assert!(matches!(report.floor(2), Some(FloorOutcome::Skipped { .. })));
}

#[test]
fn unreadable_floor_catalog_aborts_run() {
    let store = MemoryStore::with_floor_count(2, vec![]).with_failures(FailurePlan {
        floors_unavailable: true,
        ..Default::default()
    });
    let mut generator = DungeonGenerator::new(store, config(2, 1)).unwrap();
    let err = generator.generate_full_dungeon(&factions()).unwrap_err();
    assert!(matches!(err, GenerationError::FatalSetupFailure { .. }));
    assert!(!err.is_per_floor());
}

#[test]
fn oversized_floor_fails_with_insufficient_space() {
    let mut cfg = config(1, 1);
    cfg.grid.min_rooms = 500;
    let (report, _) = run(cfg, MemoryStore::with_floor_count(1, vec![]));
    assert!(matches!(
        report.floor(1),
        Some(FloorOutcome::Failed {
            stage: Stage::Sampling,
            ..
        })
    ));
}

// ── Determinism ────────────────────────────────────────────────────────

#[test]
fn same_seed_same_dungeon() {
    let (_, a) = run(config(3, 1234), MemoryStore::with_floor_count(3, vec![]));
    let (_, b) = run(config(3, 1234), MemoryStore::with_floor_count(3, vec![]));
    assert_eq!(a, b);
}

#[test]
fn floor_layout_independent_of_other_floors() {
    let layout = |snapshot: &DungeonSnapshot| -> Vec<(i32, i32, String)> {
        snapshot
            .rooms_on_floor(102)
            .iter()
            .map(|r| (r.room.x, r.room.y, r.room.name.clone()))
            .collect()
    };
    let (_, healthy) = run(config(3, 77), MemoryStore::with_floor_count(3, vec![]));
    let broken_store = MemoryStore::with_floor_count(3, vec![]).with_failures(FailurePlan {
        rooms_on_floor: Some(101),
        ..Default::default()
    });
    let (_, broken) = run(config(3, 77), broken_store);
    assert_eq!(layout(&healthy), layout(&broken));
}

// ── Deduplication ──────────────────────────────────────────────────────

/// Nearest-neighbour repair plus a corridor the level designer added twice.
struct DuplicatingRepair;

impl ConnectivityRepairStrategy for DuplicatingRepair {
    fn repair(
        &self,
        rooms: &[PersistedRoom],
        mut edges: Vec<ConnectionSpec>,
        entrance: u64,
    ) -> RepairOutcome {
        let dup = ConnectionSpec::new(rooms[0].id, rooms[1].id, Direction::North);
        edges.push(dup);
        edges.push(dup);
        NearestNeighborRepair.repair(rooms, edges, entrance)
    }
}

#[test]
fn duplicate_edges_persist_once() {
    let store = MemoryStore::with_floor_count(1, vec![]);
    let mut generator = DungeonGenerator::new(store, config(1, 9))
        .unwrap()
        .with_repair_strategy(Box::new(DuplicatingRepair));
    generator.generate_full_dungeon(&[]).unwrap();

    let target = ConnectionSpec::new(1, 2, Direction::North);
    let count = generator
        .store()
        .connections()
        .iter()
        .filter(|c| **c == target)
        .count();
    assert_eq!(count, 1);

    let unique: HashSet<_> = generator.store().connections().iter().collect();
    assert_eq!(unique.len(), generator.store().connections().len());
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_every_floor_fully_connected(seed in any::<u64>(), half_extent in 3i32..8) {
        let mut cfg = config(2, seed);
        cfg.grid.half_extent = half_extent;
        cfg.grid.min_rooms = (half_extent * half_extent) as usize;
        let (report, snapshot) = run(cfg, MemoryStore::with_floor_count(2, vec![]));
        prop_assert!(report.is_complete());
        for floor in &snapshot.floors {
            let rooms = floor_rooms(&snapshot, floor.id);
            let edges = snapshot.connections_on_floor(floor.id);
            prop_assert!(is_connected(&rooms, &edges, entrance_id(&snapshot, floor.id)));
        }
    }
}
