//! Procedural dungeon generation for deepcrawl.
//!
//! Builds each floor's room graph, guarantees every room is reachable from
//! the entrance, and partitions rooms among competing factions. The crate
//! knows nothing about the database behind it: storage is reached through
//! the [`store::DungeonStore`] trait, and everything else is plain data in,
//! plain data out.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assembler`] | Per-floor placement of entrance, stairs and themed rooms; faction theming |
//! | [`catalog`] | Floor themes and weighted room-type sampling |
//! | [`config`] | Generator settings with serde-loadable defaults |
//! | [`connectivity`] | Cardinal adjacency, reachability, nearest-neighbour repair |
//! | [`error`] | Error taxonomy and pipeline stages |
//! | [`generator`] | Full-dungeon run with per-floor failure isolation and reporting |
//! | [`grid`] | Randomized lattice sampling for room positions |
//! | [`model`] | Rooms, connections, floors, factions |
//! | [`store`] | Storage collaborator trait and in-memory store |
//! | [`territory`] | Influence-proportional contiguous territory growth |
//!
//! # Example
//!
//! ```rust,no_run
//! use deepcrawl_logic::config::GeneratorConfig;
//! use deepcrawl_logic::generator::DungeonGenerator;
//! use deepcrawl_logic::store::MemoryStore;
//!
//! let store = MemoryStore::with_floor_count(10, vec![]);
//! let mut generator = DungeonGenerator::new(store, GeneratorConfig::default())?;
//! let report = generator.regenerate()?;
//! assert!(report.is_complete());
//! # Ok::<(), deepcrawl_logic::error::GenerationError>(())
//! ```

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod generator;
pub mod grid;
pub mod model;
pub mod store;
pub mod territory;
