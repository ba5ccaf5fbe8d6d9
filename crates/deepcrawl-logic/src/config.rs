//! Generator configuration.
//!
//! Every knob has a default matching the live game's tuning, so
//! `GeneratorConfig::default()` is a complete config. All structs accept
//! partial JSON (`#[serde(default)]`), letting a config file override only
//! what it cares about.

use serde::{Deserialize, Serialize};

/// Top-level settings for a full dungeon run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Floors are generated for numbers `1..=floor_count`; the last one has no stairs.
    pub floor_count: u32,
    /// Base RNG seed. Each floor derives its own stream from this.
    pub seed: u64,
    pub grid: GridConfig,
    pub placement: PlacementConfig,
    pub territory: TerritoryConfig,
    pub batches: BatchConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            floor_count: 10,
            seed: 42,
            grid: GridConfig::default(),
            placement: PlacementConfig::default(),
            territory: TerritoryConfig::default(),
            batches: BatchConfig::default(),
        }
    }
}

/// Lattice sampling for room positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Lattice spans `[-half_extent, half_extent)` on both axes.
    pub half_extent: i32,
    pub min_rooms: usize,
    /// Probability of keeping each lattice cell in the first pass.
    pub keep_probability: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            half_extent: 10,
            min_rooms: 120,
            keep_probability: 0.55,
        }
    }
}

/// Special room placement and room flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Staircases per floor (the final floor gets none).
    pub staircases: usize,
    /// Rejection-sampling budget per staircase.
    pub max_attempts: u32,
    pub loot_chance: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            staircases: 3,
            max_attempts: 1000,
            loot_chance: 0.3,
        }
    }
}

/// How many factions a floor hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionCountPolicy {
    /// `ceil(claimable after reservation / rooms_per_faction)`
    Proportional,
    /// `floor(claimable room count / rooms_per_faction)`; set `rooms_per_faction`
    /// to 120 for the sparse legacy tuning.
    Density,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryConfig {
    /// Share of claimable rooms held back from every faction, in `[0, 1]`.
    pub unclaimed_percent: f64,
    pub min_factions: usize,
    pub max_factions: usize,
    pub rooms_per_faction: usize,
    pub faction_count_policy: FactionCountPolicy,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            unclaimed_percent: 0.2,
            min_factions: 2,
            max_factions: 6,
            rooms_per_faction: 25,
            faction_count_policy: FactionCountPolicy::Proportional,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub rooms: usize,
    pub connections: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            rooms: 50,
            connections: 100,
        }
    }
}
