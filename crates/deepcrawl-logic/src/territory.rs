//! Faction territory allocation.
//!
//! Claimable rooms are partitioned among a random subset of factions,
//! proportional to influence. Regions grow outward from a seed room one
//! ring at a time, all factions in lockstep, so territories read as
//! contiguous areas and interleave instead of one faction swallowing the
//! map. A configurable share of rooms is held back as unclaimed first.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{FactionCountPolicy, TerritoryConfig};
use crate::model::{Cell, Direction, Faction};

/// A room eligible for faction claims, identified by its placement index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimableRoom {
    pub placement_id: usize,
    pub cell: Cell,
}

/// Who owns which rooms after allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TerritoryAssignment {
    /// Faction id → placement ids. Only factions that received rooms appear.
    pub regions: BTreeMap<u32, BTreeSet<usize>>,
    pub unclaimed: BTreeSet<usize>,
    /// Per-faction quota before growth, in selection order.
    pub quotas: Vec<(u32, usize)>,
    /// Rooms held back before any faction was considered.
    pub reserved: usize,
}

impl TerritoryAssignment {
    /// Everything unclaimed, for floors with no factions in play.
    pub fn all_unclaimed(rooms: &[ClaimableRoom]) -> Self {
        Self {
            unclaimed: rooms.iter().map(|r| r.placement_id).collect(),
            ..Default::default()
        }
    }

    pub fn owner_of(&self, placement_id: usize) -> Option<u32> {
        self.regions
            .iter()
            .find(|(_, ids)| ids.contains(&placement_id))
            .map(|(&faction_id, _)| faction_id)
    }

    /// placement id → faction id for every claimed room.
    pub fn owners(&self) -> HashMap<usize, u32> {
        self.regions
            .iter()
            .flat_map(|(&faction_id, ids)| ids.iter().map(move |&id| (id, faction_id)))
            .collect()
    }

    pub fn claimed_count(&self) -> usize {
        self.regions.values().map(BTreeSet::len).sum()
    }

    pub fn total(&self) -> usize {
        self.claimed_count() + self.unclaimed.len()
    }
}

/// Partitions claimable rooms among factions.
pub trait TerritoryAllocationStrategy {
    fn allocate(
        &self,
        rooms: &[ClaimableRoom],
        factions: &[Faction],
        config: &TerritoryConfig,
        rng: &mut dyn RngCore,
    ) -> TerritoryAssignment;
}

/// Seeded ring-by-ring region growth over 4-neighbour adjacency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContiguousGrowth;

impl TerritoryAllocationStrategy for ContiguousGrowth {
    fn allocate(
        &self,
        rooms: &[ClaimableRoom],
        factions: &[Faction],
        config: &TerritoryConfig,
        rng: &mut dyn RngCore,
    ) -> TerritoryAssignment {
        let mut order: Vec<usize> = (0..rooms.len()).collect();
        order.shuffle(rng);

        let reserve = reserved_count(rooms.len(), config.unclaimed_percent);
        let (held_back, pool) = order.split_at(reserve);

        let eligible: Vec<&Faction> = factions
            .iter()
            .filter(|f| f.influence.is_finite() && f.influence > 0.0)
            .collect();
        let count = faction_count(config, pool.len(), rooms.len(), eligible.len());

        let mut assignment = TerritoryAssignment {
            reserved: reserve,
            unclaimed: held_back.iter().map(|&i| rooms[i].placement_id).collect(),
            ..Default::default()
        };
        if count == 0 {
            assignment
                .unclaimed
                .extend(pool.iter().map(|&i| rooms[i].placement_id));
            return assignment;
        }

        let selected: Vec<&Faction> = eligible.choose_multiple(rng, count).copied().collect();
        let influences: Vec<f64> = selected.iter().map(|f| f.influence as f64).collect();
        let quotas = proportional_quotas(&influences, pool.len());
        assignment.quotas = selected.iter().map(|f| f.id).zip(quotas.iter().copied()).collect();

        let owner = grow_regions(rooms, pool, &quotas);

        for &i in pool {
            let placement_id = rooms[i].placement_id;
            match owner.get(&i) {
                Some(&slot) => {
                    assignment
                        .regions
                        .entry(selected[slot].id)
                        .or_default()
                        .insert(placement_id);
                }
                None => {
                    assignment.unclaimed.insert(placement_id);
                }
            }
        }

        log::debug!(
            "territory: {} rooms, {} reserved, {} factions, {} claimed",
            rooms.len(),
            reserve,
            selected.len(),
            assignment.claimed_count()
        );
        assignment
    }
}

/// Grow every faction from a seed taken off the shuffled pool.
/// Returns room index → faction slot for every claimed room.
fn grow_regions(
    rooms: &[ClaimableRoom],
    pool: &[usize],
    quotas: &[usize],
) -> HashMap<usize, usize> {
    let by_cell: HashMap<Cell, usize> = pool.iter().map(|&i| (rooms[i].cell, i)).collect();
    let mut owner: HashMap<usize, usize> = HashMap::with_capacity(pool.len());
    let mut claimed = vec![0usize; quotas.len()];
    let mut frontiers: Vec<Vec<usize>> = vec![Vec::new(); quotas.len()];

    let mut seeds = pool.iter().copied();
    for (slot, &quota) in quotas.iter().enumerate() {
        if quota == 0 {
            continue;
        }
        if let Some(seed) = seeds.next() {
            owner.insert(seed, slot);
            claimed[slot] = 1;
            frontiers[slot].push(seed);
        }
    }

    loop {
        let mut progress = false;
        for slot in 0..quotas.len() {
            if claimed[slot] >= quotas[slot] {
                frontiers[slot].clear();
                continue;
            }
            let mut next_ring = Vec::new();
            'ring: for &room in &frontiers[slot] {
                let (x, y) = rooms[room].cell;
                for dir in Direction::CARDINAL {
                    let Some((dx, dy)) = dir.offset() else {
                        continue;
                    };
                    let Some(&neighbor) = by_cell.get(&(x + dx, y + dy)) else {
                        continue;
                    };
                    if owner.contains_key(&neighbor) {
                        continue;
                    }
                    owner.insert(neighbor, slot);
                    claimed[slot] += 1;
                    next_ring.push(neighbor);
                    progress = true;
                    if claimed[slot] >= quotas[slot] {
                        break 'ring;
                    }
                }
            }
            frontiers[slot] = next_ring;
        }
        if !progress {
            break;
        }
    }
    owner
}

/// `floor(percent × total)` with the percent clamped to `[0, 1]`.
pub fn reserved_count(total: usize, unclaimed_percent: f64) -> usize {
    let p = if unclaimed_percent.is_finite() {
        unclaimed_percent.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((p * total as f64).floor() as usize).min(total)
}

/// How many factions a floor hosts.
///
/// The policy's target is clamped to `[min_factions, max_factions]`, and
/// never exceeds the eligible factions or the rooms left to hand out.
pub fn faction_count(
    config: &TerritoryConfig,
    remaining: usize,
    claimable: usize,
    eligible: usize,
) -> usize {
    if eligible == 0 || remaining == 0 {
        return 0;
    }
    let per = config.rooms_per_faction.max(1);
    let wanted = match config.faction_count_policy {
        FactionCountPolicy::Proportional => remaining.div_ceil(per),
        FactionCountPolicy::Density => claimable / per,
    };
    let upper = config.max_factions.min(eligible).min(remaining);
    let lower = config.min_factions.min(upper);
    wanted.clamp(lower, upper)
}

/// Split `total` proportionally to `weights`, summing to `total` exactly.
///
/// Largest-remainder rounding: everyone gets the floor of their exact
/// share, leftover units go to the largest fractional parts (earlier
/// entries win ties). Non-positive weight sums split evenly.
pub fn proportional_quotas(weights: &[f64], total: usize) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    let exact: Vec<f64> = if sum > 0.0 && sum.is_finite() {
        weights
            .iter()
            .map(|w| w.max(0.0) / sum * total as f64)
            .collect()
    } else {
        vec![total as f64 / weights.len() as f64; weights.len()]
    };

    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut assigned: usize = quotas.iter().sum();

    let mut by_remainder: Vec<usize> = (0..weights.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut cursor = 0;
    while assigned < total {
        quotas[by_remainder[cursor % by_remainder.len()]] += 1;
        assigned += 1;
        cursor += 1;
    }
    while assigned > total {
        if let Some(largest) = (0..quotas.len()).max_by_key(|&i| quotas[i]) {
            quotas[largest] -= 1;
            assigned -= 1;
        }
    }
    quotas
}
