//! Randomized lattice sampling for room positions.

use rand::Rng;
use std::collections::HashSet;

use crate::config::GridConfig;
use crate::error::{GenerationError, Result};
use crate::model::Cell;

/// Lower bound on the random fill budget, however small the lattice.
const MIN_FILL_ATTEMPTS: usize = 1000;

/// Produces a set of unique lattice cells dense enough to hold a floor.
#[derive(Debug, Clone)]
pub struct GridSampler {
    pub half_extent: i32,
    pub min_rooms: usize,
    pub keep_probability: f64,
}

impl From<&GridConfig> for GridSampler {
    fn from(config: &GridConfig) -> Self {
        Self {
            half_extent: config.half_extent,
            min_rooms: config.min_rooms,
            keep_probability: config.keep_probability,
        }
    }
}

impl GridSampler {
    /// Number of cells in `[-half_extent, half_extent)²`.
    pub fn capacity(&self) -> usize {
        let side = (self.half_extent.max(0) as usize) * 2;
        side * side
    }

    /// Keep each lattice cell with `keep_probability`, then top up with
    /// uniform random cells until at least `min_rooms` are present.
    ///
    /// Order is lattice scan order followed by fill order, so the result is
    /// reproducible for a given RNG state.
    pub fn sample(&self, rng: &mut impl Rng) -> Result<Vec<Cell>> {
        let capacity = self.capacity();
        if self.min_rooms > capacity {
            return Err(GenerationError::InsufficientSpace {
                requested: self.min_rooms,
                capacity,
            });
        }

        let g = self.half_extent.max(0);
        let p = self.keep_probability.clamp(0.0, 1.0);
        let mut seen: HashSet<Cell> = HashSet::with_capacity(capacity);
        let mut cells = Vec::with_capacity(capacity);

        for x in -g..g {
            for y in -g..g {
                if rng.gen_bool(p) {
                    seen.insert((x, y));
                    cells.push((x, y));
                }
            }
        }

        let max_attempts = (capacity * 64).max(MIN_FILL_ATTEMPTS);
        let mut attempts = 0;
        while cells.len() < self.min_rooms {
            if attempts >= max_attempts {
                log::warn!(
                    "grid fill gave up after {} attempts at {}/{} cells",
                    attempts,
                    cells.len(),
                    self.min_rooms
                );
                return Err(GenerationError::InsufficientSpace {
                    requested: self.min_rooms,
                    capacity,
                });
            }
            attempts += 1;
            let cell = (rng.gen_range(-g..g), rng.gen_range(-g..g));
            if seen.insert(cell) {
                cells.push(cell);
            }
        }

        Ok(cells)
    }
}
