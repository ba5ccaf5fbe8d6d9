//! Floor themes and weighted room-type sampling.
//!
//! The built-in catalog ships as JSON in `data/floor_themes.json` and is
//! embedded at compile time. Floor 1 uses the first theme; floors deeper
//! than the catalog reuse the last one.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const BUILTIN_THEMES_JSON: &str = include_str!("../../../data/floor_themes.json");

/// A themed template for normal rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomType {
    pub name: String,
    pub description: String,
    /// Relative sampling weight within the theme.
    pub weight: f64,
    /// Sanctuary rooms are marked safe and never claimed by a faction.
    #[serde(default)]
    pub safe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorTheme {
    pub name: String,
    pub description: String,
    pub room_types: Vec<RoomType>,
}

impl FloorTheme {
    pub fn total_weight(&self) -> f64 {
        self.room_types.iter().map(|t| t.weight.max(0.0)).sum()
    }

    /// Weighted draw of one room type. Each call is independent.
    ///
    /// Draws `r` uniformly in `[0, total)` and returns the first type whose
    /// cumulative weight reaches `r`. A zero (or non-finite) total yields
    /// the first entry. Returns `None` only for a theme with no room types.
    pub fn sample(&self, rng: &mut impl Rng) -> Option<&RoomType> {
        let first = self.room_types.first()?;
        let total = self.total_weight();
        if !(total.is_finite() && total > 0.0) {
            return Some(first);
        }

        let r = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for room_type in &self.room_types {
            cumulative += room_type.weight.max(0.0);
            if cumulative >= r && room_type.weight > 0.0 {
                return Some(room_type);
            }
        }
        // Float accumulation can land a hair short of `total`.
        self.room_types.iter().rev().find(|t| t.weight > 0.0)
    }
}

/// Immutable theme list indexed by floor number (1-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeCatalog {
    themes: Vec<FloorTheme>,
}

impl ThemeCatalog {
    pub fn new(themes: Vec<FloorTheme>) -> Self {
        Self { themes }
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_THEMES_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn themes(&self) -> &[FloorTheme] {
        &self.themes
    }

    pub fn theme_for(&self, floor_number: u32) -> Option<&FloorTheme> {
        let index = (floor_number.max(1) - 1) as usize;
        self.themes.get(index).or_else(|| self.themes.last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn room(name: &str, weight: f64) -> RoomType {
        RoomType {
            name: name.to_string(),
            description: String::new(),
            weight,
            safe: false,
        }
    }

    fn theme(weights: &[f64]) -> FloorTheme {
        FloorTheme {
            name: "Test".into(),
            description: String::new(),
            room_types: weights
                .iter()
                .enumerate()
                .map(|(i, w)| room(&format!("t{}", i), *w))
                .collect(),
        }
    }

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = ThemeCatalog::builtin().unwrap();
        assert!(catalog.len() >= 5);
        for t in catalog.themes() {
            assert!(!t.room_types.is_empty(), "theme {} has no rooms", t.name);
            assert!(t.room_types.iter().all(|r| r.weight > 0.0));
        }
    }

    #[test]
    fn test_theme_for_clamps_to_last() {
        let catalog = ThemeCatalog::builtin().unwrap();
        assert_eq!(catalog.theme_for(1).unwrap().name, catalog.themes()[0].name);
        let last = catalog.themes().last().unwrap();
        assert_eq!(catalog.theme_for(999).unwrap().name, last.name);
        assert!(ThemeCatalog::new(vec![]).theme_for(1).is_none());
    }

    #[test]
    fn test_weighted_distribution() {
        let t = theme(&[3.0, 4.0, 3.0, 2.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts = [0usize; 4];
        let draws = 10_000;
        for _ in 0..draws {
            let picked = t.sample(&mut rng).unwrap();
            let idx = t.room_types.iter().position(|r| r.name == picked.name).unwrap();
            counts[idx] += 1;
        }
        let expected = [0.25, 0.333, 0.25, 0.166];
        for (count, want) in counts.iter().zip(expected) {
            let got = *count as f64 / draws as f64;
            assert!(
                (got - want).abs() < 0.05,
                "empirical {:.3} vs expected {:.3}",
                got,
                want
            );
        }
    }

    #[test]
    fn test_zero_total_weight_returns_first() {
        let t = theme(&[0.0, 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(t.sample(&mut rng).unwrap().name, "t0");
        }
    }

    #[test]
    fn test_zero_weight_entries_never_drawn() {
        let t = theme(&[0.0, 5.0, 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            assert_eq!(t.sample(&mut rng).unwrap().name, "t1");
        }
    }

    #[test]
    fn test_empty_theme_samples_nothing() {
        let t = theme(&[]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(t.sample(&mut rng).is_none());
    }

    #[test]
    fn test_safe_flag_defaults_false() {
        let json = r#"[{ "name": "A", "description": "d",
                         "room_types": [{ "name": "x", "description": "y", "weight": 1 }] }]"#;
        let catalog = ThemeCatalog::from_json(json).unwrap();
        assert!(!catalog.themes()[0].room_types[0].safe);
        assert!(ThemeCatalog::from_json("{ not json").is_err());
    }
}
