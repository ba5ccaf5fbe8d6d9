//! Deepcrawl Headless Generation Harness
//!
//! Builds a full dungeon against the in-memory store and validates the
//! result floor by floor. No database, no server.
//!
//! Usage:
//!   cargo run -p deepcrawl-simtest
//!   cargo run -p deepcrawl-simtest -- --seed 7 --floors 3 --verbose
//!   cargo run -p deepcrawl-simtest -- --config gen.json --out dungeon.json

use clap::Parser;
use deepcrawl_logic::catalog::ThemeCatalog;
use deepcrawl_logic::config::GeneratorConfig;
use deepcrawl_logic::connectivity::is_connected;
use deepcrawl_logic::generator::{DungeonGenerator, FloorOutcome, GenerationReport};
use deepcrawl_logic::model::{Faction, PersistedRoom, RoomKind};
use deepcrawl_logic::store::{DungeonSnapshot, MemoryStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ── Sample factions (same JSON the tests use) ───────────────────────────
const FACTIONS_JSON: &str = include_str!("../../../data/factions.json");

#[derive(Debug, Parser)]
#[command(name = "deepcrawl-simtest", about = "Generate a dungeon in memory and validate it")]
struct Args {
    /// Override the base RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of floors
    #[arg(long)]
    floors: Option<u32>,

    /// Generator config as JSON; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the generated dungeon snapshot as JSON
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print passing checks and debug logs
    #[arg(long)]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!("=== Deepcrawl Generation Harness ===\n");

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            log::error!("config error: {}", e);
            std::process::exit(2);
        }
    };

    let mut results = Vec::new();

    // 1. Theme catalog
    results.extend(validate_catalog());

    // 2. Faction data
    let factions = match serde_json::from_str::<Vec<Faction>>(FACTIONS_JSON) {
        Ok(f) => f,
        Err(e) => {
            results.push(TestResult {
                name: "factions_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            Vec::new()
        }
    };
    results.extend(validate_factions(&factions));

    // 3. Full dungeon build
    log::info!(
        "building {} floors with seed {} ({} factions)",
        config.floor_count,
        config.seed,
        factions.len()
    );
    let built = build(&config, &factions);
    match &built {
        Ok((report, snapshot)) => {
            results.extend(validate_report(&config, report));
            results.extend(validate_floors(&config, snapshot));

            // 4. Determinism: same seed, same dungeon
            results.extend(validate_determinism(&config, &factions, snapshot));

            if let Some(path) = &args.out {
                results.push(write_snapshot(path, snapshot));
            }
        }
        Err(e) => results.push(TestResult {
            name: "generation_setup".into(),
            passed: false,
            detail: e.clone(),
        }),
    }

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<GeneratorConfig, String> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {}", path.display(), e))?;
            serde_json::from_str(&text).map_err(|e| format!("parsing {}: {}", path.display(), e))?
        }
        None => GeneratorConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(floors) = args.floors {
        config.floor_count = floors;
    }
    Ok(config)
}

fn build(
    config: &GeneratorConfig,
    factions: &[Faction],
) -> Result<(GenerationReport, DungeonSnapshot), String> {
    let store = MemoryStore::with_floor_count(config.floor_count, factions.to_vec());
    let mut generator = DungeonGenerator::new(store, config.clone()).map_err(|e| e.to_string())?;
    let report = generator.regenerate().map_err(|e| e.to_string())?;
    Ok((report, generator.store().snapshot()))
}

// ── 1. Theme Catalog ────────────────────────────────────────────────────

fn validate_catalog() -> Vec<TestResult> {
    println!("--- Theme Catalog ---");
    let mut results = Vec::new();

    let catalog = match ThemeCatalog::builtin() {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult {
                name: "catalog_parse".into(),
                passed: false,
                detail: format!("{}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "catalog_not_empty".into(),
        passed: !catalog.is_empty(),
        detail: format!("{} themes loaded", catalog.len()),
    });

    let unweighted: Vec<_> = catalog
        .themes()
        .iter()
        .filter(|t| t.total_weight() <= 0.0)
        .map(|t| t.name.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_positive_weights".into(),
        passed: unweighted.is_empty(),
        detail: if unweighted.is_empty() {
            "every theme has a positive total weight".into()
        } else {
            format!("zero-weight themes: {:?}", unweighted)
        },
    });

    let no_claimable: Vec<_> = catalog
        .themes()
        .iter()
        .filter(|t| t.room_types.iter().all(|r| r.safe))
        .map(|t| t.name.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_claimable_types".into(),
        passed: no_claimable.is_empty(),
        detail: if no_claimable.is_empty() {
            "every theme offers claimable rooms".into()
        } else {
            format!("themes with only safe rooms: {:?}", no_claimable)
        },
    });

    results
}

// ── 2. Factions ─────────────────────────────────────────────────────────

fn validate_factions(factions: &[Faction]) -> Vec<TestResult> {
    println!("--- Factions ---");
    let ids: HashSet<u32> = factions.iter().map(|f| f.id).collect();
    let contenders = factions.iter().filter(|f| f.influence > 0.0).count();
    vec![
        TestResult {
            name: "factions_unique_ids".into(),
            passed: ids.len() == factions.len(),
            detail: format!("{} factions, {} distinct ids", factions.len(), ids.len()),
        },
        TestResult {
            name: "factions_contenders".into(),
            passed: contenders >= 2,
            detail: format!("{} factions with positive influence", contenders),
        },
    ]
}

// ── 3. Generation ───────────────────────────────────────────────────────

fn validate_report(config: &GeneratorConfig, report: &GenerationReport) -> Vec<TestResult> {
    println!("--- Generation Report ---");
    let mut results = Vec::new();

    results.push(TestResult {
        name: "report_floor_count".into(),
        passed: report.floors.len() == config.floor_count as usize,
        detail: format!("{} floors reported", report.floors.len()),
    });

    for floor in &report.floors {
        let (passed, detail) = match &floor.outcome {
            FloorOutcome::Generated(stats) => (
                true,
                format!(
                    "{} rooms, {} stairs, {} connections, {} factions ({} claimed / {} unclaimed)",
                    stats.rooms,
                    stats.stairs,
                    stats.connections,
                    stats.factions,
                    stats.claimed,
                    stats.unclaimed
                ),
            ),
            FloorOutcome::Skipped { reason } => (false, format!("skipped: {}", reason)),
            FloorOutcome::Failed {
                stage,
                error,
                rooms_left,
            } => (
                false,
                format!("{} failed: {} ({} rooms left behind)", stage, error, rooms_left),
            ),
        };
        results.push(TestResult {
            name: format!("floor_{}_generated", floor.floor_number),
            passed,
            detail,
        });
    }

    results
}

fn validate_floors(config: &GeneratorConfig, snapshot: &DungeonSnapshot) -> Vec<TestResult> {
    println!("--- Floor Invariants ---");
    let mut results = Vec::new();

    for floor in &snapshot.floors {
        let n = floor.floor_number;
        let rooms = snapshot.rooms_on_floor(floor.id);
        let edges = snapshot.connections_on_floor(floor.id);

        results.push(TestResult {
            name: format!("floor_{}_min_rooms", n),
            passed: rooms.len() >= config.grid.min_rooms,
            detail: format!("{} rooms (min {})", rooms.len(), config.grid.min_rooms),
        });

        let cells: HashSet<(i32, i32)> = rooms.iter().map(|r| (r.room.x, r.room.y)).collect();
        results.push(TestResult {
            name: format!("floor_{}_unique_cells", n),
            passed: cells.len() == rooms.len(),
            detail: format!("{} rooms on {} cells", rooms.len(), cells.len()),
        });

        let entrances: Vec<_> = rooms
            .iter()
            .filter(|r| r.room.kind == RoomKind::Entrance)
            .collect();
        let at_origin =
            entrances.len() == 1 && entrances[0].room.x == 0 && entrances[0].room.y == 0;
        results.push(TestResult {
            name: format!("floor_{}_entrance", n),
            passed: at_origin,
            detail: format!("{} entrance(s), origin: {}", entrances.len(), at_origin),
        });

        let stairs = rooms
            .iter()
            .filter(|r| r.room.kind == RoomKind::Stairs)
            .count();
        let expected = if n == config.floor_count {
            0
        } else {
            config.placement.staircases
        };
        results.push(TestResult {
            name: format!("floor_{}_stairs", n),
            passed: stairs == expected,
            detail: format!("{} staircases (expected {})", stairs, expected),
        });

        let bad_claims = rooms
            .iter()
            .filter(|r| r.room.faction_id.is_some() && !r.room.is_claimable())
            .count();
        results.push(TestResult {
            name: format!("floor_{}_special_rooms_unclaimed", n),
            passed: bad_claims == 0,
            detail: format!("{} special rooms carry a faction", bad_claims),
        });

        let distinct: HashSet<_> = edges.iter().collect();
        results.push(TestResult {
            name: format!("floor_{}_no_duplicate_edges", n),
            passed: distinct.len() == edges.len(),
            detail: format!("{} edges, {} distinct", edges.len(), distinct.len()),
        });

        let persisted: Vec<PersistedRoom> = rooms
            .iter()
            .map(|r| PersistedRoom {
                id: r.id,
                floor_id: r.room.floor_id,
                x: r.room.x,
                y: r.room.y,
                placement_id: r.room.placement_id,
            })
            .collect();
        let connected = entrances
            .first()
            .map(|e| is_connected(&persisted, &edges, e.id))
            .unwrap_or(false);
        results.push(TestResult {
            name: format!("floor_{}_connected", n),
            passed: connected,
            detail: if connected {
                "every room reachable from the entrance".into()
            } else {
                "some rooms unreachable".into()
            },
        });
    }

    results
}

// ── 4. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(
    config: &GeneratorConfig,
    factions: &[Faction],
    first: &DungeonSnapshot,
) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let passed = matches!(build(config, factions), Ok((_, second)) if &second == first);
    vec![TestResult {
        name: "same_seed_same_dungeon".into(),
        passed,
        detail: format!("seed {} rebuilt identically: {}", config.seed, passed),
    }]
}

fn write_snapshot(path: &Path, snapshot: &DungeonSnapshot) -> TestResult {
    let written = snapshot
        .to_json_pretty()
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
    match &written {
        Ok(()) => log::info!("snapshot written to {}", path.display()),
        Err(e) => log::error!("could not write snapshot to {}: {}", path.display(), e),
    }
    TestResult {
        name: "snapshot_written".into(),
        passed: written.is_ok(),
        detail: match written {
            Ok(()) => format!("{} rooms written to {}", snapshot.rooms.len(), path.display()),
            Err(e) => format!("{}: {}", path.display(), e),
        },
    }
}
