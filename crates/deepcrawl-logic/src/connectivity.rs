//! Room adjacency and connectivity repair.
//!
//! Edges are directional, but every traversal here treats them as
//! undirected: a corridor walked one way can be walked back.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::{manhattan, Cell, ConnectionSpec, Direction, PersistedRoom};

/// Cardinal edges between every pair of rooms at Manhattan distance 1.
///
/// Each adjacent pair yields two edges, one per direction, labelled with
/// the direction of travel.
pub fn adjacency_edges(rooms: &[PersistedRoom]) -> Vec<ConnectionSpec> {
    let by_cell: HashMap<Cell, u64> = rooms.iter().map(|r| (r.cell(), r.id)).collect();
    let mut edges = Vec::new();
    for room in rooms {
        for dir in Direction::CARDINAL {
            let Some((dx, dy)) = dir.offset() else {
                continue;
            };
            if let Some(&neighbor) = by_cell.get(&(room.x + dx, room.y + dy)) {
                edges.push(ConnectionSpec::new(room.id, neighbor, dir));
            }
        }
    }
    edges
}

/// Drop repeated `(from, to, direction)` triples, keeping first occurrences in order.
pub fn dedupe_edges(edges: Vec<ConnectionSpec>) -> Vec<ConnectionSpec> {
    let mut seen = HashSet::with_capacity(edges.len());
    edges.into_iter().filter(|e| seen.insert(*e)).collect()
}

fn undirected_adjacency(edges: &[ConnectionSpec]) -> HashMap<u64, Vec<u64>> {
    let mut adj: HashMap<u64, Vec<u64>> = HashMap::new();
    for e in edges {
        adj.entry(e.from_room_id).or_default().push(e.to_room_id);
        adj.entry(e.to_room_id).or_default().push(e.from_room_id);
    }
    adj
}

/// Flood `start` over `adj`, skipping anything already in `visited`.
/// Newly reached ids are inserted into `visited` and returned.
fn flood(start: u64, adj: &HashMap<u64, Vec<u64>>, visited: &mut HashSet<u64>) -> Vec<u64> {
    let mut reached = Vec::new();
    if !visited.insert(start) {
        return reached;
    }
    reached.push(start);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for &next in adj.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.insert(next) {
                reached.push(next);
                queue.push_back(next);
            }
        }
    }
    reached
}

/// Room ids reachable from `start` treating edges as undirected.
pub fn reachable_from(start: u64, edges: &[ConnectionSpec]) -> HashSet<u64> {
    let adj = undirected_adjacency(edges);
    let mut visited = HashSet::new();
    flood(start, &adj, &mut visited);
    visited
}

/// Whether every room is reachable from `entrance`.
pub fn is_connected(rooms: &[PersistedRoom], edges: &[ConnectionSpec], entrance: u64) -> bool {
    let reached = reachable_from(entrance, edges);
    rooms.iter().all(|r| reached.contains(&r.id))
}

/// Result of a repair pass.
#[derive(Debug, Clone, Default)]
pub struct RepairOutcome {
    /// Input edges followed by the bridging edges.
    pub edges: Vec<ConnectionSpec>,
    /// Bridging edges only, both directions of each pair.
    pub added: Vec<ConnectionSpec>,
}

impl RepairOutcome {
    pub fn bridges(&self) -> usize {
        self.added.len() / 2
    }

    pub fn secret_bridges(&self) -> usize {
        self.added
            .iter()
            .filter(|e| e.direction == Direction::Secret)
            .count()
            / 2
    }
}

/// Makes every room reachable from the entrance.
pub trait ConnectivityRepairStrategy {
    fn repair(
        &self,
        rooms: &[PersistedRoom],
        edges: Vec<ConnectionSpec>,
        entrance: u64,
    ) -> RepairOutcome;
}

/// Joins each stranded component to the closest already-connected room.
///
/// Stranded rooms are visited in room order. For the component containing
/// a stranded room, the member with the smallest Manhattan distance to any
/// connected room is bridged to that room (ties go to the earlier room).
/// Unit-step bridges get the matching cardinal label, anything else is a
/// `secret` passage. The bridged component then counts as connected, so
/// later components can chain off it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborRepair;

impl ConnectivityRepairStrategy for NearestNeighborRepair {
    fn repair(
        &self,
        rooms: &[PersistedRoom],
        mut edges: Vec<ConnectionSpec>,
        entrance: u64,
    ) -> RepairOutcome {
        if !rooms.iter().any(|r| r.id == entrance) {
            log::warn!("entrance room {} not on floor, skipping repair", entrance);
            return RepairOutcome {
                edges,
                added: Vec::new(),
            };
        }

        let adj = undirected_adjacency(&edges);
        let mut visited = HashSet::new();
        flood(entrance, &adj, &mut visited);

        let mut connected: Vec<&PersistedRoom> =
            rooms.iter().filter(|r| visited.contains(&r.id)).collect();
        let mut added = Vec::new();

        for stranded in rooms {
            if visited.contains(&stranded.id) {
                continue;
            }
            let component: HashSet<u64> = flood(stranded.id, &adj, &mut visited)
                .into_iter()
                .collect();
            let members: Vec<&PersistedRoom> = rooms
                .iter()
                .filter(|r| component.contains(&r.id))
                .collect();

            let mut best: Option<(u32, &PersistedRoom, &PersistedRoom)> = None;
            for &member in &members {
                for &target in &connected {
                    let d = manhattan(member.cell(), target.cell());
                    if best.map_or(true, |(bd, _, _)| d < bd) {
                        best = Some((d, member, target));
                    }
                }
            }

            if let Some((distance, from, to)) = best {
                let bridge = ConnectionSpec::new(
                    from.id,
                    to.id,
                    Direction::between(from.cell(), to.cell()),
                );
                log::debug!(
                    "bridging room {} to {} ({:?}, distance {})",
                    from.id,
                    to.id,
                    bridge.direction,
                    distance
                );
                added.push(bridge);
                added.push(bridge.reversed());
            }
            connected.extend(members);
        }

        edges.extend(added.iter().copied());
        RepairOutcome { edges, added }
    }
}
