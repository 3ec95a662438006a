#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cost-weighted grid searches driven by a [`PotentialField`].
//!
//! Both searches read the field as the cost of entering a cell. Field values
//! may be negative, so neither search guarantees the true minimum-cost
//! answer; they return the answer their expansion order reaches first.

mod frontier;

use std::collections::{BTreeSet, HashMap, HashSet};

use frontier::Frontier;
use restraint_core::{CellCoord, PotentialField, WorldView};

/// Cheapest reachable cell from `source` for which `predicate` holds.
///
/// Cells are marked visited when first enqueued and never re-costed, and the
/// predicate is evaluated when a cell leaves the frontier. Returns `None` when
/// the source is a wall or the reachable region holds no qualifying cell.
pub fn nearest_cell<W, P>(
    world: &W,
    costs: &PotentialField,
    source: CellCoord,
    mut predicate: P,
) -> Option<CellCoord>
where
    W: WorldView + ?Sized,
    P: FnMut(CellCoord) -> bool,
{
    if !world.is_within_bounds(source) || world.is_wall(source) {
        return None;
    }

    let mut frontier = Frontier::default();
    let mut visited = HashSet::from([source]);
    let mut accumulated = HashMap::from([(source, 0.0_f64)]);
    frontier.push(source, 0.0);

    while let Some(cursor) = frontier.pop() {
        if predicate(cursor) {
            return Some(cursor);
        }

        let spent = accumulated.get(&cursor).copied().unwrap_or_default();
        for neighbour in world.neighbours(cursor).cells() {
            if world.is_wall(neighbour) || !visited.insert(neighbour) {
                continue;
            }
            let cost = spent + costs.value(neighbour);
            let _ = accumulated.insert(neighbour, cost);
            frontier.push(neighbour, cost);
        }
    }

    None
}

/// Cheapest reachable tile a unit standing on `source` could still capture.
///
/// A tile qualifies when it is known to the world, not friendly, not
/// permanently owned and not listed in `excluded`.
pub fn nearest_capturable<W>(
    world: &W,
    costs: &PotentialField,
    source: CellCoord,
    excluded: &BTreeSet<CellCoord>,
) -> Option<CellCoord>
where
    W: WorldView + ?Sized,
{
    nearest_cell(world, costs, source, |cell| {
        !excluded.contains(&cell)
            && world
                .tile_at(cell)
                .map_or(false, |tile| !tile.is_friendly() && !tile.is_permanently_owned())
    })
}

/// Cheapest path from `start` to `end`, both inclusive, never entering a cell
/// of `avoid`.
///
/// Cells are ordered by accumulated cost plus the obstacle-free Manhattan
/// distance to `end`. Open cells are relaxed and re-enqueued whenever a
/// strictly cheaper route is found, but a cell is expanded at most once, which
/// keeps the search finite when the field holds negative values.
///
/// Returns `None` when either endpoint is a wall or `end` is avoided, and
/// `[end]` when both endpoints coincide.
pub fn cheapest_path<W>(
    world: &W,
    costs: &PotentialField,
    start: CellCoord,
    end: CellCoord,
    avoid: Option<&BTreeSet<CellCoord>>,
) -> Option<Vec<CellCoord>>
where
    W: WorldView + ?Sized,
{
    if !world.is_within_bounds(start) || !world.is_within_bounds(end) {
        return None;
    }
    if world.is_wall(start) || world.is_wall(end) {
        return None;
    }
    let avoided = |cell: CellCoord| avoid.map_or(false, |set| set.contains(&cell));
    if avoided(end) {
        return None;
    }
    if start == end {
        return Some(vec![end]);
    }

    let dimensions = world.dimensions();
    let topology = world.topology();
    let heuristic = |cell: CellCoord| f64::from(topology.distance(dimensions, cell, end));

    let mut frontier = Frontier::default();
    let mut closed: HashSet<CellCoord> = HashSet::new();
    let mut accumulated = HashMap::from([(start, 0.0_f64)]);
    let mut parents: HashMap<CellCoord, CellCoord> = HashMap::new();
    frontier.push(start, heuristic(start));

    while let Some(current) = frontier.pop() {
        if !closed.insert(current) {
            continue;
        }
        if current == end {
            return Some(reconstruct(&parents, start, end));
        }

        let spent = accumulated.get(&current).copied().unwrap_or_default();
        for neighbour in world.neighbours(current).cells() {
            if world.is_wall(neighbour) || avoided(neighbour) || closed.contains(&neighbour) {
                continue;
            }
            let cost = spent + costs.value(neighbour);
            let improved = accumulated
                .get(&neighbour)
                .map_or(true, |known| cost < *known);
            if !improved {
                continue;
            }
            let _ = accumulated.insert(neighbour, cost);
            let _ = parents.insert(neighbour, current);
            frontier.push(neighbour, cost + heuristic(neighbour));
        }
    }

    None
}

fn reconstruct(
    parents: &HashMap<CellCoord, CellCoord>,
    start: CellCoord,
    end: CellCoord,
) -> Vec<CellCoord> {
    let mut path = vec![end];
    let mut cursor = end;
    while cursor != start {
        let Some(parent) = parents.get(&cursor).copied() else {
            break;
        };
        path.push(parent);
        cursor = parent;
    }
    path.reverse();
    path
}
