#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! One-shot planner that tiles the home half of the map with nests.
//!
//! The plan seeds an X of nests on the diagonals of the home spawn, then walks
//! outward breadth-first through the cells strictly closer to the home spawn
//! than to the enemy spawn, greedily adding every cell that keeps clear of the
//! existing nests and their neighbours without sealing off any of its own
//! neighbours.

use std::collections::{BTreeSet, VecDeque};

use restraint_core::{CellCoord, PotentialField, WorldView};
use restraint_system_pathing::cheapest_path;
use tracing::info;

const SEED_OFFSETS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Colonisation layout chosen once per game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestPlan {
    nests: BTreeSet<CellCoord>,
    adjacency: BTreeSet<CellCoord>,
    friendly_spawn: CellCoord,
    enemy_spawn: CellCoord,
    spawn_separation: Option<u32>,
}

impl NestPlan {
    /// Plan without nests, for callers that do not colonise.
    #[must_use]
    pub fn empty(friendly_spawn: CellCoord, enemy_spawn: CellCoord) -> Self {
        Self {
            nests: BTreeSet::new(),
            adjacency: BTreeSet::new(),
            friendly_spawn,
            enemy_spawn,
            spawn_separation: None,
        }
    }

    /// Cells chosen to become nests.
    #[must_use]
    pub fn nests(&self) -> &BTreeSet<CellCoord> {
        &self.nests
    }

    /// Open cells bordering a chosen nest; capturing all of them completes the nests.
    #[must_use]
    pub fn adjacency(&self) -> &BTreeSet<CellCoord> {
        &self.adjacency
    }

    /// Home spawn the plan grows from.
    #[must_use]
    pub const fn friendly_spawn(&self) -> CellCoord {
        self.friendly_spawn
    }

    /// Enemy spawn bounding the planned half of the map.
    #[must_use]
    pub const fn enemy_spawn(&self) -> CellCoord {
        self.enemy_spawn
    }

    /// Steps between the two spawns, `None` when they are disconnected.
    #[must_use]
    pub const fn spawn_separation(&self) -> Option<u32> {
        self.spawn_separation
    }

    fn place(&mut self, nest: CellCoord, surrounding: &BTreeSet<CellCoord>) {
        let home = self.friendly_spawn;
        let _ = self.nests.insert(nest);
        self.adjacency
            .extend(surrounding.iter().copied().filter(|cell| *cell != home));
    }

    fn touches_nest(&self, cell: CellCoord, surrounding: &BTreeSet<CellCoord>) -> bool {
        self.nests.contains(&cell)
            || self.adjacency.contains(&cell)
            || surrounding.iter().any(|neighbour| self.adjacency.contains(neighbour))
    }
}

/// Computes the nest layout for the team the view belongs to.
///
/// An empty seed cluster is not an error; the breadth-first pass still runs
/// and the plan may end up holding no nests at all.
#[must_use]
pub fn plan_nests<W>(world: &W) -> NestPlan
where
    W: WorldView + ?Sized,
{
    let home = world.friendly_spawn();
    let enemy = world.enemy_spawn();
    let mut plan = NestPlan {
        spawn_separation: world.shortest_path_distance(home, enemy),
        ..NestPlan::empty(home, enemy)
    };

    for (columns, rows) in SEED_OFFSETS {
        let Some(seed) = world.topology().step(world.dimensions(), home, columns, rows) else {
            continue;
        };
        if world.is_wall(seed) || plan.nests.contains(&seed) || plan.adjacency.contains(&seed) {
            continue;
        }
        let surrounding = open_neighbours(world, seed);
        plan.place(seed, &surrounding);
    }

    let uniform = PotentialField::default();
    let mut visited: BTreeSet<CellCoord> = plan.nests.clone();
    let _ = visited.insert(home);
    let mut queue = VecDeque::from([home]);

    while let Some(position) = queue.pop_back() {
        let surrounding = open_neighbours(world, position);

        if position != home && !plan.touches_nest(position, &surrounding) {
            let mut avoid = plan.nests.clone();
            let _ = avoid.insert(position);
            let keeps_access = surrounding
                .iter()
                .all(|cell| cheapest_path(world, &uniform, home, *cell, Some(&avoid)).is_some());
            if keeps_access {
                plan.place(position, &surrounding);
            }
        }

        for cell in world.neighbours(position).cells() {
            if world.is_wall(cell) || visited.contains(&cell) {
                continue;
            }
            if closer_to_home(world, cell, home, enemy) {
                let _ = visited.insert(cell);
                queue.push_front(cell);
            }
        }
    }

    info!(
        nests = plan.nests.len(),
        adjacency = plan.adjacency.len(),
        spawn_separation = ?plan.spawn_separation,
        "planned nest layout"
    );
    plan
}

fn open_neighbours<W>(world: &W, cell: CellCoord) -> BTreeSet<CellCoord>
where
    W: WorldView + ?Sized,
{
    world
        .neighbours(cell)
        .cells()
        .filter(|neighbour| !world.is_wall(*neighbour))
        .collect()
}

fn closer_to_home<W>(world: &W, cell: CellCoord, home: CellCoord, enemy: CellCoord) -> bool
where
    W: WorldView + ?Sized,
{
    match (
        world.shortest_path_distance(cell, home),
        world.shortest_path_distance(cell, enemy),
    ) {
        (Some(home), Some(enemy)) => home < enemy,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
