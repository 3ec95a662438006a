#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick decision loop that turns plans into unit moves.
//!
//! Every friendly unit carries at most one [`Task`]. Idle units receive a new
//! attack or expand task; active units consume one step of theirs. Local
//! overrides then get a chance to replace the proposed step: resting once the
//! map is nearly claimed, drifting down the potential gradient, and trading
//! blows with adjacent enemies. Processing stops early once the tick's
//! wall-clock budget is spent.

mod task;

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    time::{Duration, Instant},
};

use rand::Rng;
use restraint_core::{CellCoord, MoveExecutor, PotentialField, UnitId, UnitSnapshot, WorldView};
use restraint_system_nest_planner::{plan_nests, NestPlan};
use restraint_system_pathing::nearest_capturable;
use restraint_system_potential_field::{FieldTuning, PotentialFieldBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub use task::{Task, TaskKind};

/// Tuning knobs for task assignment and the local overrides.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchTuning {
    /// Wall-clock seconds a tick may spend before remaining units are skipped.
    pub time_budget: f64,
    /// Chance per unit and tick of resting once exploration is nearly done.
    pub rest_probability: f64,
    /// Explored fraction above which units may rest.
    pub explored_threshold: f64,
    /// Health a unit must exceed before it may attack.
    pub attack_health_floor: u32,
    /// Multiple of the average enemy health a unit must exceed before it may attack.
    pub attack_density_multiplier: f64,
    /// Gradient step above which a unit always moves downhill.
    pub gradient_certain_delta: f64,
}

impl DispatchTuning {
    /// Budget as a duration; negative or malformed values yield a zero budget.
    #[must_use]
    pub fn budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_budget).unwrap_or(Duration::ZERO)
    }
}

impl Default for DispatchTuning {
    fn default() -> Self {
        Self {
            time_budget: 0.55,
            rest_probability: 0.15,
            explored_threshold: 0.9,
            attack_health_floor: 5,
            attack_density_multiplier: 3.0,
            gradient_certain_delta: 1.0,
        }
    }
}

/// Statistics describing a single handled tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Zero-based index of the tick.
    pub turn: u64,
    /// Summed health of the friendly units.
    pub friendly_strength: u64,
    /// Summed health of the enemy units.
    pub enemy_strength: u64,
    /// Mean friendly health, zero without friendly units.
    pub friendly_average: f64,
    /// Mean enemy health, zero without enemy units.
    pub enemy_average: f64,
    /// Fraction of the grid no longer neutral, walls included.
    pub explored: f64,
    /// Friendly units without an active task when the tick started.
    pub idle: usize,
    /// Friendly units alive this tick.
    pub units: usize,
    /// Friendly units handled before the budget ran out.
    pub processed: usize,
}

/// Stateful per-team dispatcher owning every unit's task.
#[derive(Debug)]
pub struct Dispatcher {
    tuning: DispatchTuning,
    field_builder: PotentialFieldBuilder,
    plan: Option<NestPlan>,
    completion: BTreeSet<CellCoord>,
    tasks: HashMap<UnitId, Task>,
    turn: u64,
}

impl Dispatcher {
    /// Creates a dispatcher that plans its nests on the first handled tick.
    #[must_use]
    pub fn new(tuning: DispatchTuning, field: FieldTuning) -> Self {
        Self {
            tuning,
            field_builder: PotentialFieldBuilder::new(field),
            plan: None,
            completion: BTreeSet::new(),
            tasks: HashMap::new(),
            turn: 0,
        }
    }

    /// Replaces the nest plan instead of computing one on the first tick.
    #[must_use]
    pub fn with_plan(mut self, plan: NestPlan) -> Self {
        self.completion = plan.adjacency().clone();
        self.plan = Some(plan);
        self
    }

    /// Tuning the dispatcher applies.
    #[must_use]
    pub fn tuning(&self) -> &DispatchTuning {
        &self.tuning
    }

    /// Tuning the potential field is built with.
    #[must_use]
    pub fn field_tuning(&self) -> &FieldTuning {
        self.field_builder.tuning()
    }

    /// Nest plan in effect, once computed.
    #[must_use]
    pub fn plan(&self) -> Option<&NestPlan> {
        self.plan.as_ref()
    }

    /// Planned cells still waiting to be captured.
    #[must_use]
    pub fn completion(&self) -> &BTreeSet<CellCoord> {
        &self.completion
    }

    /// Task currently held by the unit.
    #[must_use]
    pub fn task(&self, unit: UnitId) -> Option<&Task> {
        self.tasks.get(&unit)
    }

    /// Number of ticks handled so far.
    #[must_use]
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    /// Chooses and submits this tick's moves, timing the budget from now.
    pub fn handle<W, R, E>(
        &mut self,
        world: &W,
        friendly: &[UnitSnapshot],
        enemies: &[UnitSnapshot],
        rng: &mut R,
        executor: &mut E,
    ) -> TickReport
    where
        W: WorldView + ?Sized,
        R: Rng,
        E: MoveExecutor + ?Sized,
    {
        self.handle_since(Instant::now(), world, friendly, enemies, rng, executor)
    }

    /// Chooses and submits this tick's moves for a tick that began at `started`.
    ///
    /// Illegal moves are logged and invalidate the unit's task; they never
    /// abort the tick.
    pub fn handle_since<W, R, E>(
        &mut self,
        started: Instant,
        world: &W,
        friendly: &[UnitSnapshot],
        enemies: &[UnitSnapshot],
        rng: &mut R,
        executor: &mut E,
    ) -> TickReport
    where
        W: WorldView + ?Sized,
        R: Rng,
        E: MoveExecutor + ?Sized,
    {
        if self.plan.is_none() {
            let plan = plan_nests(world);
            self.completion = plan.adjacency().clone();
            self.plan = Some(plan);
        }

        self.completion.retain(|cell| {
            world
                .tile_at(*cell)
                .map_or(false, |tile| tile.is_neutral())
        });
        let field = self
            .field_builder
            .build(world, &self.completion, friendly, enemies);

        let alive: HashSet<UnitId> = friendly.iter().map(|unit| unit.id).collect();
        self.tasks.retain(|unit, _| alive.contains(unit));

        let friendly_strength = strength(friendly);
        let enemy_strength = strength(enemies);
        let mut report = TickReport {
            turn: self.turn,
            friendly_strength,
            enemy_strength,
            friendly_average: average(friendly_strength, friendly.len()),
            enemy_average: average(enemy_strength, enemies.len()),
            explored: explored_fraction(world),
            idle: friendly
                .iter()
                .filter(|unit| self.tasks.get(&unit.id).map_or(true, Task::is_complete))
                .count(),
            units: friendly.len(),
            processed: 0,
        };

        info!(
            turn = report.turn,
            friendly_strength = report.friendly_strength,
            enemy_strength = report.enemy_strength,
            friendly_average = report.friendly_average,
            enemy_average = report.enemy_average,
            idle = report.idle,
            units = report.units,
            "tick"
        );

        let unplanned = BTreeSet::new();
        let tick = Tick {
            world,
            field: &field,
            nests: self.plan.as_ref().map_or(&unplanned, NestPlan::nests),
            tuning: &self.tuning,
            enemy_average: report.enemy_average,
            explored: report.explored,
        };

        let budget = self.tuning.budget();
        for (index, unit) in friendly.iter().enumerate() {
            if started.elapsed() > budget {
                debug!(
                    turn = report.turn,
                    skipped = friendly.len() - index,
                    "tick budget exhausted"
                );
                break;
            }
            tick.step(&mut self.tasks, unit, rng, executor);
            report.processed += 1;
        }

        self.turn = self.turn.saturating_add(1);
        report
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchTuning::default(), FieldTuning::default())
    }
}

/// Read-only inputs shared by every unit handled in one tick.
struct Tick<'a, W: ?Sized> {
    world: &'a W,
    field: &'a PotentialField,
    nests: &'a BTreeSet<CellCoord>,
    tuning: &'a DispatchTuning,
    enemy_average: f64,
    explored: f64,
}

impl<W> Tick<'_, W>
where
    W: WorldView + ?Sized,
{
    fn step<R, E>(
        &self,
        tasks: &mut HashMap<UnitId, Task>,
        unit: &UnitSnapshot,
        rng: &mut R,
        executor: &mut E,
    ) where
        R: Rng,
        E: MoveExecutor + ?Sized,
    {
        let idle = tasks.get(&unit.id).map_or(true, Task::is_complete);
        if idle {
            match self.assign(unit) {
                Some(task) => {
                    let _ = tasks.insert(unit.id, task);
                }
                None => {
                    let _ = tasks.remove(&unit.id);
                }
            }
        }

        let mut task = tasks.get_mut(&unit.id);
        let mut proposed = task.as_deref_mut().and_then(Task::next_move);
        let mut overridden = false;

        if self.explored > self.tuning.explored_threshold
            && rng.gen::<f64>() < self.tuning.rest_probability
        {
            proposed = None;
            overridden = true;
        }

        let here = self.field.value(unit.cell);
        for neighbour in self.world.neighbours(unit.cell).cells() {
            if self.world.is_wall(neighbour) {
                continue;
            }
            let delta = here - self.field.value(neighbour);
            if delta > self.tuning.gradient_certain_delta
                || (delta > 0.0 && rng.gen::<f64>() < delta)
            {
                proposed = Some(neighbour);
                overridden = true;
            }
        }

        let engaging = proposed.map_or(false, |cell| self.world.enemy_at(cell).is_some());
        if !engaging {
            if let Some(target) = self.strongest_adjacent_enemy(unit.cell) {
                proposed = Some(target);
                overridden = true;
            }
        }

        if overridden {
            if let Some(task) = task.as_deref_mut() {
                task.invalidate();
            }
        }

        let Some(destination) = proposed else {
            return;
        };
        if let Err(error) = executor.submit(unit, destination) {
            warn!(
                unit = unit.id.get(),
                column = destination.column(),
                row = destination.row(),
                %error,
                "move rejected"
            );
            if let Some(task) = task {
                task.invalidate();
            }
        }
    }

    fn assign(&self, unit: &UnitSnapshot) -> Option<Task> {
        let threshold = self.tuning.attack_density_multiplier * self.enemy_average;
        if f64::from(unit.health) > threshold && unit.health > self.tuning.attack_health_floor {
            return self.attack(unit);
        }
        self.expand(unit)
    }

    fn expand(&self, unit: &UnitSnapshot) -> Option<Task> {
        let target = nearest_capturable(self.world, self.field, unit.cell, self.nests)?;
        let task = self
            .world
            .shortest_path(unit.cell, target, self.nests)
            .and_then(|path| Task::from_path(TaskKind::Expand, target, &path));
        task.or_else(|| self.attack(unit))
    }

    fn attack(&self, unit: &UnitSnapshot) -> Option<Task> {
        let clusters = self.world.enemy_nest_clusters();
        let mut largest: Option<&BTreeSet<CellCoord>> = None;
        for cluster in &clusters {
            if largest.map_or(true, |best| cluster.len() > best.len()) {
                largest = Some(cluster);
            }
        }

        let target = largest?.iter().copied().min_by_key(|cell| {
            self.world
                .shortest_path_distance(unit.cell, *cell)
                .unwrap_or(u32::MAX)
        })?;
        let path = self.world.shortest_path(unit.cell, target, self.nests)?;
        Task::from_path(TaskKind::Attack, target, &path)
    }

    fn strongest_adjacent_enemy(&self, cell: CellCoord) -> Option<CellCoord> {
        let mut strongest: Option<(CellCoord, u32)> = None;
        for neighbour in self.world.neighbours(cell).cells() {
            let Some(enemy) = self.world.enemy_at(neighbour) else {
                continue;
            };
            if strongest.map_or(true, |(_, health)| enemy.health > health) {
                strongest = Some((neighbour, enemy.health));
            }
        }
        strongest.map(|(cell, _)| cell)
    }
}

fn strength(units: &[UnitSnapshot]) -> u64 {
    units.iter().map(|unit| u64::from(unit.health)).sum()
}

fn average(total: u64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total as f64 / count as f64
}

fn explored_fraction<W>(world: &W) -> f64
where
    W: WorldView + ?Sized,
{
    let cells = world.dimensions().cell_count();
    if cells == 0 {
        return 0.0;
    }
    1.0 - world.neutral_tile_count() as f64 / cells as f64
}
