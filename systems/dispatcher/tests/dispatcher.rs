use std::{
    collections::{BTreeSet, VecDeque},
    thread,
    time::{Duration, Instant},
};

use rand::RngCore;
use restraint_core::{
    Allegiance, CellCoord, Dimensions, MoveError, MoveExecutor, TileSnapshot, Topology, UnitId,
    UnitSnapshot, WorldView,
};
use restraint_system_dispatcher::{DispatchTuning, Dispatcher, TaskKind};
use restraint_system_nest_planner::NestPlan;
use restraint_system_potential_field::FieldTuning;
use restraint_world::{query, Team, TeamView, World};

const OPEN: &str = "\
A....
.....
.....
.....
....B
";

const LANE: &str = "\
A..B
####
####
####
####
####
";

/// Yields scripted uniform draws, then an optional constant.
struct ScriptedRng {
    script: VecDeque<f64>,
    then: Option<f64>,
}

impl ScriptedRng {
    fn exactly(draws: &[f64]) -> Self {
        Self {
            script: draws.iter().copied().collect(),
            then: None,
        }
    }

    fn always(draw: f64) -> Self {
        Self {
            script: VecDeque::new(),
            then: Some(draw),
        }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let draw = self
            .script
            .pop_front()
            .or(self.then)
            .expect("unexpected random draw");
        // Inverse of the 53-bit mantissa mapping used for uniform f64 samples.
        ((draw * (1_u64 << 53) as f64) as u64) << 11
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingExecutor {
    moves: Vec<(UnitId, CellCoord)>,
    reject: bool,
}

impl MoveExecutor for RecordingExecutor {
    fn submit(&mut self, unit: &UnitSnapshot, destination: CellCoord) -> Result<(), MoveError> {
        self.moves.push((unit.id, destination));
        if self.reject {
            return Err(MoveError::Wall(destination));
        }
        Ok(())
    }
}

fn unit(id: u32, column: u32, row: u32, health: u32) -> UnitSnapshot {
    UnitSnapshot {
        id: UnitId::new(id),
        cell: CellCoord::new(column, row),
        health,
    }
}

fn bounded(map: &str) -> World {
    World::from_map_with_topology(map, Topology::Bounded).expect("valid map")
}

#[test]
fn strong_unit_selects_attack_task() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 0, 0, 20)];
    let enemies = [unit(1, 4, 4, 2)];
    let mut dispatcher = Dispatcher::default();
    let mut executor = RecordingExecutor::default();

    let report = dispatcher.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::always(0.99),
        &mut executor,
    );

    let task = dispatcher.task(UnitId::new(0)).expect("task assigned");
    assert_eq!(task.kind(), TaskKind::Attack);
    assert_eq!(task.target(), CellCoord::new(4, 4));
    assert!(!task.is_complete());
    assert_eq!(executor.moves.len(), 1);
    let (_, step) = executor.moves[0];
    assert!(view.neighbours(CellCoord::new(0, 0)).cells().any(|cell| cell == step));
    assert_eq!(report.friendly_strength, 20);
    assert!((report.friendly_average - 20.0).abs() < f64::EPSILON);
    assert!((report.enemy_average - 2.0).abs() < f64::EPSILON);
    assert_eq!(report.idle, 1);
    assert_eq!(report.processed, 1);
}

#[test]
fn weak_unit_expands_toward_cheapest_capturable_tile() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 0, 0, 1)];
    let enemies = [unit(1, 4, 4, 2)];
    let mut dispatcher = Dispatcher::default();
    let mut executor = RecordingExecutor::default();

    let _ = dispatcher.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::always(0.99),
        &mut executor,
    );

    let plan = dispatcher.plan().expect("planned on first tick");
    assert_eq!(
        plan.nests(),
        &[(0, 3), (1, 1), (3, 0)]
            .into_iter()
            .map(|(column, row)| CellCoord::new(column, row))
            .collect::<BTreeSet<_>>()
    );
    let task = dispatcher.task(UnitId::new(0)).expect("task assigned");
    assert_eq!(task.kind(), TaskKind::Expand);
    assert_eq!(task.target(), CellCoord::new(1, 0));
    assert!(!plan.nests().contains(&task.target()));
    assert_eq!(executor.moves, vec![(UnitId::new(0), CellCoord::new(1, 0))]);
}

#[test]
fn gradient_draw_below_delta_steps_downhill() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 2, 2, 1)];
    let enemies = [unit(1, 2, 0, 5)];
    let plan = NestPlan::empty(CellCoord::new(0, 0), CellCoord::new(4, 4));

    let mut taken = Dispatcher::default().with_plan(plan.clone());
    let mut executor = RecordingExecutor::default();
    let _ = taken.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::exactly(&[0.1]),
        &mut executor,
    );
    assert_eq!(executor.moves, vec![(UnitId::new(0), CellCoord::new(2, 1))]);
    assert!(taken.task(UnitId::new(0)).expect("task assigned").is_complete());

    let mut declined = Dispatcher::default().with_plan(plan);
    let mut executor = RecordingExecutor::default();
    let _ = declined.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::exactly(&[0.5]),
        &mut executor,
    );
    assert_eq!(executor.moves.len(), 1);
    assert_ne!(executor.moves[0].1, CellCoord::new(2, 1));
    assert!(!declined.task(UnitId::new(0)).expect("task assigned").is_complete());
}

#[test]
fn steep_gradient_overrides_without_drawing() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 2, 2, 1)];
    let enemies = [unit(1, 2, 0, 11)];
    let mut dispatcher = Dispatcher::default()
        .with_plan(NestPlan::empty(CellCoord::new(0, 0), CellCoord::new(4, 4)));
    let mut executor = RecordingExecutor::default();

    let _ = dispatcher.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::exactly(&[]),
        &mut executor,
    );

    assert_eq!(executor.moves, vec![(UnitId::new(0), CellCoord::new(2, 1))]);
}

#[test]
fn last_steep_neighbour_in_direction_order_wins() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 2, 2, 1)];
    let enemies = [unit(1, 2, 0, 11), unit(2, 0, 2, 11)];
    let mut dispatcher = Dispatcher::default()
        .with_plan(NestPlan::empty(CellCoord::new(0, 0), CellCoord::new(4, 4)));
    let mut executor = RecordingExecutor::default();

    let _ = dispatcher.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::exactly(&[]),
        &mut executor,
    );

    assert_eq!(executor.moves, vec![(UnitId::new(0), CellCoord::new(1, 2))]);
    assert!(dispatcher.task(UnitId::new(0)).expect("task assigned").is_complete());
}

#[test]
fn rest_cancels_the_move_and_forces_reassignment() {
    let world = bounded(LANE);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 0, 0, 20)];
    let enemies = query::roster(&world, Team::B);

    let mut resting = Dispatcher::default();
    let mut executor = RecordingExecutor::default();
    let report = resting.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::exactly(&[0.1]),
        &mut executor,
    );
    assert!(report.explored > 0.9);
    assert!(executor.moves.is_empty());
    let task = resting.task(UnitId::new(0)).expect("task assigned");
    assert_eq!(task.kind(), TaskKind::Attack);
    assert!(task.is_complete());
    assert_eq!(task.remaining(), 2);

    let mut active = Dispatcher::default();
    let mut executor = RecordingExecutor::default();
    let _ = active.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::exactly(&[0.5]),
        &mut executor,
    );
    assert_eq!(executor.moves, vec![(UnitId::new(0), CellCoord::new(1, 0))]);
    assert!(!active.task(UnitId::new(0)).expect("task assigned").is_complete());
}

/// Fully claimed bounded arena whose only occupants are enemies.
struct Arena {
    dimensions: Dimensions,
    enemies: Vec<UnitSnapshot>,
}

impl WorldView for Arena {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn topology(&self) -> Topology {
        Topology::Bounded
    }

    fn is_wall(&self, cell: CellCoord) -> bool {
        !self.dimensions.contains(cell)
    }

    fn shortest_path_distance(&self, from: CellCoord, to: CellCoord) -> Option<u32> {
        Some(Topology::Bounded.distance(self.dimensions, from, to))
    }

    fn shortest_path(
        &self,
        _from: CellCoord,
        _to: CellCoord,
        _avoid: &BTreeSet<CellCoord>,
    ) -> Option<Vec<CellCoord>> {
        None
    }

    fn neutral_tile_count(&self) -> usize {
        self.dimensions.cell_count()
    }

    fn enemy_nest_clusters(&self) -> Vec<BTreeSet<CellCoord>> {
        Vec::new()
    }

    fn enemy_at(&self, cell: CellCoord) -> Option<UnitSnapshot> {
        self.enemies.iter().copied().find(|enemy| enemy.cell == cell)
    }

    fn friendly_spawn(&self) -> CellCoord {
        CellCoord::new(0, 0)
    }

    fn enemy_spawn(&self) -> CellCoord {
        CellCoord::new(2, 2)
    }

    fn tile_at(&self, cell: CellCoord) -> Option<TileSnapshot> {
        Some(TileSnapshot {
            cell,
            owner: Some(Allegiance::Friendly),
            permanent: false,
        })
    }
}

#[test]
fn idle_unit_engages_the_strongest_adjacent_enemy() {
    let arena = Arena {
        dimensions: Dimensions::new(3, 3),
        enemies: vec![unit(10, 1, 0, 2), unit(11, 2, 1, 7), unit(12, 0, 1, 7)],
    };
    let friendly = [unit(0, 1, 1, 1)];
    let mut dispatcher = Dispatcher::default()
        .with_plan(NestPlan::empty(arena.friendly_spawn(), arena.enemy_spawn()));
    let mut executor = RecordingExecutor::default();

    let report = dispatcher.handle(
        &arena,
        &friendly,
        &arena.enemies,
        &mut ScriptedRng::exactly(&[]),
        &mut executor,
    );

    assert_eq!(executor.moves, vec![(UnitId::new(0), CellCoord::new(2, 1))]);
    assert!(dispatcher.task(UnitId::new(0)).is_none());
    assert_eq!(report.idle, 1);
}

#[test]
fn rejected_moves_invalidate_tasks_without_stopping_the_tick() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 0, 0, 20), unit(2, 2, 2, 20)];
    let enemies = [unit(1, 4, 4, 1)];
    let mut dispatcher = Dispatcher::default();
    let mut executor = RecordingExecutor {
        reject: true,
        ..RecordingExecutor::default()
    };

    let report = dispatcher.handle(
        &view,
        &friendly,
        &enemies,
        &mut ScriptedRng::always(0.99),
        &mut executor,
    );

    assert_eq!(report.processed, 2);
    assert_eq!(executor.moves.len(), 2);
    for snapshot in &friendly {
        let task = dispatcher.task(snapshot.id).expect("task assigned");
        assert!(task.is_complete());
    }
}

#[test]
fn exhausted_budget_skips_units_and_keeps_their_tasks() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 0, 0, 20), unit(2, 2, 2, 20)];
    let enemies = [unit(1, 4, 4, 1)];
    let mut dispatcher = Dispatcher::new(
        DispatchTuning {
            time_budget: 0.2,
            ..DispatchTuning::default()
        },
        FieldTuning::default(),
    );
    let mut rng = ScriptedRng::always(0.99);

    let mut executor = RecordingExecutor::default();
    let first = dispatcher.handle(
        &view,
        &friendly,
        &enemies,
        &mut rng,
        &mut executor,
    );
    assert_eq!(first.processed, 2);
    let remaining: Vec<usize> = friendly
        .iter()
        .map(|snapshot| dispatcher.task(snapshot.id).expect("task assigned").remaining())
        .collect();

    let started = Instant::now();
    thread::sleep(Duration::from_millis(250));
    let mut executor = RecordingExecutor::default();
    let second = dispatcher.handle_since(
        started,
        &view,
        &friendly,
        &enemies,
        &mut rng,
        &mut executor,
    );

    assert_eq!(second.turn, 1);
    assert_eq!(second.units, 2);
    assert_eq!(second.processed, 0);
    assert!(executor.moves.is_empty());
    let after: Vec<usize> = friendly
        .iter()
        .map(|snapshot| dispatcher.task(snapshot.id).expect("task kept").remaining())
        .collect();
    assert_eq!(after, remaining);
}

#[test]
fn tasks_of_vanished_units_are_pruned() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let enemies = [unit(1, 4, 4, 1)];
    let mut dispatcher = Dispatcher::default();
    let mut rng = ScriptedRng::always(0.99);

    let both = [unit(0, 0, 0, 20), unit(2, 2, 2, 20)];
    let _ = dispatcher.handle(
        &view,
        &both,
        &enemies,
        &mut rng,
        &mut RecordingExecutor::default(),
    );
    assert!(dispatcher.task(UnitId::new(2)).is_some());

    let survivor = [unit(0, 0, 0, 20)];
    let report = dispatcher.handle(
        &view,
        &survivor,
        &enemies,
        &mut rng,
        &mut RecordingExecutor::default(),
    );

    assert!(dispatcher.task(UnitId::new(2)).is_none());
    assert!(dispatcher.task(UnitId::new(0)).is_some());
    assert_eq!(report.units, 1);
    assert_eq!(dispatcher.turn(), 2);
}

#[test]
fn empty_enemy_roster_averages_to_zero() {
    let world = bounded(OPEN);
    let view = TeamView::new(&world, Team::A);
    let friendly = [unit(0, 0, 0, 6)];
    let mut dispatcher = Dispatcher::default();

    let report = dispatcher.handle(
        &view,
        &friendly,
        &[],
        &mut ScriptedRng::always(0.99),
        &mut RecordingExecutor::default(),
    );

    assert!(report.enemy_average.abs() < f64::EPSILON);
    assert_eq!(report.enemy_strength, 0);
    let task = dispatcher.task(UnitId::new(0)).expect("task assigned");
    assert_eq!(task.kind(), TaskKind::Attack);
}
