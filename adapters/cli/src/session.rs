//! Self-play match between two dispatchers sharing one world.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use restraint_system_dispatcher::{Dispatcher, TickReport};
use restraint_world::{apply, query, Command, Event, OrderBook, Team, TeamView, World};
use tracing::info;

use crate::config::Config;

struct Side {
    team: Team,
    dispatcher: Dispatcher,
    rng: ChaCha8Rng,
}

/// Outcome of one full turn: both sides move, then the world closes the turn.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TurnSummary {
    /// Reports of team A and team B, in that order.
    pub(crate) reports: [TickReport; 2],
    /// Events produced while applying the turn.
    pub(crate) events: Vec<Event>,
}

/// Owns the world and both decision engines for the length of a match.
pub(crate) struct Session {
    world: World,
    sides: [Side; 2],
}

impl Session {
    /// Seats both teams on the world with independent seeded generators.
    pub(crate) fn new(world: World, config: &Config, seed: u64) -> Self {
        let side = |team: Team, stream: u64| Side {
            team,
            dispatcher: Dispatcher::new(config.dispatch.clone(), config.field.clone()),
            rng: {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(stream);
                rng
            },
        };
        let sides = [side(Team::A, 0), side(Team::B, 1)];
        for side in &sides {
            info!(
                team = ?side.team,
                dispatch = ?side.dispatcher.tuning(),
                field = ?side.dispatcher.field_tuning(),
                "dispatcher ready"
            );
        }
        Self { world, sides }
    }

    /// World the match is played on.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Lets each side act in turn, then closes the turn.
    pub(crate) fn play_turn(&mut self) -> TurnSummary {
        let mut events = Vec::new();
        let [first, second] = &mut self.sides;

        let reports = [
            act(&mut self.world, first, &mut events),
            act(&mut self.world, second, &mut events),
        ];
        apply(&mut self.world, Command::EndTurn, &mut events);

        TurnSummary { reports, events }
    }

    /// Plays up to `turns` turns, stopping early once a side has no units left.
    pub(crate) fn run(&mut self, turns: u64) -> u64 {
        for turn in 0..turns {
            let summary = self.play_turn();
            let captured = summary
                .events
                .iter()
                .filter(|event| matches!(event, Event::TileCaptured { .. }))
                .count();
            let [report_a, report_b] = &summary.reports;
            info!(
                turn,
                captured,
                strength_a = report_a.friendly_strength,
                strength_b = report_b.friendly_strength,
                territory_a = query::territory(&self.world, Team::A),
                territory_b = query::territory(&self.world, Team::B),
                "turn closed"
            );

            if [Team::A, Team::B]
                .iter()
                .any(|team| query::roster(&self.world, *team).is_empty())
            {
                return turn + 1;
            }
        }
        turns
    }
}

fn act(world: &mut World, side: &mut Side, events: &mut Vec<Event>) -> TickReport {
    let friendly = query::roster(world, side.team);
    let enemies = query::roster(world, side.team.opponent());
    let view = TeamView::new(world, side.team);
    let mut book = OrderBook::new(world, side.team);

    let report = side
        .dispatcher
        .handle(&view, &friendly, &enemies, &mut side.rng, &mut book);
    let commands = book.into_commands();

    for command in commands {
        apply(world, command, events);
    }
    report
}
