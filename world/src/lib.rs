#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for a Restraint match.
//!
//! The world is a grid, wrapping by default, of walls and capturable tiles contested by two
//! teams. Adapters mutate it exclusively through [`apply`], which appends the
//! resulting [`Event`] values, and systems observe it through [`TeamView`],
//! the team-relative [`WorldView`] implementation.

mod map;
mod navigation;

use std::collections::{BTreeSet, HashSet, VecDeque};

use restraint_core::{
    Allegiance, CellCoord, Dimensions, MoveError, MoveExecutor, Neighbours, TileSnapshot, Topology,
    UnitId, UnitSnapshot, WorldView,
};

pub use map::MapError;
use navigation::{breadth_first_path, NavigationField};

/// Health granted to units created by a nest.
const SPAWNED_UNIT_HEALTH: u32 = 1;

/// One of the two contesting sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    /// The side spawning on the `A` glyph.
    A,
    /// The side spawning on the `B` glyph.
    B,
}

impl Team {
    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that a unit step onto an adjacent cell.
    MoveUnit {
        /// Unit attempting to move.
        unit: UnitId,
        /// Adjacent destination cell.
        destination: CellCoord,
    },
    /// Closes the turn: forms new nests and lets every nest spawn.
    EndTurn,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A unit moved onto an empty cell.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Cell the unit left.
        from: CellCoord,
        /// Cell the unit now occupies.
        to: CellCoord,
    },
    /// A unit stepped onto a teammate and was absorbed by it.
    UnitsMerged {
        /// Unit that remains on the board.
        into: UnitId,
        /// Unit that was absorbed.
        from: UnitId,
    },
    /// A unit attacked an adjacent enemy.
    CombatResolved {
        /// Unit that initiated the exchange.
        attacker: UnitId,
        /// Unit that was attacked.
        defender: UnitId,
        /// Health removed from both units.
        damage: u32,
    },
    /// A tile changed owner.
    TileCaptured {
        /// Captured cell.
        cell: CellCoord,
        /// New owner.
        team: Team,
    },
    /// A neutral tile enclosed by one team became its nest.
    NestFormed {
        /// Cell of the new nest.
        cell: CellCoord,
        /// Owner of the nest.
        team: Team,
    },
    /// An enemy unit stepped onto a nest and razed it.
    NestDestroyed {
        /// Cell of the razed nest.
        cell: CellCoord,
        /// Team that lost the nest.
        team: Team,
    },
    /// A nest produced a new unit.
    UnitSpawned {
        /// Identifier of the new unit.
        unit: UnitId,
        /// Cell the unit occupies.
        cell: CellCoord,
        /// Owner of the unit.
        team: Team,
    },
    /// The turn counter advanced.
    TurnEnded {
        /// Index of the turn that just closed.
        turn: u64,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Tile {
    owner: Option<Team>,
    nest: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Unit {
    id: UnitId,
    team: Team,
    cell: CellCoord,
    health: u32,
}

impl Unit {
    fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            cell: self.cell,
            health: self.health,
        }
    }
}

/// Represents the authoritative state of a match.
#[derive(Clone, Debug)]
pub struct World {
    topology: Topology,
    dimensions: Dimensions,
    walls: Vec<bool>,
    tiles: Vec<Tile>,
    units: Vec<Unit>,
    spawns: [CellCoord; 2],
    spawn_fields: [NavigationField; 2],
    next_unit_id: u32,
    turn: u64,
}

impl World {
    /// Builds a wrapping world from an ASCII map.
    ///
    /// `#` marks a wall, `.` open neutral ground, and `A`/`B` the single
    /// spawn of each team. Each spawn starts as a nest holding one unit.
    pub fn from_map(text: &str) -> Result<Self, MapError> {
        Self::from_map_with_topology(text, Topology::Toroidal)
    }

    /// Builds a world from an ASCII map using the provided edge behaviour.
    pub fn from_map_with_topology(text: &str, topology: Topology) -> Result<Self, MapError> {
        let layout = map::parse(text)?;
        let mut world = Self {
            topology,
            dimensions: layout.dimensions,
            tiles: vec![Tile::default(); layout.walls.len()],
            walls: layout.walls,
            units: Vec::new(),
            spawns: layout.spawns,
            spawn_fields: [NavigationField::default(), NavigationField::default()],
            next_unit_id: 0,
            turn: 0,
        };

        for team in [Team::A, Team::B] {
            let spawn = world.spawns[team.index()];
            let mut field = NavigationField::default();
            field.rebuild_with(world.topology, world.dimensions, spawn, |cell| {
                world.is_wall(cell)
            });
            world.spawn_fields[team.index()] = field;

            if let Some(tile) = world.tile_mut(spawn) {
                *tile = Tile {
                    owner: Some(team),
                    nest: true,
                };
            }
            let _ = world.spawn_unit(team, spawn);
        }

        Ok(world)
    }

    fn neighbours(&self, cell: CellCoord) -> Neighbours {
        Neighbours::on(self.topology, self.dimensions, cell)
    }

    fn is_wall(&self, cell: CellCoord) -> bool {
        self.dimensions
            .index(cell)
            .and_then(|index| self.walls.get(index).copied())
            .unwrap_or(true)
    }

    fn tile(&self, cell: CellCoord) -> Option<Tile> {
        if self.is_wall(cell) {
            return None;
        }
        self.dimensions
            .index(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    fn tile_mut(&mut self, cell: CellCoord) -> Option<&mut Tile> {
        let index = self.dimensions.index(cell)?;
        self.tiles.get_mut(index)
    }

    fn unit_index(&self, unit: UnitId) -> Option<usize> {
        self.units.iter().position(|candidate| candidate.id == unit)
    }

    fn occupant_index(&self, cell: CellCoord) -> Option<usize> {
        self.units.iter().position(|candidate| candidate.cell == cell)
    }

    fn spawn_unit(&mut self, team: Team, cell: CellCoord) -> UnitId {
        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        self.units.push(Unit {
            id,
            team,
            cell,
            health: SPAWNED_UNIT_HEALTH,
        });
        id
    }

    fn open_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let columns = self.dimensions.columns();
        let rows = self.dimensions.rows();
        (0..rows)
            .flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
            .filter(move |cell| !self.is_wall(*cell))
    }

    fn move_unit(&mut self, unit: UnitId, destination: CellCoord, out_events: &mut Vec<Event>) {
        let Some(mover_index) = self.unit_index(unit) else {
            return;
        };
        let mover = self.units[mover_index];
        let adjacent = self
            .neighbours(mover.cell)
            .cells()
            .any(|cell| cell == destination);
        if !adjacent || self.is_wall(destination) {
            return;
        }

        match self.occupant_index(destination) {
            None => {
                self.units[mover_index].cell = destination;
                out_events.push(Event::UnitMoved {
                    unit,
                    from: mover.cell,
                    to: destination,
                });
                self.capture(destination, mover.team, out_events);
            }
            Some(occupant_index) if self.units[occupant_index].team == mover.team => {
                let occupant = &mut self.units[occupant_index];
                occupant.health = occupant.health.saturating_add(mover.health);
                let into = occupant.id;
                let _ = self.units.remove(mover_index);
                out_events.push(Event::UnitsMerged { into, from: unit });
            }
            Some(occupant_index) => {
                let defender = self.units[occupant_index];
                let damage = mover.health.min(defender.health);
                self.units[mover_index].health -= damage;
                self.units[occupant_index].health -= damage;
                out_events.push(Event::CombatResolved {
                    attacker: unit,
                    defender: defender.id,
                    damage,
                });
                self.units.retain(|candidate| candidate.health > 0);
            }
        }
    }

    fn capture(&mut self, cell: CellCoord, team: Team, out_events: &mut Vec<Event>) {
        let Some(tile) = self.tile_mut(cell) else {
            return;
        };
        if tile.owner == Some(team) {
            return;
        }

        let razed = if tile.nest { tile.owner } else { None };
        *tile = Tile {
            owner: Some(team),
            nest: false,
        };

        if let Some(previous) = razed {
            out_events.push(Event::NestDestroyed {
                cell,
                team: previous,
            });
        }
        out_events.push(Event::TileCaptured { cell, team });
    }

    fn end_turn(&mut self, out_events: &mut Vec<Event>) {
        let formed: Vec<(CellCoord, Team)> = self
            .open_cells()
            .filter_map(|cell| {
                let tile = self.tile(cell)?;
                if tile.owner.is_some() {
                    return None;
                }
                self.enclosing_team(cell).map(|team| (cell, team))
            })
            .collect();

        for (cell, team) in formed {
            if let Some(tile) = self.tile_mut(cell) {
                *tile = Tile {
                    owner: Some(team),
                    nest: true,
                };
                out_events.push(Event::NestFormed { cell, team });
            }
        }

        let nests: Vec<(CellCoord, Team)> = self
            .open_cells()
            .filter_map(|cell| {
                let tile = self.tile(cell)?;
                match (tile.nest, tile.owner) {
                    (true, Some(team)) => Some((cell, team)),
                    _ => None,
                }
            })
            .collect();

        for (cell, team) in nests {
            match self.occupant_index(cell) {
                Some(index) if self.units[index].team == team => {
                    let unit = &mut self.units[index];
                    unit.health = unit.health.saturating_add(SPAWNED_UNIT_HEALTH);
                }
                Some(_) => {}
                None => {
                    let unit = self.spawn_unit(team, cell);
                    out_events.push(Event::UnitSpawned { unit, cell, team });
                }
            }
        }

        out_events.push(Event::TurnEnded { turn: self.turn });
        self.turn = self.turn.saturating_add(1);
    }

    fn enclosing_team(&self, cell: CellCoord) -> Option<Team> {
        let mut enclosing = None;
        for neighbour in self.neighbours(cell).cells() {
            let Some(tile) = self.tile(neighbour) else {
                continue;
            };
            let owner = tile.owner?;
            match enclosing {
                None => enclosing = Some(owner),
                Some(team) if team == owner => {}
                Some(_) => return None,
            }
        }
        enclosing
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MoveUnit { unit, destination } => world.move_unit(unit, destination, out_events),
        Command::EndTurn => world.end_turn(out_events),
    }
}

/// Team-relative read-only view of the world.
#[derive(Clone, Copy, Debug)]
pub struct TeamView<'w> {
    world: &'w World,
    team: Team,
}

impl<'w> TeamView<'w> {
    /// Captures the world from the perspective of `team`.
    #[must_use]
    pub fn new(world: &'w World, team: Team) -> Self {
        Self { world, team }
    }

    fn allegiance(&self, owner: Team) -> Allegiance {
        if owner == self.team {
            Allegiance::Friendly
        } else {
            Allegiance::Enemy
        }
    }

    fn spawn_field(&self, cell: CellCoord) -> Option<&'w NavigationField> {
        self.world
            .spawn_fields
            .iter()
            .find(|field| field.origin() == Some(cell))
    }
}

impl WorldView for TeamView<'_> {
    fn dimensions(&self) -> Dimensions {
        self.world.dimensions
    }

    fn topology(&self) -> Topology {
        self.world.topology
    }

    fn is_wall(&self, cell: CellCoord) -> bool {
        self.world.is_wall(cell)
    }

    fn shortest_path_distance(&self, from: CellCoord, to: CellCoord) -> Option<u32> {
        if self.world.is_wall(from) || self.world.is_wall(to) {
            return None;
        }
        if let Some(field) = self.spawn_field(to) {
            return field.distance(from);
        }
        if let Some(field) = self.spawn_field(from) {
            return field.distance(to);
        }
        let world = self.world;
        let path = breadth_first_path(world.topology, world.dimensions, from, to, |cell| {
            world.is_wall(cell)
        })?;
        u32::try_from(path.len().saturating_sub(1)).ok()
    }

    fn shortest_path(
        &self,
        from: CellCoord,
        to: CellCoord,
        avoid: &BTreeSet<CellCoord>,
    ) -> Option<Vec<CellCoord>> {
        if self.world.is_wall(from) || self.world.is_wall(to) {
            return None;
        }
        let world = self.world;
        breadth_first_path(world.topology, world.dimensions, from, to, |cell| {
            world.is_wall(cell) || avoid.contains(&cell)
        })
    }

    fn neutral_tile_count(&self) -> usize {
        self.world
            .open_cells()
            .filter(|cell| {
                self.world
                    .tile(*cell)
                    .map_or(false, |tile| tile.owner.is_none())
            })
            .count()
    }

    fn enemy_nest_clusters(&self) -> Vec<BTreeSet<CellCoord>> {
        let enemy = self.team.opponent();
        let is_enemy_nest = |cell: CellCoord| {
            self.world
                .tile(cell)
                .map_or(false, |tile| tile.nest && tile.owner == Some(enemy))
        };

        let mut seen: HashSet<CellCoord> = HashSet::new();
        let mut clusters = Vec::new();
        for start in self.world.open_cells().filter(|cell| is_enemy_nest(*cell)) {
            if !seen.insert(start) {
                continue;
            }
            let mut cluster = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            while let Some(cell) = queue.pop_front() {
                let _ = cluster.insert(cell);
                for neighbour in self.world.neighbours(cell).cells() {
                    if is_enemy_nest(neighbour) && seen.insert(neighbour) {
                        queue.push_back(neighbour);
                    }
                }
            }
            clusters.push(cluster);
        }
        clusters
    }

    fn enemy_at(&self, cell: CellCoord) -> Option<UnitSnapshot> {
        let enemy = self.team.opponent();
        self.world
            .units
            .iter()
            .find(|unit| unit.cell == cell && unit.team == enemy)
            .map(Unit::snapshot)
    }

    fn friendly_spawn(&self) -> CellCoord {
        self.world.spawns[self.team.index()]
    }

    fn enemy_spawn(&self) -> CellCoord {
        self.world.spawns[self.team.opponent().index()]
    }

    fn tile_at(&self, cell: CellCoord) -> Option<TileSnapshot> {
        self.world.tile(cell).map(|tile| TileSnapshot {
            cell,
            owner: tile.owner.map(|owner| self.allegiance(owner)),
            permanent: tile.nest,
        })
    }
}

/// Validates one team's moves for a tick and records them as commands.
#[derive(Debug)]
pub struct OrderBook<'w> {
    world: &'w World,
    team: Team,
    ordered: HashSet<UnitId>,
    commands: Vec<Command>,
}

impl<'w> OrderBook<'w> {
    /// Opens an empty order book for `team`.
    #[must_use]
    pub fn new(world: &'w World, team: Team) -> Self {
        Self {
            world,
            team,
            ordered: HashSet::new(),
            commands: Vec::new(),
        }
    }

    /// Consumes the book, yielding the accepted moves in submission order.
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl MoveExecutor for OrderBook<'_> {
    fn submit(&mut self, unit: &UnitSnapshot, destination: CellCoord) -> Result<(), MoveError> {
        let Some(current) = self
            .world
            .units
            .iter()
            .find(|candidate| candidate.id == unit.id && candidate.team == self.team)
        else {
            return Err(MoveError::UnknownUnit(unit.id));
        };

        let adjacent = self
            .world
            .neighbours(current.cell)
            .cells()
            .any(|cell| cell == destination);
        if !adjacent {
            return Err(MoveError::NotAdjacent {
                unit: unit.id,
                destination,
            });
        }
        if self.world.is_wall(destination) {
            return Err(MoveError::Wall(destination));
        }
        if !self.ordered.insert(unit.id) {
            return Err(MoveError::AlreadyOrdered(unit.id));
        }

        self.commands.push(Command::MoveUnit {
            unit: unit.id,
            destination,
        });
        Ok(())
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use restraint_core::{CellCoord, Dimensions, UnitSnapshot};

    use super::{Team, World};

    /// Size of the grid.
    #[must_use]
    pub fn dimensions(world: &World) -> Dimensions {
        world.dimensions
    }

    /// Number of turns closed so far.
    #[must_use]
    pub fn turn(world: &World) -> u64 {
        world.turn
    }

    /// Living units of `team`, ordered by identifier.
    #[must_use]
    pub fn roster(world: &World, team: Team) -> Vec<UnitSnapshot> {
        let mut roster: Vec<UnitSnapshot> = world
            .units
            .iter()
            .filter(|unit| unit.team == team)
            .map(super::Unit::snapshot)
            .collect();
        roster.sort_by_key(|unit| unit.id);
        roster
    }

    /// Owner of the tile, `None` for neutral tiles and walls.
    #[must_use]
    pub fn owner(world: &World, cell: CellCoord) -> Option<Team> {
        world.tile(cell).and_then(|tile| tile.owner)
    }

    /// Reports whether the cell holds a nest.
    #[must_use]
    pub fn is_nest(world: &World, cell: CellCoord) -> bool {
        world.tile(cell).map_or(false, |tile| tile.nest)
    }

    /// Number of tiles owned by `team`.
    #[must_use]
    pub fn territory(world: &World, team: Team) -> usize {
        world
            .open_cells()
            .filter(|cell| owner(world, *cell) == Some(team))
            .count()
    }

    /// Total health of the living units of `team`.
    #[must_use]
    pub fn strength(world: &World, team: Team) -> u64 {
        world
            .units
            .iter()
            .filter(|unit| unit.team == team)
            .map(|unit| u64::from(unit.health))
            .sum()
    }
}
