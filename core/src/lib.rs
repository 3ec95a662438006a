#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Restraint decision engine.
//!
//! This crate defines the vocabulary that connects the world adapter and the
//! pure planning systems. The world exposes itself through the [`WorldView`]
//! trait, systems read immutable [`UnitSnapshot`] rosters and build a
//! [`PotentialField`] every tick, and chosen moves leave through a
//! [`MoveExecutor`]. Nothing in here owns game state.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Size of the playing field measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    columns: u32,
    rows: u32,
}

impl Dimensions {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells on the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Row-major offset of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Adds the offset to the cell, wrapping around both axes.
    ///
    /// Returns the input unchanged on an empty grid.
    #[must_use]
    pub fn offset(&self, cell: CellCoord, columns: i32, rows: i32) -> CellCoord {
        if self.columns == 0 || self.rows == 0 {
            return cell;
        }
        let column = wrap(i64::from(cell.column()) + i64::from(columns), self.columns);
        let row = wrap(i64::from(cell.row()) + i64::from(rows), self.rows);
        CellCoord::new(column, row)
    }

    /// Manhattan distance where each axis takes the shorter of the direct and
    /// wrap-around spans.
    #[must_use]
    pub fn toroidal_distance(&self, from: CellCoord, to: CellCoord) -> u32 {
        axis_span(from.column(), to.column(), self.columns)
            + axis_span(from.row(), to.row(), self.rows)
    }
}

fn wrap(value: i64, size: u32) -> u32 {
    let wrapped = value.rem_euclid(i64::from(size));
    u32::try_from(wrapped).unwrap_or(0)
}

fn axis_span(from: u32, to: u32, size: u32) -> u32 {
    let direct = from.abs_diff(to);
    direct.min(size.saturating_sub(direct))
}

/// Cardinal movement directions, listed in the order searches visit them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in canonical iteration order.
    pub const ORDERED: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Column and row offset of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Edge behaviour of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Stepping off one edge re-enters from the opposite edge.
    #[default]
    Toroidal,
    /// Cells beyond the edges do not exist.
    Bounded,
}

impl Topology {
    /// Cell reached by adding the offset, or `None` when it leaves a bounded grid.
    #[must_use]
    pub fn step(
        self,
        dimensions: Dimensions,
        cell: CellCoord,
        columns: i32,
        rows: i32,
    ) -> Option<CellCoord> {
        match self {
            Self::Toroidal => Some(dimensions.offset(cell, columns, rows)),
            Self::Bounded => {
                let column = i64::from(cell.column()) + i64::from(columns);
                let row = i64::from(cell.row()) + i64::from(rows);
                let stepped =
                    CellCoord::new(u32::try_from(column).ok()?, u32::try_from(row).ok()?);
                dimensions.contains(stepped).then_some(stepped)
            }
        }
    }

    /// Obstacle-free Manhattan distance between two cells.
    #[must_use]
    pub fn distance(self, dimensions: Dimensions, from: CellCoord, to: CellCoord) -> u32 {
        match self {
            Self::Toroidal => dimensions.toroidal_distance(from, to),
            Self::Bounded => {
                from.column().abs_diff(to.column()) + from.row().abs_diff(to.row())
            }
        }
    }
}

/// Orthogonal neighbours of a cell keyed by direction, in [`Direction::ORDERED`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighbours {
    slots: [Option<(Direction, CellCoord)>; 4],
    cursor: usize,
}

impl Neighbours {
    /// Neighbours of the cell under the provided edge behaviour.
    ///
    /// Toroidal grids always yield four neighbours; bounded grids omit the
    /// directions that leave the grid.
    #[must_use]
    pub fn on(topology: Topology, dimensions: Dimensions, cell: CellCoord) -> Self {
        let mut slots = [None; 4];
        for (slot, direction) in slots.iter_mut().zip(Direction::ORDERED) {
            let (columns, rows) = direction.delta();
            *slot = topology
                .step(dimensions, cell, columns, rows)
                .map(|neighbour| (direction, neighbour));
        }
        Self { slots, cursor: 0 }
    }

    /// Neighbour reached by stepping in the provided direction, if any.
    #[must_use]
    pub fn get(&self, direction: Direction) -> Option<CellCoord> {
        self.slots
            .iter()
            .flatten()
            .find(|(candidate, _)| *candidate == direction)
            .map(|(_, cell)| *cell)
    }

    /// Iterator over the neighbouring cells without their directions.
    pub fn cells(self) -> impl Iterator<Item = CellCoord> {
        self.map(|(_, cell)| cell)
    }
}

impl Iterator for Neighbours {
    type Item = (Direction, CellCoord);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.slots.len() {
            let value = self.slots[self.cursor];
            self.cursor += 1;
            if value.is_some() {
                return value;
            }
        }
        None
    }
}

/// Stable identifier assigned to a unit for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable representation of a living unit captured for one tick.
///
/// Presence in the per-tick roster implies the unit is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Cell currently occupied by the unit.
    pub cell: CellCoord,
    /// Remaining health of the unit.
    pub health: u32,
}

/// Side that owns a tile, relative to the team asking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Allegiance {
    /// Owned by the viewing team.
    Friendly,
    /// Owned by the opposing team.
    Enemy,
}

/// Ownership flags of a single open tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileSnapshot {
    /// Cell the tile covers.
    pub cell: CellCoord,
    /// Owner of the tile, `None` while neutral.
    pub owner: Option<Allegiance>,
    /// Set for nests, which cannot be captured by stepping on them.
    pub permanent: bool,
}

impl TileSnapshot {
    /// Reports whether no team owns the tile.
    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    /// Reports whether the viewing team owns the tile.
    #[must_use]
    pub fn is_friendly(&self) -> bool {
        self.owner == Some(Allegiance::Friendly)
    }

    /// Reports whether the tile is permanently owned.
    #[must_use]
    pub const fn is_permanently_owned(&self) -> bool {
        self.permanent
    }
}

/// Per-cell strategic desirability; lower values are more attractive.
///
/// Cells that were never adjusted report the baseline. The same mapping is
/// consumed by the searches as the cost of entering a cell, so values may be
/// negative.
#[derive(Clone, Debug, PartialEq)]
pub struct PotentialField {
    baseline: f64,
    values: HashMap<CellCoord, f64>,
}

impl PotentialField {
    /// Baseline reported for every cell absent from the field.
    pub const DEFAULT_BASELINE: f64 = 1.0;

    /// Creates an empty field reporting the provided baseline everywhere.
    #[must_use]
    pub fn with_baseline(baseline: f64) -> Self {
        Self {
            baseline,
            values: HashMap::new(),
        }
    }

    /// Value of the cell, or the baseline when unmapped.
    #[must_use]
    pub fn value(&self, cell: CellCoord) -> f64 {
        self.values.get(&cell).copied().unwrap_or(self.baseline)
    }

    /// Lowers the cell's value by `amount`, starting from the baseline.
    pub fn subtract(&mut self, cell: CellCoord, amount: f64) {
        let baseline = self.baseline;
        let entry = self.values.entry(cell).or_insert(baseline);
        *entry -= amount;
    }

    /// Number of cells carrying an explicit value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether every cell sits at the baseline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterator over the explicitly mapped cells and their values.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, f64)> + '_ {
        self.values.iter().map(|(cell, value)| (*cell, *value))
    }
}

impl Default for PotentialField {
    fn default() -> Self {
        Self::with_baseline(Self::DEFAULT_BASELINE)
    }
}

/// Read-only grid adapter the planning systems query, from one team's perspective.
pub trait WorldView {
    /// Size of the grid.
    fn dimensions(&self) -> Dimensions;

    /// Edge behaviour of the grid.
    fn topology(&self) -> Topology {
        Topology::Toroidal
    }

    /// Reports whether the cell is impassable.
    fn is_wall(&self, cell: CellCoord) -> bool;

    /// Reports whether the cell lies inside the grid.
    fn is_within_bounds(&self, cell: CellCoord) -> bool {
        self.dimensions().contains(cell)
    }

    /// Orthogonal neighbours of the cell, wrapping when the grid is toroidal.
    fn neighbours(&self, cell: CellCoord) -> Neighbours {
        Neighbours::on(self.topology(), self.dimensions(), cell)
    }

    /// Number of steps on the shortest wall-free path, if one exists.
    fn shortest_path_distance(&self, from: CellCoord, to: CellCoord) -> Option<u32>;

    /// Shortest wall-free path from `from` to `to`, both inclusive, never
    /// entering a cell of `avoid`.
    fn shortest_path(
        &self,
        from: CellCoord,
        to: CellCoord,
        avoid: &BTreeSet<CellCoord>,
    ) -> Option<Vec<CellCoord>>;

    /// Number of open tiles no team owns.
    fn neutral_tile_count(&self) -> usize;

    /// Orthogonally connected groups of enemy nests.
    fn enemy_nest_clusters(&self) -> Vec<BTreeSet<CellCoord>>;

    /// Enemy unit standing on the cell, if any.
    fn enemy_at(&self, cell: CellCoord) -> Option<UnitSnapshot>;

    /// Spawn nest of the viewing team.
    fn friendly_spawn(&self) -> CellCoord;

    /// Spawn nest of the opposing team.
    fn enemy_spawn(&self) -> CellCoord;

    /// Ownership flags of the tile, `None` for walls and unknown cells.
    fn tile_at(&self, cell: CellCoord) -> Option<TileSnapshot>;
}

/// Reasons a move request may be rejected by the move-execution collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    /// No living unit with the provided identifier exists.
    #[error("unit {} is not alive", .0.get())]
    UnknownUnit(UnitId),
    /// The destination is not an orthogonal neighbour of the unit.
    #[error("unit {} cannot reach ({}, {}) in one step", .unit.get(), .destination.column(), .destination.row())]
    NotAdjacent {
        /// Unit that attempted the move.
        unit: UnitId,
        /// Requested destination.
        destination: CellCoord,
    },
    /// The destination is a wall.
    #[error("cell ({}, {}) is a wall", .0.column(), .0.row())]
    Wall(CellCoord),
    /// The unit already received a move this tick.
    #[error("unit {} already moved this tick", .0.get())]
    AlreadyOrdered(UnitId),
}

/// Accepts the moves chosen for friendly units.
pub trait MoveExecutor {
    /// Requests that the unit step onto `destination`.
    fn submit(&mut self, unit: &UnitSnapshot, destination: CellCoord) -> Result<(), MoveError>;
}
