//! ASCII map parsing.

use restraint_core::{CellCoord, Dimensions};
use thiserror::Error;

use crate::Team;

const WALL_GLYPH: char = '#';
const OPEN_GLYPH: char = '.';
const SPAWN_A_GLYPH: char = 'A';
const SPAWN_B_GLYPH: char = 'B';

/// Reasons a map description may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// The description contains no rows.
    #[error("map is empty")]
    Empty,
    /// A row differs in width from the first row.
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A glyph outside the map alphabet was found.
    #[error("unknown glyph {glyph:?} at column {column}, row {row}")]
    UnknownGlyph {
        /// Character that could not be interpreted.
        glyph: char,
        /// Column containing the glyph.
        column: usize,
        /// Row containing the glyph.
        row: usize,
    },
    /// A team has no spawn on the map.
    #[error("team {0:?} has no spawn")]
    MissingSpawn(Team),
    /// A team has more than one spawn on the map.
    #[error("team {0:?} has more than one spawn")]
    DuplicateSpawn(Team),
    /// The map is too large to index.
    #[error("map dimensions exceed the supported range")]
    TooLarge,
}

/// Static terrain decoded from a map description.
#[derive(Clone, Debug)]
pub(crate) struct MapLayout {
    pub(crate) dimensions: Dimensions,
    pub(crate) walls: Vec<bool>,
    pub(crate) spawns: [CellCoord; 2],
}

/// Parses a map where `#` is a wall, `.` open ground, and `A`/`B` the spawns.
pub(crate) fn parse(text: &str) -> Result<MapLayout, MapError> {
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(first) = rows.first() else {
        return Err(MapError::Empty);
    };
    let width = first.chars().count();
    if width == 0 {
        return Err(MapError::Empty);
    }

    let mut walls = Vec::with_capacity(width * rows.len());
    let mut spawns: [Option<CellCoord>; 2] = [None, None];

    for (row_index, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(MapError::Ragged {
                row: row_index,
                expected: width,
                found,
            });
        }

        for (column_index, glyph) in row.chars().enumerate() {
            let cell = CellCoord::new(
                u32::try_from(column_index).map_err(|_| MapError::TooLarge)?,
                u32::try_from(row_index).map_err(|_| MapError::TooLarge)?,
            );
            let team = match glyph {
                WALL_GLYPH => {
                    walls.push(true);
                    continue;
                }
                OPEN_GLYPH => {
                    walls.push(false);
                    continue;
                }
                SPAWN_A_GLYPH => Team::A,
                SPAWN_B_GLYPH => Team::B,
                _ => {
                    return Err(MapError::UnknownGlyph {
                        glyph,
                        column: column_index,
                        row: row_index,
                    })
                }
            };
            walls.push(false);
            let slot = &mut spawns[team.index()];
            if slot.is_some() {
                return Err(MapError::DuplicateSpawn(team));
            }
            *slot = Some(cell);
        }
    }

    let spawn_a = spawns[0].ok_or(MapError::MissingSpawn(Team::A))?;
    let spawn_b = spawns[1].ok_or(MapError::MissingSpawn(Team::B))?;
    let dimensions = Dimensions::new(
        u32::try_from(width).map_err(|_| MapError::TooLarge)?,
        u32::try_from(rows.len()).map_err(|_| MapError::TooLarge)?,
    );

    Ok(MapLayout {
        dimensions,
        walls,
        spawns: [spawn_a, spawn_b],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_walls_and_spawns() {
        let layout = parse("A.#\n..B\n").expect("valid map");

        assert_eq!(layout.dimensions, Dimensions::new(3, 2));
        assert_eq!(layout.walls, vec![false, false, true, false, false, false]);
        assert_eq!(layout.spawns, [CellCoord::new(0, 0), CellCoord::new(2, 1)]);
    }

    #[test]
    fn rejects_ragged_rows() {
        assert_eq!(
            parse("A..\n.B\n").unwrap_err(),
            MapError::Ragged {
                row: 1,
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn rejects_missing_and_duplicate_spawns() {
        assert_eq!(parse("A..\n...\n").unwrap_err(), MapError::MissingSpawn(Team::B));
        assert_eq!(parse("A.A\n..B\n").unwrap_err(), MapError::DuplicateSpawn(Team::A));
    }

    #[test]
    fn rejects_unknown_glyphs() {
        assert_eq!(
            parse("A?B\n").unwrap_err(),
            MapError::UnknownGlyph {
                glyph: '?',
                column: 1,
                row: 0,
            }
        );
    }
}
