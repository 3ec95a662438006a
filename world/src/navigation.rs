//! Breadth-first navigation helpers used by the world crate.

use std::collections::{HashMap, VecDeque};

use restraint_core::{CellCoord, Dimensions, Neighbours, Topology};

/// Dense step-count grid seeded from a single origin cell.
///
/// The world keeps one field per spawn so distance queries against either
/// spawn, which the nest planner issues for every visited cell, avoid a fresh
/// search. Distances default to `u32::MAX` for unreachable cells so callers can
/// distinguish walls from traversable tiles.
#[derive(Clone, Debug, Default)]
pub(crate) struct NavigationField {
    dimensions: Option<Dimensions>,
    origin: Option<CellCoord>,
    distances: Vec<u32>,
}

impl NavigationField {
    /// Rebuilds the distances using a breadth-first search from `origin`.
    pub(crate) fn rebuild_with<F>(
        &mut self,
        topology: Topology,
        dimensions: Dimensions,
        origin: CellCoord,
        mut is_blocked: F,
    ) where
        F: FnMut(CellCoord) -> bool,
    {
        let cell_count = dimensions.cell_count();
        self.dimensions = Some(dimensions);
        self.origin = Some(origin);

        if self.distances.len() != cell_count {
            self.distances = vec![u32::MAX; cell_count];
        } else {
            self.distances.fill(u32::MAX);
        }

        let Some(origin_index) = dimensions.index(origin) else {
            return;
        };
        if is_blocked(origin) {
            return;
        }

        self.distances[origin_index] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(origin);

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = dimensions.index(cell) else {
                continue;
            };
            let next_distance = self.distances[current_index].saturating_add(1);

            for neighbour in Neighbours::on(topology, dimensions, cell).cells() {
                if is_blocked(neighbour) {
                    continue;
                }

                let Some(neighbour_index) = dimensions.index(neighbour) else {
                    continue;
                };

                if self.distances[neighbour_index] <= next_distance {
                    continue;
                }

                self.distances[neighbour_index] = next_distance;
                queue.push_back(neighbour);
            }
        }
    }

    /// Cell the field was seeded from.
    #[must_use]
    pub(crate) fn origin(&self) -> Option<CellCoord> {
        self.origin
    }

    /// Steps from the origin to the cell, if reachable.
    #[must_use]
    pub(crate) fn distance(&self, cell: CellCoord) -> Option<u32> {
        let index = self.dimensions?.index(cell)?;
        self.distances
            .get(index)
            .copied()
            .filter(|distance| *distance != u32::MAX)
    }
}

/// Shortest path from `from` to `to`, both inclusive, that never enters a
/// blocked cell.
pub(crate) fn breadth_first_path<F>(
    topology: Topology,
    dimensions: Dimensions,
    from: CellCoord,
    to: CellCoord,
    mut is_blocked: F,
) -> Option<Vec<CellCoord>>
where
    F: FnMut(CellCoord) -> bool,
{
    if !dimensions.contains(from) || !dimensions.contains(to) {
        return None;
    }
    if from == to {
        return Some(vec![to]);
    }
    if is_blocked(to) {
        return None;
    }

    let mut parents: HashMap<CellCoord, CellCoord> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(from);

    while let Some(cell) = queue.pop_front() {
        if cell == to {
            let mut path = vec![to];
            let mut cursor = to;
            while let Some(parent) = parents.get(&cursor).copied() {
                path.push(parent);
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }

        for neighbour in Neighbours::on(topology, dimensions, cell).cells() {
            if neighbour == from || parents.contains_key(&neighbour) || is_blocked(neighbour) {
                continue;
            }
            let _ = parents.insert(neighbour, cell);
            queue.push_back(neighbour);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_with_sets_origin_to_zero() {
        let mut field = NavigationField::default();

        field.rebuild_with(
            Topology::Toroidal,
            Dimensions::new(3, 4),
            CellCoord::new(1, 2),
            |_| false,
        );

        assert_eq!(field.distance(CellCoord::new(1, 2)), Some(0));
        assert_eq!(field.distance(CellCoord::new(1, 1)), Some(1));
        assert_eq!(field.distance(CellCoord::new(1, 0)), Some(2));
        assert_eq!(field.distance(CellCoord::new(0, 0)), Some(3));
    }

    #[test]
    fn rebuild_with_wraps_around_edges() {
        let mut field = NavigationField::default();

        field.rebuild_with(
            Topology::Toroidal,
            Dimensions::new(5, 1),
            CellCoord::new(0, 0),
            |_| false,
        );

        assert_eq!(field.distance(CellCoord::new(4, 0)), Some(1));
        assert_eq!(field.distance(CellCoord::new(3, 0)), Some(2));
    }

    #[test]
    fn rebuild_with_respects_walls() {
        let mut field = NavigationField::default();
        let wall = CellCoord::new(1, 1);

        field.rebuild_with(
            Topology::Toroidal,
            Dimensions::new(3, 3),
            CellCoord::new(1, 2),
            |cell| cell == wall,
        );

        assert_eq!(field.distance(wall), None);
        assert_eq!(field.distance(CellCoord::new(1, 0)), Some(1));
        assert_eq!(field.distance(CellCoord::new(0, 1)), Some(2));
    }

    #[test]
    fn rebuild_with_stops_at_bounded_edges() {
        let mut field = NavigationField::default();

        field.rebuild_with(
            Topology::Bounded,
            Dimensions::new(5, 1),
            CellCoord::new(0, 0),
            |_| false,
        );

        assert_eq!(field.distance(CellCoord::new(4, 0)), Some(4));
    }

    #[test]
    fn breadth_first_path_includes_both_endpoints() {
        let path = breadth_first_path(
            Topology::Toroidal,
            Dimensions::new(6, 6),
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
            |_| false,
        );

        assert_eq!(
            path,
            Some(vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(2, 0),
            ])
        );
    }

    #[test]
    fn breadth_first_path_fails_when_goal_is_sealed() {
        let goal = CellCoord::new(2, 2);
        let sealed = Neighbours::on(Topology::Toroidal, Dimensions::new(5, 5), goal)
            .cells()
            .collect::<Vec<_>>();

        let path = breadth_first_path(
            Topology::Toroidal,
            Dimensions::new(5, 5),
            CellCoord::new(0, 0),
            goal,
            |cell| sealed.contains(&cell),
        );

        assert!(path.is_none());
    }
}
