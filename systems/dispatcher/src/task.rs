use restraint_core::CellCoord;

/// Objective a task was created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Heading for a cell of the largest enemy nest cluster.
    Attack,
    /// Heading for the cheapest capturable tile.
    Expand,
}

/// Standing assignment of a single unit: a target and the steps left to reach it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    kind: TaskKind,
    target: CellCoord,
    // Next step last.
    steps: Vec<CellCoord>,
    complete: bool,
}

impl Task {
    /// Creates a task from a path that starts on the unit's cell and ends on
    /// `target`.
    ///
    /// The leading cell is dropped since the unit already stands there.
    /// Returns `None` when no step remains.
    #[must_use]
    pub fn from_path(kind: TaskKind, target: CellCoord, path: &[CellCoord]) -> Option<Self> {
        let (_, steps) = path.split_first()?;
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            target,
            steps: steps.iter().rev().copied().collect(),
            complete: false,
        })
    }

    /// Objective the task pursues.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Cell the task leads to.
    #[must_use]
    pub const fn target(&self) -> CellCoord {
        self.target
    }

    /// Number of steps not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether the owning unit needs a new task.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Consumes the next step, completing the task when it is the final one.
    pub fn next_move(&mut self) -> Option<CellCoord> {
        self.complete = self.steps.len() <= 1;
        self.steps.pop()
    }

    /// Marks the task complete so the unit is reassigned at its next idle check.
    pub fn invalidate(&mut self) {
        self.complete = true;
    }
}
