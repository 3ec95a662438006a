#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that scores grid cells by strategic desirability.
//!
//! The field starts every cell at a baseline and lowers it for cells that
//! still need capturing to complete a planned nest and for cells an enemy
//! stands on or touches. Lower values attract units; the field is rebuilt
//! from scratch every tick.

use std::collections::BTreeSet;

use restraint_core::{CellCoord, PotentialField, UnitSnapshot, WorldView};
use serde::Deserialize;

/// Tuning knobs controlling the shape of the potential field.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldTuning {
    /// Value reported for cells nothing lowered.
    pub baseline: f64,
    /// Amount subtracted from every completion target; larger values pull idle units toward unfinished nests.
    pub completion_benefit: f64,
    /// Scale applied to the square of an enemy's health before subtracting it around the enemy.
    pub enemy_strength_factor: f64,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            baseline: PotentialField::DEFAULT_BASELINE,
            completion_benefit: 0.1,
            enemy_strength_factor: 0.01,
        }
    }
}

/// Builds the per-tick potential field from world state.
#[derive(Clone, Debug, Default)]
pub struct PotentialFieldBuilder {
    tuning: FieldTuning,
}

impl PotentialFieldBuilder {
    /// Creates a builder with the provided tuning surface.
    #[must_use]
    pub fn new(tuning: FieldTuning) -> Self {
        Self { tuning }
    }

    /// Tuning the builder applies.
    #[must_use]
    pub fn tuning(&self) -> &FieldTuning {
        &self.tuning
    }

    /// Computes the field for the current tick.
    ///
    /// `completion` holds the planned cells that are still neutral. Each
    /// enemy lowers its own cell and the four orthogonal neighbours by
    /// `enemy_strength_factor * health²`; walls absorb the penalty.
    /// Friendly units do not shape the field today.
    #[must_use]
    pub fn build<W>(
        &self,
        world: &W,
        completion: &BTreeSet<CellCoord>,
        _friendly: &[UnitSnapshot],
        enemies: &[UnitSnapshot],
    ) -> PotentialField
    where
        W: WorldView + ?Sized,
    {
        let mut field = PotentialField::with_baseline(self.tuning.baseline);

        for &cell in completion {
            field.subtract(cell, self.tuning.completion_benefit);
        }

        for enemy in enemies {
            let threat = self.threat(enemy.health);
            field.subtract(enemy.cell, threat);

            for neighbour in world.neighbours(enemy.cell).cells() {
                if world.is_wall(neighbour) {
                    continue;
                }
                field.subtract(neighbour, threat);
            }
        }

        field
    }

    fn threat(&self, health: u32) -> f64 {
        let health = f64::from(health);
        self.tuning.enemy_strength_factor * health * health
    }
}
