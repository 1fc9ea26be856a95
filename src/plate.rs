//! Plate partition and crust inputs.
//!
//! Both are produced by external collaborators (the plate-graph and crust
//! providers) and consumed read-only by the motion fitter, the segment
//! decomposer and the belt deriver.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Crust composition of a cell - affects boundary behavior and polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrustKind {
    Oceanic,
    Continental,
}

/// Per-cell crustal properties.
#[derive(Clone, Debug)]
pub struct Crust {
    /// Crust composition per cell.
    pub kind: Vec<CrustKind>,

    /// Crust strength per cell, 0..1. Strong crust resists compression.
    pub strength: Vec<f32>,
}

/// Plate partition: which plate each cell belongs to, plus per-plate seed
/// positions used as periodic unwrap references.
#[derive(Clone, Debug)]
pub struct PlateGraph {
    /// For each cell index, which plate it belongs to.
    pub cell_plate: Vec<u16>,

    /// Seed X position per plate.
    pub seed_x: Vec<f32>,

    /// Seed Y position per plate.
    pub seed_y: Vec<f32>,
}

impl PlateGraph {
    /// Number of plates.
    pub fn plate_count(&self) -> usize {
        self.seed_x.len()
    }

    /// Seed position of a plate. Cells of the plate are unwrapped relative
    /// to this point so a plate is never split by the periodic seam.
    pub fn seed(&self, plate: usize) -> Vec2 {
        Vec2::new(self.seed_x[plate], self.seed_y[plate])
    }
}
