//! Tectonic driver-field core for procedural planet generation.
//!
//! This crate turns a sparse set of plate-boundary events into dense
//! per-cell geophysical driver fields that downstream terrain shaping
//! (mountains, coastlines, rivers) consumes as ground truth. The pipeline
//! runs in stages:
//!
//! **Stage 1: Event fields**
//! - Diffusion - multi-source expansion of event intensities into the seven
//!   channel fields, with deterministic provenance
//!
//! **Stage 2: Kinematics**
//! - Motion - rigid translation + rotation fitted per plate from a forcing
//!   field, with fit-quality diagnostics
//! - Segments - boundary edges decomposed into compression, extension and
//!   shear with convergence polarity
//!
//! **Stage 3: History**
//! - Eras - 5-8 discrete time-slices, each a full stage 1+2 run
//! - Blending - recency-weighted collapse into one present-day field
//!
//! **Stage 4: Belts**
//! - Belt drivers - gap-filled, noise-filtered boundary belts spread into
//!   smooth tile-facing fields
//!
//! All stages are pure functions over immutable mesh/crust/plate inputs;
//! the whole computation is single-threaded, batch and deterministic.
//! Rasterization onto the tile grid, mesh construction and mantle noise
//! synthesis are external collaborators.

mod belt;
mod config;
mod constants;
mod diffusion;
mod error;
mod event;
mod field;
mod history;
mod mesh;
mod motion;
mod plate;
mod segment;
mod util;

pub use belt::{derive_belt_drivers, BeltComponent, BeltDrivers};
pub use config::{
    BeltConfig, ChannelDecay, DiffusionConfig, EraSchedule, HistoryConfig, MotionConfig,
    SegmentConfig, TectonicConfig,
};
pub use constants::*;
pub use diffusion::synthesize_event_fields;
pub use error::HistoryError;
pub use event::{EventKind, TectonicEvent};
pub use field::{BoundaryClass, Channel, ChannelField, EventFields};
pub use history::{
    blend_history, simulate_history, BlendedField, Era, EraInputs, HistoryRollups,
    TectonicHistory,
};
pub use mesh::NeighborhoodMesh;
pub use motion::{fit_plate_motion, plate_velocity_at, PlateMotion};
pub use plate::{Crust, CrustKind, PlateGraph};
pub use segment::{decompose_segments, BoundarySegment};
pub use util::StageTimer;
