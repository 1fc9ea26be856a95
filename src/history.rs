//! Era history: simulation, rollups and recency-weighted blending.
//!
//! A history is an ordered run of 5-8 eras, oldest first. Each era is a full
//! synthesizer + motion-fit + segment-decomposition pass over that era's
//! inputs. Assembly validates the era-count contract up front, derives the
//! per-cell provenance rollups, and blending collapses the whole stack into
//! one present-day field with a dominant-era map.

use glam::Vec2;
use smallvec::SmallVec;

use crate::config::TectonicConfig;
use crate::constants::{
    ERA_ACTIVE_BOOST, ERA_INACTIVE_DAMP, ERA_RECENCY_FALLOFF, MAX_BELT_AGE, MAX_ERAS, MIN_ERAS,
    RECENT_ERA_SPAN, WIDTH_SCALE_BASE, WIDTH_SCALE_RECENCY,
};
use crate::diffusion::synthesize_event_fields;
use crate::error::HistoryError;
use crate::event::TectonicEvent;
use crate::field::{BoundaryClass, EventFields};
use crate::mesh::NeighborhoodMesh;
use crate::motion::{fit_plate_motion, PlateMotion};
use crate::plate::{Crust, PlateGraph};
use crate::segment::{decompose_segments, BoundarySegment};
use crate::util::StageTimer;

/// One simulated time-slice of the tectonic history.
#[derive(Clone, Debug)]
pub struct Era {
    pub fields: EventFields,
    pub motion: PlateMotion,
    pub segments: Vec<BoundarySegment>,
}

impl Era {
    /// Run one era: synthesize fields from this era's events, fit plate
    /// motion from this era's forcing, decompose the boundary segments.
    pub fn simulate(
        mesh: &NeighborhoodMesh,
        plates: &PlateGraph,
        crust: &Crust,
        events: &[TectonicEvent],
        forcing: &[Vec2],
        config: &TectonicConfig,
        era_gain: f32,
        extra_drift_steps: u8,
    ) -> Era {
        let mut diffusion = config.diffusion.clone();
        diffusion.era_gain = era_gain;
        diffusion.drift_bonus_steps = extra_drift_steps;

        let fields = synthesize_event_fields(mesh, events, &diffusion);
        let motion = fit_plate_motion(mesh, plates, forcing, &config.motion);
        let segments = decompose_segments(mesh, plates, crust, &motion, &config.segment);

        Era {
            fields,
            motion,
            segments,
        }
    }
}

/// Per-cell provenance summarized across eras.
#[derive(Clone, Debug)]
pub struct HistoryRollups {
    /// Summed uplift value across eras, saturating.
    pub uplift_total: Vec<u16>,

    /// Summed volcanism value across eras, saturating.
    pub volcanism_total: Vec<u16>,

    /// Summed fracture value across eras, saturating.
    pub fracture_total: Vec<u16>,

    /// Fraction of the uplift total contributed by the newest eras, 0..255.
    pub recent_fraction: Vec<u8>,

    /// Newest era with boundary activity at the cell, -1 if none.
    pub last_active_era: Vec<i16>,

    /// Oldest era with boundary activity at the cell, -1 if none.
    pub origin_era: Vec<i16>,

    /// Originating plate of the boundary winner at the origin era.
    pub origin_plate: Vec<u16>,

    /// Newest era with a resolved boundary class, -1 if none.
    pub last_boundary_era: Vec<i16>,

    /// Boundary class at `last_boundary_era` (`BoundaryClass` as byte).
    pub last_boundary_class: Vec<u8>,
}

/// An assembled, validated era sequence plus its rollups.
///
/// Eras are append-only and read-only once assembled; storage is a
/// fixed-capacity small vector sized to the contractual maximum.
#[derive(Clone, Debug)]
pub struct TectonicHistory {
    eras: SmallVec<[Era; MAX_ERAS]>,
    pub rollups: HistoryRollups,
}

impl TectonicHistory {
    /// Validate the era-count contract and derive the rollups.
    pub fn assemble(eras: Vec<Era>) -> Result<TectonicHistory, HistoryError> {
        if !(MIN_ERAS..=MAX_ERAS).contains(&eras.len()) {
            return Err(HistoryError::EraCount(eras.len()));
        }
        let rollups = build_rollups(&eras);
        Ok(TectonicHistory {
            eras: SmallVec::from_vec(eras),
            rollups,
        })
    }

    /// Number of eras, oldest first.
    pub fn era_count(&self) -> usize {
        self.eras.len()
    }

    /// All eras, oldest first.
    pub fn eras(&self) -> &[Era] {
        &self.eras
    }

    /// One era by index (0 = oldest).
    pub fn era(&self, index: usize) -> &Era {
        &self.eras[index]
    }
}

fn build_rollups(eras: &[Era]) -> HistoryRollups {
    let n = eras[0].fields.cell_count();
    let mut rollups = HistoryRollups {
        uplift_total: vec![0; n],
        volcanism_total: vec![0; n],
        fracture_total: vec![0; n],
        recent_fraction: vec![0; n],
        last_active_era: vec![-1; n],
        origin_era: vec![-1; n],
        origin_plate: vec![0; n],
        last_boundary_era: vec![-1; n],
        last_boundary_class: vec![0; n],
    };

    let recent_start = eras.len().saturating_sub(RECENT_ERA_SPAN);
    let mut recent_uplift = vec![0u16; n];

    for (index, era) in eras.iter().enumerate() {
        let fields = &era.fields;
        for cell in 0..n {
            let uplift = fields.uplift.value[cell] as u16;
            rollups.uplift_total[cell] = rollups.uplift_total[cell].saturating_add(uplift);
            rollups.volcanism_total[cell] = rollups.volcanism_total[cell]
                .saturating_add(fields.volcanism.value[cell] as u16);
            rollups.fracture_total[cell] = rollups.fracture_total[cell]
                .saturating_add(fields.fracture.value[cell] as u16);
            if index >= recent_start {
                recent_uplift[cell] = recent_uplift[cell].saturating_add(uplift);
            }

            if fields.boundary_class[cell] != BoundaryClass::None as u8 {
                if rollups.origin_era[cell] < 0 {
                    rollups.origin_era[cell] = index as i16;
                    rollups.origin_plate[cell] = fields.boundary_origin_plate[cell];
                }
                rollups.last_active_era[cell] = index as i16;
                rollups.last_boundary_era[cell] = index as i16;
                rollups.last_boundary_class[cell] = fields.boundary_class[cell];
            }
        }
    }

    for cell in 0..n {
        let total = rollups.uplift_total[cell];
        if total > 0 {
            let frac = recent_uplift[cell] as f32 / total as f32;
            rollups.recent_fraction[cell] = (frac * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    rollups
}

/// The blended present-day field.
#[derive(Clone, Debug)]
pub struct BlendedField {
    pub uplift: Vec<u8>,
    pub rift: Vec<u8>,
    pub shear: Vec<u8>,

    /// Index of the era whose weighted intensity dominates the cell.
    pub dominant_era: Vec<u8>,

    /// Boundary class of the dominant era, falling back to the provenance
    /// class when the dominant era itself shows none.
    pub boundary_class: Vec<u8>,

    /// Eras-before-present of the cell's defining era, clamped to
    /// `[0, MAX_BELT_AGE]`.
    pub belt_age: Vec<u8>,

    /// Belt width multiplier derived from the recent-fraction rollup:
    /// recently active belts are narrower and sharper.
    pub width_scale: Vec<f32>,
}

/// Collapse the era stack into one recency-weighted field.
pub fn blend_history(history: &TectonicHistory) -> BlendedField {
    let _t = StageTimer::new("history blend");

    let eras = history.eras();
    let count = eras.len();
    let n = eras[0].fields.cell_count();
    let rollups = &history.rollups;

    let mut blended = BlendedField {
        uplift: vec![0; n],
        rift: vec![0; n],
        shear: vec![0; n],
        dominant_era: vec![(count - 1) as u8; n],
        boundary_class: vec![0; n],
        belt_age: vec![MAX_BELT_AGE; n],
        width_scale: vec![WIDTH_SCALE_BASE; n],
    };

    // Base weight per era depends only on recency rank; the per-cell boost
    // depends on the cell's own last-active era.
    let base: Vec<f32> = (0..count)
        .map(|index| {
            let age = (count - 1 - index) as f32;
            (-ERA_RECENCY_FALLOFF * age).exp()
        })
        .collect();

    for cell in 0..n {
        let last_active = rollups.last_active_era[cell];

        let mut weight_sum = 0.0f32;
        let mut uplift_sum = 0.0f32;
        let mut rift_sum = 0.0f32;
        let mut shear_sum = 0.0f32;
        let mut dominant = count - 1;
        let mut dominant_score = 0.0f32;

        for (index, era) in eras.iter().enumerate() {
            let boost = if last_active == index as i16 {
                ERA_ACTIVE_BOOST
            } else {
                ERA_INACTIVE_DAMP
            };
            let w = base[index] * boost;
            weight_sum += w;

            let fields = &era.fields;
            let uplift = fields.uplift.value[cell] as f32;
            let rift = fields.rift.value[cell] as f32;
            let shear = fields.shear.value[cell] as f32;
            uplift_sum += w * uplift;
            rift_sum += w * rift;
            shear_sum += w * shear;

            // >= ties toward the more recent era.
            let score = w * (uplift + rift + shear);
            if score >= dominant_score {
                dominant_score = score;
                dominant = index;
            }
        }

        if weight_sum > 0.0 {
            blended.uplift[cell] = to_byte(uplift_sum / weight_sum);
            blended.rift[cell] = to_byte(rift_sum / weight_sum);
            blended.shear[cell] = to_byte(shear_sum / weight_sum);
        }
        blended.dominant_era[cell] = dominant as u8;

        let class = eras[dominant].fields.boundary_class[cell];
        blended.boundary_class[cell] = if class != BoundaryClass::None as u8 {
            class
        } else {
            rollups.last_boundary_class[cell]
        };

        let defining = if last_active >= 0 {
            last_active
        } else {
            rollups.origin_era[cell]
        };
        if defining >= 0 {
            let age = (count - 1) as i16 - defining;
            blended.belt_age[cell] = age.clamp(0, MAX_BELT_AGE as i16) as u8;
        }

        let recent = rollups.recent_fraction[cell] as f32 / 255.0;
        blended.width_scale[cell] = WIDTH_SCALE_BASE - WIDTH_SCALE_RECENCY * recent;
    }

    blended
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Inputs for one era of a history run.
#[derive(Clone, Copy)]
pub struct EraInputs<'a> {
    pub events: &'a [TectonicEvent],
    pub forcing: &'a [Vec2],
}

/// Run and assemble a full history from per-era inputs (oldest first).
///
/// The era count is validated before any computation; the per-era gain and
/// drift schedule comes from the history config, aligned so the newest era
/// always uses the newest schedule entry.
pub fn simulate_history(
    mesh: &NeighborhoodMesh,
    plates: &PlateGraph,
    crust: &Crust,
    eras: &[EraInputs<'_>],
    config: &TectonicConfig,
) -> Result<TectonicHistory, HistoryError> {
    if !(MIN_ERAS..=MAX_ERAS).contains(&eras.len()) {
        return Err(HistoryError::EraCount(eras.len()));
    }

    let _t = StageTimer::new("history simulation");
    log::debug!("simulating {} eras over {} cells", eras.len(), mesh.cell_count);

    let count = eras.len();
    let mut simulated = Vec::with_capacity(count);
    for (index, inputs) in eras.iter().enumerate() {
        let entry = config.history.entry(index, count);
        simulated.push(Era::simulate(
            mesh,
            plates,
            crust,
            inputs.events,
            inputs.forcing,
            config,
            entry.gain,
            entry.extra_drift_steps,
        ));
    }

    TectonicHistory::assemble(simulated)
}
