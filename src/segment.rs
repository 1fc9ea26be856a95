//! Boundary segment decomposition.
//!
//! Every mesh edge crossing a plate boundary is visited exactly once and the
//! relative rigid-body velocity at its midpoint is split into a
//! boundary-normal part (compression or extension) and a boundary-tangential
//! part (shear). Because plate velocity is evaluated at the midpoint rather
//! than at the cell centers, a pure rotation differential produces nonzero
//! shear even with zero net translation.

use glam::Vec2;

use crate::config::SegmentConfig;
use crate::constants::{
    COMPRESSION_RESISTANCE_BASE, CONV_FRACTURE_FACTOR, CONV_VOLCANISM_FACTOR,
    DIV_FRACTURE_FACTOR, DIV_VOLCANISM_FACTOR, EPS_LEN, EXTENSION_WEAKNESS_BASE,
    EXTENSION_WEAKNESS_SLOPE, TRANSFORM_FRACTURE_FACTOR,
};
use crate::field::BoundaryClass;
use crate::mesh::NeighborhoodMesh;
use crate::motion::{plate_velocity_at, PlateMotion};
use crate::plate::{Crust, CrustKind, PlateGraph};
use crate::util::StageTimer;

/// One decomposed boundary edge, stored once per adjacency pair
/// (`a_cell < b_cell`).
#[derive(Clone, Debug)]
pub struct BoundarySegment {
    pub a_cell: u32,
    pub b_cell: u32,
    pub plate_a: u16,
    pub plate_b: u16,

    /// Dominant regime, or `None` below the intensity gate.
    pub regime: BoundaryClass,

    /// Which side subducts at a convergent segment: -1 = A side, +1 = B
    /// side, 0 = undecided.
    pub polarity: i8,

    pub compression: u8,
    pub extension: u8,
    pub shear: u8,

    /// Secondary volcanism, a fixed linear function of the regime's primary
    /// intensity.
    pub volcanism: u8,

    /// Secondary fracture, likewise.
    pub fracture: u8,

    /// Relative velocity direction, quantized to a signed byte per axis.
    pub drift_u: i8,
    pub drift_v: i8,
}

/// Decompose every plate-boundary edge of the mesh.
pub fn decompose_segments(
    mesh: &NeighborhoodMesh,
    plates: &PlateGraph,
    crust: &Crust,
    motion: &PlateMotion,
    config: &SegmentConfig,
) -> Vec<BoundarySegment> {
    let _t = StageTimer::new("segment decomposition");

    let n = mesh.cell_count;
    assert_eq!(plates.cell_plate.len(), n);
    assert_eq!(crust.kind.len(), n);
    assert_eq!(crust.strength.len(), n);
    let mut segments = Vec::new();

    for a in 0..n {
        let plate_a = plates.cell_plate[a];
        for &b in mesh.neighbors(a) {
            let b = b as usize;
            if b <= a || b >= n {
                continue; // each undirected edge once
            }
            let plate_b = plates.cell_plate[b];
            if plate_a == plate_b {
                continue;
            }

            if let Some(segment) =
                decompose_edge(mesh, crust, motion, config, a, b, plate_a, plate_b)
            {
                segments.push(segment);
            }
        }
    }

    segments
}

#[allow(clippy::too_many_arguments)]
fn decompose_edge(
    mesh: &NeighborhoodMesh,
    crust: &Crust,
    motion: &PlateMotion,
    config: &SegmentConfig,
    a: usize,
    b: usize,
    plate_a: u16,
    plate_b: u16,
) -> Option<BoundarySegment> {
    let delta = mesh.delta(a, b);
    let len = delta.length();
    if len <= EPS_LEN {
        return None; // degenerate edge
    }
    let normal = delta / len;
    let tangent = Vec2::new(-normal.y, normal.x);

    // Rigid velocity of each plate at the shared midpoint.
    let midpoint = mesh.site(a) + 0.5 * delta;
    let vel = |plate: u16| {
        let p = plate as usize;
        let c = motion.center[p];
        let r = Vec2::new(mesh.wrap_dx(midpoint.x - c.x), midpoint.y - c.y);
        plate_velocity_at(motion, p, r)
    };
    let relative = vel(plate_b) - vel(plate_a);

    // Normal points A -> B, so a negative normal velocity closes the edge.
    let vn = relative.dot(normal);
    let vt = relative.dot(tangent);

    // Crustal resistance scales compression up and extension down: strong
    // crust resists being shortened more than it resists being pulled apart.
    let strength_a = crust.strength[a].clamp(0.0, 1.0);
    let strength_b = crust.strength[b].clamp(0.0, 1.0);
    let resistance = 0.5 * (strength_a + strength_b);

    let scale = config.intensity_scale;
    let compression = to_byte((-vn).max(0.0) * scale * (COMPRESSION_RESISTANCE_BASE + resistance));
    let extension = to_byte(
        vn.max(0.0) * scale * (EXTENSION_WEAKNESS_BASE - EXTENSION_WEAKNESS_SLOPE * resistance),
    );
    let shear = to_byte(vt.abs() * scale);

    // Largest component wins; ties break compression > extension > shear.
    let mut regime = BoundaryClass::None;
    let mut primary = 0u8;
    for (value, class) in [
        (compression, BoundaryClass::Convergent),
        (extension, BoundaryClass::Divergent),
        (shear, BoundaryClass::Transform),
    ] {
        if value > primary {
            primary = value;
            regime = class;
        }
    }
    if primary < config.regime_min_intensity {
        regime = BoundaryClass::None;
        primary = 0;
    }

    let polarity = if regime == BoundaryClass::Convergent {
        convergent_polarity(
            crust.kind[a],
            crust.kind[b],
            strength_a,
            strength_b,
            config.polarity_strength_threshold,
        )
    } else {
        0
    };

    let (volcanism, fracture) = match regime {
        BoundaryClass::Convergent => (
            scaled(primary, CONV_VOLCANISM_FACTOR),
            scaled(primary, CONV_FRACTURE_FACTOR),
        ),
        BoundaryClass::Divergent => (
            scaled(primary, DIV_VOLCANISM_FACTOR),
            scaled(primary, DIV_FRACTURE_FACTOR),
        ),
        BoundaryClass::Transform => (0, scaled(primary, TRANSFORM_FRACTURE_FACTOR)),
        BoundaryClass::None => (0, 0),
    };

    let drift = if relative.length() > EPS_LEN {
        relative.normalize() * 127.0
    } else {
        Vec2::ZERO
    };

    Some(BoundarySegment {
        a_cell: a as u32,
        b_cell: b as u32,
        plate_a,
        plate_b,
        regime,
        polarity,
        compression,
        extension,
        shear,
        volcanism,
        fracture,
        drift_u: drift.x.round().clamp(-127.0, 127.0) as i8,
        drift_v: drift.y.round().clamp(-127.0, 127.0) as i8,
    })
}

/// Who subducts: crust-kind asymmetry decides first (oceanic dives under
/// continental); between like crusts the clearly weaker side subducts;
/// otherwise undecided.
fn convergent_polarity(
    kind_a: CrustKind,
    kind_b: CrustKind,
    strength_a: f32,
    strength_b: f32,
    threshold: f32,
) -> i8 {
    match (kind_a, kind_b) {
        (CrustKind::Oceanic, CrustKind::Continental) => -1,
        (CrustKind::Continental, CrustKind::Oceanic) => 1,
        _ => {
            if strength_a < strength_b - threshold {
                -1
            } else if strength_b < strength_a - threshold {
                1
            } else {
                0
            }
        }
    }
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn scaled(primary: u8, factor: f32) -> u8 {
    (primary as f32 * factor).round().clamp(0.0, 255.0) as u8
}
