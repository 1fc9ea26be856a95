//! End-to-end pipeline tests: events through belts on a two-plate world.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use orogen::{
    blend_history, derive_belt_drivers, simulate_history, BoundaryClass, Crust, CrustKind,
    EraInputs, EventKind, NeighborhoodMesh, PlateGraph, TectonicConfig, TectonicEvent,
};

const COLS: usize = 48;
const ROWS: usize = 32;

/// Two stacked plates: oceanic below, continental above, boundary along the
/// middle rows.
fn build_world() -> (NeighborhoodMesh, PlateGraph, Crust) {
    let mesh = NeighborhoodMesh::grid(COLS, ROWS, 1.0);

    let mut cell_plate = Vec::with_capacity(mesh.cell_count);
    let mut kind = Vec::with_capacity(mesh.cell_count);
    let mut strength = Vec::with_capacity(mesh.cell_count);
    for r in 0..ROWS {
        for _ in 0..COLS {
            if r < ROWS / 2 {
                cell_plate.push(0u16);
                kind.push(CrustKind::Oceanic);
                strength.push(0.4);
            } else {
                cell_plate.push(1u16);
                kind.push(CrustKind::Continental);
                strength.push(0.7);
            }
        }
    }

    let plates = PlateGraph {
        cell_plate,
        seed_x: vec![COLS as f32 * 0.5, COLS as f32 * 0.5],
        seed_y: vec![ROWS as f32 * 0.25, ROWS as f32 * 0.75],
    };
    let crust = Crust { kind, strength };
    (mesh, plates, crust)
}

/// Collision events seeded along the plate boundary.
fn boundary_events() -> Vec<TectonicEvent> {
    let row = ROWS / 2 - 1;
    (0..COLS)
        .step_by(3)
        .map(|c| TectonicEvent {
            kind: EventKind::Collision,
            seeds: vec![(row * COLS + c) as u32],
            uplift: 0.9,
            rift: 0.0,
            shear: 0.0,
            volcanism: 0.1,
            fracture: 0.2,
            drift_u: 0.2,
            drift_v: -1.0,
            drift_steps: 0,
            origin_plate: 0,
            polarity: -1,
        })
        .collect()
}

/// Both plates push toward the boundary, with a little deterministic jitter
/// so the fit has residuals to report.
fn convergent_forcing(mesh: &NeighborhoodMesh, plates: &PlateGraph) -> Vec<Vec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    (0..mesh.cell_count)
        .map(|cell| {
            let toward = if plates.cell_plate[cell] == 0 {
                Vec2::new(0.0, 0.5)
            } else {
                Vec2::new(0.0, -0.5)
            };
            let jitter = Vec2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * 0.1;
            toward + jitter
        })
        .collect()
}

fn era_inputs<'a>(events: &'a [TectonicEvent], forcing: &'a [Vec2], count: usize) -> Vec<EraInputs<'a>> {
    (0..count)
        .map(|_| EraInputs { events, forcing })
        .collect()
}

#[test]
fn era_count_is_validated_before_any_work() {
    let (mesh, plates, crust) = build_world();
    let events = boundary_events();
    let forcing = convergent_forcing(&mesh, &plates);
    let config = TectonicConfig::default();

    for count in [0, 4, 9] {
        let eras = era_inputs(&events, &forcing, count);
        let err = simulate_history(&mesh, &plates, &crust, &eras, &config).unwrap_err();
        assert!(err.to_string().contains("eraCount within 5..8"));
    }

    for count in 5..=8 {
        let eras = era_inputs(&events, &forcing, count);
        let history = simulate_history(&mesh, &plates, &crust, &eras, &config).unwrap();
        assert_eq!(history.era_count(), count);
    }
}

#[test]
fn full_pipeline_is_deterministic() {
    let (mesh, plates, crust) = build_world();
    let events = boundary_events();
    let forcing = convergent_forcing(&mesh, &plates);
    let config = TectonicConfig::default();
    let eras = era_inputs(&events, &forcing, 6);

    let run = || {
        let history = simulate_history(&mesh, &plates, &crust, &eras, &config).unwrap();
        let blended = blend_history(&history);
        let drivers = derive_belt_drivers(&mesh, &blended, &history.rollups, &config.belt);
        (history, blended, drivers)
    };

    let (history_a, blended_a, drivers_a) = run();
    let (history_b, blended_b, drivers_b) = run();

    assert_eq!(blended_a.uplift, blended_b.uplift);
    assert_eq!(blended_a.boundary_class, blended_b.boundary_class);
    assert_eq!(blended_a.dominant_era, blended_b.dominant_era);
    assert_eq!(drivers_a.stress, drivers_b.stress);
    assert_eq!(drivers_a.closeness, drivers_b.closeness);
    assert_eq!(drivers_a.belt_distance, drivers_b.belt_distance);
    for (ea, eb) in history_a.eras().iter().zip(history_b.eras()) {
        assert_eq!(ea.fields.uplift.value, eb.fields.uplift.value);
        assert_eq!(ea.fields.uplift.event_index, eb.fields.uplift.event_index);
        assert_eq!(ea.motion.fit_error, eb.motion.fit_error);
        assert_eq!(ea.segments.len(), eb.segments.len());
    }
}

#[test]
fn fitted_motion_and_segments_are_physical() {
    let (mesh, plates, crust) = build_world();
    let events = boundary_events();
    let forcing = convergent_forcing(&mesh, &plates);
    let config = TectonicConfig::default();
    let eras = era_inputs(&events, &forcing, 5);

    let history = simulate_history(&mesh, &plates, &crust, &eras, &config).unwrap();
    let era = history.era(0);

    // The fit recovers the authored convergent push.
    assert!(era.motion.velocity[0].y > 0.3);
    assert!(era.motion.velocity[1].y < -0.3);
    for p in 0..2 {
        assert!(era.motion.omega[p].is_finite());
        assert!(era.motion.fit_rms[p].is_finite());
        assert!(era.motion.fit_p90[p] >= 0.0);
    }

    // Every boundary segment is convergent with the oceanic side subducting.
    assert!(!era.segments.is_empty());
    for segment in &era.segments {
        assert_eq!(segment.regime, BoundaryClass::Convergent);
        assert!(segment.compression > 0);
        assert_eq!(segment.polarity, -1, "oceanic side subducts");
    }
}

#[test]
fn belts_read_as_bands_not_walls() {
    let (mesh, plates, crust) = build_world();
    let events = boundary_events();
    let forcing = convergent_forcing(&mesh, &plates);
    let config = TectonicConfig::default();
    let eras = era_inputs(&events, &forcing, 6);

    let history = simulate_history(&mesh, &plates, &crust, &eras, &config).unwrap();
    let blended = blend_history(&history);
    let drivers = derive_belt_drivers(&mesh, &blended, &history.rollups, &config.belt);

    let convergent: Vec<_> = drivers
        .components
        .iter()
        .filter(|c| c.class == BoundaryClass::Convergent)
        .collect();
    assert!(!convergent.is_empty());

    let mean_size: f32 = convergent.iter().map(|c| c.cell_count as f32).sum::<f32>()
        / convergent.len() as f32;
    assert!(mean_size >= 8.0, "belt components too small: {mean_size}");

    // Band density: mask cells should mostly sit next to other mask cells.
    let mask = &drivers.belt_mask;
    let mut neighbor_sum = 0usize;
    let mut mask_cells = 0usize;
    for cell in 0..mesh.cell_count {
        if mask[cell] == 0 {
            continue;
        }
        mask_cells += 1;
        neighbor_sum += mesh
            .neighbors(cell)
            .iter()
            .filter(|&&nb| mask[nb as usize] != 0)
            .count();
    }
    assert!(mask_cells > 0);
    let density = neighbor_sum as f32 / mask_cells as f32;
    assert!(density >= 2.0, "belt reads as isolated walls: {density}");
}

#[test]
fn mountain_cells_carry_driver_signal() {
    let (mesh, plates, crust) = build_world();
    let events = boundary_events();
    let forcing = convergent_forcing(&mesh, &plates);
    let config = TectonicConfig::default();
    let eras = era_inputs(&events, &forcing, 6);

    let history = simulate_history(&mesh, &plates, &crust, &eras, &config).unwrap();
    let blended = blend_history(&history);
    let drivers = derive_belt_drivers(&mesh, &blended, &history.rollups, &config.belt);

    // Stand in for the downstream terrain stage: cells with strong blended
    // uplift become mountains.
    let mountains: Vec<usize> = (0..mesh.cell_count)
        .filter(|&cell| blended.uplift[cell] >= 100)
        .collect();
    assert!(
        mountains.len() >= 20,
        "scenario produced too few mountains: {}",
        mountains.len()
    );

    let with_signal = mountains
        .iter()
        .filter(|&&cell| drivers.stress[cell] >= 32)
        .count();
    let near_zero = mountains
        .iter()
        .filter(|&&cell| drivers.stress[cell] < 8)
        .count();

    let coverage = with_signal as f32 / mountains.len() as f32;
    let dead = near_zero as f32 / mountains.len() as f32;
    assert!(coverage >= 0.7, "driver coverage too low: {coverage}");
    assert!(dead <= 0.1, "too many dead mountain cells: {dead}");
}

#[test]
fn presets_produce_distinct_worlds() {
    let (mesh, plates, crust) = build_world();
    let events = boundary_events();
    let forcing = convergent_forcing(&mesh, &plates);
    let eras = era_inputs(&events, &forcing, 5);

    let active = simulate_history(&mesh, &plates, &crust, &eras, &TectonicConfig::active()).unwrap();
    let calm = simulate_history(&mesh, &plates, &crust, &eras, &TectonicConfig::calm()).unwrap();

    let sum = |h: &orogen::TectonicHistory| -> u64 {
        h.era(0)
            .fields
            .uplift
            .value
            .iter()
            .map(|&v| v as u64)
            .sum()
    };
    assert!(sum(&active) > sum(&calm));
}
