//! Event-field synthesis: diffusing sparse events into dense channel fields.
//!
//! Every event is expanded outward from its (drifted) seed cells with a
//! multi-source Dijkstra pass over the mesh graph. Distances are measured in
//! mean-edge-length units so authored radii stay comparable across mesh
//! resolutions, and all channel writes go through the shared
//! replace-if-better comparator so the result is independent of event order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::config::DiffusionConfig;
use crate::constants::{DRIFT_QUANT, EPS_LEN};
use crate::event::{EventKind, TectonicEvent};
use crate::field::{BoundaryClass, Channel, Claim, EventFields};
use crate::mesh::NeighborhoodMesh;
use crate::util::StageTimer;

/// Visited bookkeeping reused across events.
///
/// Instead of clearing a whole-mesh array per event, cells carry a
/// generation stamp: a cell is "visited this event" only when its stamp
/// matches the current generation. The counter is owned by the enclosing
/// call and the backing array is cleared before the counter can wrap.
struct VisitScratch {
    stamp: Vec<u32>,
    dist: Vec<f32>,
    generation: u32,
}

impl VisitScratch {
    fn new(cell_count: usize) -> Self {
        Self {
            stamp: vec![0; cell_count],
            dist: vec![f32::INFINITY; cell_count],
            generation: 0,
        }
    }

    fn next_generation(&mut self) {
        if self.generation == u32::MAX {
            self.stamp.fill(0);
            self.generation = 0;
        }
        self.generation += 1;
    }

    fn dist(&self, cell: usize) -> f32 {
        if self.stamp[cell] == self.generation {
            self.dist[cell]
        } else {
            f32::INFINITY
        }
    }

    fn set(&mut self, cell: usize, dist: f32) {
        self.stamp[cell] = self.generation;
        self.dist[cell] = dist;
    }
}

/// Synthesize the seven channel fields plus the resolved per-cell boundary
/// classification from a list of events.
pub fn synthesize_event_fields(
    mesh: &NeighborhoodMesh,
    events: &[TectonicEvent],
    config: &DiffusionConfig,
) -> EventFields {
    let _t = StageTimer::new("event diffusion");

    let n = mesh.cell_count;
    let mut fields = EventFields::new(n);
    let mean_edge = mesh.mean_edge_length().max(EPS_LEN);

    let mut scratch = VisitScratch::new(n);
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, u32)>> = BinaryHeap::new();

    for (event_index, event) in events.iter().enumerate() {
        let (intensities, max_radius) = event_intensities(event, config);
        if max_radius <= 0.0 {
            // Nothing to diffuse; skip without touching the heap.
            continue;
        }

        scratch.next_generation();
        heap.clear();

        for &seed in &event.seeds {
            let Some(seed) = drift_seed(mesh, seed, event, config.drift_bonus_steps) else {
                continue;
            };
            if scratch.dist(seed) > 0.0 {
                scratch.set(seed, 0.0);
                heap.push(Reverse((OrderedFloat(0.0), seed as u32)));
            }
        }

        while let Some(Reverse((OrderedFloat(d), cell))) = heap.pop() {
            let cell = cell as usize;
            if d > scratch.dist(cell) {
                continue;
            }

            stamp_channels(&mut fields, event, event_index as u32, &intensities, cell, d, config);

            for &nb in mesh.neighbors(cell) {
                let nb = nb as usize;
                if nb >= n {
                    continue;
                }
                let step = mesh.delta(cell, nb).length() / mean_edge;
                let nd = d + step;
                if nd <= max_radius && nd < scratch.dist(nb) {
                    scratch.set(nb, nd);
                    heap.push(Reverse((OrderedFloat(nd), nb as u32)));
                }
            }
        }
    }

    resolve_boundaries(&mut fields, events);
    fields
}

/// Byte intensities per channel for one event (blend and era gain applied),
/// plus the largest active decay radius.
fn event_intensities(
    event: &TectonicEvent,
    config: &DiffusionConfig,
) -> ([u8; Channel::COUNT], f32) {
    let mut intensities = [0u8; Channel::COUNT];
    let mut max_radius = 0.0f32;

    for channel in Channel::ALL {
        let mut raw = event.channel_intensity(channel);
        if !raw.is_finite() || raw <= 0.0 {
            continue;
        }
        if era_boosted(event.kind, channel) {
            raw *= config.era_gain;
        }
        let byte = (raw * config.blend * 255.0).round().clamp(0.0, 255.0) as u8;
        if byte == 0 {
            continue;
        }
        intensities[channel.index()] = byte;

        let decay = config.decay(event.kind, channel);
        if decay.radius > 0.0 {
            max_radius = max_radius.max(decay.radius);
        }
    }

    (intensities, max_radius)
}

/// Within-era emphasis applies to convergent uplift and subduction
/// volcanism only.
fn era_boosted(kind: EventKind, channel: Channel) -> bool {
    match kind {
        EventKind::Collision => matches!(channel, Channel::Uplift | Channel::Collision),
        EventKind::Subduction => channel == Channel::Volcanism,
        _ => false,
    }
}

/// Walk a seed along the event's drift: a greedy directional walk that
/// repeatedly steps to the neighbor best aligned with the drift direction.
/// Returns `None` for out-of-range seed ids.
fn drift_seed(
    mesh: &NeighborhoodMesh,
    seed: u32,
    event: &TectonicEvent,
    bonus_steps: u8,
) -> Option<usize> {
    let n = mesh.cell_count;
    let mut cell = seed as usize;
    if cell >= n {
        return None;
    }

    let drift = event.drift();
    let steps = event.drift_steps.saturating_add(bonus_steps);
    if steps == 0 || drift.length_squared() <= EPS_LEN * EPS_LEN {
        return Some(cell);
    }
    let dir = drift.normalize();

    for _ in 0..steps {
        let mut best = None;
        let mut best_align = 0.0f32;
        for &nb in mesh.neighbors(cell) {
            let nb = nb as usize;
            if nb >= n {
                continue;
            }
            let delta = mesh.delta(cell, nb);
            let len = delta.length();
            if len <= EPS_LEN {
                continue;
            }
            let align = delta.dot(dir) / len;
            if align > best_align {
                best_align = align;
                best = Some(nb);
            }
        }
        match best {
            Some(nb) => cell = nb,
            None => break,
        }
    }

    Some(cell)
}

/// Offer this event's decayed intensities to every channel at one cell.
fn stamp_channels(
    fields: &mut EventFields,
    event: &TectonicEvent,
    event_index: u32,
    intensities: &[u8; Channel::COUNT],
    cell: usize,
    dist: f32,
    config: &DiffusionConfig,
) {
    let kind = event.kind.index() as u8;
    for channel in Channel::ALL {
        let intensity = intensities[channel.index()];
        if intensity == 0 {
            continue;
        }
        let decay = config.decay(event.kind, channel);
        if decay.radius <= 0.0 || dist > decay.radius {
            continue;
        }
        let score = intensity as f32 * (-dist * decay.rate).exp();
        if score <= 0.0 {
            continue;
        }
        fields.channel_mut(channel).offer(
            cell,
            Claim {
                score,
                intensity,
                event_kind: kind,
                event_index,
            },
            event.origin_plate,
            event.polarity,
        );
    }
}

/// Resolve each cell's boundary classification from the three regime
/// channels, using the same ordering rule as the channel updates.
fn resolve_boundaries(fields: &mut EventFields, events: &[TectonicEvent]) {
    let EventFields {
        uplift,
        rift,
        shear,
        boundary_class,
        boundary_polarity,
        boundary_intensity,
        boundary_origin_plate,
        boundary_drift_u,
        boundary_drift_v,
        ..
    } = fields;

    let candidates = [
        (BoundaryClass::Convergent, &*uplift),
        (BoundaryClass::Divergent, &*rift),
        (BoundaryClass::Transform, &*shear),
    ];

    for cell in 0..boundary_class.len() {
        let mut winner: Option<(BoundaryClass, f32, u8, u32)> = None;
        for (class, channel) in candidates {
            let score = channel.score[cell];
            if score <= 0.0 {
                continue;
            }
            let value = channel.value[cell];
            let better = match winner {
                None => true,
                // Strictly-greater comparison keeps the earlier (higher
                // priority) channel on full ties.
                Some((_, ws, wv, _)) => score > ws || (score == ws && value > wv),
            };
            if better {
                winner = Some((class, score, value, channel.event_index[cell]));
            }
        }

        let Some((class, _, value, event_index)) = winner else {
            continue;
        };
        let channel = match class {
            BoundaryClass::Convergent => &*uplift,
            BoundaryClass::Divergent => &*rift,
            _ => &*shear,
        };
        boundary_class[cell] = class as u8;
        boundary_polarity[cell] = channel.polarity[cell];
        boundary_intensity[cell] = value;
        boundary_origin_plate[cell] = channel.origin_plate[cell];
        if let Some(event) = events.get(event_index as usize) {
            boundary_drift_u[cell] = quantize_drift(event.drift_u);
            boundary_drift_v[cell] = quantize_drift(event.drift_v);
        }
    }
}

fn quantize_drift(d: f32) -> i8 {
    (d * DRIFT_QUANT).round().clamp(-127.0, 127.0) as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collision_event(seeds: Vec<u32>) -> TectonicEvent {
        TectonicEvent {
            kind: EventKind::Collision,
            seeds,
            uplift: 0.9,
            rift: 0.0,
            shear: 0.0,
            volcanism: 0.0,
            fracture: 0.2,
            drift_u: 0.0,
            drift_v: 0.0,
            drift_steps: 0,
            origin_plate: 3,
            polarity: 1,
        }
    }

    #[test]
    fn scores_decay_with_distance() {
        let mesh = NeighborhoodMesh::grid(16, 16, 1.0);
        let seed = 8 + 8 * 16;
        let fields = synthesize_event_fields(
            &mesh,
            &[collision_event(vec![seed as u32])],
            &DiffusionConfig::default(),
        );

        let at_seed = fields.uplift.value[seed];
        let one_off = fields.uplift.value[seed + 1];
        let far = fields.uplift.value[seed + 7];
        assert!(at_seed > one_off, "{at_seed} vs {one_off}");
        assert!(one_off > far, "{one_off} vs {far}");
        assert_eq!(fields.uplift.origin_plate[seed], 3);
        assert_eq!(fields.boundary_class[seed], BoundaryClass::Convergent as u8);
    }

    #[test]
    fn out_of_range_seeds_are_dropped() {
        let mesh = NeighborhoodMesh::grid(8, 8, 1.0);
        let fields = synthesize_event_fields(
            &mesh,
            &[collision_event(vec![9999])],
            &DiffusionConfig::default(),
        );
        assert!(fields.uplift.value.iter().all(|&v| v == 0));
    }

    #[test]
    fn drift_walk_moves_the_seed() {
        let mesh = NeighborhoodMesh::grid(16, 4, 1.0);
        let mut event = collision_event(vec![0]);
        event.drift_u = 1.0;
        event.drift_steps = 3;

        let landed = drift_seed(&mesh, 0, &event, 0).unwrap();
        assert_eq!(landed, 3);
    }

    #[test]
    fn drift_walk_wraps_the_seam() {
        let mesh = NeighborhoodMesh::grid(8, 4, 1.0);
        let mut event = collision_event(vec![0]);
        event.drift_u = -1.0;
        event.drift_steps = 2;

        let landed = drift_seed(&mesh, 0, &event, 0).unwrap();
        assert_eq!(landed, 6);
    }

    #[test]
    fn two_runs_are_byte_identical() {
        let mesh = NeighborhoodMesh::grid(24, 12, 1.0);
        let events = vec![
            collision_event(vec![30, 31, 32]),
            TectonicEvent {
                kind: EventKind::Rift,
                rift: 0.7,
                ..collision_event(vec![100, 101])
            },
        ];
        let config = DiffusionConfig::default();

        let a = synthesize_event_fields(&mesh, &events, &config);
        let b = synthesize_event_fields(&mesh, &events, &config);
        assert_eq!(a.uplift.value, b.uplift.value);
        assert_eq!(a.rift.value, b.rift.value);
        assert_eq!(a.boundary_class, b.boundary_class);
        assert_eq!(a.uplift.event_index, b.uplift.event_index);
    }

    #[test]
    fn equal_scores_resolve_by_event_identity() {
        let mesh = NeighborhoodMesh::grid(9, 3, 1.0);
        // Two identical events whose seeds straddle cell 4 symmetrically.
        let mut left = collision_event(vec![3]);
        left.origin_plate = 1;
        let mut right = collision_event(vec![5]);
        right.origin_plate = 2;

        let config = DiffusionConfig::default();
        let forward = synthesize_event_fields(&mesh, &[left.clone(), right.clone()], &config);
        let reversed = synthesize_event_fields(&mesh, &[right, left], &config);

        // In the forward list the left event has index 0 and must win the
        // midpoint; with the list reversed the (now index 0) right event
        // wins. Either way the winner is the lower event index.
        assert_eq!(forward.uplift.event_index[4], 0);
        assert_eq!(reversed.uplift.event_index[4], 0);
    }
}
