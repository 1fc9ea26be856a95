//! Per-channel driver fields and the winner-takes-cell update rule.
//!
//! Each channel tracks, per cell, both the rendered byte potential and the
//! provenance of the event that produced it. Provenance is what makes the
//! update rule a total order: ties on score and intensity are broken by the
//! `(event kind, event index)` pair, never by write order.

use serde::{Deserialize, Serialize};

/// One scalar driver channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Combined convergent uplift.
    Uplift,
    /// Continent-continent collision share of uplift.
    Collision,
    /// Subduction share of uplift.
    Subduction,
    Rift,
    Shear,
    Volcanism,
    Fracture,
}

impl Channel {
    /// All channels, in tie-break priority order (lower index wins ties).
    pub const ALL: [Channel; 7] = [
        Channel::Uplift,
        Channel::Collision,
        Channel::Subduction,
        Channel::Rift,
        Channel::Shear,
        Channel::Volcanism,
        Channel::Fracture,
    ];

    /// Number of channels.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of this channel.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Boundary regime classification shared by cells and segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BoundaryClass {
    None = 0,
    Convergent = 1,
    Divergent = 2,
    Transform = 3,
}

impl BoundaryClass {
    /// Decode a byte previously produced by `as u8`.
    pub fn from_u8(v: u8) -> BoundaryClass {
        match v {
            1 => BoundaryClass::Convergent,
            2 => BoundaryClass::Divergent,
            3 => BoundaryClass::Transform,
            _ => BoundaryClass::None,
        }
    }
}

/// A challenger for a cell's channel slot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Claim {
    pub score: f32,
    pub intensity: u8,
    pub event_kind: u8,
    pub event_index: u32,
}

/// Total-order comparison used by every channel-update site.
///
/// Higher score wins; on equal score higher intensity wins; on equal
/// intensity the lower `(event kind, event index)` pair wins. The result
/// never depends on the order claims arrive in.
pub(crate) fn claim_wins(new: &Claim, cur: &Claim) -> bool {
    if new.score != cur.score {
        return new.score > cur.score;
    }
    if new.intensity != cur.intensity {
        return new.intensity > cur.intensity;
    }
    (new.event_kind, new.event_index) < (cur.event_kind, cur.event_index)
}

/// Parallel per-cell arrays for one channel.
#[derive(Clone, Debug)]
pub struct ChannelField {
    /// Rendered potential, 0..255. Monotonically derived from `score`;
    /// an untouched cell (score ≤ 0) stays at 0.
    pub value: Vec<u8>,

    /// Raw intensity × decay, used only for comparisons, never emitted.
    pub score: Vec<f32>,

    /// Clamped source intensity of the winning event.
    pub intensity: Vec<u8>,

    /// Kind of the winning event (dense `EventKind` index; `u8::MAX` when
    /// untouched).
    pub event_kind: Vec<u8>,

    /// Index of the winning event in the input list (`u32::MAX` untouched).
    pub event_index: Vec<u32>,

    /// Originating plate of the winning event.
    pub origin_plate: Vec<u16>,

    /// Signed polarity of the winning event.
    pub polarity: Vec<i8>,
}

impl ChannelField {
    /// All-zero field for `cell_count` cells.
    pub fn new(cell_count: usize) -> Self {
        Self {
            value: vec![0; cell_count],
            score: vec![0.0; cell_count],
            intensity: vec![0; cell_count],
            event_kind: vec![u8::MAX; cell_count],
            event_index: vec![u32::MAX; cell_count],
            origin_plate: vec![0; cell_count],
            polarity: vec![0; cell_count],
        }
    }

    /// Replace-if-better. Returns whether the claim took the cell.
    pub(crate) fn offer(
        &mut self,
        cell: usize,
        claim: Claim,
        origin_plate: u16,
        polarity: i8,
    ) -> bool {
        if claim.score <= 0.0 {
            return false;
        }
        let cur = Claim {
            score: self.score[cell],
            intensity: self.intensity[cell],
            event_kind: self.event_kind[cell],
            event_index: self.event_index[cell],
        };
        if self.score[cell] > 0.0 && !claim_wins(&claim, &cur) {
            return false;
        }

        self.score[cell] = claim.score;
        self.value[cell] = claim.score.round().clamp(0.0, 255.0) as u8;
        self.intensity[cell] = claim.intensity;
        self.event_kind[cell] = claim.event_kind;
        self.event_index[cell] = claim.event_index;
        self.origin_plate[cell] = origin_plate;
        self.polarity[cell] = polarity;
        true
    }
}

/// Full synthesized field set: the seven channels plus the resolved per-cell
/// boundary classification.
#[derive(Clone, Debug)]
pub struct EventFields {
    pub uplift: ChannelField,
    pub collision: ChannelField,
    pub subduction: ChannelField,
    pub rift: ChannelField,
    pub shear: ChannelField,
    pub volcanism: ChannelField,
    pub fracture: ChannelField,

    /// Resolved boundary class per cell (`BoundaryClass` as byte).
    pub boundary_class: Vec<u8>,

    /// Polarity of the winning boundary channel.
    pub boundary_polarity: Vec<i8>,

    /// Value of the winning boundary channel.
    pub boundary_intensity: Vec<u8>,

    /// Originating plate of the winning boundary channel.
    pub boundary_origin_plate: Vec<u16>,

    /// Winning event's drift, quantized to a signed byte per axis.
    pub boundary_drift_u: Vec<i8>,
    pub boundary_drift_v: Vec<i8>,
}

impl EventFields {
    /// All-zero field set for `cell_count` cells.
    pub fn new(cell_count: usize) -> Self {
        Self {
            uplift: ChannelField::new(cell_count),
            collision: ChannelField::new(cell_count),
            subduction: ChannelField::new(cell_count),
            rift: ChannelField::new(cell_count),
            shear: ChannelField::new(cell_count),
            volcanism: ChannelField::new(cell_count),
            fracture: ChannelField::new(cell_count),
            boundary_class: vec![0; cell_count],
            boundary_polarity: vec![0; cell_count],
            boundary_intensity: vec![0; cell_count],
            boundary_origin_plate: vec![0; cell_count],
            boundary_drift_u: vec![0; cell_count],
            boundary_drift_v: vec![0; cell_count],
        }
    }

    /// Number of cells covered by this field set.
    pub fn cell_count(&self) -> usize {
        self.uplift.value.len()
    }

    /// Channel accessor by enum.
    pub fn channel(&self, channel: Channel) -> &ChannelField {
        match channel {
            Channel::Uplift => &self.uplift,
            Channel::Collision => &self.collision,
            Channel::Subduction => &self.subduction,
            Channel::Rift => &self.rift,
            Channel::Shear => &self.shear,
            Channel::Volcanism => &self.volcanism,
            Channel::Fracture => &self.fracture,
        }
    }

    /// Mutable channel accessor by enum.
    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelField {
        match channel {
            Channel::Uplift => &mut self.uplift,
            Channel::Collision => &mut self.collision,
            Channel::Subduction => &mut self.subduction,
            Channel::Rift => &mut self.rift,
            Channel::Shear => &mut self.shear,
            Channel::Volcanism => &mut self.volcanism,
            Channel::Fracture => &mut self.fracture,
        }
    }
}
