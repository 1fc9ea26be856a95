//! Sparse tectonic events - the seeded sources every driver field grows from.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::field::Channel;

/// What kind of boundary process an event records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Continent-continent convergence.
    Collision,
    /// Convergence with one side diving under the other.
    Subduction,
    /// Divergent spreading.
    Rift,
    /// Transform shear zone.
    Shear,
    /// Intraplate volcanic center.
    Hotspot,
    /// Brittle deformation without a dominant regime.
    Fracture,
}

impl EventKind {
    /// All kinds, in dense-index order.
    pub const ALL: [EventKind; 6] = [
        EventKind::Collision,
        EventKind::Subduction,
        EventKind::Rift,
        EventKind::Shear,
        EventKind::Hotspot,
        EventKind::Fracture,
    ];

    /// Number of kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of this kind.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One immutable boundary event.
///
/// Intensities are authored in 0..1 and scaled to bytes by the synthesizer.
/// The drift vector describes where the event's surface expression has
/// migrated since the event occurred; seeds are walked along it before
/// diffusion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TectonicEvent {
    pub kind: EventKind,

    /// Seed cell ids. Out-of-range ids are silently dropped.
    pub seeds: Vec<u32>,

    /// Convergent uplift contribution, 0..1.
    pub uplift: f32,
    /// Rift contribution, 0..1.
    pub rift: f32,
    /// Shear contribution, 0..1.
    pub shear: f32,
    /// Volcanism contribution, 0..1.
    pub volcanism: f32,
    /// Fracture contribution, 0..1.
    pub fracture: f32,

    /// Drift direction, X component.
    pub drift_u: f32,
    /// Drift direction, Y component.
    pub drift_v: f32,
    /// How many neighbor steps the seeds have drifted.
    pub drift_steps: u8,

    /// Plate the event originated on.
    pub origin_plate: u16,

    /// Signed convergence polarity carried into the uplift provenance.
    pub polarity: i8,
}

impl TectonicEvent {
    /// Drift vector as a glam value.
    pub fn drift(&self) -> Vec2 {
        Vec2::new(self.drift_u, self.drift_v)
    }

    /// Raw 0..1 intensity this event contributes to a channel.
    ///
    /// The uplift contribution lands on the combined uplift channel and,
    /// depending on the event kind, on exactly one of the collision and
    /// subduction sub-channels.
    pub fn channel_intensity(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Uplift => self.uplift,
            Channel::Collision => {
                if self.kind == EventKind::Collision {
                    self.uplift
                } else {
                    0.0
                }
            }
            Channel::Subduction => {
                if self.kind == EventKind::Subduction {
                    self.uplift
                } else {
                    0.0
                }
            }
            Channel::Rift => self.rift,
            Channel::Shear => self.shear,
            Channel::Volcanism => self.volcanism,
            Channel::Fracture => self.fracture,
        }
    }
}
