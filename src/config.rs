//! Configuration for the tectonic driver pipeline.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_ERAS;
use crate::event::EventKind;
use crate::field::Channel;

/// Decay authored for one channel of one event kind.
///
/// `radius` is in mean-edge-length units (zero disables the channel for that
/// kind); `rate` is the exponent of the per-unit falloff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelDecay {
    pub radius: f32,
    pub rate: f32,
}

impl ChannelDecay {
    const OFF: ChannelDecay = ChannelDecay {
        radius: 0.0,
        rate: 0.0,
    };

    const fn new(radius: f32, rate: f32) -> Self {
        Self { radius, rate }
    }
}

/// Configuration for event-field synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionConfig {
    /// Decay radius/rate per event kind per channel, indexed by the dense
    /// enum indices.
    pub profiles: [[ChannelDecay; Channel::COUNT]; EventKind::COUNT],

    /// Global intensity pre-scale applied before byte clamping.
    pub blend: f32,

    /// Within-era emphasis: boosts collision-uplift and subduction-volcanism
    /// intensities. Set per era by the history driver.
    pub era_gain: f32,

    /// Extra drift steps added to every event this era (older eras have
    /// drifted further). Set per era by the history driver.
    pub drift_bonus_steps: u8,
}

impl DiffusionConfig {
    /// Decay entry for an event kind / channel pair.
    pub fn decay(&self, kind: EventKind, channel: Channel) -> ChannelDecay {
        self.profiles[kind.index()][channel.index()]
    }
}

fn default_profile(kind: EventKind) -> [ChannelDecay; Channel::COUNT] {
    let mut p = [ChannelDecay::OFF; Channel::COUNT];
    let set = |p: &mut [ChannelDecay; Channel::COUNT], c: Channel, d: ChannelDecay| {
        p[c.index()] = d;
    };
    match kind {
        EventKind::Collision => {
            set(&mut p, Channel::Uplift, ChannelDecay::new(10.0, 0.35));
            set(&mut p, Channel::Collision, ChannelDecay::new(10.0, 0.35));
            set(&mut p, Channel::Shear, ChannelDecay::new(4.0, 0.8));
            set(&mut p, Channel::Volcanism, ChannelDecay::new(3.0, 0.9));
            set(&mut p, Channel::Fracture, ChannelDecay::new(6.0, 0.5));
        }
        EventKind::Subduction => {
            set(&mut p, Channel::Uplift, ChannelDecay::new(8.0, 0.4));
            set(&mut p, Channel::Subduction, ChannelDecay::new(8.0, 0.4));
            set(&mut p, Channel::Volcanism, ChannelDecay::new(5.0, 0.5));
            set(&mut p, Channel::Fracture, ChannelDecay::new(5.0, 0.6));
            set(&mut p, Channel::Shear, ChannelDecay::new(3.0, 0.9));
        }
        EventKind::Rift => {
            set(&mut p, Channel::Rift, ChannelDecay::new(8.0, 0.4));
            set(&mut p, Channel::Fracture, ChannelDecay::new(6.0, 0.5));
            set(&mut p, Channel::Volcanism, ChannelDecay::new(4.0, 0.7));
        }
        EventKind::Shear => {
            set(&mut p, Channel::Shear, ChannelDecay::new(7.0, 0.45));
            set(&mut p, Channel::Fracture, ChannelDecay::new(5.0, 0.6));
        }
        EventKind::Hotspot => {
            set(&mut p, Channel::Volcanism, ChannelDecay::new(5.0, 0.5));
            set(&mut p, Channel::Uplift, ChannelDecay::new(3.0, 0.8));
        }
        EventKind::Fracture => {
            set(&mut p, Channel::Fracture, ChannelDecay::new(7.0, 0.45));
        }
    }
    p
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        let mut profiles = [[ChannelDecay::OFF; Channel::COUNT]; EventKind::COUNT];
        for kind in EventKind::ALL {
            profiles[kind.index()] = default_profile(kind);
        }
        Self {
            profiles,
            blend: 1.0,
            era_gain: 1.0,
            drift_bonus_steps: 0,
        }
    }
}

/// Configuration for plate motion fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Forcing low-pass iterations before fitting (0 or 1).
    pub smoothing_iterations: usize,

    /// Rotation clamp: omega magnitude never implies a tangential speed
    /// above `omega_factor × mean forcing speed` at the plate's effective
    /// radius.
    pub omega_factor: f32,

    /// Floor for the effective radius in the omega clamp, so tiny plates
    /// do not spin up unboundedly.
    pub plate_radius_min: f32,

    /// Residual histogram bin count (clamped to 8..=128 at use).
    pub histogram_bins: usize,

    /// P90 normalization scale for the quality score. A normalization, not
    /// a cap: the P90 estimate may exceed it.
    pub p90_norm: f32,

    /// Residual magnitude mapped to a full-scale fit error byte.
    pub fit_error_scale: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            smoothing_iterations: 1,
            omega_factor: 0.5,
            plate_radius_min: 4.0,
            histogram_bins: 48,
            p90_norm: 1.5,
            fit_error_scale: 2.0,
        }
    }
}

/// Configuration for boundary segment decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Relative velocity magnitude mapped to a full-scale intensity byte.
    pub intensity_scale: f32,

    /// Segments whose strongest component stays below this byte value are
    /// classified as no boundary.
    pub regime_min_intensity: u8,

    /// Minimum crust strength difference for polarity inference when both
    /// sides share a crust kind.
    pub polarity_strength_threshold: f32,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            intensity_scale: 160.0,
            regime_min_intensity: 8,
            polarity_strength_threshold: 0.15,
        }
    }
}

/// Per-era knobs applied by the history driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EraSchedule {
    /// Era gain handed to the synthesizer (see `DiffusionConfig::era_gain`).
    pub gain: f32,

    /// Extra drift steps for every event of the era.
    pub extra_drift_steps: u8,
}

/// Configuration for history simulation and blending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Schedule entries, oldest era first. When the history is longer than
    /// the schedule the last entry repeats.
    pub schedule: Vec<EraSchedule>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        // Older eras carry more drift and less within-era emphasis.
        let schedule = (0..MAX_ERAS)
            .map(|i| EraSchedule {
                gain: 1.0 + 0.05 * i as f32,
                extra_drift_steps: (MAX_ERAS - 1 - i) as u8,
            })
            .collect();
        Self { schedule }
    }
}

impl HistoryConfig {
    /// Schedule entry for era `index` out of `count`, aligned so the newest
    /// era always gets the newest entry.
    pub fn entry(&self, index: usize, count: usize) -> EraSchedule {
        if self.schedule.is_empty() {
            return EraSchedule {
                gain: 1.0,
                extra_drift_steps: 0,
            };
        }
        let skip = self.schedule.len().saturating_sub(count);
        let i = (index + skip).min(self.schedule.len() - 1);
        self.schedule[i]
    }
}

/// Configuration for belt derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeltConfig {
    /// BFS steps used to bridge small gaps between same-regime seeds.
    pub gap_fill_steps: u32,

    /// Connected components smaller than this are discarded as event dust.
    pub min_component_cells: usize,

    /// Wavefront cutoff base: `round(falloff_radius × sigma × width_scale)`
    /// steps per seed.
    pub falloff_radius: f32,

    /// How strongly seed age widens (and softens) the belt.
    pub age_sigma_gain: f32,
}

impl Default for BeltConfig {
    fn default() -> Self {
        Self {
            gap_fill_steps: 2,
            min_component_cells: 4,
            falloff_radius: 5.0,
            age_sigma_gain: 3.0,
        }
    }
}

/// Aggregate configuration for the full pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TectonicConfig {
    pub diffusion: DiffusionConfig,
    pub motion: MotionConfig,
    pub segment: SegmentConfig,
    pub history: HistoryConfig,
    pub belt: BeltConfig,
}

impl TectonicConfig {
    /// Preset for restless worlds: wider event reach, livelier rotation,
    /// sharper belts.
    pub fn active() -> Self {
        let mut config = Self::default();
        config.diffusion.blend = 1.15;
        config.motion.omega_factor = 0.7;
        config.belt.min_component_cells = 3;
        config
    }

    /// Preset for quiet worlds: subdued intensities and broader, softer
    /// belts.
    pub fn calm() -> Self {
        let mut config = Self::default();
        config.diffusion.blend = 0.8;
        config.motion.omega_factor = 0.35;
        config.belt.min_component_cells = 6;
        config.belt.falloff_radius = 6.0;
        config
    }
}
