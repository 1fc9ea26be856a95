//! Constants for the tectonic driver pipeline.

/// Minimum number of eras a tectonic history may hold.
pub const MIN_ERAS: usize = 5;

/// Maximum number of eras a tectonic history may hold.
pub const MAX_ERAS: usize = 8;

/// Maximum belt age in eras-before-present. Ages are clamped to this when
/// deriving belt widths, so a history shorter than `MAX_ERAS` still maps
/// onto the full width range.
pub const MAX_BELT_AGE: u8 = (MAX_ERAS - 1) as u8;

// Era blending

/// Recency falloff for per-era blend weights: `exp(-ERA_RECENCY_FALLOFF * age)`
/// where age is eras-before-present.
pub const ERA_RECENCY_FALLOFF: f32 = 0.7;

/// Weight boost applied to the era that last reworked a given cell. A cell's
/// own most-recent-activity era counts more than its nominal recency rank.
pub const ERA_ACTIVE_BOOST: f32 = 1.25;

/// Weight damp applied to every era that is not the cell's last-active one.
pub const ERA_INACTIVE_DAMP: f32 = 0.85;

/// Number of newest eras counted as "recent" by the recent-fraction rollup.
pub const RECENT_ERA_SPAN: usize = 2;

// Belt derivation

/// Width-scale at zero recent activity (old, spread-out belts).
pub const WIDTH_SCALE_BASE: f32 = 1.25;

/// How much a fully recent history narrows the belt width-scale.
pub const WIDTH_SCALE_RECENCY: f32 = 0.5;

// Segment decomposition

/// Compression response floor: crust of zero strength still resists
/// compression at this fraction of the nominal response.
pub const COMPRESSION_RESISTANCE_BASE: f32 = 0.5;

/// Extension response at zero crust strength.
pub const EXTENSION_WEAKNESS_BASE: f32 = 1.25;

/// How much crust strength suppresses the extension response. Strong crust
/// resists compression more than it resists extension, so this slope is
/// shallower than the compression gain.
pub const EXTENSION_WEAKNESS_SLOPE: f32 = 0.75;

/// Secondary volcanism as a fraction of convergent compression.
pub const CONV_VOLCANISM_FACTOR: f32 = 0.6;

/// Secondary fracture as a fraction of convergent compression.
pub const CONV_FRACTURE_FACTOR: f32 = 0.25;

/// Secondary volcanism as a fraction of divergent extension.
pub const DIV_VOLCANISM_FACTOR: f32 = 0.4;

/// Secondary fracture as a fraction of divergent extension.
pub const DIV_FRACTURE_FACTOR: f32 = 0.35;

/// Secondary fracture as a fraction of transform shear.
pub const TRANSFORM_FRACTURE_FACTOR: f32 = 0.5;

// Quantization

/// Scale applied to event drift vectors before clamping to the signed byte
/// range stored in the boundary drift arrays.
pub const DRIFT_QUANT: f32 = 64.0;

// Motion fitting

/// Residual histogram span as a multiple of the P90 normalization scale.
/// Residuals beyond `p90_norm * HIST_RANGE_FACTOR` land in the last bin, so
/// the P90 estimate can legitimately exceed `p90_norm` (the norm is a
/// normalization scale, not a cap).
pub const HIST_RANGE_FACTOR: f32 = 4.0;

// Numeric guards

/// Floor for weight denominators in f64 accumulation.
pub const EPS_WEIGHT: f64 = 1e-9;

/// Floor for edge/vector lengths in f32 geometry.
pub const EPS_LEN: f32 = 1e-6;
