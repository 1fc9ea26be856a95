//! Error types for contract violations.

use thiserror::Error;

/// Errors surfaced when assembling a tectonic history.
///
/// Numeric edge cases (degenerate plates, zero-length edges, non-finite
/// forcing) are handled inline with neutral fallbacks and never reach this
/// type; only genuine contract violations do.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// The era sequence is outside the supported range.
    #[error("tectonic history requires eraCount within 5..8, got {0}")]
    EraCount(usize),
}
