//! Timing helpers for pipeline stages.

use std::time::Instant;

/// RAII timer that logs elapsed time for a pipeline stage on drop.
///
/// # Example
/// ```ignore
/// let _t = StageTimer::new("event diffusion");
/// // ... do work ...
/// // logs "event diffusion: 12.3ms" when _t is dropped
/// ```
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    /// Start timing a stage; logs at DEBUG level on drop.
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        log::debug!("{}: {:.3?}", self.stage, self.start.elapsed());
    }
}
