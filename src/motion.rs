//! Rigid plate motion fitted from a per-cell forcing field.
//!
//! Each plate's kinematics are a translation plus a signed angular velocity
//! about its weighted centroid. The fit downweights boundary-adjacent cells
//! (their forcing is least representative of interior motion) and reuses
//! the identical weight and position computation in all three passes, so
//! translation, rotation and residuals stay mutually consistent.
//!
//! Accumulation is double precision; emitted fields are single precision or
//! byte-quantized.

use glam::Vec2;

use crate::config::MotionConfig;
use crate::constants::{EPS_LEN, EPS_WEIGHT, HIST_RANGE_FACTOR};
use crate::mesh::NeighborhoodMesh;
use crate::plate::PlateGraph;
use crate::util::StageTimer;

/// Fitted rigid motion per plate, with fit-quality diagnostics.
#[derive(Clone, Debug)]
pub struct PlateMotion {
    /// Weighted centroid per plate, in seed-unwrapped coordinates.
    pub center: Vec<Vec2>,

    /// Translation per plate.
    pub velocity: Vec<Vec2>,

    /// Signed angular velocity per plate, clamped so the implied tangential
    /// speed at the plate's effective radius stays physical.
    pub omega: Vec<f32>,

    /// Weighted RMS of the per-cell fit residual.
    pub fit_rms: Vec<f32>,

    /// Estimated 90th percentile of the residual distribution. Normalized
    /// by `p90_norm` for the quality score but never capped at it.
    pub fit_p90: Vec<f32>,

    /// Fit quality per plate: `clamp01(1 - p90/p90_norm)` as a byte.
    pub quality: Vec<u8>,

    /// Residual magnitude per cell, byte-quantized by `fit_error_scale`.
    pub fit_error: Vec<u8>,
}

/// Fit each plate's rigid motion from a per-cell 2-D forcing field.
pub fn fit_plate_motion(
    mesh: &NeighborhoodMesh,
    plates: &PlateGraph,
    forcing: &[Vec2],
    config: &MotionConfig,
) -> PlateMotion {
    let _t = StageTimer::new("plate motion fit");

    let n = mesh.cell_count;
    assert_eq!(plates.cell_plate.len(), n);
    assert_eq!(forcing.len(), n);
    let plate_count = plates.plate_count();

    let forcing = smoothed_forcing(mesh, forcing, config.smoothing_iterations.min(1));

    // Shared weight and unwrapped position per cell, reused by every pass.
    let mut weight = vec![0.0f64; n];
    let mut pos = vec![Vec2::ZERO; n];
    for cell in 0..n {
        let degree = mesh.boundary_degree(cell, &plates.cell_plate);
        weight[cell] = (mesh.area(cell) as f64 / (1.0 + degree as f64)).max(0.0);

        let plate = plates.cell_plate[cell] as usize;
        let seed = plates.seed(plate);
        let site = mesh.site(cell);
        pos[cell] = Vec2::new(seed.x + mesh.wrap_dx(site.x - seed.x), site.y);
    }

    // Pass 1: weighted centroid, translation and mean forcing speed.
    let mut sw = vec![0.0f64; plate_count];
    let mut sx = vec![0.0f64; plate_count];
    let mut sy = vec![0.0f64; plate_count];
    let mut svx = vec![0.0f64; plate_count];
    let mut svy = vec![0.0f64; plate_count];
    let mut sspeed = vec![0.0f64; plate_count];
    for cell in 0..n {
        let p = plates.cell_plate[cell] as usize;
        let w = weight[cell];
        let v = forcing[cell];
        sw[p] += w;
        sx[p] += w * pos[cell].x as f64;
        sy[p] += w * pos[cell].y as f64;
        svx[p] += w * v.x as f64;
        svy[p] += w * v.y as f64;
        sspeed[p] += w * v.length() as f64;
    }

    let mut center = vec![Vec2::ZERO; plate_count];
    let mut velocity = vec![Vec2::ZERO; plate_count];
    let mut mean_speed = vec![0.0f64; plate_count];
    let mut degenerate = vec![false; plate_count];
    for p in 0..plate_count {
        if sw[p] <= EPS_WEIGHT {
            // Zero-weight plate: neutral motion anchored at the seed.
            center[p] = plates.seed(p);
            degenerate[p] = true;
            continue;
        }
        center[p] = Vec2::new((sx[p] / sw[p]) as f32, (sy[p] / sw[p]) as f32);
        velocity[p] = Vec2::new((svx[p] / sw[p]) as f32, (svy[p] / sw[p]) as f32);
        mean_speed[p] = sspeed[p] / sw[p];
    }

    // Pass 2: least-squares angular velocity about the centroid,
    // omega = sum(w * r x dv) / sum(w * |r|^2), clamped so rotation never
    // implies a tangential speed above omega_factor * mean forcing speed at
    // the plate's effective radius.
    let mut s_cross = vec![0.0f64; plate_count];
    let mut s_r2 = vec![0.0f64; plate_count];
    for cell in 0..n {
        let p = plates.cell_plate[cell] as usize;
        if degenerate[p] {
            continue;
        }
        let w = weight[cell];
        let r = pos[cell] - center[p];
        let dv = forcing[cell] - velocity[p];
        s_cross[p] += w * (r.x as f64 * dv.y as f64 - r.y as f64 * dv.x as f64);
        s_r2[p] += w * (r.length_squared() as f64);
    }

    let mut omega = vec![0.0f32; plate_count];
    for p in 0..plate_count {
        if degenerate[p] || s_r2[p] <= EPS_WEIGHT {
            continue;
        }
        let raw = (s_cross[p] / s_r2[p]) as f32;
        let rms_radius = (s_r2[p] / sw[p]).sqrt() as f32;
        let effective_radius = rms_radius.max(config.plate_radius_min).max(EPS_LEN);
        let cap = config.omega_factor * mean_speed[p] as f32 / effective_radius;
        omega[p] = raw.clamp(-cap, cap);
    }

    // Pass 3: residuals against the fitted rigid motion, accumulated into a
    // weighted RMS and a log-spaced histogram for the P90 estimate. Linear
    // bins would let the long residual tail swallow the resolution near
    // zero, so bins are spaced by log1p and read back through expm1.
    let bins = config.histogram_bins.clamp(8, 128);
    let limit = (config.p90_norm * HIST_RANGE_FACTOR).max(EPS_LEN);
    let log_limit = (limit as f64).ln_1p();

    let mut hist = vec![0.0f64; plate_count * bins];
    let mut s_err2 = vec![0.0f64; plate_count];
    let mut fit_error = vec![0u8; n];
    for cell in 0..n {
        let p = plates.cell_plate[cell] as usize;
        if degenerate[p] {
            continue;
        }
        let w = weight[cell];
        let r = pos[cell] - center[p];
        let predicted = velocity[p] + omega[p] * Vec2::new(-r.y, r.x);
        let err = (forcing[cell] - predicted).length();

        fit_error[cell] =
            (err / config.fit_error_scale * 255.0).round().clamp(0.0, 255.0) as u8;
        s_err2[p] += w * (err as f64) * (err as f64);

        let t = ((err as f64).ln_1p() / log_limit).clamp(0.0, 1.0);
        let bin = ((t * bins as f64) as usize).min(bins - 1);
        hist[p * bins + bin] += w;
    }

    let mut fit_rms = vec![0.0f32; plate_count];
    let mut fit_p90 = vec![0.0f32; plate_count];
    let mut quality = vec![0u8; plate_count];
    for p in 0..plate_count {
        if degenerate[p] {
            quality[p] = 255;
            continue;
        }
        fit_rms[p] = (s_err2[p] / sw[p]).sqrt() as f32;
        fit_p90[p] = histogram_p90(&hist[p * bins..(p + 1) * bins], log_limit);
        let q = (1.0 - fit_p90[p] / config.p90_norm).clamp(0.0, 1.0);
        quality[p] = (q * 255.0).round() as u8;
    }

    PlateMotion {
        center,
        velocity,
        omega,
        fit_rms,
        fit_p90,
        quality,
        fit_error,
    }
}

/// Rigid velocity of a plate evaluated at an arbitrary point.
pub fn plate_velocity_at(motion: &PlateMotion, plate: usize, r: Vec2) -> Vec2 {
    motion.velocity[plate] + motion.omega[plate] * Vec2::new(-r.y, r.x)
}

/// One optional neighbor-averaging pass over the forcing field. Non-finite
/// inputs are replaced with zero either way.
fn smoothed_forcing(mesh: &NeighborhoodMesh, forcing: &[Vec2], iterations: usize) -> Vec<Vec2> {
    let n = mesh.cell_count;
    let mut out: Vec<Vec2> = (0..n)
        .map(|cell| {
            let v = forcing[cell];
            if v.is_finite() {
                v
            } else {
                Vec2::ZERO
            }
        })
        .collect();

    for _ in 0..iterations {
        let prev = out.clone();
        for (cell, slot) in out.iter_mut().enumerate() {
            let mut sum = prev[cell];
            let mut count = 1.0f32;
            for &nb in mesh.neighbors(cell) {
                let nb = nb as usize;
                if nb >= n {
                    continue;
                }
                sum += prev[nb];
                count += 1.0;
            }
            *slot = sum / count;
        }
    }

    out
}

/// Weighted 90th percentile from a log1p-spaced histogram.
fn histogram_p90(hist: &[f64], log_limit: f64) -> f32 {
    let total: f64 = hist.iter().sum();
    if total <= EPS_WEIGHT {
        return 0.0;
    }
    let target = 0.9 * total;
    let bins = hist.len();

    let mut cum = 0.0f64;
    for (bin, &w) in hist.iter().enumerate() {
        if cum + w >= target {
            let frac = if w > 0.0 { (target - cum) / w } else { 0.0 };
            let t = (bin as f64 + frac) / bins as f64;
            return (t * log_limit).exp_m1() as f32;
        }
        cum += w;
    }

    log_limit.exp_m1() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionConfig;

    fn single_plate(mesh: &NeighborhoodMesh) -> PlateGraph {
        PlateGraph {
            cell_plate: vec![0; mesh.cell_count],
            seed_x: vec![mesh.wrap_width * 0.5],
            seed_y: vec![4.0],
        }
    }

    #[test]
    fn pure_translation_is_recovered() {
        let mesh = NeighborhoodMesh::grid(12, 8, 1.0);
        let plates = single_plate(&mesh);
        let forcing = vec![Vec2::new(0.8, -0.3); mesh.cell_count];

        let motion = fit_plate_motion(&mesh, &plates, &forcing, &MotionConfig::default());

        assert!((motion.velocity[0].x - 0.8).abs() < 1e-4);
        assert!((motion.velocity[0].y + 0.3).abs() < 1e-4);
        assert!(motion.omega[0].abs() < 1e-4);
        assert!(motion.fit_rms[0] < 1e-3);
        // In-bin interpolation keeps the P90 estimate a hair above zero even
        // for a perfect fit, so quality sits just below full scale.
        assert!(motion.quality[0] >= 245, "quality {}", motion.quality[0]);
    }

    #[test]
    fn rotation_is_recovered_and_clamped() {
        let mesh = NeighborhoodMesh::grid(8, 8, 1.0);
        let plates = single_plate(&mesh);
        let config = MotionConfig {
            smoothing_iterations: 0,
            ..MotionConfig::default()
        };

        // Forcing = pure rotation at a rate far above the physical cap.
        let spin = 10.0f32;
        let center = Vec2::new(4.0, 4.0);
        let forcing: Vec<Vec2> = (0..mesh.cell_count)
            .map(|cell| {
                let r = mesh.site(cell) - center;
                spin * Vec2::new(-r.y, r.x)
            })
            .collect();

        let motion = fit_plate_motion(&mesh, &plates, &forcing, &config);

        assert!(motion.omega[0] > 0.0, "spin direction preserved");
        // The clamp keeps the implied edge speed physical, far below the
        // authored spin.
        assert!(motion.omega[0] < 0.5 * spin, "omega {}", motion.omega[0]);
    }

    #[test]
    fn degenerate_plate_falls_back_to_seed() {
        let mesh = NeighborhoodMesh::grid(6, 4, 1.0);
        // Plate 1 owns no cells at all.
        let plates = PlateGraph {
            cell_plate: vec![0; mesh.cell_count],
            seed_x: vec![3.0, 5.0],
            seed_y: vec![2.0, 1.0],
        };
        let forcing = vec![Vec2::new(1.0, 0.0); mesh.cell_count];

        let motion = fit_plate_motion(&mesh, &plates, &forcing, &MotionConfig::default());

        assert_eq!(motion.velocity[1], Vec2::ZERO);
        assert_eq!(motion.omega[1], 0.0);
        assert!((motion.center[1].x - 5.0).abs() < 1e-6);
        assert!((motion.center[1].y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_forcing_is_neutralized() {
        let mesh = NeighborhoodMesh::grid(6, 4, 1.0);
        let plates = single_plate(&mesh);
        let mut forcing = vec![Vec2::new(0.5, 0.0); mesh.cell_count];
        forcing[3] = Vec2::new(f32::NAN, f32::INFINITY);

        let motion = fit_plate_motion(&mesh, &plates, &forcing, &MotionConfig::default());

        assert!(motion.velocity[0].is_finite());
        assert!(motion.fit_rms[0].is_finite());
        assert!(motion.fit_p90[0].is_finite());
    }

    #[test]
    fn p90_can_exceed_the_normalization_scale() {
        let config = MotionConfig::default();
        let bins = config.histogram_bins.clamp(8, 128);
        let limit = config.p90_norm * HIST_RANGE_FACTOR;
        let log_limit = (limit as f64).ln_1p();

        // All weight in the last bin: the estimate lands at the histogram
        // limit, well above p90_norm.
        let mut hist = vec![0.0f64; bins];
        hist[bins - 1] = 1.0;
        let p90 = histogram_p90(&hist, log_limit);
        assert!(p90 > config.p90_norm);
    }
}
