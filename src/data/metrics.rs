//! Metric engine: per-state curves in, comparative RF quality figures out.
//!
//! All "per point" reductions walk the state curves column-wise, i.e. they
//! combine the values of every state at one frequency index.

use std::ops::Range;

use log::{debug, warn};
use rand::Rng;

use super::freq::{nearest_index, to_ghz_2dp};
use super::model::{BorderStats, PassbandEdges};

// ---------------------------------------------------------------------------
// Point-wise transforms
// ---------------------------------------------------------------------------

/// VSWR from a reflection magnitude in dB.
///
/// 0 dB (total reflection) is a pole and yields `+inf`.
pub fn vswr(mag_db: f64) -> f64 {
    let r = 10f64.powf(mag_db / 20.0);
    (1.0 + r) / (1.0 - r)
}

pub fn vswr_curve(mags_db: &[f64]) -> Vec<f64> {
    mags_db.iter().map(|&m| vswr(m)).collect()
}

fn points(curves: &[Vec<f64>]) -> usize {
    curves.first().map_or(0, Vec::len)
}

fn column(curves: &[Vec<f64>], i: usize) -> impl Iterator<Item = f64> + '_ {
    curves.iter().map(move |c| c[i])
}

/// Mean across states at every frequency point.
pub fn pointwise_mean(curves: &[Vec<f64>]) -> Vec<f64> {
    let n = curves.len() as f64;
    (0..points(curves))
        .map(|i| column(curves, i).sum::<f64>() / n)
        .collect()
}

/// Deviation of every state from the point-wise mean of all states.
pub fn s21_error(s21: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let means = pointwise_mean(s21);
    s21.iter()
        .map(|curve| curve.iter().zip(&means).map(|(v, m)| v - m).collect())
        .collect()
}

/// Root mean square of a set of values.
pub fn rmse(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum_sq, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v * v, n + 1));
    if n == 0 {
        0.0
    } else {
        (sum_sq / n as f64).sqrt()
    }
}

/// Per-point RMSE across the state error curves.
pub fn s21_rmse(errors: &[Vec<f64>]) -> Vec<f64> {
    (0..points(errors)).map(|i| rmse(column(errors, i))).collect()
}

/// Worst (minimum) value across states at every point.
pub fn pointwise_min(curves: &[Vec<f64>]) -> Vec<f64> {
    (0..points(curves))
        .map(|i| column(curves, i).fold(f64::INFINITY, f64::min))
        .collect()
}

pub fn shift_all(curves: &mut [Vec<f64>], shift: f64) {
    curves.iter_mut().flatten().for_each(|v| *v += shift);
}

pub fn scale_all(curves: &mut [Vec<f64>], gain: f64) {
    curves.iter_mut().flatten().for_each(|v| *v *= gain);
}

// ---------------------------------------------------------------------------
// Calibration drift simulation
// ---------------------------------------------------------------------------

/// Uniform perturbations emulating drift between calibration runs.
///
/// Each term is drawn once per run and applied to every state and point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationDrift {
    /// Added to every S21 curve, dB.
    pub s21_shift_db: f64,
    pub vswr_in_shift: f64,
    pub vswr_out_shift: f64,
    /// Multiplies every S21 error curve.
    pub error_gain: f64,
}

impl CalibrationDrift {
    pub const S21_SHIFT_DB: f64 = 0.2;
    pub const VSWR_SHIFT: f64 = 0.05;
    pub const ERROR_GAIN_MIN: f64 = 0.875;
    pub const ERROR_GAIN_MAX: f64 = 1.125;

    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let drift = CalibrationDrift {
            s21_shift_db: rng.gen_range(-Self::S21_SHIFT_DB..=Self::S21_SHIFT_DB),
            vswr_in_shift: rng.gen_range(-Self::VSWR_SHIFT..=Self::VSWR_SHIFT),
            vswr_out_shift: rng.gen_range(-Self::VSWR_SHIFT..=Self::VSWR_SHIFT),
            error_gain: rng.gen_range(Self::ERROR_GAIN_MIN..=Self::ERROR_GAIN_MAX),
        };
        debug!("calibration drift: {drift:?}");
        drift
    }

    /// No perturbation.
    pub fn identity() -> Self {
        CalibrationDrift {
            s21_shift_db: 0.0,
            vswr_in_shift: 0.0,
            vswr_out_shift: 0.0,
            error_gain: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Bandwidth
// ---------------------------------------------------------------------------

/// Minimum S21 at the two border frequencies and the index midway between.
///
/// `None` when the axis is empty.
pub fn border_stats(
    freqs: &[f64],
    s21: &[Vec<f64>],
    low_ghz: f64,
    high_ghz: f64,
) -> Option<BorderStats> {
    let lo = nearest_index(freqs, low_ghz)?;
    let hi = nearest_index(freqs, high_ghz)?;
    let mid = lo.min(hi) + lo.abs_diff(hi) / 2;
    let indices = [lo, mid, hi];
    let min_at = |i: usize| column(s21, i).fold(f64::INFINITY, f64::min);
    Some(BorderStats {
        indices,
        s21_min: indices.map(min_at),
    })
}

/// Maximal index runs where `values[i] > level`.
pub fn passing_runs(values: &[f64], level: f64) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &v) in values.iter().enumerate() {
        match (v > level, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..values.len());
    }
    runs
}

/// Longest run; the first one wins a tie.
pub fn longest_run(runs: &[Range<usize>]) -> Option<Range<usize>> {
    runs.iter()
        .fold(None::<&Range<usize>>, |best, r| match best {
            Some(b) if b.len() >= r.len() => Some(b),
            _ => Some(r),
        })
        .cloned()
}

/// Edges of the longest run where worst-case S21 stays above `kp`.
///
/// `border` (low, high indices) replaces the run boundaries when every point
/// forms a run of its own, which only a single-point sweep can produce.
pub fn passband_edges(
    freqs: &[f64],
    s21: &[Vec<f64>],
    kp: f64,
    border: (usize, usize),
) -> PassbandEdges {
    let minima = pointwise_min(s21);
    let runs = passing_runs(&minima, kp);

    let Some(best) = longest_run(&runs) else {
        warn!("no point passes kp = {kp} dB; passband edges not available");
        return PassbandEdges::NotAvailable;
    };

    let (lo, hi) = if runs.len() == freqs.len() {
        border
    } else {
        (best.start, best.end - 1)
    };
    debug!("passband run {best:?} of {} runs, edges at {lo}..={hi}", runs.len());

    PassbandEdges::Found {
        low_ghz: to_ghz_2dp(freqs[lo]),
        high_ghz: to_ghz_2dp(freqs[hi]),
    }
}
