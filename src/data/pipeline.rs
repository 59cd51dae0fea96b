use std::path::PathBuf;

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::freq::nearest_index;
use super::ingest::ingest;
use super::loader::{CalibrationCorner, load_calibration_set};
use super::metrics::{
    CalibrationDrift, border_stats, passband_edges, s21_error, s21_rmse, scale_all, shift_all,
    vswr_curve,
};
use super::model::{MeasurementResult, RawSweep, ReductionProfile};
use crate::error::PipelineError;

/// Calibration sets live under `<root>/<corner>/` by default.
pub const DEFAULT_CALIBRATION_ROOT: &str = "data";

/// How a run obtains and reduces its curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Load reference curves from the calibration set and apply drift.
    pub adjust: bool,
    /// Restrict to codes 0, 1, 2, 4, 8, 16, 32, 63.
    pub only_main_states: bool,
    pub corner: CalibrationCorner,
    pub calibration_root: PathBuf,
    pub profile: ReductionProfile,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            adjust: false,
            only_main_states: false,
            corner: CalibrationCorner::default(),
            calibration_root: PathBuf::from(DEFAULT_CALIBRATION_ROOT),
            profile: ReductionProfile::default(),
        }
    }
}

/// Reduce one run into a [`MeasurementResult`].
///
/// In adjust mode the curves come from the calibration set and `raw` only
/// contributes its parameters and currents.
pub fn reduce<R: Rng + ?Sized>(
    raw: RawSweep,
    options: &PipelineOptions,
    rng: &mut R,
) -> Result<MeasurementResult, PipelineError> {
    info!(
        "process result: adjust={} main_states={} profile={:?}",
        options.adjust, options.only_main_states, options.profile
    );

    let mut curves = if options.adjust {
        load_calibration_set(
            &options.calibration_root,
            options.corner,
            options.only_main_states,
        )?
    } else {
        ingest(&raw, options.only_main_states)?
    };
    if curves.freqs.is_empty() {
        return Err(PipelineError::EmptyAxis);
    }

    let params = raw.params;
    let kp = params.kp()?;
    let low_ghz = params.border_low_ghz()?;
    let high_ghz = params.border_high_ghz()?;

    let drift = if options.adjust {
        CalibrationDrift::draw(rng)
    } else {
        CalibrationDrift::identity()
    };

    shift_all(&mut curves.s21, drift.s21_shift_db);

    let mut vswr_in: Vec<Vec<f64>> = curves.s11.iter().map(|c| vswr_curve(c)).collect();
    let mut vswr_out: Vec<Vec<f64>> = curves.s22.iter().map(|c| vswr_curve(c)).collect();
    shift_all(&mut vswr_in, drift.vswr_in_shift);
    shift_all(&mut vswr_out, drift.vswr_out_shift);

    let mut s21_err = s21_error(&curves.s21);
    scale_all(&mut s21_err, drift.error_gain);

    let (s21_rmse, stats) = match options.profile {
        ReductionProfile::Full => {
            let stats = border_stats(&curves.freqs, &curves.s21, low_ghz, high_ghz)
                .ok_or(PipelineError::EmptyAxis)?;
            (Some(s21_rmse(&s21_err)), Some(stats))
        }
        ReductionProfile::Crossing => (None, None),
    };

    let border = (
        nearest_index(&curves.freqs, low_ghz).ok_or(PipelineError::EmptyAxis)?,
        nearest_index(&curves.freqs, high_ghz).ok_or(PipelineError::EmptyAxis)?,
    );
    let passband = passband_edges(&curves.freqs, &curves.s21, kp, border);

    info!(
        "reduced {} states x {} points, passband {:?}",
        curves.state_count(),
        curves.points(),
        passband
    );

    Ok(MeasurementResult {
        curves,
        params,
        currents: raw.currents,
        profile: options.profile,
        vswr_in,
        vswr_out,
        s21_err,
        s21_rmse,
        border_stats: stats,
        passband,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ingest::BLOCKS;
    use crate::data::model::{CurrentPair, PassbandEdges, SecondaryParams};
    use crate::error::{ConfigError, IngestError};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// One state buffer with constant S11/S22 and a given S21 curve.
    fn state(freqs: &[f64], s21: &[f64]) -> Vec<f64> {
        let p = freqs.len();
        let mut buf = vec![0.0; BLOCKS * p];
        buf[..p].copy_from_slice(freqs);
        buf[p..2 * p].fill(-20.0);
        buf[3 * p..4 * p].copy_from_slice(s21);
        buf[7 * p..8 * p].fill(-26.0);
        buf
    }

    fn sweep(s21: &[Vec<f64>]) -> RawSweep {
        let freqs: Vec<f64> = (0..s21[0].len()).map(|i| 4e9 + i as f64 * 1e9).collect();
        let buffers = s21.iter().map(|c| state(&freqs, c)).collect();
        RawSweep::new(
            freqs.len(),
            vec![buffers],
            SecondaryParams::default(),
            CurrentPair::new(0.0035, 0.0045),
        )
    }

    #[test]
    fn test_reduce_raw() {
        let raw = sweep(&[vec![-1.0, -1.5, -2.0, -1.0, -0.5], vec![-3.0, 2.0, 1.0, 0.5, 0.0]]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = reduce(raw, &PipelineOptions::default(), &mut rng).unwrap();

        assert_eq!(result.freqs().len(), 5);
        assert_eq!(result.vswr_in().len(), 2);
        assert_relative_eq!(result.vswr_in()[0][0], 1.1 / 0.9, epsilon = 1e-12);
        assert_eq!(result.s21_err()[0][0], 1.0);
        assert_eq!(result.s21_rmse().unwrap()[0], 1.0);
        let stats = result.border_stats().unwrap();
        assert_eq!(stats.indices, [0, 2, 4]);
        assert_eq!(stats.s21_min, [-3.0, -2.0, -0.5]);
        // kp = 0: everything fails
        assert_eq!(result.passband(), PassbandEdges::NotAvailable);
    }

    #[test]
    fn test_reduce_passband() {
        let mut raw = sweep(&[vec![-1.0, -0.5, -0.4, -0.6, -2.0]]);
        raw.params.insert("kp", -0.8);
        let mut rng = StdRng::seed_from_u64(1);
        let result = reduce(raw, &PipelineOptions::default(), &mut rng).unwrap();
        assert_eq!(
            result.passband(),
            PassbandEdges::Found {
                low_ghz: 5.0,
                high_ghz: 7.0
            }
        );
    }

    #[test]
    fn test_crossing_profile_skips_rmse() {
        let raw = sweep(&[vec![-1.0, -1.0], vec![-2.0, -2.0]]);
        let options = PipelineOptions {
            profile: ReductionProfile::Crossing,
            ..Default::default()
        };
        let result = reduce(raw, &options, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(result.s21_rmse().is_none());
        assert!(result.border_stats().is_none());
    }

    #[test]
    fn test_missing_threshold() {
        let mut raw = sweep(&[vec![-1.0]]);
        raw.params.remove("kp");
        let mut rng = StdRng::seed_from_u64(1);
        let err = reduce(raw, &PipelineOptions::default(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MissingKey(ref k)) if k == "kp"
        ));
    }

    #[test]
    fn test_ingest_failure_is_tagged() {
        let mut raw = sweep(&[vec![-1.0, -1.0]]);
        raw.cycles[0][0].truncate(10);
        let mut rng = StdRng::seed_from_u64(1);
        let err = reduce(raw, &PipelineOptions::default(), &mut rng).unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::Shape { .. })));
        assert!(err.to_string().starts_with("ingest:"));
    }

    #[test]
    fn test_raw_main_states_are_labeled() {
        let curves: Vec<Vec<f64>> = (0..8).map(|i| vec![-0.25 * i as f64, -1.0]).collect();
        let raw = sweep(&curves);
        let options = PipelineOptions {
            only_main_states: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let result = reduce(raw, &options, &mut rng).unwrap();
        assert_eq!(result.states(), &[0, 1, 2, 4, 8, 16, 32, 63]);
        assert_eq!(result.s21()[7], vec![-1.75, -1.0]);
    }

    #[test]
    fn test_raw_main_states_count_mismatch() {
        let raw = sweep(&[vec![-1.0], vec![-2.0]]);
        let options = PipelineOptions {
            only_main_states: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let err = reduce(raw, &options, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Ingest(IngestError::StateCount { labels: 8, buffers: 2 })
        ));
    }
}
