use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::loader::CalibrationCorner;
use crate::data::model::{MeasurementResult, RawSweep};
use crate::data::pipeline::{PipelineOptions, reduce};
use crate::data::report;
use crate::error::{CalibrationError, PipelineError, ReportError};

// ---------------------------------------------------------------------------
// Measurement session
// ---------------------------------------------------------------------------

/// Holds the options and the result of the latest run.
///
/// A submission clears the previous result first, so a failed run leaves the
/// session not ready.
pub struct MeasurementSession {
    pub options: PipelineOptions,

    /// Drift source for adjust mode.
    rng: StdRng,

    /// Result of the last successful run (None until then).
    result: Option<MeasurementResult>,
}

impl Default for MeasurementSession {
    fn default() -> Self {
        Self::new(PipelineOptions::default())
    }
}

impl MeasurementSession {
    pub fn new(options: PipelineOptions) -> Self {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Session with a fixed drift source, for reproducible adjust runs.
    pub fn with_rng(options: PipelineOptions, rng: StdRng) -> Self {
        Self {
            options,
            rng,
            result: None,
        }
    }

    pub fn seeded(options: PipelineOptions, seed: u64) -> Self {
        Self::with_rng(options, StdRng::seed_from_u64(seed))
    }

    /// Reset, then reduce a new run.
    pub fn submit(&mut self, raw: RawSweep) -> Result<&MeasurementResult, PipelineError> {
        self.result = None;
        let result = reduce(raw, &self.options, &mut self.rng)?;
        Ok(&*self.result.insert(result))
    }

    pub fn is_ready(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&MeasurementResult> {
        self.result.as_ref()
    }

    /// Formatted report of the last run.
    pub fn report(&self) -> Result<String, ReportError> {
        let result = self.result.as_ref().ok_or(ReportError::NotReady)?;
        report::render(result)
    }

    /// Select the calibration corner by its legacy integer key.
    pub fn set_corner_key(&mut self, key: u8) -> Result<(), CalibrationError> {
        self.options.corner = CalibrationCorner::from_key(key)?;
        Ok(())
    }
}
