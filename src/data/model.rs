use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Attenuation states – immutable lookup tables
// ---------------------------------------------------------------------------

/// Attenuation inserted per code step.
pub const ATTENUATION_STEP_DB: f64 = 0.25;

/// Number of attenuator codes (6-bit control word).
pub const STATE_COUNT: u8 = 64;

/// Single-bit states plus all-zero and all-one, swept in "main states" mode.
pub const MAIN_STATES: [u8; 8] = [0, 1, 2, 4, 8, 16, 32, 63];

/// Nominal attenuation for a control code.
pub fn attenuation_db(code: u8) -> f64 {
    code as f64 * ATTENUATION_STEP_DB
}

/// Codes swept in one run, in ascending order.
pub fn state_codes(only_main: bool) -> Vec<u8> {
    if only_main {
        MAIN_STATES.to_vec()
    } else {
        (0..STATE_COUNT).collect()
    }
}

// ---------------------------------------------------------------------------
// SecondaryParams – the sweep configuration mapping
// ---------------------------------------------------------------------------

/// Numeric sweep parameters keyed by name (`Pin`, `F1`, `F2`, `kp`,
/// `Fborder1`, `Fborder2`, `Fstat`, `cycles`). Frequencies are in GHz.
///
/// Kept as a mapping so that each stage only fails on the keys it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecondaryParams(BTreeMap<String, f64>);

impl Default for SecondaryParams {
    fn default() -> Self {
        [
            ("Pin", -10.0),
            ("F1", 4.0),
            ("F2", 8.0),
            ("kp", 0.0),
            ("Fborder1", 4.0),
            ("Fborder2", 8.0),
            ("Fstat", 6.0),
            ("cycles", 1.0),
        ]
        .into_iter()
        .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SecondaryParams {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        SecondaryParams(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl SecondaryParams {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Look up a key, failing with the key name when it is absent.
    pub fn require(&self, key: &str) -> Result<f64, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<f64> {
        self.0.remove(key)
    }

    /// Passing threshold for worst-case S21, dB.
    pub fn kp(&self) -> Result<f64, ConfigError> {
        self.require("kp")
    }

    pub fn border_low_ghz(&self) -> Result<f64, ConfigError> {
        self.require("Fborder1")
    }

    pub fn border_high_ghz(&self) -> Result<f64, ConfigError> {
        self.require("Fborder2")
    }

    /// Report stimulus frequency, GHz.
    pub fn stat_ghz(&self) -> Result<f64, ConfigError> {
        self.require("Fstat")
    }
}

// ---------------------------------------------------------------------------
// Raw input from the instrument driver
// ---------------------------------------------------------------------------

/// Supply currents of both channels, amperes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentPair {
    pub ch1: f64,
    pub ch2: f64,
}

impl CurrentPair {
    pub fn new(ch1: f64, ch2: f64) -> Self {
        Self { ch1, ch2 }
    }

    pub fn milliamps(&self) -> (f64, f64) {
        (self.ch1 * 1_000.0, self.ch2 * 1_000.0)
    }
}

/// One measurement run as delivered by the analyzer driver.
#[derive(Debug, Clone, Default)]
pub struct RawSweep {
    /// Swept points per curve.
    pub points: usize,
    /// Per cycle, per state: `9 * points` values
    /// `[freq, S11, _, S21, _, _, _, S22, _]`.
    pub cycles: Vec<Vec<Vec<f64>>>,
    /// Codes of the measured states. Empty means "take them from the swept table".
    pub states: Vec<u8>,
    pub params: SecondaryParams,
    pub currents: CurrentPair,
}

impl RawSweep {
    pub fn new(
        points: usize,
        cycles: Vec<Vec<Vec<f64>>>,
        params: SecondaryParams,
        currents: CurrentPair,
    ) -> Self {
        Self {
            points,
            cycles,
            states: Vec::new(),
            params,
            currents,
        }
    }

    pub fn with_states(mut self, states: Vec<u8>) -> Self {
        self.states = states;
        self
    }
}

// ---------------------------------------------------------------------------
// SweepCurves – per-state magnitudes before reduction
// ---------------------------------------------------------------------------

/// Frequency axis plus per-state S11/S21/S22 magnitudes (dB), ordered by
/// ascending state code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepCurves {
    /// Hz, shared by every state.
    pub freqs: Vec<f64>,
    pub states: Vec<u8>,
    pub s11: Vec<Vec<f64>>,
    pub s21: Vec<Vec<f64>>,
    pub s22: Vec<Vec<f64>>,
}

impl SweepCurves {
    pub fn state_count(&self) -> usize {
        self.s21.len()
    }

    pub fn points(&self) -> usize {
        self.freqs.len()
    }
}

// ---------------------------------------------------------------------------
// Derived metrics
// ---------------------------------------------------------------------------

/// Which bandwidth characterization a reduction computes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionProfile {
    /// Three-point border statistics, RMSE and passband edges.
    #[default]
    Full,
    /// Passband edges from the threshold crossing only.
    Crossing,
}

/// Worst-case S21 at the low border, midpoint and high border.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BorderStats {
    pub indices: [usize; 3],
    pub s21_min: [f64; 3],
}

/// Lower/upper edge of the longest passing run, GHz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassbandEdges {
    Found { low_ghz: f64, high_ghz: f64 },
    NotAvailable,
}

impl PassbandEdges {
    pub fn low(&self) -> Option<f64> {
        match self {
            PassbandEdges::Found { low_ghz, .. } => Some(*low_ghz),
            PassbandEdges::NotAvailable => None,
        }
    }

    pub fn high(&self) -> Option<f64> {
        match self {
            PassbandEdges::Found { high_ghz, .. } => Some(*high_ghz),
            PassbandEdges::NotAvailable => None,
        }
    }
}

/// Renders one edge value, `n/a` when no passing run exists.
pub struct EdgeDisplay(pub Option<f64>);

impl fmt::Display for EdgeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "n/a"),
        }
    }
}

// ---------------------------------------------------------------------------
// MeasurementResult – a completed reduction
// ---------------------------------------------------------------------------

/// Output of a successful reduction. Read-only once built.
#[derive(Debug, Clone)]
pub struct MeasurementResult {
    pub(crate) curves: SweepCurves,
    pub(crate) params: SecondaryParams,
    pub(crate) currents: CurrentPair,
    pub(crate) profile: ReductionProfile,
    pub(crate) vswr_in: Vec<Vec<f64>>,
    pub(crate) vswr_out: Vec<Vec<f64>>,
    pub(crate) s21_err: Vec<Vec<f64>>,
    pub(crate) s21_rmse: Option<Vec<f64>>,
    pub(crate) border_stats: Option<BorderStats>,
    pub(crate) passband: PassbandEdges,
}

impl MeasurementResult {
    pub fn freqs(&self) -> &[f64] {
        &self.curves.freqs
    }

    pub fn states(&self) -> &[u8] {
        &self.curves.states
    }

    pub fn s11(&self) -> &[Vec<f64>] {
        &self.curves.s11
    }

    pub fn s21(&self) -> &[Vec<f64>] {
        &self.curves.s21
    }

    pub fn s22(&self) -> &[Vec<f64>] {
        &self.curves.s22
    }

    pub fn vswr_in(&self) -> &[Vec<f64>] {
        &self.vswr_in
    }

    pub fn vswr_out(&self) -> &[Vec<f64>] {
        &self.vswr_out
    }

    pub fn s21_err(&self) -> &[Vec<f64>] {
        &self.s21_err
    }

    /// Per-point RMSE of the S21 error; `None` in the crossing profile.
    pub fn s21_rmse(&self) -> Option<&[f64]> {
        self.s21_rmse.as_deref()
    }

    pub fn border_stats(&self) -> Option<&BorderStats> {
        self.border_stats.as_ref()
    }

    pub fn passband(&self) -> PassbandEdges {
        self.passband
    }

    pub fn params(&self) -> &SecondaryParams {
        &self.params
    }

    pub fn currents(&self) -> CurrentPair {
        self.currents
    }

    pub fn profile(&self) -> ReductionProfile {
        self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_table() {
        assert_eq!(state_codes(false).len(), 64);
        assert_eq!(state_codes(true), vec![0, 1, 2, 4, 8, 16, 32, 63]);
        assert_eq!(attenuation_db(63), 15.75);
    }

    #[test]
    fn test_missing_key_is_named() {
        let mut params = SecondaryParams::default();
        params.remove("Fstat");
        assert_eq!(
            params.stat_ghz(),
            Err(ConfigError::MissingKey("Fstat".into()))
        );
        assert_eq!(params.kp(), Ok(0.0));
    }

    #[test]
    fn test_params_from_json() {
        let params: SecondaryParams =
            serde_json::from_str(r#"{"kp": -3.5, "Fborder1": 1.2}"#).unwrap();
        assert_eq!(params.kp(), Ok(-3.5));
        assert_eq!(params.border_low_ghz(), Ok(1.2));
        assert!(params.border_high_ghz().is_err());
    }

    #[test]
    fn test_edge_display() {
        assert_eq!(EdgeDisplay(None).to_string(), "n/a");
        assert_eq!(EdgeDisplay(Some(4.25)).to_string(), "4.25");
    }
}
