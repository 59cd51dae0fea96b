use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

use super::ingest::BLOCKS;
use super::model::{CurrentPair, RawSweep, SecondaryParams, SweepCurves, state_codes};
use crate::error::CalibrationError;

// ---------------------------------------------------------------------------
// Calibration corners
// ---------------------------------------------------------------------------

/// Temperature corner whose reference sweeps are loaded in adjust mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationCorner {
    /// +25 °C
    #[default]
    Room,
    /// +85 °C
    Hot,
    /// −60 °C
    Cold,
}

impl CalibrationCorner {
    /// Map the legacy selector (1 → +25, 2 → +85, 3 → −60).
    pub fn from_key(key: u8) -> Result<Self, CalibrationError> {
        match key {
            1 => Ok(CalibrationCorner::Room),
            2 => Ok(CalibrationCorner::Hot),
            3 => Ok(CalibrationCorner::Cold),
            other => Err(CalibrationError::UnknownCorner(other)),
        }
    }

    /// Directory name under the calibration root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            CalibrationCorner::Room => "+25",
            CalibrationCorner::Hot => "+85",
            CalibrationCorner::Cold => "-60",
        }
    }
}

// ---------------------------------------------------------------------------
// Calibration set loader (.s2p reference files)
// ---------------------------------------------------------------------------

/// Header/comment lines at the top of every reference file.
const S2P_HEADER_LINES: usize = 5;

/// Columns per data row: freq plus magnitude/phase for S11, S21, S12, S22.
const S2P_COLUMNS: usize = 9;

/// Reference file of one state inside a corner directory.
pub fn calibration_file(dir: &Path, code: u8) -> PathBuf {
    dir.join(format!("s{code}.s2p"))
}

/// One parsed reference file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoPortMagnitudes {
    pub freqs: Vec<f64>,
    pub s11_db: Vec<f64>,
    pub s21_db: Vec<f64>,
    pub s22_db: Vec<f64>,
}

/// Load the reference sweeps of every state from `root/<corner>/s{code}.s2p`.
///
/// Every file must have as many rows as the first one. The frequency axis is
/// taken from the last file read.
pub fn load_calibration_set(
    root: &Path,
    corner: CalibrationCorner,
    only_main: bool,
) -> Result<SweepCurves, CalibrationError> {
    let dir = root.join(corner.dir_name());
    info!("reading adjust set from: {}/", dir.display());

    let mut curves = SweepCurves::default();
    for code in state_codes(only_main) {
        let path = calibration_file(&dir, code);
        let text = std::fs::read_to_string(&path).map_err(|source| CalibrationError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed = parse_s2p(&text, &path)?;

        if let Some(first) = curves.s21.first() {
            if parsed.freqs.len() != first.len() {
                return Err(CalibrationError::Shape {
                    path,
                    expected: first.len(),
                    actual: parsed.freqs.len(),
                });
            }
        }

        curves.states.push(code);
        curves.s11.push(parsed.s11_db);
        curves.s21.push(parsed.s21_db);
        curves.s22.push(parsed.s22_db);
        curves.freqs = parsed.freqs;
    }
    Ok(curves)
}

/// Parse the body of a reference file.
///
/// Row layout:
/// `freq_Hz s11_db s11_deg s21_db s21_deg s12_db s12_deg s22_db s22_deg`
pub fn parse_s2p(text: &str, path: &Path) -> Result<TwoPortMagnitudes, CalibrationError> {
    let mut out = TwoPortMagnitudes::default();

    for (idx, line) in text.lines().enumerate().skip(S2P_HEADER_LINES) {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parse_err = |reason: String| CalibrationError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            reason,
        };

        let values = trimmed
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| parse_err(format!("'{tok}' is not a number")))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.len() != S2P_COLUMNS {
            return Err(parse_err(format!(
                "expected {S2P_COLUMNS} fields, got {}",
                values.len()
            )));
        }

        // Phases (columns 2, 4, 6, 8) and S12 are validated but not kept.
        out.freqs.push(values[0]);
        out.s11_db.push(values[1]);
        out.s21_db.push(values[3]);
        out.s22_db.push(values[7]);
    }

    if out.freqs.is_empty() {
        return Err(CalibrationError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Raw dump loader (analyzer SNP query output saved per state)
// ---------------------------------------------------------------------------

/// Dump file of one state: a single comma-separated line of `9 * points`
/// floats as returned by the analyzer.
pub fn raw_dump_file(dir: &Path, code: u8) -> PathBuf {
    dir.join(format!("s2p_{code}.s2p"))
}

/// Build a single-cycle [`RawSweep`] from a directory of dump files.
///
/// Without an explicit `points`, the count is inferred from the first buffer.
pub fn load_raw_dump(
    dir: &Path,
    points: Option<usize>,
    only_main: bool,
    params: SecondaryParams,
    currents: CurrentPair,
) -> Result<RawSweep> {
    let codes = state_codes(only_main);
    let mut buffers = Vec::with_capacity(codes.len());

    for &code in &codes {
        let path = raw_dump_file(dir, code);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading raw dump {}", path.display()))?;
        let first = text
            .lines()
            .next()
            .with_context(|| format!("{} is empty", path.display()))?;
        let values = parse_float_list(first)
            .with_context(|| format!("parsing raw dump {}", path.display()))?;
        buffers.push(values);
    }

    let points = match (points, buffers.first()) {
        (Some(p), _) => p,
        (None, Some(first)) => points_in_buffer(first.len())?,
        (None, None) => bail!("no raw dumps in {}", dir.display()),
    };
    info!(
        "loaded {} raw state buffers ({} points) from {}",
        buffers.len(),
        points,
        dir.display()
    );
    Ok(RawSweep::new(points, vec![buffers], params, currents).with_states(codes))
}

/// Parse `"1.0,2.0,3.0"` into floats.
pub fn parse_float_list(line: &str) -> Result<Vec<f64>> {
    line.trim()
        .split(',')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("value {j}: '{tok}' is not a number"))
        })
        .collect()
}

/// Point count implied by a dump buffer length.
pub fn points_in_buffer(len: usize) -> Result<usize> {
    if len == 0 || len % BLOCKS != 0 {
        bail!("buffer of {len} values is not a multiple of {BLOCKS}");
    }
    Ok(len / BLOCKS)
}

// ---------------------------------------------------------------------------
// Secondary parameters
// ---------------------------------------------------------------------------

/// Load secondary parameters from a JSON object such as
/// `{"Pin": -10, "F1": 4, "F2": 8, "kp": 0, "Fborder1": 4, "Fborder2": 8,
///   "Fstat": 6, "cycles": 1}`.
pub fn load_params(path: &Path) -> Result<SecondaryParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading parameters {}", path.display()))?;
    let params: SecondaryParams = serde_json::from_str(&text)
        .with_context(|| format!("parsing parameters {}", path.display()))?;
    Ok(params)
}
