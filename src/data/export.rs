use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::freq::HZ_PER_GHZ;
use super::model::{BorderStats, CurrentPair, MeasurementResult, PassbandEdges, ReductionProfile};

// ---------------------------------------------------------------------------
// Curve table (CSV)
// ---------------------------------------------------------------------------

/// Write the reduced curves as one row per frequency point.
///
/// Columns: `freq_ghz`, then `s21_<code>`, `vswr_in_<code>`,
/// `vswr_out_<code>`, `err_<code>` for every state, then `rmse` when present.
pub fn write_curves<W: Write>(result: &MeasurementResult, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let families: [(&str, &[Vec<f64>]); 4] = [
        ("s21", result.s21()),
        ("vswr_in", result.vswr_in()),
        ("vswr_out", result.vswr_out()),
        ("err", result.s21_err()),
    ];

    let mut header = vec!["freq_ghz".to_string()];
    for (name, _) in &families {
        header.extend(result.states().iter().map(|code| format!("{name}_{code}")));
    }
    if result.s21_rmse().is_some() {
        header.push("rmse".to_string());
    }
    writer.write_record(&header).context("writing CSV header")?;

    for (i, f) in result.freqs().iter().enumerate() {
        let mut row = vec![(f / HZ_PER_GHZ).to_string()];
        for (_, curves) in &families {
            row.extend(curves.iter().map(|c| c[i].to_string()));
        }
        if let Some(rmse) = result.s21_rmse() {
            row.push(rmse[i].to_string());
        }
        writer
            .write_record(&row)
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

pub fn write_curves_file(result: &MeasurementResult, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_curves(result, file)
}

// ---------------------------------------------------------------------------
// Scalar summary (JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Summary {
    pub states: Vec<u8>,
    pub points: usize,
    pub profile: ReductionProfile,
    pub currents: CurrentPair,
    pub border_stats: Option<BorderStats>,
    pub passband: PassbandEdges,
    /// Largest per-point RMSE of S21 across states.
    pub max_rmse: Option<f64>,
}

impl Summary {
    pub fn from_result(result: &MeasurementResult) -> Self {
        Summary {
            states: result.states().to_vec(),
            points: result.freqs().len(),
            profile: result.profile(),
            currents: result.currents(),
            border_stats: result.border_stats().copied(),
            passband: result.passband(),
            max_rmse: result
                .s21_rmse()
                .map(|r| r.iter().copied().fold(0.0, f64::max)),
        }
    }
}

pub fn write_summary_file(result: &MeasurementResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&Summary::from_result(result))
        .context("serializing summary")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
