use super::freq::{nearest_index, to_ghz_2dp};
use super::model::{EdgeDisplay, MeasurementResult};
use crate::error::ReportError;

/// Supply voltage at which channel currents are measured.
pub const BIAS_VOLTAGE: f64 = 5.25;

/// Render the stimulus-frequency report of a finished run.
///
/// Values at `Fstat` are taken from the first (lowest-code) state.
pub fn render(result: &MeasurementResult) -> Result<String, ReportError> {
    let fstat = result.params().stat_ghz()?;
    let freqs = result.freqs();
    let idx = nearest_index(freqs, fstat).ok_or(ReportError::EmptyAxis)?;

    let s21_at_stat = result.s21()[0][idx];
    let vswr_in = result.vswr_in()[0][idx];
    let vswr_out = result.vswr_out()[0][idx];
    let (cur1, cur2) = result.currents().milliamps();

    let mut out = format!(
        "Current consumption at {BIAS_VOLTAGE} V:\n\
         {cur1:.2} mA, channel 1\n\
         {cur2:.2} mA, channel 2\n"
    );

    if let Some(stats) = result.border_stats() {
        out.push_str("\nMinimum loss:\n");
        for (&i, loss) in stats.indices.iter().zip(stats.s21_min) {
            out.push_str(&format!("{loss:.2} dB at {} GHz\n", to_ghz_2dp(freqs[i])));
        }
    }

    let passband = result.passband();
    out.push_str(&format!(
        "
Initial attenuation:
{s21_at_stat} dB at {fstat} GHz

VSWR in:
{vswr_in:.2} at {fstat} GHz

VSWR out:
{vswr_out:.2} at {fstat} GHz

Lower passband edge, Fl:
{}

Upper passband edge, Fh:
{}
",
        EdgeDisplay(passband.low()),
        EdgeDisplay(passband.high()),
    ));
    Ok(out)
}
