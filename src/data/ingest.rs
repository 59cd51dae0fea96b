use log::debug;

use super::model::{RawSweep, SweepCurves, state_codes};
use crate::error::IngestError;

/// Blocks per flattened state buffer.
pub const BLOCKS: usize = 9;

const FREQ_BLOCK: usize = 0;
const S11_BLOCK: usize = 1;
const S21_BLOCK: usize = 3;
const S22_BLOCK: usize = 7;

/// Split the driver's flattened buffers into per-state curves.
///
/// Every cycle is shape-checked; the curves of the final cycle are kept,
/// since the driver re-measures all states on each cycle.
///
/// Unlabeled buffers take the codes of the swept table: the eight main states
/// when `only_main` is set, otherwise the leading codes of the full table.
pub fn ingest(raw: &RawSweep, only_main: bool) -> Result<SweepCurves, IngestError> {
    let points = raw.points;
    if points == 0 {
        return Err(IngestError::ZeroPoints);
    }
    let expected = BLOCKS * points;

    for (cycle, states) in raw.cycles.iter().enumerate() {
        for (state, buf) in states.iter().enumerate() {
            if buf.len() != expected {
                return Err(IngestError::Shape {
                    cycle,
                    state,
                    expected,
                    actual: buf.len(),
                });
            }
        }
    }

    let last = raw.cycles.last().ok_or(IngestError::NoCycles)?;
    if last.is_empty() {
        return Err(IngestError::NoStates);
    }
    if raw.cycles.len() > 1 {
        debug!(
            "ingest: keeping cycle {} of {}",
            raw.cycles.len() - 1,
            raw.cycles.len()
        );
    }

    let states = if raw.states.is_empty() {
        let mut codes = state_codes(only_main);
        if codes.len() < last.len() || (only_main && codes.len() != last.len()) {
            return Err(IngestError::StateCount {
                labels: codes.len(),
                buffers: last.len(),
            });
        }
        codes.truncate(last.len());
        codes
    } else if raw.states.len() == last.len() {
        raw.states.clone()
    } else {
        return Err(IngestError::StateCount {
            labels: raw.states.len(),
            buffers: last.len(),
        });
    };

    let block = |buf: &[f64], i: usize| buf[i * points..(i + 1) * points].to_vec();

    let mut curves = SweepCurves {
        states,
        ..Default::default()
    };
    for buf in last {
        curves.freqs = block(buf, FREQ_BLOCK);
        curves.s11.push(block(buf, S11_BLOCK));
        curves.s21.push(block(buf, S21_BLOCK));
        curves.s22.push(block(buf, S22_BLOCK));
    }

    debug!(
        "ingest: {} states x {} points",
        curves.state_count(),
        curves.points()
    );
    Ok(curves)
}
