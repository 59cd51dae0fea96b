/// Hertz per gigahertz.
pub const HZ_PER_GHZ: f64 = 1_000_000_000.0;

/// Index of the axis entry (Hz) closest to `target_ghz`.
///
/// Ties resolve to the lowest index. Returns `None` for an empty axis.
pub fn nearest_index(freqs: &[f64], target_ghz: f64) -> Option<usize> {
    let target = target_ghz * HZ_PER_GHZ;
    let mut best: Option<(usize, f64)> = None;
    for (i, &f) in freqs.iter().enumerate() {
        let dist = (f - target).abs();
        match best {
            Some((_, d)) if d <= dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

/// Hz → GHz rounded to two decimals, as printed in reports.
pub fn to_ghz_2dp(hz: f64) -> f64 {
    round_2dp(hz / HZ_PER_GHZ)
}

pub fn round_2dp(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
