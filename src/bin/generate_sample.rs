use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rusty_atten::CalibrationCorner;
use rusty_atten::data::loader::{calibration_file, raw_dump_file};
use rusty_atten::data::model::{attenuation_db, state_codes};

const POINTS: usize = 201;
const F_START_HZ: f64 = 4e9;
const F_STOP_HZ: f64 = 8e9;

/// Magnitudes (dB) and phases (deg) of one swept point.
struct Point {
    freq: f64,
    s11: (f64, f64),
    s21: (f64, f64),
    s12: (f64, f64),
    s22: (f64, f64),
}

/// Synthetic attenuator: insertion loss rising with frequency, each code
/// adding its nominal step with a small frequency-dependent error.
fn simulate_state(code: u8, extra_loss_db: f64, rng: &mut StdRng) -> Vec<Point> {
    let step = (F_STOP_HZ - F_START_HZ) / (POINTS - 1) as f64;
    let nominal = attenuation_db(code);
    (0..POINTS)
        .map(|i| {
            let freq = F_START_HZ + i as f64 * step;
            let f_ghz = freq / 1e9;
            let slope = 1.0 + 0.01 * (f_ghz - 6.0);
            let s21 = -(1.2 + 0.15 * f_ghz + extra_loss_db) - nominal * slope
                + rng.gen_range(-0.02..0.02);
            let phase = (-360.0 * f_ghz * 0.35 - nominal * 2.0) % 360.0;
            Point {
                freq,
                s11: (-18.0 + 0.6 * (f_ghz - 4.0) + rng.gen_range(-0.5..0.5), 40.0),
                s21: (s21, phase),
                s12: (s21, phase),
                s22: (-17.0 + 0.5 * (f_ghz - 4.0) + rng.gen_range(-0.5..0.5), -35.0),
            }
        })
        .collect()
}

fn write_calibration_corner(
    root: &Path,
    corner: CalibrationCorner,
    extra_loss_db: f64,
    rng: &mut StdRng,
) -> Result<()> {
    let dir = root.join(corner.dir_name());
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    for code in state_codes(false) {
        let mut text = format!(
            "! synthetic attenuator reference\n! state {code}\n! corner {}\n# Hz S DB R 50\n\
             ! freq s11db s11deg s21db s21deg s12db s12deg s22db s22deg\n",
            corner.dir_name()
        );
        for p in simulate_state(code, extra_loss_db, rng) {
            writeln!(
                text,
                "{} {:.4} {:.3} {:.4} {:.3} {:.4} {:.3} {:.4} {:.3}",
                p.freq, p.s11.0, p.s11.1, p.s21.0, p.s21.1, p.s12.0, p.s12.1, p.s22.0, p.s22.1
            )?;
        }
        let path = calibration_file(&dir, code);
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

/// One comma-separated line per state, block-ordered as the analyzer returns it.
fn write_raw_dump(dir: &Path, rng: &mut StdRng) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    for code in state_codes(false) {
        let points = simulate_state(code, 0.0, rng);
        let blocks: [fn(&Point) -> f64; 9] = [
            |p| p.freq,
            |p| p.s11.0,
            |p| p.s11.1,
            |p| p.s21.0,
            |p| p.s21.1,
            |p| p.s12.0,
            |p| p.s12.1,
            |p| p.s22.0,
            |p| p.s22.1,
        ];
        let line = blocks
            .iter()
            .flat_map(|get| points.iter().map(move |p| get(p).to_string()))
            .collect::<Vec<_>>()
            .join(",");
        let path = raw_dump_file(dir, code);
        fs::write(&path, line).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    let root = Path::new("data");
    for (corner, extra_loss) in [
        (CalibrationCorner::Room, 0.0),
        (CalibrationCorner::Hot, 0.35),
        (CalibrationCorner::Cold, -0.25),
    ] {
        write_calibration_corner(root, corner, extra_loss, &mut rng)?;
    }

    let raw_dir = Path::new("ref/sample_data");
    write_raw_dump(raw_dir, &mut rng)?;

    println!(
        "Wrote 3 calibration corners under {}/ and {} raw dumps to {} ({POINTS} points each)",
        root.display(),
        state_codes(false).len(),
        raw_dir.display()
    );
    Ok(())
}
