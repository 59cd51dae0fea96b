use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use rusty_atten::data::loader::calibration_file;
use rusty_atten::data::metrics::{s21_error, vswr_curve};
use rusty_atten::data::model::state_codes;
use rusty_atten::error::CalibrationError;
use rusty_atten::{
    CalibrationCorner, CurrentPair, MeasurementSession, PassbandEdges, PipelineError,
    PipelineOptions, RawSweep, SecondaryParams, reduce,
};

const FREQS: [f64; 5] = [4e9, 5e9, 6e9, 7e9, 8e9];

/// Reference set where code `c` loses `0.25 * c` dB on top of a frequency
/// dependent baseline.
fn write_corner(root: &Path, corner: CalibrationCorner, only_main: bool) {
    let dir = root.join(corner.dir_name());
    fs::create_dir_all(&dir).unwrap();
    for code in state_codes(only_main) {
        let mut text = String::from("!\n!\n!\n# Hz S DB R 50\n!\n");
        for (i, f) in FREQS.iter().enumerate() {
            let s21 = -1.0 - 0.1 * i as f64 - 0.25 * code as f64;
            text.push_str(&format!(
                "{f} -{} 0 {s21} 0 {s21} 0 -{} 0\n",
                18 + i,
                20 + i
            ));
        }
        fs::write(calibration_file(&dir, code), text).unwrap();
    }
}

fn adjust_options(root: &Path, only_main: bool) -> PipelineOptions {
    PipelineOptions {
        adjust: true,
        only_main_states: only_main,
        corner: CalibrationCorner::Cold,
        calibration_root: root.to_path_buf(),
        ..Default::default()
    }
}

fn params() -> SecondaryParams {
    let mut params = SecondaryParams::default();
    params.insert("kp", -3.0);
    params
}

#[test]
fn adjust_run_is_reproducible_and_bounded() {
    let tmp = TempDir::new().unwrap();
    write_corner(tmp.path(), CalibrationCorner::Cold, true);
    let options = adjust_options(tmp.path(), true);

    let raw = || RawSweep {
        params: params(),
        ..Default::default()
    };
    let a = reduce(raw(), &options, &mut StdRng::seed_from_u64(11)).unwrap();
    let b = reduce(raw(), &options, &mut StdRng::seed_from_u64(11)).unwrap();

    assert_eq!(a.states(), &[0, 1, 2, 4, 8, 16, 32, 63]);
    assert_eq!(a.freqs(), &FREQS);
    assert_eq!(a.s21(), b.s21());
    assert_eq!(a.vswr_in(), b.vswr_in());
    assert_eq!(a.s21_err(), b.s21_err());

    // Uniform S21 shift within ±0.2 dB.
    let shift = a.s21()[0][0] - -1.0;
    assert!(shift.abs() <= 0.2);
    for (code, curve) in a.states().iter().zip(a.s21()) {
        for (i, v) in curve.iter().enumerate() {
            let nominal = -1.0 - 0.1 * i as f64 - 0.25 * *code as f64;
            assert_relative_eq!(v - nominal, shift, epsilon = 1e-9);
        }
    }

    // VSWR offset within ±0.05.
    let clean_in = vswr_curve(&[-18.0, -19.0, -20.0, -21.0, -22.0]);
    let vswr_shift = a.vswr_in()[3][2] - clean_in[2];
    assert!(vswr_shift.abs() <= 0.05 + 1e-12);

    // Error gain within [0.875, 1.125].
    let unscaled = s21_error(a.s21());
    let gain = a.s21_err()[0][0] / unscaled[0][0];
    assert!((0.875 - 1e-9..=1.125 + 1e-9).contains(&gain));

    assert!(a.s21_rmse().unwrap().iter().all(|&v| v >= 0.0));
}

#[test]
fn adjust_passband_and_report() {
    let tmp = TempDir::new().unwrap();
    write_corner(tmp.path(), CalibrationCorner::Cold, false);

    let mut session = MeasurementSession::seeded(adjust_options(tmp.path(), false), 3);
    let result = session
        .submit(RawSweep {
            params: params(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.states().len(), 64);

    // Worst state (63) sits near -16.75 dB: nothing passes kp = -3.
    assert_eq!(result.passband(), PassbandEdges::NotAvailable);

    let report = session.report().unwrap();
    assert!(report.contains("Lower passband edge, Fl:\nn/a"));
    assert!(report.contains("at 6 GHz"));
}

#[test]
fn missing_reference_file_aborts_run() {
    let tmp = TempDir::new().unwrap();
    write_corner(tmp.path(), CalibrationCorner::Cold, true);
    fs::remove_file(calibration_file(&tmp.path().join("-60"), 16)).unwrap();

    let mut session = MeasurementSession::seeded(adjust_options(tmp.path(), true), 3);
    let err = session
        .submit(RawSweep {
            params: params(),
            ..Default::default()
        })
        .unwrap_err();
    match err {
        PipelineError::Calibration(CalibrationError::Io { path, .. }) => {
            assert!(path.ends_with("s16.s2p"))
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!session.is_ready());
}

#[test]
fn report_fails_without_fstat() {
    let tmp = TempDir::new().unwrap();
    write_corner(tmp.path(), CalibrationCorner::Cold, true);

    let mut params = params();
    params.remove("Fstat");
    let mut session = MeasurementSession::seeded(adjust_options(tmp.path(), true), 3);
    session
        .submit(RawSweep {
            params,
            ..Default::default()
        })
        .unwrap();

    let err = session.report().unwrap_err();
    assert!(err.to_string().contains("Fstat"));
}

#[test]
fn reference_files_of_different_length_abort_run() {
    let tmp = TempDir::new().unwrap();
    write_corner(tmp.path(), CalibrationCorner::Cold, true);
    let mut short = String::from("!\n!\n!\n# Hz S DB R 50\n!\n");
    for f in &FREQS[..2] {
        short.push_str(&format!("{f} -18 0 -16.75 0 -16.75 0 -20 0\n"));
    }
    fs::write(calibration_file(&tmp.path().join("-60"), 63), short).unwrap();

    let mut session = MeasurementSession::seeded(adjust_options(tmp.path(), true), 3);
    let err = session
        .submit(RawSweep {
            params: params(),
            ..Default::default()
        })
        .unwrap_err();
    assert!(err.to_string().starts_with("calibration load:"));
    match err {
        PipelineError::Calibration(CalibrationError::Shape {
            path,
            expected,
            actual,
        }) => {
            assert!(path.ends_with("s63.s2p"));
            assert_eq!((expected, actual), (5, 2));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!session.is_ready());
}

#[test]
fn adjust_report_carries_supply_currents() {
    let tmp = TempDir::new().unwrap();
    write_corner(tmp.path(), CalibrationCorner::Cold, true);

    let mut session = MeasurementSession::seeded(adjust_options(tmp.path(), true), 5);
    let result = session
        .submit(RawSweep {
            params: params(),
            currents: CurrentPair::new(0.0125, 0.0375),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.currents(), CurrentPair::new(0.0125, 0.0375));

    let report = session.report().unwrap();
    assert!(report.starts_with(
        "Current consumption at 5.25 V:\n12.50 mA, channel 1\n37.50 mA, channel 2\n"
    ));
}
