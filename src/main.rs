use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use rusty_atten::data::export::{write_curves_file, write_summary_file};
use rusty_atten::data::loader::{load_params, load_raw_dump};
use rusty_atten::data::pipeline::DEFAULT_CALIBRATION_ROOT;
use rusty_atten::{
    CalibrationCorner, CurrentPair, MeasurementSession, PipelineOptions, RawSweep,
    ReductionProfile, SecondaryParams,
};

#[derive(Parser)]
#[command(name = "rusty-atten", version, about = "Digital attenuator sweep reduction")]
struct Cli {
    /// Secondary parameters as a JSON object (Pin, F1, F2, kp, Fborder1, Fborder2, Fstat, cycles)
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Only codes 0, 1, 2, 4, 8, 16, 32, 63
    #[arg(long)]
    main_states: bool,

    #[arg(long, value_enum, default_value_t = Profile::Full)]
    profile: Profile,

    /// Write reduced curves as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write scalar metrics as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Channel 1 supply current, A
    #[arg(long, default_value_t = 0.0)]
    current1: f64,

    /// Channel 2 supply current, A
    #[arg(long, default_value_t = 0.0)]
    current2: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reduce a directory of raw analyzer dumps (s2p_<code>.s2p)
    Raw {
        dir: PathBuf,

        /// Points per curve; inferred from the first dump when omitted
        #[arg(long)]
        points: Option<usize>,
    },
    /// Reduce a stored calibration corner with simulated drift
    Adjust {
        /// 1 = +25, 2 = +85, 3 = -60
        #[arg(long, default_value_t = 1)]
        corner: u8,

        #[arg(long, default_value = DEFAULT_CALIBRATION_ROOT)]
        root: PathBuf,

        /// Fix the drift draw
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Full,
    Crossing,
}

impl From<Profile> for ReductionProfile {
    fn from(p: Profile) -> Self {
        match p {
            Profile::Full => ReductionProfile::Full,
            Profile::Crossing => ReductionProfile::Crossing,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let params = match &cli.params {
        Some(path) => load_params(path)?,
        None => SecondaryParams::default(),
    };

    let mut options = PipelineOptions {
        only_main_states: cli.main_states,
        profile: cli.profile.into(),
        ..Default::default()
    };
    let currents = CurrentPair::new(cli.current1, cli.current2);

    let (mut session, raw) = match cli.command {
        Command::Raw { dir, points } => {
            let raw = load_raw_dump(&dir, points, cli.main_states, params, currents)?;
            (MeasurementSession::new(options), raw)
        }
        Command::Adjust { corner, root, seed } => {
            options.adjust = true;
            options.corner = CalibrationCorner::from_key(corner)?;
            options.calibration_root = root;
            let session = match seed {
                Some(seed) => MeasurementSession::seeded(options, seed),
                None => MeasurementSession::new(options),
            };
            let raw = RawSweep {
                params,
                currents,
                ..Default::default()
            };
            (session, raw)
        }
    };

    let result = session.submit(raw).context("measurement run failed")?;
    if let Some(path) = &cli.csv {
        write_curves_file(result, path)?;
        info!("curves written to {}", path.display());
    }
    if let Some(path) = &cli.json {
        write_summary_file(result, path)?;
        info!("summary written to {}", path.display());
    }

    let report = session.report().context("rendering report")?;
    print!("{report}");
    Ok(())
}
