use std::path::PathBuf;

use thiserror::Error;

/// A required key is absent from the secondary parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing configuration key '{0}'")]
    MissingKey(String),
}

/// Raw sweep buffer does not match the declared shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("raw sweep contains no cycles")]
    NoCycles,
    #[error("final sweep cycle contains no states")]
    NoStates,
    #[error("point count must be positive")]
    ZeroPoints,
    #[error("{labels} state labels for {buffers} state buffers")]
    StateCount { labels: usize, buffers: usize },
    #[error("cycle {cycle}, state {state}: expected {expected} values, got {actual}")]
    Shape {
        cycle: usize,
        state: usize,
        expected: usize,
        actual: usize,
    },
}

/// Reference two-port file could not be read or parsed.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("{}: expected {expected} rows like the other states, got {actual}", path.display())]
    Shape {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    #[error("{} has no data rows", path.display())]
    Empty { path: PathBuf },
    #[error("unknown calibration corner key {0} (expected 1, 2 or 3)")]
    UnknownCorner(u8),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("measurement result is not ready")]
    NotReady,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("frequency axis is empty")]
    EmptyAxis,
}

/// Any failure of a reduction run, tagged by the stage that produced it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("ingest: {0}")]
    Ingest(#[from] IngestError),
    #[error("calibration load: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("reduction: frequency axis is empty")]
    EmptyAxis,
    #[error("report: {0}")]
    Report(#[from] ReportError),
}
