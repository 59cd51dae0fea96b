//! Characterization of a 6-bit digital RF attenuator from network analyzer
//! sweeps: VSWR, transmission error, passband edges and a text report.

pub mod data;
pub mod error;
pub mod state;

pub use data::loader::CalibrationCorner;
pub use data::model::{
    CurrentPair, MeasurementResult, PassbandEdges, RawSweep, ReductionProfile, SecondaryParams,
};
pub use data::pipeline::{PipelineOptions, reduce};
pub use error::PipelineError;
pub use state::MeasurementSession;
