/// Data layer: sweep ingest, calibration loading, reduction and reporting.
///
/// Architecture:
/// ```text
///  analyzer buffers (9 × P per state)      <root>/<corner>/s{code}.s2p
///        │                                          │
///        ▼                                          ▼
///   ┌──────────┐                              ┌──────────┐
///   │  ingest   │                              │  loader   │
///   └──────────┘                              └──────────┘
///        └──────────────┬───────────────────────────┘
///                       ▼
///                ┌─────────────┐
///                │ SweepCurves  │  freqs, per-state S11/S21/S22
///                └─────────────┘
///                       │
///                       ▼
///                ┌─────────────┐
///                │   metrics    │  VSWR, error, RMSE, bandwidth, drift
///                └─────────────┘
///                       │
///                       ▼
///             ┌───────────────────┐
///             │ MeasurementResult  │──▶ report / export
///             └───────────────────┘
/// ```

pub mod export;
pub mod freq;
pub mod ingest;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod report;
