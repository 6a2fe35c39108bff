//! `navcharge-recon`: air-navigation charge reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded vendor and reference rows,
//! returns per-line verdicts plus a summary. No CLI or path handling.

pub mod config;
pub mod error;
pub mod extract;
pub mod formula;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod summary;
pub mod table;

pub use config::SourceConfig;
pub use error::ReconError;
pub use model::{ReconReport, ReportLine, VendorRecord, Verdict};
pub use reconcile::{run, ReconInput};
