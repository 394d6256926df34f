use super::archiver::DirectoryCreateError;
use super::report::SweepReport;
use crate::core::identity::{IdentityError, RunIdentity};
use crate::core::template::{ConfigLoadError, ConfigWriteError};
use thiserror::Error;

/// Errors that abort a whole sweep. Per-point engine and archive failures are not
/// errors at this level; they are recorded in the sweep report.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Invalid run identity: {0}")]
    Identity(#[from] IdentityError),

    #[error(
        "Capacities {first} and {second} both map to run identity '{identity}'; use a step of at least 0.01"
    )]
    IdentityCollision {
        identity: RunIdentity,
        first: f64,
        second: f64,
    },

    #[error("Failed to load configuration template: {0}")]
    TemplateLoad(#[from] ConfigLoadError),

    #[error("Failed to write active run configuration for {identity}: {source}")]
    ConfigWrite {
        identity: RunIdentity,
        #[source]
        source: ConfigWriteError,
    },

    #[error("Failed to prepare results directory: {0}")]
    Directory(#[from] DirectoryCreateError),

    /// A fatal error at `identity` after the sweep had started. `report` holds the
    /// points completed before it; the summary file was written from it.
    #[error(
        "Sweep aborted at {identity} after {completed} point(s): {source}",
        completed = report.points.len()
    )]
    Aborted {
        identity: RunIdentity,
        report: Box<SweepReport>,
        #[source]
        source: Box<SweepError>,
    },
}
