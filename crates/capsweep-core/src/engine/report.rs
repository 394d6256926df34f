use crate::core::combination::CombinationName;
use crate::core::identity::RunIdentity;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File written to the results root at the end of a sweep.
pub const SUMMARY_FILE_NAME: &str = "sweep_summary.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum RunOutcome {
    Completed,
    Failed { code: Option<i32>, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ArchiveOutcome {
    Archived { path: PathBuf },
    /// The run failed and the policy says not to archive failed runs.
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointStatus {
    Succeeded,
    RunFailed,
    ArchiveFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointReport {
    pub identity: RunIdentity,
    pub combination: CombinationName,
    pub capacity: f64,
    pub run: RunOutcome,
    pub archive: ArchiveOutcome,
    pub cleaned_up: bool,
}

impl PointReport {
    /// A failed run dominates an archive failure: the point is a run failure even if
    /// archiving its partial output also failed.
    pub fn status(&self) -> PointStatus {
        match (&self.run, &self.archive) {
            (RunOutcome::Failed { .. }, _) => PointStatus::RunFailed,
            (RunOutcome::Completed, ArchiveOutcome::Archived { .. }) => PointStatus::Succeeded,
            (RunOutcome::Completed, _) => PointStatus::ArchiveFailed,
        }
    }

    pub fn archive_path(&self) -> Option<&Path> {
        match &self.archive {
            ArchiveOutcome::Archived { path } => Some(path.as_path()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub points: Vec<PointReport>,
    /// Points never started because the sweep halted on a failure.
    pub not_attempted: Vec<RunIdentity>,
    pub halted: bool,
    /// Set when a fatal error ended the sweep early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl SweepReport {
    pub fn with_status(&self, status: PointStatus) -> impl Iterator<Item = &PointReport> {
        self.points.iter().filter(move |p| p.status() == status)
    }

    pub fn succeeded(&self) -> Vec<&RunIdentity> {
        self.with_status(PointStatus::Succeeded)
            .map(|p| &p.identity)
            .collect()
    }

    pub fn run_failures(&self) -> Vec<&RunIdentity> {
        self.with_status(PointStatus::RunFailed)
            .map(|p| &p.identity)
            .collect()
    }

    pub fn archive_failures(&self) -> Vec<&RunIdentity> {
        self.with_status(PointStatus::ArchiveFailed)
            .map(|p| &p.identity)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        !self.halted
            && self.aborted.is_none()
            && self.not_attempted.is_empty()
            && self
                .points
                .iter()
                .all(|p| p.status() == PointStatus::Succeeded)
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} point(s): {} succeeded, {} failed to run, {} failed to archive",
            self.points.len() + self.not_attempted.len(),
            self.succeeded().len(),
            self.run_failures().len(),
            self.archive_failures().len()
        );
        if self.halted {
            line.push_str(&format!(
                ", {} not attempted (halted)",
                self.not_attempted.len()
            ));
        }
        if let Some(reason) = &self.aborted {
            line.push_str(&format!("; aborted: {}", reason));
        }
        line
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}
