use crate::core::combination::Combination;
use crate::core::identity::RunIdentity;
use crate::core::template::ConfigTemplate;
use crate::engine::archiver::ResultArchiver;
use crate::engine::config::{FailurePolicy, SweepConfig};
use crate::engine::director::{Engine, RunContext, RunStatus};
use crate::engine::error::SweepError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::{
    ArchiveOutcome, PointReport, PointStatus, RunOutcome, SUMMARY_FILE_NAME, SweepReport,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

/// One planned execution: a capacity value under one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub combination: Combination,
    pub capacity: f64,
    pub identity: RunIdentity,
}

/// Expands a sweep configuration into its ordered list of points, combinations in the
/// outer loop and capacities in the inner loop. Fails if two points would share an
/// output directory.
pub fn plan(config: &SweepConfig) -> Result<Vec<SweepPoint>, SweepError> {
    let mut seen: HashMap<RunIdentity, f64> = HashMap::new();
    let mut points = Vec::new();

    for combination in &config.combinations {
        for capacity in config.spec.iter() {
            let identity = RunIdentity::new(
                &config.mode,
                combination.name,
                config.bandwidth_mhz,
                capacity,
            )?;
            if let Some(&first) = seen.get(&identity) {
                return Err(SweepError::IdentityCollision {
                    identity,
                    first,
                    second: capacity,
                });
            }
            seen.insert(identity.clone(), capacity);
            points.push(SweepPoint {
                combination: combination.clone(),
                capacity,
                identity,
            });
        }
    }
    Ok(points)
}

#[instrument(skip_all, name = "sweep_workflow")]
pub fn run(
    config: &SweepConfig,
    engine: &dyn Engine,
    reporter: &ProgressReporter,
) -> Result<SweepReport, SweepError> {
    // === Phase 0: Planning ===
    let points = plan(config)?;
    info!(
        "Planned {} sweep point(s) for mode {} at {}M across {} combination(s).",
        points.len(),
        config.mode,
        config.bandwidth_mhz,
        config.combinations.len()
    );

    // === Phase 1: Shared preconditions ===
    let template = ConfigTemplate::load(&config.template.path)?;
    let archiver = ResultArchiver::new(&config.results);
    archiver.prepare_root()?;

    // === Phase 2: Sequential execution ===
    reporter.report(Progress::SweepStart {
        total_points: points.len() as u64,
    });
    let mut report = SweepReport::default();
    let mut active_combination = None;

    for (index, point) in points.iter().enumerate() {
        if active_combination != Some(point.combination.name) {
            active_combination = Some(point.combination.name);
            info!(
                "Combination {}: weights [{}], marking/port [{}].",
                point.combination.name, point.combination.weights, point.combination.marking
            );
            reporter.report(Progress::Message(format!(
                "Sweeping under {}",
                point.combination.name
            )));
        }

        reporter.report(Progress::PointStart {
            index,
            identity: point.identity.to_string(),
        });
        let point_report = match run_point(config, &template, &archiver, engine, point) {
            Ok(point_report) => point_report,
            Err(e) => {
                error!("Aborting sweep at {}: {}", point.identity, e);
                report.halted = true;
                report.aborted = Some(e.to_string());
                report.not_attempted = points[index..]
                    .iter()
                    .map(|p| p.identity.clone())
                    .collect();
                reporter.report(Progress::SweepFinish);
                write_summary(config, &archiver, &report);
                return Err(SweepError::Aborted {
                    identity: point.identity.clone(),
                    report: Box::new(report),
                    source: Box::new(e),
                });
            }
        };
        let status = point_report.status();
        reporter.report(Progress::PointFinish { status });
        report.points.push(point_report);

        if status != PointStatus::Succeeded && config.policy.on_failure == FailurePolicy::Halt {
            warn!(
                "Halting sweep after {} ({:?}) as configured.",
                point.identity, status
            );
            report.halted = true;
            report.not_attempted = points[index + 1..]
                .iter()
                .map(|p| p.identity.clone())
                .collect();
            break;
        }
    }
    reporter.report(Progress::SweepFinish);

    // === Phase 3: Summary ===
    write_summary(config, &archiver, &report);
    info!("Sweep finished: {}.", report.summary_line());
    Ok(report)
}

fn write_summary(config: &SweepConfig, archiver: &ResultArchiver, report: &SweepReport) {
    if !config.write_summary {
        return;
    }
    let path = archiver.root().join(SUMMARY_FILE_NAME);
    match report.write_json(&path) {
        Ok(()) => debug!("Sweep summary written to {:?}.", &path),
        Err(e) => warn!("Failed to write sweep summary to {:?}: {}", &path, e),
    }
}

fn run_point(
    config: &SweepConfig,
    template: &ConfigTemplate,
    archiver: &ResultArchiver,
    engine: &dyn Engine,
    point: &SweepPoint,
) -> Result<PointReport, SweepError> {
    let identity = &point.identity;
    info!("Link capacity: {:.2} ({}).", point.capacity, identity);

    let output_dir = archiver.create_output_dir(identity)?;

    let options = config.template.materialize_options(&point.combination);
    template
        .materialize_with(identity, point.capacity, &options)
        .write_atomic(&config.active_config_path)
        .map_err(|source| SweepError::ConfigWrite {
            identity: identity.clone(),
            source,
        })?;

    let run = match engine.invoke(&RunContext {
        identity,
        output_dir: &output_dir,
    }) {
        Ok(RunStatus::Success) => RunOutcome::Completed,
        Ok(status @ RunStatus::Failed { code }) => {
            warn!("Engine run for {} {}.", identity, status);
            RunOutcome::Failed {
                code,
                reason: status.to_string(),
            }
        }
        Err(e) => {
            error!("Engine run for {} could not complete: {}", identity, e);
            RunOutcome::Failed {
                code: None,
                reason: e.to_string(),
            }
        }
    };

    let run_failed = matches!(run, RunOutcome::Failed { .. });
    let archive = if run_failed && !config.policy.archive_failed_runs {
        debug!("Not archiving failed run {}.", identity);
        ArchiveOutcome::Skipped
    } else {
        match archiver.archive(identity) {
            Ok(path) => ArchiveOutcome::Archived { path },
            Err(e) => {
                error!("Archiving {} failed: {}", identity, e);
                ArchiveOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    };

    let cleaned_up = match &archive {
        ArchiveOutcome::Archived { .. } => archiver.cleanup(identity).unwrap_or_else(|e| {
            warn!("Failed to remove output directory of {}: {}", identity, e);
            false
        }),
        _ => false,
    };

    Ok(PointReport {
        identity: identity.clone(),
        combination: point.combination.name,
        capacity: point.capacity,
        run,
        archive,
        cleaned_up,
    })
}
