use crate::cli::SweepArgs;
use crate::config::PartialSweepConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use capsweep::{
    engine::{
        director::ProcessEngine,
        error::SweepError,
        progress::ProgressReporter,
        report::{ArchiveOutcome, RunOutcome, SweepReport},
    },
    workflows,
};
use tracing::{info, warn};

pub fn run(args: SweepArgs) -> Result<()> {
    let partial_config = PartialSweepConfig::from_args(&args)?;
    info!("Merging configuration from file and CLI arguments...");
    let final_config = partial_config.merge_with_cli(&args)?;

    let engine = ProcessEngine::new(final_config.engine.clone());
    info!("Engine command: {}", engine.command().command_line());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting capacity sweep: {} point(s) under {} combination(s)...",
        final_config.spec.len() * final_config.combinations.len(),
        final_config.combinations.len()
    );
    info!("Invoking the core sweep workflow...");

    let report = match workflows::sweep::run(&final_config, &engine, &reporter) {
        Ok(report) => report,
        Err(e) => {
            if let SweepError::Aborted { report, .. } = &e {
                print_report(report);
            }
            return Err(e.into());
        }
    };
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        warn!("Sweep finished with failures: {}", report.summary_line());
        Err(CliError::Incomplete(report.summary_line()))
    }
}

fn print_report(report: &SweepReport) {
    println!();
    for point in &report.points {
        let run = match &point.run {
            RunOutcome::Completed => "ok".to_string(),
            RunOutcome::Failed { reason, .. } => format!("FAILED ({})", reason),
        };
        let archive = match &point.archive {
            ArchiveOutcome::Archived { path } => path.display().to_string(),
            ArchiveOutcome::Skipped => "skipped".to_string(),
            ArchiveOutcome::Failed { reason } => format!("FAILED ({})", reason),
        };
        println!("  {:<36} run: {:<24} archive: {}", point.identity, run, archive);
    }
    for identity in &report.not_attempted {
        println!("  {:<36} not attempted", identity);
    }
    println!("{}", report.summary_line());
}
