use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "capsweep - Sweep a link-capacity value across repeated runs of an external network simulator.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sweep: materialize, invoke the engine, and archive once per sweep point.
    Run(SweepArgs),
    /// Print the planned sweep points and resolved paths without running anything.
    Plan(SweepArgs),
}

/// Arguments shared by `run` and `plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    // --- Plan File ---
    /// Path to a sweep-plan file in TOML format. Built-in defaults apply without one.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Scenario Overrides ---
    /// Override the scenario mode (e.g., 'DL_UPandLowSep').
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Override the bandwidth in MHz.
    #[arg(short, long, value_name = "MHZ")]
    pub bandwidth: Option<u32>,

    /// Select a combination to sweep under ('CU-plane' or 'C-plane').
    /// Can be used multiple times; combinations run in the given order.
    #[arg(long = "combination", value_name = "NAME")]
    pub combinations: Vec<String>,

    // --- Range Overrides ---
    /// Override the first link capacity of the sweep.
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub start: Option<f64>,

    /// Override the last link capacity of the sweep (inclusive).
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub stop: Option<f64>,

    /// Override the capacity increment between sweep points.
    #[arg(long, value_name = "FLOAT")]
    pub step: Option<f64>,

    // --- Path Overrides ---
    /// Override the configuration template path.
    #[arg(short, long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Override the active run configuration path read by the engine.
    #[arg(long, value_name = "PATH")]
    pub active_config: Option<PathBuf>,

    /// Override the results root directory.
    #[arg(short, long, value_name = "PATH")]
    pub results_root: Option<PathBuf>,

    // --- Policy Overrides ---
    /// Stop the sweep at the first point that fails to run or archive.
    #[arg(long)]
    pub halt_on_error: bool,

    /// Do not archive the output of runs whose engine exited unsuccessfully.
    #[arg(long)]
    pub skip_failed_archives: bool,

    /// Remove each raw output directory after it has been archived.
    #[arg(long)]
    pub cleanup: bool,

    /// Override the archive compression ('none', 'gzip' or 'zstd').
    #[arg(long, value_name = "KIND")]
    pub compression: Option<String>,

    /// Set a specific configuration value, overriding the plan file.
    /// Can be used multiple times. Example: -S sweep.step=0.02
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_subcommand_parses_overrides() {
        let cli = Cli::parse_from([
            "capsweep",
            "-vv",
            "run",
            "-c",
            "sweep.toml",
            "--start",
            "50",
            "--stop",
            "51",
            "--step",
            "0.5",
            "--combination",
            "CU-plane",
            "--combination",
            "C-plane",
            "--halt-on-error",
            "-S",
            "results.cleanup=true",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.config, Some(PathBuf::from("sweep.toml")));
        assert_eq!(args.start, Some(50.0));
        assert_eq!(args.step, Some(0.5));
        assert_eq!(args.combinations, vec!["CU-plane", "C-plane"]);
        assert!(args.halt_on_error);
        assert_eq!(args.set_values, vec!["results.cleanup=true"]);
    }

    #[test]
    fn plan_subcommand_needs_no_arguments() {
        let cli = Cli::parse_from(["capsweep", "plan"]);
        assert!(matches!(cli.command, Commands::Plan(_)));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["capsweep", "-q", "-v", "plan"]);
        assert!(result.is_err());
    }
}
