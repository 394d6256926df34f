mod defaults;

use crate::cli::SweepArgs;
use crate::error::{CliError, Result};
use capsweep::core::combination::{
    Combination, CombinationName, MarkingProfile, WeightProfile,
};
use capsweep::core::range::SweepSpec;
use capsweep::engine::archiver::Compression;
use capsweep::engine::config::{FailurePolicy, SweepConfig, SweepConfigBuilder, SweepPolicy};
use capsweep::engine::director::{EngineCommand, EngineOutput};
use defaults::DefaultsConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRangeConfig {
    start: Option<f64>,
    stop: Option<f64>,
    step: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialTemplateConfig {
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
    identity_field: Option<String>,
    swept_field: Option<String>,
    inject_combination: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialEngineConfig {
    program: Option<String>,
    args: Option<Vec<String>>,
    working_dir: Option<PathBuf>,
    output: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialResultsConfig {
    root: Option<PathBuf>,
    compression: Option<String>,
    cleanup: Option<bool>,
    reuse_existing: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialPolicyConfig {
    on_failure: Option<String>,
    archive_failed_runs: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialProfileConfig {
    weights: Option<Vec<u32>>,
    marking_port: Option<Vec<(u16, u8)>>,
}

/// A sweep-plan file as written by the user: every field optional, merged later with
/// command-line overrides and built-in defaults.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialSweepConfig {
    mode: Option<String>,
    bandwidth: Option<u32>,
    combinations: Option<Vec<String>>,
    active_config: Option<PathBuf>,
    write_summary: Option<bool>,
    sweep: Option<PartialRangeConfig>,
    template: Option<PartialTemplateConfig>,
    engine: Option<PartialEngineConfig>,
    results: Option<PartialResultsConfig>,
    policy: Option<PartialPolicyConfig>,
    profiles: Option<BTreeMap<String, PartialProfileConfig>>,
}

impl PartialSweepConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading sweep plan from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the plan file named by `args`, or starts from an empty plan.
    pub fn from_args(args: &SweepArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(mut self, args: &SweepArgs) -> Result<SweepConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let mode = args
            .mode
            .clone()
            .or(self.mode.take())
            .unwrap_or(defaults.mode.clone());
        let bandwidth_mhz = args
            .bandwidth
            .or(self.bandwidth)
            .unwrap_or(defaults.bandwidth_mhz);

        let range = self.sweep.take().unwrap_or_default();
        let spec = SweepSpec::new(
            args.start.or(range.start).unwrap_or(defaults.start),
            args.stop.or(range.stop).unwrap_or(defaults.stop),
            args.step.or(range.step).unwrap_or(defaults.step),
        )
        .map_err(|e| CliError::Config(e.to_string()))?;

        let combinations = self.resolve_combinations(args, &defaults)?;

        let template = self.template.take().unwrap_or_default();
        let template_path = args.template.clone().or(template.path).unwrap_or_else(|| {
            template
                .dir
                .unwrap_or_else(|| PathBuf::from(&defaults.template_dir))
                .join(DefaultsConfig::template_file_name(bandwidth_mhz, &mode))
        });

        let engine = self.merge_engine(&defaults)?;
        let results = self.results.take().unwrap_or_default();
        let compression = match args.compression.as_deref().or(results.compression.as_deref()) {
            Some(kind) => kind.parse::<Compression>().map_err(CliError::Argument)?,
            None => Compression::default(),
        };
        let policy = self.merge_policy(args)?;

        let mut builder = SweepConfigBuilder::new()
            .mode(mode)
            .bandwidth_mhz(bandwidth_mhz)
            .spec(spec)
            .combinations(combinations)
            .template_path(template_path)
            .inject_combination(template.inject_combination.unwrap_or(false))
            .active_config_path(
                args.active_config
                    .clone()
                    .or(self.active_config.take())
                    .unwrap_or_else(|| PathBuf::from(&defaults.active_config)),
            )
            .engine(engine)
            .results_root(
                args.results_root
                    .clone()
                    .or(results.root)
                    .unwrap_or_else(|| PathBuf::from(&defaults.results_root)),
            )
            .compression(compression)
            .cleanup(args.cleanup || results.cleanup.unwrap_or(false))
            .reuse_existing(results.reuse_existing.unwrap_or(false))
            .policy(policy)
            .write_summary(self.write_summary.unwrap_or(true));
        if let Some(field) = template.identity_field {
            builder = builder.identity_field(field);
        }
        if let Some(field) = template.swept_field {
            builder = builder.swept_field(field);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn resolve_combinations(
        &self,
        args: &SweepArgs,
        defaults: &DefaultsConfig,
    ) -> Result<Vec<Combination>> {
        let mut overrides = BTreeMap::new();
        for (name, profile) in self.profiles.iter().flatten() {
            let name = CombinationName::from_str(name)
                .map_err(|e| CliError::Config(format!("[profiles]: {}", e)))?;
            overrides.insert(name, profile);
        }

        let selected = if !args.combinations.is_empty() {
            &args.combinations
        } else {
            self.combinations.as_ref().unwrap_or(&defaults.combinations)
        };

        selected
            .iter()
            .map(|raw| -> Result<Combination> {
                let name = CombinationName::from_str(raw)
                    .map_err(|e| CliError::Argument(e.to_string()))?;
                let builtin = Combination::builtin(name);
                let Some(profile) = overrides.get(&name) else {
                    return Ok(builtin);
                };
                let weights = match &profile.weights {
                    Some(weights) => WeightProfile::new(weights.clone())
                        .map_err(|e| CliError::Config(e.to_string()))?,
                    None => builtin.weights,
                };
                let marking = match &profile.marking_port {
                    Some(pairs) => MarkingProfile::new(pairs.clone())
                        .map_err(|e| CliError::Config(e.to_string()))?,
                    None => builtin.marking,
                };
                Ok(Combination::new(name, weights, marking))
            })
            .collect()
    }

    fn merge_engine(&mut self, defaults: &DefaultsConfig) -> Result<EngineCommand> {
        let file = self.engine.take().unwrap_or_default();
        let output = match file.output.as_deref() {
            Some(raw) => parse_engine_output(raw)?,
            None => EngineOutput::default(),
        };
        Ok(
            EngineCommand::new(file.program.unwrap_or(defaults.engine_program.clone()))
                .args(file.args.unwrap_or(defaults.engine_args.clone()))
                .working_dir(
                    file.working_dir
                        .unwrap_or_else(|| PathBuf::from(&defaults.engine_working_dir)),
                )
                .output(output),
        )
    }

    fn merge_policy(&mut self, args: &SweepArgs) -> Result<SweepPolicy> {
        let file = self.policy.take().unwrap_or_default();
        let on_failure = if args.halt_on_error {
            FailurePolicy::Halt
        } else {
            match file.on_failure.as_deref() {
                Some(raw) => parse_failure_policy(raw)?,
                None => FailurePolicy::default(),
            }
        };
        let archive_failed_runs =
            !args.skip_failed_archives && file.archive_failed_runs.unwrap_or(true);
        Ok(SweepPolicy {
            on_failure,
            archive_failed_runs,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "mode" => self.mode = Some(value_str.to_string()),
                "bandwidth" => self.bandwidth = Some(parse_value(key, value_str)?),
                "active-config" => self.active_config = Some(PathBuf::from(value_str)),
                "write-summary" => self.write_summary = Some(parse_value(key, value_str)?),
                "sweep.start" => {
                    self.sweep.get_or_insert_with(Default::default).start =
                        Some(parse_value(key, value_str)?);
                }
                "sweep.stop" => {
                    self.sweep.get_or_insert_with(Default::default).stop =
                        Some(parse_value(key, value_str)?);
                }
                "sweep.step" => {
                    self.sweep.get_or_insert_with(Default::default).step =
                        Some(parse_value(key, value_str)?);
                }
                "template.path" => {
                    self.template.get_or_insert_with(Default::default).path =
                        Some(PathBuf::from(value_str));
                }
                "template.inject-combination" => {
                    self.template
                        .get_or_insert_with(Default::default)
                        .inject_combination = Some(parse_value(key, value_str)?);
                }
                "engine.program" => {
                    self.engine.get_or_insert_with(Default::default).program =
                        Some(value_str.to_string());
                }
                "engine.working-dir" => {
                    self.engine.get_or_insert_with(Default::default).working_dir =
                        Some(PathBuf::from(value_str));
                }
                "engine.output" => {
                    parse_engine_output(value_str)?;
                    self.engine.get_or_insert_with(Default::default).output =
                        Some(value_str.to_string());
                }
                "results.root" => {
                    self.results.get_or_insert_with(Default::default).root =
                        Some(PathBuf::from(value_str));
                }
                "results.compression" => {
                    self.results.get_or_insert_with(Default::default).compression =
                        Some(value_str.to_string());
                }
                "results.cleanup" => {
                    self.results.get_or_insert_with(Default::default).cleanup =
                        Some(parse_value(key, value_str)?);
                }
                "results.reuse-existing" => {
                    self.results
                        .get_or_insert_with(Default::default)
                        .reuse_existing = Some(parse_value(key, value_str)?);
                }
                "policy.on-failure" => {
                    parse_failure_policy(value_str)?;
                    self.policy.get_or_insert_with(Default::default).on_failure =
                        Some(value_str.to_string());
                }
                "policy.archive-failed-runs" => {
                    self.policy
                        .get_or_insert_with(Default::default)
                        .archive_failed_runs = Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value_str
        ))
    })
}

fn parse_engine_output(raw: &str) -> Result<EngineOutput> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "inherit" => Ok(EngineOutput::Inherit),
        "discard" => Ok(EngineOutput::Discard),
        "capture" => Ok(EngineOutput::Capture),
        other => Err(CliError::Config(format!(
            "Unknown engine output '{}'. Expected 'inherit', 'discard' or 'capture'.",
            other
        ))),
    }
}

fn parse_failure_policy(raw: &str) -> Result<FailurePolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "continue" => Ok(FailurePolicy::Continue),
        "halt" => Ok(FailurePolicy::Halt),
        other => Err(CliError::Config(format!(
            "Unknown failure policy '{}'. Expected 'continue' or 'halt'.",
            other
        ))),
    }
}
