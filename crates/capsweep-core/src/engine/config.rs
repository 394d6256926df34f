use super::archiver::Compression;
use super::director::EngineCommand;
use crate::core::combination::Combination;
use crate::core::range::SweepSpec;
use crate::core::template::MaterializeOptions;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("At least one combination must be selected")]
    NoCombinations,

    #[error("Combination '{0}' is selected more than once")]
    DuplicateCombination(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Continue,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    pub on_failure: FailurePolicy,
    /// Archive the output directory of a run whose engine exited unsuccessfully.
    pub archive_failed_runs: bool,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::Continue,
            archive_failed_runs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateConfig {
    pub path: PathBuf,
    pub identity_field: String,
    pub swept_field: String,
    pub inject_combination: bool,
}

impl TemplateConfig {
    pub fn materialize_options(&self, combination: &Combination) -> MaterializeOptions {
        MaterializeOptions {
            identity_field: self.identity_field.clone(),
            swept_field: self.swept_field.clone(),
            combination: self.inject_combination.then(|| combination.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsConfig {
    pub root: PathBuf,
    pub compression: Compression,
    /// Remove the raw output directory once its archive is sealed.
    pub cleanup: bool,
    /// Accept an output directory that already exists instead of failing.
    pub reuse_existing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub mode: String,
    pub bandwidth_mhz: u32,
    pub spec: SweepSpec,
    pub combinations: Vec<Combination>,
    pub template: TemplateConfig,
    pub active_config_path: PathBuf,
    pub engine: EngineCommand,
    pub results: ResultsConfig,
    pub policy: SweepPolicy,
    pub write_summary: bool,
}

#[derive(Default)]
pub struct SweepConfigBuilder {
    mode: Option<String>,
    bandwidth_mhz: Option<u32>,
    spec: Option<SweepSpec>,
    combinations: Vec<Combination>,
    template_path: Option<PathBuf>,
    identity_field: Option<String>,
    swept_field: Option<String>,
    inject_combination: bool,
    active_config_path: Option<PathBuf>,
    engine: Option<EngineCommand>,
    results_root: Option<PathBuf>,
    compression: Option<Compression>,
    cleanup: bool,
    reuse_existing: bool,
    policy: SweepPolicy,
    write_summary: Option<bool>,
}

impl SweepConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
    pub fn bandwidth_mhz(mut self, bandwidth: u32) -> Self {
        self.bandwidth_mhz = Some(bandwidth);
        self
    }
    pub fn spec(mut self, spec: SweepSpec) -> Self {
        self.spec = Some(spec);
        self
    }
    pub fn combination(mut self, combination: Combination) -> Self {
        self.combinations.push(combination);
        self
    }
    pub fn combinations(mut self, combinations: Vec<Combination>) -> Self {
        self.combinations = combinations;
        self
    }
    pub fn template_path(mut self, path: PathBuf) -> Self {
        self.template_path = Some(path);
        self
    }
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = Some(field.into());
        self
    }
    pub fn swept_field(mut self, field: impl Into<String>) -> Self {
        self.swept_field = Some(field.into());
        self
    }
    pub fn inject_combination(mut self, inject: bool) -> Self {
        self.inject_combination = inject;
        self
    }
    pub fn active_config_path(mut self, path: PathBuf) -> Self {
        self.active_config_path = Some(path);
        self
    }
    pub fn engine(mut self, engine: EngineCommand) -> Self {
        self.engine = Some(engine);
        self
    }
    pub fn results_root(mut self, root: PathBuf) -> Self {
        self.results_root = Some(root);
        self
    }
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }
    pub fn cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }
    pub fn reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }
    pub fn policy(mut self, policy: SweepPolicy) -> Self {
        self.policy = policy;
        self
    }
    pub fn write_summary(mut self, write: bool) -> Self {
        self.write_summary = Some(write);
        self
    }

    pub fn build(self) -> Result<SweepConfig, ConfigError> {
        if self.combinations.is_empty() {
            return Err(ConfigError::NoCombinations);
        }
        for (i, combination) in self.combinations.iter().enumerate() {
            if self.combinations[..i]
                .iter()
                .any(|other| other.name == combination.name)
            {
                return Err(ConfigError::DuplicateCombination(
                    combination.name.to_string(),
                ));
            }
        }

        let template = TemplateConfig {
            path: self
                .template_path
                .ok_or(ConfigError::MissingParameter("template_path"))?,
            identity_field: self
                .identity_field
                .unwrap_or_else(|| crate::core::template::DEFAULT_IDENTITY_FIELD.to_string()),
            swept_field: self
                .swept_field
                .unwrap_or_else(|| crate::core::template::DEFAULT_SWEPT_FIELD.to_string()),
            inject_combination: self.inject_combination,
        };
        let results = ResultsConfig {
            root: self
                .results_root
                .ok_or(ConfigError::MissingParameter("results_root"))?,
            compression: self.compression.unwrap_or_default(),
            cleanup: self.cleanup,
            reuse_existing: self.reuse_existing,
        };

        Ok(SweepConfig {
            mode: self.mode.ok_or(ConfigError::MissingParameter("mode"))?,
            bandwidth_mhz: self
                .bandwidth_mhz
                .ok_or(ConfigError::MissingParameter("bandwidth_mhz"))?,
            spec: self.spec.ok_or(ConfigError::MissingParameter("spec"))?,
            combinations: self.combinations,
            template,
            active_config_path: self
                .active_config_path
                .ok_or(ConfigError::MissingParameter("active_config_path"))?,
            engine: self.engine.ok_or(ConfigError::MissingParameter("engine"))?,
            results,
            policy: self.policy,
            write_summary: self.write_summary.unwrap_or(true),
        })
    }
}
