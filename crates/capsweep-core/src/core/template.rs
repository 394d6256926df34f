use super::combination::Combination;
use super::identity::RunIdentity;
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_IDENTITY_FIELD: &str = "FolderName";
pub const DEFAULT_SWEPT_FIELD: &str = "MidLinkCap";
pub const WEIGHTS_FIELD: &str = "Weights";
pub const MARKING_PORT_FIELD: &str = "Marking_Port";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("File I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}", path = path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Template '{path}' must be a JSON object at the top level", path = path.display())]
    NotAnObject { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ConfigWriteError {
    #[error("File I/O error while writing '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize run configuration for '{path}': {source}", path = path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Swept value {0} cannot be represented in JSON")]
    NonFiniteValue(f64),
}

/// Which fields of the template a sweep overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeOptions {
    pub identity_field: String,
    pub swept_field: String,
    /// When set, the combination's weight and marking/port profiles are written to
    /// `Weights` and `Marking_Port` in their space-separated form.
    pub combination: Option<Combination>,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            swept_field: DEFAULT_SWEPT_FIELD.to_string(),
            combination: None,
        }
    }
}

/// A configuration document loaded once per sweep. Only the overridden fields are
/// interpreted; every other key passes through untouched and in its original order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTemplate {
    document: Map<String, Value>,
}

impl ConfigTemplate {
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let file = fs::File::open(path).map_err(|e| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: Value =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| ConfigLoadError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        match value {
            Value::Object(document) => {
                debug!(
                    "Loaded template {:?} with {} top-level keys.",
                    path,
                    document.len()
                );
                Ok(Self { document })
            }
            _ => Err(ConfigLoadError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn from_map(document: Map<String, Value>) -> Self {
        Self { document }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn materialize(&self, identity: &RunIdentity, value: f64) -> RunConfig {
        self.materialize_with(identity, value, &MaterializeOptions::default())
    }

    pub fn materialize_with(
        &self,
        identity: &RunIdentity,
        value: f64,
        options: &MaterializeOptions,
    ) -> RunConfig {
        let mut document = self.document.clone();
        document.insert(
            options.identity_field.clone(),
            Value::String(identity.to_string()),
        );
        document.insert(options.swept_field.clone(), Value::from(value));
        if let Some(combination) = &options.combination {
            document.insert(
                WEIGHTS_FIELD.to_string(),
                Value::String(combination.weights.to_string()),
            );
            document.insert(
                MARKING_PORT_FIELD.to_string(),
                Value::String(combination.marking.to_string()),
            );
        }
        RunConfig { document, value }
    }
}

/// A materialized configuration for exactly one engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    document: Map<String, Value>,
    value: f64,
}

impl RunConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Replaces the document at `path` so that readers see either the previous
    /// configuration or this one in full, never a partial write.
    pub fn write_atomic(&self, path: &Path) -> Result<(), ConfigWriteError> {
        if !self.value.is_finite() {
            return Err(ConfigWriteError::NonFiniteValue(self.value));
        }
        let io_err = |source: std::io::Error| ConfigWriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(io_err)?;

        let temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.document).map_err(|e| {
                ConfigWriteError::Serialize {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
            writer.write_all(b"\n").map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(path).map_err(|e| io_err(e.error))?;

        debug!("Wrote active run configuration to {:?}.", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::combination::CombinationName;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_template(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("scen_20_DL_UPandLowSep.json");
        fs::write(&path, content).unwrap();
        path
    }

    fn reference_identity() -> RunIdentity {
        RunIdentity::new("DL_UPandLowSep", CombinationName::CuPlane, 20, 55.14).unwrap()
    }

    #[test]
    fn materialize_overrides_only_identity_and_swept_fields() {
        let dir = tempdir().unwrap();
        let template_path = write_template(
            dir.path(),
            r#"{"FolderName": "x", "MidLinkCap": 0, "Other": 42}"#,
        );
        let active_path = dir.path().join("scen_ex.json");

        let template = ConfigTemplate::load(&template_path).unwrap();
        template
            .materialize(&reference_identity(), 55.14)
            .write_atomic(&active_path)
            .unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&active_path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "FolderName": "MOD_DL_UPandLowSep_CU-plane_20M_55.14",
                "MidLinkCap": 55.14,
                "Other": 42
            })
        );
    }

    #[test]
    fn reloading_materialized_config_preserves_every_template_key() {
        let dir = tempdir().unwrap();
        let template_path = write_template(
            dir.path(),
            r#"{
                "FolderName": "placeholder",
                "MidLinkCap": 10.0,
                "SimTime": 5,
                "Nodes": [{"id": 1, "rate": "1Gbps"}],
                "Tracing": {"pcap": false}
            }"#,
        );
        let active_path = dir.path().join("nested").join("scen_ex.json");

        let template = ConfigTemplate::load(&template_path).unwrap();
        let identity = reference_identity();
        template
            .materialize(&identity, 55.18000000000001)
            .write_atomic(&active_path)
            .unwrap();

        let reloaded = ConfigTemplate::load(&active_path).unwrap();
        let map = reloaded.as_map();
        assert_eq!(map["FolderName"], json!(identity.as_str()));
        assert!((map["MidLinkCap"].as_f64().unwrap() - 55.18).abs() < 1e-9);
        for (key, value) in template.as_map() {
            if key == "FolderName" || key == "MidLinkCap" {
                continue;
            }
            assert_eq!(map.get(key), Some(value), "key {key} changed");
        }
        assert_eq!(map.len(), template.as_map().len());
    }

    #[test]
    fn loading_same_template_twice_yields_equal_documents() {
        let dir = tempdir().unwrap();
        let template_path = write_template(dir.path(), r#"{"a": 1, "b": [1, 2, 3]}"#);

        let first = ConfigTemplate::load(&template_path).unwrap();
        let second = ConfigTemplate::load(&template_path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn load_reports_missing_and_malformed_templates() {
        let dir = tempdir().unwrap();

        let missing = ConfigTemplate::load(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigLoadError::Io { .. })));

        let malformed = write_template(dir.path(), "{ not json");
        assert!(matches!(
            ConfigTemplate::load(&malformed),
            Err(ConfigLoadError::Parse { .. })
        ));

        let array = dir.path().join("array.json");
        fs::write(&array, "[1, 2]").unwrap();
        assert!(matches!(
            ConfigTemplate::load(&array),
            Err(ConfigLoadError::NotAnObject { .. })
        ));
    }

    #[test]
    fn write_atomic_replaces_previous_configuration() {
        let dir = tempdir().unwrap();
        let active_path = dir.path().join("scen_ex.json");
        let template = ConfigTemplate::from_map(
            json!({"FolderName": "", "MidLinkCap": 0})
                .as_object()
                .unwrap()
                .clone(),
        );

        let first = RunIdentity::new("DL", CombinationName::CuPlane, 20, 1.0).unwrap();
        let second = RunIdentity::new("DL", CombinationName::CuPlane, 20, 2.0).unwrap();
        template.materialize(&first, 1.0).write_atomic(&active_path).unwrap();
        template.materialize(&second, 2.0).write_atomic(&active_path).unwrap();

        let reloaded = ConfigTemplate::load(&active_path).unwrap();
        assert_eq!(reloaded.as_map()["FolderName"], json!(second.as_str()));
        assert_eq!(reloaded.as_map()["MidLinkCap"], json!(2.0));

        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn custom_fields_and_combination_injection() {
        let template = ConfigTemplate::from_map(
            json!({"Folder": "", "Cap": 0, "Weights": "1 1 1"})
                .as_object()
                .unwrap()
                .clone(),
        );
        let options = MaterializeOptions {
            identity_field: "Folder".to_string(),
            swept_field: "Cap".to_string(),
            combination: Some(Combination::builtin(CombinationName::CuPlane)),
        };

        let config = template.materialize_with(&reference_identity(), 55.14, &options);
        assert_eq!(config.get("Folder"), Some(&json!(reference_identity().as_str())));
        assert_eq!(config.get("Cap"), Some(&json!(55.14)));
        assert_eq!(config.get(WEIGHTS_FIELD), Some(&json!("73 9 18")));
        assert_eq!(
            config.get(MARKING_PORT_FIELD),
            Some(&json!("8080 46 9090 46 10800 8 10900 16 11000 24"))
        );
        assert!(config.get(DEFAULT_IDENTITY_FIELD).is_none());
    }

    #[test]
    fn non_finite_values_are_not_written() {
        let dir = tempdir().unwrap();
        let template = ConfigTemplate::from_map(Map::new());
        let result = template
            .materialize(&reference_identity(), f64::NAN)
            .write_atomic(&dir.path().join("scen_ex.json"));
        assert!(matches!(result, Err(ConfigWriteError::NonFiniteValue(_))));
    }
}
