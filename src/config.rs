//! Typed configuration records with defaulting, merging and YAML round trips
//!
//! Every config record is tagged with a [`ConfigType`] discriminator fixed by
//! the type itself. On disk a config is a YAML document with a single
//! top-level block named after the discriminator, e.g.
//!
//! ```yaml
//! model:
//!   name: linear
//!   in_features: 4
//! ```
//!
//! Undeclared keys are kept in a separate `extras` side-map instead of being
//! grafted onto the typed fields; they are written back on save and readable
//! through [`Config::get`].

use crate::error::{Error, Result};
use crate::hub::HubClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Default config file name inside a model directory or hub repo
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Undeclared keys captured during deserialization
pub type Extras = BTreeMap<String, Value>;

/// The category a config record is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    Base,
    Model,
    Dataset,
    Train,
    Criterion,
    Optimizer,
    Task,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Model => "model",
            Self::Dataset => "dataset",
            Self::Train => "train",
            Self::Criterion => "criterion",
            Self::Optimizer => "optimizer",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared contract of all config records
pub trait Config: Serialize + DeserializeOwned + Default + Clone + fmt::Debug {
    /// Discriminator fixed by the concrete record type
    const TYPE: ConfigType;

    fn extras(&self) -> &Extras;

    fn extras_mut(&mut self) -> &mut Extras;

    /// Flat key -> value projection of all declared fields plus extras
    fn to_mapping(&self) -> Mapping {
        match serde_yaml::to_value(self) {
            Ok(Value::Mapping(mapping)) => mapping,
            _ => Mapping::new(),
        }
    }

    /// The canonical on-disk document: fields nested under the type's block
    fn to_document(&self) -> Mapping {
        let mut doc = Mapping::new();
        doc.insert(
            Value::String(Self::TYPE.as_str().to_string()),
            Value::Mapping(self.to_mapping()),
        );
        doc
    }

    /// Field or extras value by name; `None` when the key is absent
    fn get(&self, key: &str) -> Option<Value> {
        let key = Value::String(key.to_string());
        self.to_mapping().get(&key).cloned()
    }

    /// Construct a record from a namespaced mapping
    ///
    /// `overrides` are merged into the type's block first and win on key
    /// collision. With `strict` set, any key the record does not declare is
    /// a hard [`Error::SchemaMismatch`]; otherwise such keys land in extras.
    fn from_mapping(doc: &Mapping, strict: bool, overrides: Mapping) -> Result<Self> {
        let block_key = Value::String(Self::TYPE.as_str().to_string());
        let mut block = match doc.get(&block_key) {
            Some(Value::Mapping(mapping)) => mapping.clone(),
            Some(_) | None => {
                return Err(Error::SchemaMismatch {
                    config_type: Self::TYPE.as_str(),
                    detail: format!("missing `{}` block in mapping", Self::TYPE),
                });
            }
        };
        merge_into(&mut block, overrides);

        let config: Self = serde_yaml::from_value(Value::Mapping(block))?;
        if strict && !config.extras().is_empty() {
            let keys: Vec<&str> = config.extras().keys().map(String::as_str).collect();
            return Err(Error::SchemaMismatch {
                config_type: Self::TYPE.as_str(),
                detail: format!("undeclared keys: [{}]", keys.join(", ")),
            });
        }
        Ok(config)
    }

    /// Load a config from a local directory or a hub repo
    ///
    /// A local directory containing `filename` wins; otherwise the hub client
    /// fetches `filename` into its cache. Parsing is lenient so that extra
    /// keys written by richer tooling survive as extras.
    fn load(
        hub: &dyn HubClient,
        path_or_id: &str,
        filename: &str,
        overrides: Mapping,
    ) -> Result<Self> {
        let local = Path::new(path_or_id).join(filename);
        let config_path = if local.is_file() {
            local
        } else {
            hub.download(path_or_id, filename)?
        };

        let text = std::fs::read_to_string(&config_path)?;
        let doc: Value = serde_yaml::from_str(&text)?;
        let doc = match doc {
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::SchemaMismatch {
                    config_type: Self::TYPE.as_str(),
                    detail: format!("`{}` is not a mapping", config_path.display()),
                });
            }
        };
        Self::from_mapping(&doc, false, overrides)
    }

    /// Write the namespaced YAML document to `dir/filename`
    ///
    /// Creates `dir` if absent and overwrites an existing file.
    fn save(&self, dir: &Path, filename: &str) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(filename);
        let text = serde_yaml::to_string(&Value::Mapping(self.to_document()))?;
        std::fs::write(&path, text)?;
        tracing::info!(path = %path.display(), config_type = %Self::TYPE, "saved config");
        Ok(())
    }
}

/// Merge `overrides` into `target`; override values win on collision
fn merge_into(target: &mut Mapping, overrides: Mapping) {
    for (key, value) in overrides {
        target.insert(key, value);
    }
}

/// An untyped record: everything lands in extras
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    #[serde(flatten)]
    pub extras: Extras,
}

impl Config for BaseConfig {
    const TYPE: ConfigType = ConfigType::Base;

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// Config for a registered model implementation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Name of the model's key in the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extras: Extras,
}

impl Config for ModelConfig {
    const TYPE: ConfigType = ConfigType::Model;

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// One task name or several
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskSpec {
    One(String),
    Many(Vec<String>),
}

/// Config for a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Name of the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name of the task(s) this dataset is built for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskSpec>,

    #[serde(flatten)]
    pub extras: Extras,
}

impl Config for DatasetConfig {
    const TYPE: ConfigType = ConfigType::Dataset;

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// Config for a loss criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Per-class weights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,

    pub ignore_index: i64,

    #[serde(flatten)]
    pub extras: Extras,
}

impl Default for CriterionConfig {
    fn default() -> Self {
        Self {
            name: None,
            weight: None,
            reduce: None,
            ignore_index: -100,
            extras: Extras::new(),
        }
    }
}

impl Config for CriterionConfig {
    const TYPE: ConfigType = ConfigType::Criterion;

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// Config for an optimizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Learning rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lr: Option<f64>,

    #[serde(flatten)]
    pub extras: Extras,
}

impl Config for OptimizerConfig {
    const TYPE: ConfigType = ConfigType::Optimizer;

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

/// Config for a training run
///
/// Owns its model and dataset configs by value; both default-construct when
/// absent from the mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub device: String,

    /// Name of the model in the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Model config for the trainer
    pub model_config: ModelConfig,

    /// Dataset config for the trainer
    pub dataset_config: DatasetConfig,

    #[serde(flatten)]
    pub extras: Extras,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            device: "cpu".to_string(),
            model_name: None,
            name: None,
            model_config: ModelConfig::default(),
            dataset_config: DatasetConfig::default(),
            extras: Extras::new(),
        }
    }
}

impl Config for TrainConfig {
    const TYPE: ConfigType = ConfigType::Train;

    fn extras(&self) -> &Extras {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::LocalHub;

    fn overrides(pairs: &[(&str, Value)]) -> Mapping {
        let mut mapping = Mapping::new();
        for (key, value) in pairs {
            mapping.insert(Value::String((*key).to_string()), value.clone());
        }
        mapping
    }

    #[test]
    fn test_config_type_display() {
        assert_eq!(ConfigType::Base.to_string(), "base");
        assert_eq!(ConfigType::Model.to_string(), "model");
        assert_eq!(ConfigType::Dataset.to_string(), "dataset");
        assert_eq!(ConfigType::Train.to_string(), "train");
        assert_eq!(ConfigType::Criterion.to_string(), "criterion");
        assert_eq!(ConfigType::Optimizer.to_string(), "optimizer");
        assert_eq!(ConfigType::Task.to_string(), "task");
    }

    #[test]
    fn test_defaults() {
        let criterion = CriterionConfig::default();
        assert_eq!(criterion.ignore_index, -100);
        assert!(criterion.name.is_none());

        let train = TrainConfig::default();
        assert_eq!(train.device, "cpu");
        assert_eq!(train.model_config, ModelConfig::default());
        assert_eq!(train.dataset_config, DatasetConfig::default());

        assert!(OptimizerConfig::default().lr.is_none());
    }

    #[test]
    fn test_discriminators() {
        assert_eq!(BaseConfig::TYPE, ConfigType::Base);
        assert_eq!(ModelConfig::TYPE, ConfigType::Model);
        assert_eq!(DatasetConfig::TYPE, ConfigType::Dataset);
        assert_eq!(CriterionConfig::TYPE, ConfigType::Criterion);
        assert_eq!(OptimizerConfig::TYPE, ConfigType::Optimizer);
        assert_eq!(TrainConfig::TYPE, ConfigType::Train);
    }

    #[test]
    fn test_mapping_roundtrip() {
        let mut config = TrainConfig {
            model_name: Some("linear".to_string()),
            ..Default::default()
        };
        config.model_config.name = Some("linear".to_string());
        config
            .extras_mut()
            .insert("epochs".to_string(), Value::from(10));

        let doc = config.to_document();
        let parsed = TrainConfig::from_mapping(&doc, false, Mapping::new()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_override_precedence() {
        let mut doc = Mapping::new();
        let mut block = Mapping::new();
        block.insert(Value::from("name"), Value::from("from-mapping"));
        doc.insert(Value::from("model"), Value::Mapping(block));

        let config = ModelConfig::from_mapping(
            &doc,
            true,
            overrides(&[("name", Value::from("from-override"))]),
        )
        .unwrap();
        assert_eq!(config.name.as_deref(), Some("from-override"));
    }

    #[test]
    fn test_strict_rejects_undeclared_key() {
        let mut doc = Mapping::new();
        let mut block = Mapping::new();
        block.insert(Value::from("foo"), Value::from(5));
        doc.insert(Value::from("model"), Value::Mapping(block));

        let err = ModelConfig::from_mapping(&doc, true, Mapping::new()).unwrap_err();
        match err {
            Error::SchemaMismatch {
                config_type,
                detail,
            } => {
                assert_eq!(config_type, "model");
                assert!(detail.contains("foo"));
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_keeps_extras() {
        let mut doc = Mapping::new();
        let mut block = Mapping::new();
        block.insert(Value::from("foo"), Value::from(5));
        doc.insert(Value::from("model"), Value::Mapping(block));

        let config = ModelConfig::from_mapping(&doc, false, Mapping::new()).unwrap();
        assert_eq!(config.get("foo"), Some(Value::from(5)));
        assert_eq!(config.get("bar"), None);
    }

    #[test]
    fn test_missing_block_is_schema_mismatch() {
        let doc = Mapping::new();
        let err = TrainConfig::from_mapping(&doc, false, Mapping::new()).unwrap_err();
        match err {
            Error::SchemaMismatch { detail, .. } => assert!(detail.contains("train")),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_get_declared_field() {
        let config = TrainConfig::default();
        assert_eq!(config.get("device"), Some(Value::from("cpu")));
    }

    #[test]
    fn test_base_config_is_all_extras() {
        let mut doc = Mapping::new();
        let mut block = Mapping::new();
        block.insert(Value::from("anything"), Value::from("goes"));
        doc.insert(Value::from("base"), Value::Mapping(block));

        let config = BaseConfig::from_mapping(&doc, false, Mapping::new()).unwrap();
        assert_eq!(config.get("anything"), Some(Value::from("goes")));

        // base declares no fields, so strict mode rejects everything
        assert!(BaseConfig::from_mapping(&doc, true, Mapping::new()).is_err());
    }

    #[test]
    fn test_task_spec_forms() {
        let one: DatasetConfig =
            serde_yaml::from_str("name: reviews\ntask: sentiment").unwrap();
        assert_eq!(one.task, Some(TaskSpec::One("sentiment".to_string())));

        let many: DatasetConfig =
            serde_yaml::from_str("task: [ner, pos]").unwrap();
        assert_eq!(
            many.task,
            Some(TaskSpec::Many(vec!["ner".to_string(), "pos".to_string()]))
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let hub = LocalHub::new(dir.path().join("hub"));

        let mut config = TrainConfig {
            name: Some("run-1".to_string()),
            ..Default::default()
        };
        config.model_config.name = Some("linear".to_string());
        config
            .model_config
            .extras_mut()
            .insert("in_features".to_string(), Value::from(4));

        let save_dir = dir.path().join("out");
        config.save(&save_dir, CONFIG_FILENAME).unwrap();

        let loaded = TrainConfig::load(
            &hub,
            save_dir.to_str().unwrap(),
            CONFIG_FILENAME,
            Mapping::new(),
        )
        .unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_missing_everywhere_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let hub = LocalHub::new(dir.path().join("hub"));

        let err = ModelConfig::load(&hub, "no/such-repo", CONFIG_FILENAME, Mapping::new())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let hub = LocalHub::new(dir.path().join("hub"));

        let config = ModelConfig {
            name: Some("linear".to_string()),
            ..Default::default()
        };
        let save_dir = dir.path().join("out");
        config.save(&save_dir, CONFIG_FILENAME).unwrap();

        let loaded = ModelConfig::load(
            &hub,
            save_dir.to_str().unwrap(),
            CONFIG_FILENAME,
            overrides(&[("name", Value::from("mlp"))]),
        )
        .unwrap();
        assert_eq!(loaded.name.as_deref(), Some("mlp"));
    }
}
