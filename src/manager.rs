//! Model lifecycle controller
//!
//! Orchestrates the full round trip between an abstract model name or hub
//! identifier and a ready, weight-loaded model instance: registry lookup,
//! config load/merge, architecture build, weight application, save and push.

use crate::cache;
use crate::config::{CONFIG_FILENAME, Config, ModelConfig};
use crate::error::{Error, Result};
use crate::hub::HubClient;
use crate::model::{Model, apply_state};
use crate::registry::ModelRegistry;
use crate::weights::{self, WEIGHTS_FILENAME};
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};

/// Options for [`ModelManager::load`]
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Force reading weights from the local path
    pub load_locally: bool,
    /// Persist the freshly loaded model into the permanent cache
    pub save_to_cache: bool,
    /// Config overrides, merged the same way `from_mapping` merges
    pub overrides: Mapping,
}

/// Turns names and identifiers into runnable models
pub struct ModelManager {
    registry: ModelRegistry,
    hub: Box<dyn HubClient>,
    cache_root: PathBuf,
}

impl ModelManager {
    pub fn new(registry: ModelRegistry, hub: Box<dyn HubClient>) -> Self {
        Self {
            registry,
            hub,
            cache_root: cache::cache_root(),
        }
    }

    /// Redirect the permanent cache, mainly for tests
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn hub(&self) -> &dyn HubClient {
        self.hub.as_ref()
    }

    /// Construct a model by registry name
    ///
    /// Without an explicit config the entry's default is used. `overrides`
    /// are merged on top with the same semantics as `from_mapping`, so a
    /// fresh model can be reshaped without hand-building a config.
    pub fn build(
        &self,
        name: &str,
        config: Option<ModelConfig>,
        overrides: Mapping,
    ) -> Result<Box<dyn Model>> {
        let entry = self.registry.resolve(name)?;
        let mut config = config.unwrap_or_else(entry.default_config);
        if !overrides.is_empty() {
            let doc = config.to_document();
            config = ModelConfig::from_mapping(&doc, false, overrides)?;
        }
        tracing::debug!(name = %name, "building model");
        (entry.build)(config)
    }

    /// Load config and weights from a local directory or a hub repo
    ///
    /// The config decides which implementation to build through its `name`
    /// field. Weight name/shape mismatches degrade to a partial load and a
    /// warning; only an unreadable weight file is an error.
    pub fn load(&self, path_or_id: &str, options: LoadOptions) -> Result<Box<dyn Model>> {
        let config = ModelConfig::load(
            self.hub.as_ref(),
            path_or_id,
            CONFIG_FILENAME,
            options.overrides.clone(),
        )?;
        let name = config.name.clone().ok_or_else(|| Error::SchemaMismatch {
            config_type: "model",
            detail: format!("config from `{path_or_id}` has no `name` field"),
        })?;
        let mut model = self.build(&name, Some(config), Mapping::new())?;

        let weights_path = if options.load_locally || Path::new(path_or_id).is_dir() {
            Path::new(path_or_id).join(WEIGHTS_FILENAME)
        } else {
            self.hub.download(path_or_id, WEIGHTS_FILENAME)?
        };
        let state = weights::load_state(&weights_path)?;
        apply_state(model.as_mut(), state);
        tracing::info!(source = %path_or_id, model = %name, "loaded model");

        if options.save_to_cache {
            let cache_dir = cache::repo_cache_dir(&self.cache_root, path_or_id);
            self.save(model.as_ref(), &cache_dir)?;
        }
        Ok(model)
    }

    /// Write weights and config side by side into `dir`
    ///
    /// The two writes are not atomic; a crash in between leaves the pair
    /// inconsistent.
    pub fn save(&self, model: &dyn Model, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        weights::save_state(&dir.join(WEIGHTS_FILENAME), model.state())?;
        model.config().save(dir, CONFIG_FILENAME)?;
        tracing::info!(dir = %dir.display(), "saved model and config");
        Ok(())
    }

    /// Publish the model and its config to the hub as one commit
    pub fn push(&self, model: &dyn Model, hub_path: &str) -> Result<()> {
        self.hub.create_repo(hub_path, true)?;
        let staging = cache::repo_cache_dir(&self.cache_root, hub_path);
        self.save(model, &staging)?;
        let name = model
            .config()
            .name
            .clone()
            .unwrap_or_else(|| hub_path.to_string());
        self.hub
            .upload(hub_path, &staging, &format!("Upload {name}"))?;
        tracing::info!(repo = %hub_path, "pushed model to hub");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::LocalHub;
    use serde_yaml::Value;
    use tempfile::TempDir;

    fn test_manager(dir: &TempDir) -> ModelManager {
        ModelManager::new(
            ModelRegistry::with_builtins(),
            Box::new(LocalHub::new(dir.path().join("hub"))),
        )
        .with_cache_root(dir.path().join("cache"))
    }

    fn overrides(pairs: &[(&str, Value)]) -> Mapping {
        let mut mapping = Mapping::new();
        for (key, value) in pairs {
            mapping.insert(Value::String((*key).to_string()), value.clone());
        }
        mapping
    }

    #[test]
    fn test_build_unknown_model() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let err = manager.build("nope", None, Mapping::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownModel { .. }));
    }

    #[test]
    fn test_build_with_default_config() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let model = manager.build("linear", None, Mapping::new()).unwrap();
        assert_eq!(model.config().name.as_deref(), Some("linear"));
        assert_eq!(model.state()["weight"].shape(), &[1, 4]);
    }

    #[test]
    fn test_build_applies_overrides() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let model = manager
            .build(
                "linear",
                None,
                overrides(&[("out_features", Value::from(3u64))]),
            )
            .unwrap();
        assert_eq!(model.state()["weight"].shape(), &[3, 4]);
    }

    #[test]
    fn test_save_then_load_locally() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let mut model = manager.build("linear", None, Mapping::new()).unwrap();
        model
            .state_mut()
            .get_mut("bias")
            .unwrap()
            .data_mut()
            .fill(1.25);

        let out = dir.path().join("saved");
        manager.save(model.as_ref(), &out).unwrap();

        let loaded = manager
            .load(
                out.to_str().unwrap(),
                LoadOptions {
                    load_locally: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(loaded.config(), model.config());
        assert_eq!(loaded.state(), model.state());
    }

    #[test]
    fn test_load_requires_name_field() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let out = dir.path().join("anon");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join(CONFIG_FILENAME), "model:\n  in_features: 4\n").unwrap();

        let err = manager
            .load(out.to_str().unwrap(), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_load_missing_weights_is_not_found() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let out = dir.path().join("confonly");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join(CONFIG_FILENAME), "model:\n  name: linear\n").unwrap();

        let err = manager
            .load(out.to_str().unwrap(), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_save_to_cache() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let model = manager.build("mlp", None, Mapping::new()).unwrap();
        let out = dir.path().join("src-model");
        manager.save(model.as_ref(), &out).unwrap();

        manager
            .load(
                out.to_str().unwrap(),
                LoadOptions {
                    save_to_cache: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let cached = cache::repo_cache_dir(&dir.path().join("cache"), out.to_str().unwrap());
        assert!(cached.join(CONFIG_FILENAME).is_file());
        assert!(cached.join(WEIGHTS_FILENAME).is_file());
    }

    #[test]
    fn test_push_then_load_from_hub() {
        let dir = TempDir::new().unwrap();
        let manager = test_manager(&dir);

        let mut model = manager.build("linear", None, Mapping::new()).unwrap();
        model
            .state_mut()
            .get_mut("weight")
            .unwrap()
            .data_mut()
            .fill(2.0);

        manager.push(model.as_ref(), "acme/affine-demo").unwrap();

        // Not a local directory, so this exercises the hub download path
        let loaded = manager
            .load("acme/affine-demo", LoadOptions::default())
            .unwrap();
        assert_eq!(loaded.state(), model.state());
        assert_eq!(loaded.config().name.as_deref(), Some("linear"));
    }
}
