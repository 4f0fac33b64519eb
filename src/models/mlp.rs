//! Two-layer perceptron with a ReLU between the affine maps

use super::{affine, feature_dim, param, parse_features};
use crate::config::{Config, ModelConfig};
use crate::error::{Error, Result};
use crate::model::{Model, ModelOutput};
use crate::registry::ModelRegistry;
use crate::weights::{StateDict, Tensor};

pub const NAME: &str = "mlp";

const DEFAULT_IN_FEATURES: usize = 4;
const DEFAULT_HIDDEN_FEATURES: usize = 8;
const DEFAULT_OUT_FEATURES: usize = 2;

pub fn register(registry: &mut ModelRegistry) {
    registry.register(NAME, default_config, build);
}

pub fn default_config() -> ModelConfig {
    let mut config = ModelConfig {
        name: Some(NAME.to_string()),
        ..Default::default()
    };
    for (key, value) in [
        ("in_features", DEFAULT_IN_FEATURES),
        ("hidden_features", DEFAULT_HIDDEN_FEATURES),
        ("out_features", DEFAULT_OUT_FEATURES),
    ] {
        config
            .extras_mut()
            .insert(key.to_string(), (value as u64).into());
    }
    config
}

pub fn build(config: ModelConfig) -> Result<Box<dyn Model>> {
    Ok(Box::new(MlpModel::new(config)))
}

#[derive(Debug)]
pub struct MlpModel {
    config: ModelConfig,
    params: StateDict,
    out_features: usize,
}

impl MlpModel {
    pub fn new(config: ModelConfig) -> Self {
        let in_features = feature_dim(&config, "in_features", DEFAULT_IN_FEATURES);
        let hidden = feature_dim(&config, "hidden_features", DEFAULT_HIDDEN_FEATURES);
        let out_features = feature_dim(&config, "out_features", DEFAULT_OUT_FEATURES);

        let mut params = StateDict::new();
        params.insert(
            "fc1.weight".to_string(),
            Tensor::zeros(&[hidden, in_features]),
        );
        params.insert("fc1.bias".to_string(), Tensor::zeros(&[hidden]));
        params.insert(
            "fc2.weight".to_string(),
            Tensor::zeros(&[out_features, hidden]),
        );
        params.insert("fc2.bias".to_string(), Tensor::zeros(&[out_features]));

        Self {
            config,
            params,
            out_features,
        }
    }

    fn run(&self, features: &[f32]) -> Result<Vec<f32>> {
        let mut hidden = affine(
            param(&self.params, "fc1.weight")?,
            param(&self.params, "fc1.bias")?,
            features,
        )?;
        for value in &mut hidden {
            *value = value.max(0.0);
        }
        affine(
            param(&self.params, "fc2.weight")?,
            param(&self.params, "fc2.bias")?,
            &hidden,
        )
    }
}

impl Model for MlpModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn state(&self) -> &StateDict {
        &self.params
    }

    fn state_mut(&mut self) -> &mut StateDict {
        &mut self.params
    }

    fn forward(&self, input: &Tensor) -> Result<ModelOutput> {
        let logits = self.run(input.data())?;
        Ok(ModelOutput::from([(
            "logits".to_string(),
            Tensor::from_data(logits),
        )]))
    }

    fn predict(&self, inputs: &[String]) -> Result<ModelOutput> {
        let mut data = Vec::with_capacity(inputs.len() * self.out_features);
        for raw in inputs {
            data.extend(self.run(&parse_features(raw)?)?);
        }
        let logits = Tensor::from_vec(vec![inputs.len(), self.out_features], data)
            .ok_or_else(|| Error::InvalidInput("inconsistent prediction width".to_string()))?;
        Ok(ModelOutput::from([("logits".to_string(), logits)]))
    }
}
