//! Affine regressor: `y = W x + b`

use super::{affine, feature_dim, param, parse_features};
use crate::config::{Config, ModelConfig};
use crate::error::{Error, Result};
use crate::model::{Model, ModelOutput};
use crate::registry::ModelRegistry;
use crate::weights::{StateDict, Tensor};

pub const NAME: &str = "linear";

const DEFAULT_IN_FEATURES: usize = 4;
const DEFAULT_OUT_FEATURES: usize = 1;

pub fn register(registry: &mut ModelRegistry) {
    registry.register(NAME, default_config, build);
}

/// Default config: a 4 -> 1 affine map
pub fn default_config() -> ModelConfig {
    let mut config = ModelConfig {
        name: Some(NAME.to_string()),
        ..Default::default()
    };
    config.extras_mut().insert(
        "in_features".to_string(),
        (DEFAULT_IN_FEATURES as u64).into(),
    );
    config.extras_mut().insert(
        "out_features".to_string(),
        (DEFAULT_OUT_FEATURES as u64).into(),
    );
    config
}

pub fn build(config: ModelConfig) -> Result<Box<dyn Model>> {
    Ok(Box::new(LinearModel::new(config)))
}

#[derive(Debug)]
pub struct LinearModel {
    config: ModelConfig,
    params: StateDict,
    out_features: usize,
}

impl LinearModel {
    /// Build the architecture from the config; parameters start zeroed
    pub fn new(config: ModelConfig) -> Self {
        let in_features = feature_dim(&config, "in_features", DEFAULT_IN_FEATURES);
        let out_features = feature_dim(&config, "out_features", DEFAULT_OUT_FEATURES);

        let mut params = StateDict::new();
        params.insert(
            "weight".to_string(),
            Tensor::zeros(&[out_features, in_features]),
        );
        params.insert("bias".to_string(), Tensor::zeros(&[out_features]));

        Self {
            config,
            params,
            out_features,
        }
    }
}

impl Model for LinearModel {
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
        let weight = param(&self.params, "weight")?;
        let bias = param(&self.params, "bias")?;
        let logits = affine(weight, bias, input.data())?;
        Ok(ModelOutput::from([(
            "logits".to_string(),
            Tensor::from_data(logits),
        )]))
    }

    fn predict(&self, inputs: &[String]) -> Result<ModelOutput> {
        let mut data = Vec::with_capacity(inputs.len() * self.out_features);
        for raw in inputs {
            let features = parse_features(raw)?;
            let weight = param(&self.params, "weight")?;
            let bias = param(&self.params, "bias")?;
            data.extend(affine(weight, bias, &features)?);
        }
        let logits = Tensor::from_vec(vec![inputs.len(), self.out_features], data)
            .ok_or_else(|| Error::InvalidInput("inconsistent prediction width".to_string()))?;
        Ok(ModelOutput::from([("logits".to_string(), logits)]))
    }
}
