//! Model trait and the weight-application policy

use crate::config::ModelConfig;
use crate::error::Result;
use crate::weights::{StateDict, Tensor};
use std::collections::BTreeMap;

/// Named output tensors (logits, loss, ...)
pub type ModelOutput = BTreeMap<String, Tensor>;

/// Contract for every registered model implementation
///
/// Construction goes through the registry's build fn; a freshly built model
/// carries initialized parameters only, and weights arrive later via
/// [`apply_state`]. Whatever computation graph sits behind `forward` is the
/// implementation's own business and never crosses this interface.
pub trait Model: std::fmt::Debug {
    /// The config this model was built from
    fn config(&self) -> &ModelConfig;

    /// Current parameters, by name
    fn state(&self) -> &StateDict;

    fn state_mut(&mut self) -> &mut StateDict;

    /// Run an encoded input through the model
    fn forward(&self, input: &Tensor) -> Result<ModelOutput>;

    /// End-to-end prediction on raw inputs
    fn predict(&self, inputs: &[String]) -> Result<ModelOutput>;
}

/// Apply stored weights to a model
///
/// An exact name/shape match replaces the whole state. On any mismatch only
/// matching parameters are applied, the rest keep their initialized values,
/// and a warning is logged. Mismatched names or shapes are never an error.
pub fn apply_state(model: &mut dyn Model, incoming: StateDict) {
    let params = model.state_mut();

    let exact = incoming.len() == params.len()
        && incoming
            .iter()
            .all(|(name, tensor)| params.get(name).is_some_and(|p| p.shape() == tensor.shape()));
    if exact {
        tracing::debug!(parameters = incoming.len(), "loaded full state");
        *params = incoming;
        return;
    }

    let total = params.len();
    let mut applied = 0usize;
    for (name, tensor) in incoming {
        if let Some(param) = params.get_mut(&name)
            && param.shape() == tensor.shape()
        {
            *param = tensor;
            applied += 1;
        }
    }
    tracing::warn!(
        applied,
        total,
        "stored weights and model parameters are incompatible, partially loading; \
         ignore this warning if you plan on fine-tuning this model"
    );
}
