//! Builtin model implementations
//!
//! Each module registers one implementation under its canonical name.
//! Real architectures belong to an ML framework, not here; these small
//! models exist to exercise the registry and lifecycle end to end.

use crate::config::{Config, ModelConfig};
use crate::error::{Error, Result};
use crate::weights::{StateDict, Tensor};

pub mod linear;
pub mod mlp;

/// Register every builtin implementation
pub fn register_builtins(registry: &mut crate::registry::ModelRegistry) {
    linear::register(registry);
    mlp::register(registry);
}

/// Read a dimension knob from config extras, falling back to a default
pub(crate) fn feature_dim(config: &ModelConfig, key: &str, default: usize) -> usize {
    config
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

pub(crate) fn param<'a>(params: &'a StateDict, name: &str) -> Result<&'a Tensor> {
    params
        .get(name)
        .ok_or_else(|| Error::CorruptWeights(format!("parameter `{name}` missing from state")))
}

/// y = W x + b over a flat feature vector
pub(crate) fn affine(weight: &Tensor, bias: &Tensor, input: &[f32]) -> Result<Vec<f32>> {
    let (rows, cols) = match weight.shape() {
        [rows, cols] => (*rows, *cols),
        other => {
            return Err(Error::CorruptWeights(format!(
                "expected 2-d weight, got shape {other:?}"
            )));
        }
    };
    if bias.shape() != [rows] {
        return Err(Error::CorruptWeights(format!(
            "bias shape {:?} does not match weight rows {rows}",
            bias.shape()
        )));
    }
    if input.len() != cols {
        return Err(Error::InvalidInput(format!(
            "expected {cols} features, got {}",
            input.len()
        )));
    }

    let mut out = bias.data().to_vec();
    for (r, acc) in out.iter_mut().enumerate() {
        let row = &weight.data()[r * cols..(r + 1) * cols];
        *acc += row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>();
    }
    Ok(out)
}

/// Parse a raw input line of comma-separated floats
pub(crate) fn parse_features(raw: &str) -> Result<Vec<f32>> {
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<f32>()
                .map_err(|_| Error::InvalidInput(format!("`{s}` is not a number")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine() {
        let weight = Tensor::from_vec(vec![2, 3], vec![1.0, 0.0, 0.0, 0.0, 1.0, 1.0]).unwrap();
        let bias = Tensor::from_vec(vec![2], vec![0.5, -0.5]).unwrap();

        let out = affine(&weight, &bias, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, vec![1.5, 4.5]);
    }

    #[test]
    fn test_affine_rejects_wrong_width() {
        let weight = Tensor::zeros(&[2, 3]);
        let bias = Tensor::zeros(&[2]);
        let err = affine(&weight, &bias, &[1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_parse_features() {
        assert_eq!(
            parse_features("1.0, 2.5,3").unwrap(),
            vec![1.0, 2.5, 3.0]
        );
        assert!(parse_features("1.0, two").is_err());
    }

    #[test]
    fn test_feature_dim_default() {
        let config = ModelConfig::default();
        assert_eq!(feature_dim(&config, "in_features", 4), 4);
    }
}
