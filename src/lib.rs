//! Model Manager - model/config management over a model hub
//!
//! A lightweight layer that loads, saves and publishes typed configs and
//! model weights, and constructs registered model implementations by name.

pub mod cache;
pub mod config;
pub mod error;
pub mod hub;
pub mod manager;
pub mod model;
pub mod models;
pub mod registry;
pub mod weights;

pub use config::{
    BaseConfig, CONFIG_FILENAME, Config, ConfigType, CriterionConfig, DatasetConfig, Extras,
    ModelConfig, OptimizerConfig, TaskSpec, TrainConfig,
};
pub use error::{Error, Result};
pub use hub::{HfHub, HubClient, LocalHub};
pub use manager::{LoadOptions, ModelManager};
pub use model::{Model, ModelOutput, apply_state};
pub use registry::{ModelRegistry, RegistryEntry};
pub use weights::{StateDict, Tensor, WEIGHTS_FILENAME};
