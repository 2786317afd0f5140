//! Configuration module for Drift
//!
//! This module handles:
//! - Project-level configuration (drift.toml)
//! - Score weights and thresholds
//! - Boundary rules and registry settings

mod project_config;

pub use project_config::{
    default_config_toml, load_project_config, BoundaryConfig, ProjectConfig, RegistryConfig,
    Thresholds, Weights, CONFIG_FILE_NAMES,
};
