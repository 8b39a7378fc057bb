//! Configuration types and env-driven constructors for Ark model profiles.

pub mod ark_model_config;
pub mod default_config;
