// ABOUTME: Secret values given literally or read from the environment.
// ABOUTME: Used for registry credentials in tinyci.yml.

use crate::error::{Error, Result};
use serde::Deserialize;

/// `password: hunter2` or `password: { env: REGISTRY_TOKEN, default: ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        env: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// The literal, or the variable's current value, or its default.
    pub fn resolve(&self) -> Result<String> {
        let (name, default) = match self {
            EnvValue::Literal(value) => return Ok(value.clone()),
            EnvValue::FromEnv { env, default } => (env, default),
        };
        std::env::var(name)
            .ok()
            .or_else(|| default.clone())
            .ok_or_else(|| Error::MissingEnvVar(name.clone()))
    }
}
