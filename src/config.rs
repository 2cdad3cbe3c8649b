//! Configuration for the `%gpt` extension.
//!
//! The environment is read once, here, and the resulting [`Config`] is handed
//! to everything that needs the credential or endpoint.

use std::{env, str::FromStr};

use crate::cli::{Model, DEFAULT_LLM};
use crate::errors::MagicError;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "OPENAI_MODEL";
pub const API_BASE_VAR: &str = "OPENAI_API_BASE";
pub const MAX_TURNS_VAR: &str = "GPT_MAGIC_MAX_TURNS";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: Model,
    pub api_base: String,
    /// Maximum user/assistant pairs kept in a transcript. `None` is unbounded.
    pub max_turns: Option<usize>,
}

impl Config {
    /// A config pointing at the default endpoint with default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Config {
            api_key: api_key.into(),
            model: DEFAULT_LLM,
            api_base: DEFAULT_API_BASE.to_string(),
            max_turns: None,
        }
    }

    pub fn from_env() -> Result<Self, MagicError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MagicError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(MagicError::MissingApiKey)?;

        let mut config = Config::new(api_key);

        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.trim().is_empty()) {
            config.model = Model::from_str(model.trim()).map_err(|_| {
                MagicError::UnsupportedModel(format!(
                    "Model {} is not a supported model, double check your {} env var. Only {} are supported.",
                    model,
                    MODEL_VAR,
                    Model::all_models().join(", ")
                ))
            })?;
        }
        if let Some(base) = lookup(API_BASE_VAR).filter(|b| !b.trim().is_empty()) {
            config.api_base = base.trim().trim_end_matches('/').to_string();
        }
        if let Some(turns) = lookup(MAX_TURNS_VAR) {
            let parsed = turns
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(MagicError::InvalidSetting {
                    var: MAX_TURNS_VAR,
                    value: turns.clone(),
                })?;
            config.max_turns = Some(parsed);
        }

        Ok(config)
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }
}
