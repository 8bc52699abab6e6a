//! Configuration settings for Manabu.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub moodle: MoodleSettings,
    pub llm: LlmSettings,
}

/// Moodle web-service settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MoodleSettings {
    /// Base URL of the Moodle site (e.g. "https://lms.example.ac.jp").
    pub base_url: String,
    /// Web-service token used on every request.
    pub token: String,
}

/// Which model backend answers queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackendKind {
    /// Hosted OpenAI chat completions with native tool calling.
    #[default]
    Openai,
    /// Local Ollama inference server with a prompt-embedded tool list.
    Ollama,
}

impl std::str::FromStr for LlmBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmBackendKind::Openai),
            "ollama" | "local" => Ok(LlmBackendKind::Ollama),
            _ => Err(format!("Unknown LLM backend: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmBackendKind::Openai => write!(f, "openai"),
            LlmBackendKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend to use (openai, ollama).
    pub backend: LlmBackendKind,
    /// Model name or identifier.
    pub model: String,
    /// API key for the hosted backend. Falls back to OPENAI_API_KEY.
    pub api_key: Option<String>,
    /// Inference endpoint URL for the local backend.
    pub endpoint: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::Openai,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            endpoint: "http://localhost:11434".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    ///
    /// Environment variables override file values so the assistant can run
    /// without a config file at all (MOODLE_URL, MOODLE_TOKEN,
    /// OPENAI_API_KEY, MODEL_NAME).
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.apply_overrides(&|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply environment-style overrides from the given lookup.
    pub fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MOODLE_URL") {
            self.moodle.base_url = url;
        }
        if let Some(token) = lookup("MOODLE_TOKEN") {
            self.moodle.token = token;
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("MODEL_NAME") {
            self.llm.model = model;
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ManabuError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("manabu")
            .join("config.toml")
    }
}
