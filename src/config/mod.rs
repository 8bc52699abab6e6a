//! Configuration module for Manabu.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{LlmBackendKind, LlmSettings, MoodleSettings, Settings};
