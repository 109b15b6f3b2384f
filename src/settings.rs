//! Generation settings: what to document and where the output goes.
//!
//! Settings can be built in code, deserialized, or loaded from `GRAPHDOC_*`
//! environment variables (a `.env` file is honoured via `dotenvy`).

use std::path::PathBuf;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SettingsError {
    #[error("documentation title must not be empty")]
    #[diagnostic(
        code(graphdoc::settings::empty_title),
        help("Set `title` or the GRAPHDOC_TITLE environment variable.")
    )]
    EmptyTitle,

    #[error("nothing to document: no native modules and no content paths configured")]
    #[diagnostic(
        code(graphdoc::settings::no_sources),
        help("Configure at least one of `native_modules` / `content_paths`.")
    )]
    NoSources,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Human-readable title handed to the site generator as `-name`.
    pub title: String,
    /// Native modules whose declared classes are documented.
    #[serde(default)]
    pub native_modules: Vec<String>,
    /// Content paths whose graph assets are documented.
    #[serde(default)]
    pub content_paths: Vec<String>,
    /// Optional context class name narrowing spawner discovery.
    #[serde(default)]
    pub context_class: Option<String>,
    /// Launch the local preview server after generation.
    #[serde(default)]
    pub start_preview_server: bool,
    /// Final site output directory.
    pub output_dir: PathBuf,
    /// Where the intermediate JSON and images are written.
    pub intermediate_dir: PathBuf,
    /// Project root handed to the site generator.
    pub project_dir: PathBuf,
    /// Wipe the output directory before the site generator runs.
    #[serde(default)]
    pub clean_output: bool,
}

impl GenerationSettings {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            native_modules: Vec::new(),
            content_paths: Vec::new(),
            context_class: None,
            start_preview_server: false,
            output_dir: PathBuf::from("docs"),
            intermediate_dir: PathBuf::from("docs/intermediate"),
            project_dir: PathBuf::from("."),
            clean_output: false,
        }
    }

    /// Load settings from `GRAPHDOC_*` environment variables, after sourcing
    /// a `.env` file when one is present. List values are comma-separated.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        let mut settings = Self::new(env_string("GRAPHDOC_TITLE").unwrap_or_default());
        settings.native_modules = env_list("GRAPHDOC_MODULES");
        settings.content_paths = env_list("GRAPHDOC_CONTENT_PATHS");
        settings.context_class = env_string("GRAPHDOC_CONTEXT_CLASS");
        settings.start_preview_server = env_flag("GRAPHDOC_PREVIEW");
        settings.clean_output = env_flag("GRAPHDOC_CLEAN_OUTPUT");
        if let Some(dir) = env_string("GRAPHDOC_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_string("GRAPHDOC_INTERMEDIATE_DIR") {
            settings.intermediate_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_string("GRAPHDOC_PROJECT_DIR") {
            settings.project_dir = PathBuf::from(dir);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.title.trim().is_empty() {
            return Err(SettingsError::EmptyTitle);
        }
        if self.native_modules.is_empty() && self.content_paths.is_empty() {
            return Err(SettingsError::NoSources);
        }
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_list(key: &str) -> Vec<String> {
    env_string(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn env_flag(key: &str) -> bool {
    env_string(key).is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_title_and_missing_sources() {
        let mut settings = GenerationSettings::new("");
        settings.native_modules.push("Core".into());
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::EmptyTitle)
        ));

        let settings = GenerationSettings::new("Docs");
        assert!(matches!(settings.validate(), Err(SettingsError::NoSources)));

        let mut settings = GenerationSettings::new("Docs");
        settings.content_paths.push("/Game".into());
        assert!(settings.validate().is_ok());
    }
}
