use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VigilError;
use crate::types::Severity;

/// Top-level configuration loaded from `.vigil.toml`.
///
/// CLI flags override config values, which override defaults.
///
/// # Examples
///
/// ```
/// use vigil_core::{Severity, VigilConfig};
///
/// let config = VigilConfig::default();
/// assert_eq!(config.review.fail_on, Severity::High);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    /// Model server settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl VigilConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] if the file cannot be read, or
    /// [`VigilError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vigil_core::VigilConfig;
    /// use std::path::Path;
    ///
    /// let config = VigilConfig::from_file(Path::new(".vigil.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, VigilError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::VigilConfig;
    ///
    /// let toml = r#"
    /// [model]
    /// name = "llama3.2"
    /// "#;
    /// let config = VigilConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.model.name.as_deref(), Some("llama3.2"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VigilError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Local model server configuration.
///
/// # Examples
///
/// ```
/// use vigil_core::ModelConfig;
///
/// let config = ModelConfig::default();
/// assert_eq!(config.base_url, "http://localhost:11434");
/// assert!(config.name.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the local model to use. Overridden by `--model`.
    pub name: Option<String>,
    /// Base URL of the Ollama server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: None,
            base_url: default_base_url(),
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use vigil_core::{ReviewConfig, Severity};
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.fail_on, Severity::High);
/// assert!(config.skip_patterns.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Verdicts at or above this severity are reported as findings
    /// (default: HIGH).
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    /// Glob patterns for files to skip before sending to the model.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

fn default_fail_on() -> Severity {
    Severity::High
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            skip_patterns: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = VigilConfig::default();
        assert!(config.model.name.is_none());
        assert_eq!(config.model.base_url, "http://localhost:11434");
        assert_eq!(config.review.fail_on, Severity::High);
        assert!(config.review.skip_patterns.is_empty());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[model]
name = "llama3.2"
"#;
        let config = VigilConfig::from_toml(toml).unwrap();
        assert_eq!(config.model.name.as_deref(), Some("llama3.2"));
        assert_eq!(config.review.fail_on, Severity::High);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[model]
name = "qwen2.5-coder:7b"
base_url = "http://10.0.0.5:11434"

[review]
fail_on = "MEDIUM"
skip_patterns = ["*.lock", "vendor/**"]
"#;
        let config = VigilConfig::from_toml(toml).unwrap();
        assert_eq!(config.model.name.as_deref(), Some("qwen2.5-coder:7b"));
        assert_eq!(config.model.base_url, "http://10.0.0.5:11434");
        assert_eq!(config.review.fail_on, Severity::Medium);
        assert_eq!(config.review.skip_patterns, vec!["*.lock", "vendor/**"]);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = VigilConfig::from_toml("").unwrap();
        assert_eq!(config.review.fail_on, Severity::High);
        assert_eq!(config.model.base_url, "http://localhost:11434");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = VigilConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_fail_on_returns_error() {
        let result = VigilConfig::from_toml("[review]\nfail_on = \"CRITICAL\"\n");
        assert!(result.is_err());
    }
}
