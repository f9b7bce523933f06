/// Errors that can occur across Vigil.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use vigil_core::VigilError;
///
/// let err = VigilError::Config("couldn't find local model: llama3".into());
/// assert!(err.to_string().contains("llama3"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration, including an unknown model name.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git invocation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Unified diff parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Model server request or response error.
    #[error("model error: {0}")]
    Model(String),

    /// The model's response did not contain a usable verdict.
    #[error("verdict error: {0}")]
    Verdict(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
