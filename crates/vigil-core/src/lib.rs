//! Core types, configuration, and error handling for Vigil.
//!
//! This crate provides the shared foundation used by the other Vigil crates:
//! - [`VigilError`] — unified error type using `thiserror`
//! - [`VigilConfig`] — configuration loaded from `.vigil.toml`
//! - Shared types: [`Severity`], [`Verdict`], [`Finding`], [`Change`],
//!   [`ChangeKind`], [`DiffHunk`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{ModelConfig, ReviewConfig, VigilConfig};
pub use error::VigilError;
pub use types::{Change, ChangeKind, DiffHunk, Finding, OutputFormat, Severity, Verdict};

/// A convenience `Result` type for Vigil operations.
pub type Result<T> = std::result::Result<T, VigilError>;
