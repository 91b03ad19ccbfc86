//! Core types, configuration, and error handling for the Vigil pipeline.
//!
//! This crate provides the shared foundation used by all other Vigil crates:
//! - [`VigilError`] — unified error type using `thiserror`
//! - [`VigilConfig`] — configuration loaded from `.vigil.toml`
//! - Shared types: [`Record`], [`CheckKind`], [`CheckStatus`],
//!   [`CommandOutcome`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    CheckConfig, GateConfig, GithubConfig, HistoryConfig, LabelRule, NotifyConfig, VigilConfig,
};
pub use error::VigilError;
pub use types::{format_bytes, CheckKind, CheckStatus, CommandOutcome, OutputFormat, Record};

/// A convenience `Result` type for Vigil operations.
pub type Result<T> = std::result::Result<T, VigilError>;
