//! Shared types, error model, and configuration for poemday.
//!
//! This crate is the foundation depended on by all other poemday crates.
//! It provides:
//! - [`PoemError`]: the unified error type
//! - Domain types ([`PoemRecord`])
//! - Configuration ([`AppConfig`], [`ExtractionConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EmbeddedScoring, ExtractionConfig, FetchConfig, MarkdownPolicy, OutputConfig,
    TitleSelection, ValidationLimits, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{PoemError, Result};
pub use types::PoemRecord;
