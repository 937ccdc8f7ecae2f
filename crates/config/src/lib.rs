//! Configuration loading, validation and env substitution.
//!
//! Config files: `marketbot.toml`, `marketbot.yaml`, or `marketbot.json`
//! Searched in `./` then `~/.config/marketbot/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, and the
//! platform-style environment overrides (`PAGE_ACCESS_TOKEN`, ...).

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load, load_config, parse_flag},
    schema::{
        BotConfig, BotIdentity, DetectorConfig, HttpConfig, MessengerConfig, NlpConfig,
        RepliesConfig, ServerConfig, SimilarityConfig, StoreConfig, WebConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
