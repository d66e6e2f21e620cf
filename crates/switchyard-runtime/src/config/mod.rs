//! Configuration for the Switchyard runtime.
//!
//! Settings are layered with figment (defaults, profile file, main file,
//! `SWITCHYARD_*` environment variables, programmatic overrides) into a
//! [`SwitchyardConfig`] and checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, HostConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig,
    SwitchyardConfig, UnroutedBatch,
};
pub use validation::validate_config;
