use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {0} does not exist")]
    FileNotFound(PathBuf),

    /// The file extension names no format compiled into this build.
    #[error("config format .{0} is unsupported or its feature is disabled")]
    UnsupportedFormat(String),

    /// A source failed to parse or does not fit the schema.
    #[error("config could not be parsed: {0}")]
    ParseError(String),

    /// Parsed fine, but a value is out of range.
    #[error("config is invalid: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
