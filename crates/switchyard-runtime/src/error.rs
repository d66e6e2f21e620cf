//! Runtime error types.

use switchyard_core::RegistrationError;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that stop the runtime from starting or serving.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Route or adapter registration failed while building the app.
    #[error("Registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// Reading invocations or writing replies failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LinesCodecError> for RuntimeError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::Io(err) => Self::Io(err),
            LinesCodecError::MaxLineLengthExceeded => Self::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "line length limit exceeded",
            )),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
