//! Error types for Weft.

use crate::envelope::GraphError;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Result type alias for Weft operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Weft operations.
///
/// Configuration errors are returned synchronously to the caller. Transport,
/// protocol and executor errors are surfaced on result envelopes instead.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Malformed options or configuration.
    Configuration {
        message: String,
    },
    /// The document declares required variables that were not supplied.
    MissingVariables {
        operation: String,
        names: Vec<String>,
    },
    /// The transport failed to deliver a response.
    Transport {
        message: String,
    },
    /// The server answered with errors, or with a payload that cannot be stored.
    Protocol {
        errors: Vec<GraphError>,
    },
    /// The executor refused to run a task.
    Executor {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            Error::MissingVariables { operation, names } => {
                write!(
                    f,
                    "Operation {} is missing required variables: {}",
                    operation,
                    names.join(", ")
                )
            }
            Error::Transport { message } => {
                write!(f, "Transport error: {}", message)
            }
            Error::Protocol { errors } => {
                write!(f, "Protocol error:")?;
                for error in errors {
                    write!(f, " {}", error.message)?;
                }
                Ok(())
            }
            Error::Executor { message } => {
                write!(f, "Executor error: {}", message)
            }
        }
    }
}

impl core::error::Error for Error {}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Creates a missing variables error.
    pub fn missing_variables(operation: impl Into<String>, names: Vec<String>) -> Self {
        Error::MissingVariables {
            operation: operation.into(),
            names,
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol error carrying server errors.
    pub fn protocol(errors: Vec<GraphError>) -> Self {
        Error::Protocol { errors }
    }

    /// Creates a protocol error from a single message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::Protocol {
            errors: vec![GraphError::new(message)],
        }
    }

    /// Creates an executor error.
    pub fn executor(message: impl Into<String>) -> Self {
        Error::Executor {
            message: message.into(),
        }
    }

    /// Returns true for errors reported synchronously from option handling.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::MissingVariables { .. }
        )
    }

    /// Converts this error into the error list carried by a result envelope.
    pub fn to_graph_errors(&self) -> Vec<GraphError> {
        match self {
            Error::Protocol { errors } => errors.clone(),
            other => vec![GraphError::new(other.to_string())],
        }
    }
}
