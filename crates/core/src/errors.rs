use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for statusd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for statusd operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Two probes registered under the same name
    #[error("probe '{name}' is registered more than once")]
    DuplicateProbe { name: String },

    /// A probe run reported a failure
    #[error("{message}")]
    Probe { probe: String, message: String },

    /// A probe run or update sink panicked and was contained
    #[error("probe '{probe}' panicked: {message}")]
    ProbePanicked { probe: String, message: String },

    /// An operation was abandoned because its cancellation signal fired
    #[error("operation '{operation}' was cancelled")]
    Cancelled { operation: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Probe {
            probe: String::new(),
            message: format!("{error:#}"),
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a duplicate probe error
    #[must_use]
    pub fn duplicate_probe(name: impl Into<String>) -> Self {
        Error::DuplicateProbe { name: name.into() }
    }

    /// Create a probe failure
    #[must_use]
    pub fn probe(probe: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Probe {
            probe: probe.into(),
            message: message.into(),
        }
    }

    /// Create a contained panic error
    #[must_use]
    pub fn probe_panicked(probe: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProbePanicked {
            probe: probe.into(),
            message: message.into(),
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a file system error for a known path
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Name of the probe this error belongs to, if any
    pub fn probe_name(&self) -> Option<&str> {
        match self {
            Error::Probe { probe, .. } | Error::ProbePanicked { probe, .. } if !probe.is_empty() => {
                Some(probe.as_str())
            }
            _ => None,
        }
    }

    /// Attach a probe name to a probe failure that was created without one
    #[must_use]
    pub fn for_probe(self, name: &str) -> Self {
        match self {
            Error::Probe { probe, message } if probe.is_empty() => Error::Probe {
                probe: name.to_string(),
                message,
            },
            other => other,
        }
    }
}

// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", message.into(), base_error),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_displays_only_message() {
        let err = Error::probe("kvstore", "etcd quorum lost");
        assert_eq!(err.to_string(), "etcd quorum lost");
        assert_eq!(err.probe_name(), Some("kvstore"));
    }

    #[test]
    fn test_anyhow_conversion_gets_probe_name_attached() {
        let err: Error = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.probe_name(), None);

        let err = err.for_probe("kubernetes");
        assert_eq!(err.probe_name(), Some("kubernetes"));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_for_probe_keeps_existing_name() {
        let err = Error::probe("ipam", "pool exhausted").for_probe("other");
        assert_eq!(err.probe_name(), Some("ipam"));
    }

    #[test]
    fn test_context_wraps_as_configuration() {
        let result: Result<()> = Err(Error::duplicate_probe("kvstore"));
        let err = result.context("registering status probes").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("registering status probes"));
        assert!(err.to_string().contains("kvstore"));
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("wait for first run", Duration::from_secs(3));
        assert_eq!(
            err.to_string(),
            "operation 'wait for first run' timed out after 3s"
        );
    }
}
