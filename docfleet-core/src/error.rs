//! Error types for DocFleet core.

use std::{error::Error, fmt, io};

/// Error type for DocFleet core operations.
#[derive(Debug)]
pub enum DocFleetError {
    /// An underlying I/O error.
    Io(io::Error),
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for DocFleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for DocFleetError {}

impl From<io::Error> for DocFleetError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Convenience result type for DocFleet core.
pub type Result<T> = std::result::Result<T, DocFleetError>;

#[cfg(test)]
mod tests {
    use super::DocFleetError;
    use std::io;

    #[test]
    fn io_error_formats_message() {
        let error = DocFleetError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{error}"), "io error: boom");
    }

    #[test]
    fn other_error_formats_message() {
        let error = DocFleetError::Other("fleet check failed".to_string());
        assert_eq!(format!("{error}"), "fleet check failed");
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: DocFleetError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            DocFleetError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            DocFleetError::Other(_) => panic!("expected Io variant"),
        }
    }
}
