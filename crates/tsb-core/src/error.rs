//! # Error Types — Proto Loading
//!
//! Errors raised while loading a proto registry from JSON or YAML. A proto
//! that fails to load never reaches the validator, so every error here is a
//! configuration error: the caller fixes the schema file, not the input value.

use std::path::PathBuf;

use thiserror::Error;

/// Error while loading or serializing a [`Proto`](crate::Proto).
#[derive(Error, Debug)]
pub enum ProtoError {
    /// The JSON text does not describe a valid proto.
    #[error("invalid proto JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The YAML text does not describe a valid proto.
    #[error("invalid proto YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The proto file could not be read.
    #[error("cannot read proto file '{path}': {source}")]
    Io {
        /// Path of the file that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_display() {
        let inner = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProtoError::Json(inner);
        assert!(format!("{err}").contains("invalid proto JSON"));
    }

    #[test]
    fn io_error_display_names_the_path() {
        let err = ProtoError::Io {
            path: PathBuf::from("protos/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("protos/missing.json"));
        assert!(msg.contains("gone"));
    }
}
