use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while turning a [`TreeSource`](super::TreeSource) into a
/// definition.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown source format '{0}'")]
    UnknownFormat(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON tree: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml")]
    #[error("invalid YAML tree: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
