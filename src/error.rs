use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No registered factory and no definition file in any base dir.
    #[error("unit '{name}' can't be located")]
    Resolution { name: String },

    #[error("dependency cycle detected: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid unit definition {}: {message}", path.display())]
    Definition { path: PathBuf, message: String },

    #[error("failed to render script for unit '{unit}': {source}")]
    Template {
        unit: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
