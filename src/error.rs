//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::debrid::DebridError;
use crate::fetch::FetchError;
use crate::registry::RegistryError;

/// Settings problems. Terminal for a request.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{source_name} requires a debrid credential; set debrid_token or REELSOURCE_DEBRID_TOKEN")]
    MissingCredential { source_name: &'static str },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Debrid(#[from] DebridError),
}

pub type Result<T> = std::result::Result<T, Error>;
