//! Recoverable module-manager errors.
//!
//! Per the error-handling model: invalid module configs are a
//! recoverable, tier-2 outcome (logged, the module is skipped); a shared
//! library failing to open or resolve a symbol is a tier-3 "broken
//! deployment" condition and aborts the process instead (see
//! [`crate::library`]), so no variant for it lives here.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModuleConfigError>;

#[derive(Debug, Error)]
pub enum ModuleConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?} as YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
