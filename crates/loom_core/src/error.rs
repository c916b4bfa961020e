//! Error types shared by the no_std-compatible foundation crates.
//!
//! Precondition violations (tier 1 in the workspace's error model) are not
//! represented here: they are programmer errors and abort via `panic!`/
//! `debug_assert!` at the call site. This type only carries recoverable,
//! tier-2 registry outcomes.

use core::fmt;
use alloc::boxed::Box;
use alloc::string::String;

/// The core error type.
#[derive(Debug, Clone)]
pub enum Error {
    /// Type registry error
    TypeRegistry(TypeRegistryError),
    /// Generic error with message
    Message(Box<str>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeRegistry(e) => write!(f, "type registry error: {}", e),
            Error::Message(msg) => write!(f, "{}", msg),
        }
    }
}

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;

/// Type registry errors
#[derive(Debug, Clone)]
pub enum TypeRegistryError {
    /// Type not registered
    NotRegistered(Box<str>),
    /// Type already registered
    AlreadyRegistered(Box<str>),
}

impl fmt::Display for TypeRegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRegistryError::NotRegistered(name) => write!(f, "type not registered: {}", name),
            TypeRegistryError::AlreadyRegistered(name) => {
                write!(f, "type already registered: {}", name)
            }
        }
    }
}

impl From<TypeRegistryError> for Error {
    fn from(e: TypeRegistryError) -> Self {
        Error::TypeRegistry(e)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Message(s.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Message(s.into_boxed_str())
    }
}
