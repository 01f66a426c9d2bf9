// src/error.rs

//! Crate-level error type for the conversion engine
//!
//! Only invocation-level faults live here (failed exclusive acquisition,
//! host infrastructure problems, config I/O). Per-unit conversion failures
//! are data, not errors: see [`crate::unit::Outcome`].

use thiserror::Error;

/// Result type for conversion-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an invocation (never a single unit)
#[derive(Error, Debug)]
pub enum Error {
    /// Another writer already holds exclusive access to the project.
    /// Fatal and non-retriable for this invocation.
    #[error("exclusive access already held: {0}")]
    AccessAlreadyHeld(String),

    /// A unit of work was requested outside an exclusive-access scope
    #[error("no exclusive access scope for work '{0}'")]
    NoExclusiveScope(String),

    /// The host has no object for the given handle
    #[error("unknown unit handle: {0}")]
    UnknownUnit(u64),

    /// The host SDK refused a structural edit. The rewriter converts this
    /// into a per-unit `HostRejectedWrite` outcome; it only escapes as an
    /// error if it occurs outside a unit rewrite.
    #[error("host rejected write to '{unit}': {message}")]
    HostRejected { unit: String, message: String },

    /// IO error from trace or config handling
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Policy file could not be parsed
    #[error("policy parse error: {0}")]
    PolicyParse(#[from] toml::de::Error),

    /// Policy could not be serialized
    #[error("policy encode error: {0}")]
    PolicyEncode(#[from] toml::ser::Error),
}
