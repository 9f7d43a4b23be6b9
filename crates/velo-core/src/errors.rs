//! Error types for velo.
//!
//! One structured enum for the whole workspace so callers can pattern-match
//! on failure modes instead of parsing strings. The benchmark harness relies
//! on the recoverable/fatal split: anything that can go wrong while
//! benchmarking a single platform configuration must be recoverable, while
//! setup failures (input files, topology construction) abort the run.

use thiserror::Error;

/// Unified error type for all velo operations.
#[derive(Error, Debug)]
pub enum VeloError {
    /// The requested execution platform cannot be used on this host
    /// (unknown name, backend compiled out, no device present).
    #[error("Platform '{platform}' unavailable: {message}")]
    PlatformUnavailable { platform: String, message: String },

    /// GPU-related errors (context creation, kernel compile, launch).
    #[error("GPU error in {context}: {message}")]
    Gpu { context: String, message: String },

    /// Platform option or simulation parameter validation errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Topology construction errors (missing templates, bad connectivity).
    #[error("Topology error: {0}")]
    Topology(String),

    /// Mathematical/numerical errors (NaN energies, exploding forces).
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// I/O errors (structure files, report writing).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors (fallback).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VeloError {
    /// Creates a platform-unavailable error.
    pub fn platform(platform: impl Into<String>, message: impl Into<String>) -> Self {
        VeloError::PlatformUnavailable {
            platform: platform.into(),
            message: message.into(),
        }
    }

    /// Creates a GPU error with context.
    pub fn gpu(context: impl Into<String>, message: impl Into<String>) -> Self {
        VeloError::Gpu {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        VeloError::Config(message.into())
    }

    /// Creates a topology error.
    pub fn topology(message: impl Into<String>) -> Self {
        VeloError::Topology(message.into())
    }

    /// Creates a numerical error.
    pub fn numerical(message: impl Into<String>) -> Self {
        VeloError::Numerical(message.into())
    }

    /// True for errors local to one platform configuration.
    ///
    /// The benchmark loop converts these into a zero-throughput result and
    /// continues; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VeloError::PlatformUnavailable { .. }
                | VeloError::Gpu { .. }
                | VeloError::Config(_)
                | VeloError::Numerical(_)
        )
    }
}

/// Result type alias for velo operations.
pub type Result<T> = std::result::Result<T, VeloError>;
