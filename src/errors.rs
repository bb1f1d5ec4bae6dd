//! Error Types
//!
//! This module defines the error types returned by the shader system.
//!
//! # Overview
//!
//! [`ShaderError`] covers failures that escape a cache-fill operation:
//! - Fallback exhaustion (no candidate material produced a program)
//! - Template rendering failures
//! - Cache and asset consistency problems
//! - Persistent cache I/O and decoding
//!
//! Errors *inside* a single compile pass (type mismatches, missing inputs,
//! platform compiler diagnostics) are plain strings collected per candidate;
//! see [`crate::renderer::compiler::CompileError`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use shadegraph::errors::{ShaderError, Result};
//!
//! fn warm_up(ctx: &mut ShaderCompilationContext) -> Result<()> {
//!     ctx.get_cached_shader(function, material, layout)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::core::ResourceKind;

/// The main error type of the shader system.
#[derive(Error, Debug)]
pub enum ShaderError {
    // ========================================================================
    // Compilation Errors
    // ========================================================================
    /// Neither the material nor any fallback material produced a program.
    ///
    /// Rendering cannot proceed for this key; the aggregated, deduplicated
    /// errors of every attempted candidate are attached.
    #[error("Failed to compile fallback material for {material} - {function}{}", error_lines(.errors))]
    FallbackExhausted {
        /// Name of the material that was requested
        material: String,
        /// Description of the shader function
        function: String,
        /// Errors of all candidates, in order of first appearance
        errors: Vec<String>,
    },

    /// The shader template could not be loaded or rendered.
    #[error("Shader template error: {0}")]
    Template(String),

    // ========================================================================
    // Cache & Asset Errors
    // ========================================================================
    /// A resource of this kind was requested but no constructor is registered.
    #[error("No constructor registered for resource kind {0:?}")]
    ResourceKindUnregistered(ResourceKind),

    /// The requested asset handle is stale or was never added.
    #[error("Asset not found: {0}")]
    MissingAsset(String),

    /// A texture was bound where a cubemap is required.
    #[error("Texture {0} is not a cubemap")]
    NotACubemap(String),

    /// The persistent program cache stream is malformed.
    #[error("Persistent shader cache is corrupt: {0}")]
    PersistentCacheCorrupt(String),

    // ========================================================================
    // Async Compilation Errors
    // ========================================================================
    /// The ticket was never issued or has already been consumed.
    #[error("Unknown compile ticket {0}")]
    UnknownTicket(u64),

    /// The background compile worker stopped before answering.
    #[error("Compile worker disconnected")]
    WorkerDisconnected,

    // ========================================================================
    // I/O & Format Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (configuration files).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

fn error_lines(errors: &[String]) -> String {
    errors.iter().map(|e| format!("\n{e}")).collect()
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<minijinja::Error> for ShaderError {
    fn from(err: minijinja::Error) -> Self {
        ShaderError::Template(err.to_string())
    }
}

/// Alias for `Result<T, ShaderError>`.
pub type Result<T> = std::result::Result<T, ShaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_message_lists_errors_one_per_line() {
        let err = ShaderError::FallbackExhausted {
            material: "Rock".to_string(),
            function: "Emissive".to_string(),
            errors: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Failed to compile fallback material for Rock - Emissive\nfirst\nsecond"
        );
    }
}
