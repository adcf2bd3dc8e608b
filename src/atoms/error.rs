// ── Limbic Atoms: Error Types ──────────────────────────────────────────────
// Single canonical error enum for the crate, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, Serialization, Persistence…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • `CoreError` → `String` conversion is provided via `Display` so that
//     host command boundaries (`Result<T, String>`) can call `.map_err(|e|
//     e.to_string())` without boilerplate.
//   • Persistence and retraining failures are recovered near where they occur
//     (fallback state, rollback); the variants exist so the recovery sites can
//     log something precise, not so callers of the facade ever see them.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CoreError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable state load/save failure that is not a plain I/O error
    /// (missing parent directory, malformed path, partial write detected).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Model snapshot creation or restore failure.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Failure inside a retraining cycle (parameter derivation, artifact
    /// persistence). Always triggers rollback at the controller.
    #[error("Retraining error: {0}")]
    Retraining(String),

    /// Engine configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Migration bridge: String → CoreError ───────────────────────────────────
// Allows `?` on functions still returning `Result<T, String>` inside functions
// that return `CoreResult<T>`.

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
/// At host command boundaries, convert with `.map_err(|e| e.to_string())`.
pub type CoreResult<T> = Result<T, CoreError>;

// ── Conversion: CoreError → String ─────────────────────────────────────────
// Lets host command functions call `.map_err(CoreError::into)` directly.

impl From<CoreError> for String {
    fn from(e: CoreError) -> Self {
        e.to_string()
    }
}
