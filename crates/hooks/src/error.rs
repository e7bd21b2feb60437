//! Hook-level error type.

use thiserror::Error;

/// Errors returned by boundary hook implementations.
///
/// The engine uses the variant to decide how hard to fail:
/// - `Unavailable` — the backing service could not be reached; a directory
///   lookup fails the build, a notification is logged and dropped.
/// - `Rejected`    — the hook understood the request and refused it.
#[derive(Debug, Error, Clone)]
pub enum HookError {
    /// Transient failure talking to the backing service.
    #[error("hook unavailable: {0}")]
    Unavailable(String),

    /// Permanent failure; retrying the same request will not help.
    #[error("hook rejected request: {0}")]
    Rejected(String),
}
