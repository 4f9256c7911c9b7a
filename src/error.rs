//! Core error taxonomy.
//!
//! Tools never let these escape their `run()` boundary — they fold any
//! `Error` into `ToolResult::failure` (see [`crate::tools::ToolResult`]).
//! Orchestrators surface errors only as section `status` values.

/// The kinds of failure recognized across the gateway, tools, and engines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store not configured, or configuration is otherwise invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transient external failure (network, timeout on the store side).
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Structural or semantic problem in a specific query.
    #[error("query error: {0}")]
    Query(String),

    /// Invalid input to a tool or engine call.
    #[error("validation error: {0}")]
    Validation(String),

    /// A per-task timeout or total orchestration budget was reached.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// An asset lookup matched nothing. Not fatal — callers should surface
    /// `{found: false, suggestions}` rather than propagate this variant.
    #[error("ambiguous reference: {0}")]
    AmbiguousReference(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A short, user-safe string suitable for `ToolResult::error_message`.
    ///
    /// Never leaks internal detail (connection strings, stack traces); the
    /// `Display` impl above is for logs, this is for callers.
    pub fn user_safe_message(&self) -> String {
        match self {
            Error::Configuration(_) => {
                "This data source is not configured.".to_string()
            }
            Error::Connectivity(_) => {
                "The data source is temporarily unavailable. Please try again.".to_string()
            }
            Error::Query(_) => "Unable to complete that query.".to_string(),
            Error::Validation(msg) => format!("Invalid input: {msg}"),
            Error::DeadlineExceeded(_) => "Generation timed out.".to_string(),
            Error::AmbiguousReference(msg) => msg.clone(),
        }
    }
}
