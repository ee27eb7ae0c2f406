//! Failure taxonomy for routine parsing.

/// Why a routine sentence could not be parsed into device updates.
///
/// Every failure from the parsing pipeline is one of these three kinds;
/// collaborator-specific errors are classified at the interpreter boundary
/// and never propagate in their raw form.
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    /// The language-understanding service could not be reached, timed out,
    /// or answered with an error status.
    #[error("language service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service responded, but the payload does not match the expected
    /// update schema.
    #[error("language service returned malformed output: {0}")]
    MalformedOutput(String),

    /// A structurally valid entry violated a catalog or uniqueness
    /// constraint under strict validation.
    #[error("validation failed: {0}")]
    Validation(String),
}
