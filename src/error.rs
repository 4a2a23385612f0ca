//! Error types for alone.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for alone operations.
///
/// Lock contention is not an error: the gate reports it as `Outcome::Later`.
#[derive(Error, Debug)]
pub enum AloneError {
    /// User provided invalid arguments or the workspace is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// The persisted work item state could not be retrieved.
    #[error("State read failed: {0}")]
    StateRead(String),

    /// An acquire or release call against the lock service failed.
    #[error("Lock service failed: {0}")]
    LockService(String),

    /// The delegate failed. Propagated verbatim; the lock stays held.
    #[error("Delegate failed: {0}")]
    Delegate(String),
}

impl AloneError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AloneError::UserError(_) => exit_codes::USER_ERROR,
            AloneError::StateRead(_) => exit_codes::STATE_FAILURE,
            AloneError::LockService(_) => exit_codes::LOCK_FAILURE,
            AloneError::Delegate(_) => exit_codes::DELEGATE_FAILURE,
        }
    }
}

/// Result type alias for alone operations.
pub type Result<T> = std::result::Result<T, AloneError>;
