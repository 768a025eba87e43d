//! Error types for pinboard.
//!
//! Uses thiserror for derive macros and provides operator-readable messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for pinboard operations.
///
/// Each variant maps to a specific process exit code. Failures of a shell
/// command run by an agent are not errors at this level; they travel back to
/// the controller as part of the result body.
#[derive(Error, Debug)]
pub enum PinboardError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The document store failed to list, read, write or delete.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// No document with the given id (or id prefix) exists.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A compare-and-swap update lost against a concurrent writer.
    #[error("Document {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    /// A per-document lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// The agent could not set up its execution environment (e.g. host identity).
    #[error("Execution failed: {0}")]
    ExecError(String),
}

impl PinboardError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PinboardError::UserError(_) => exit_codes::USER_ERROR,
            PinboardError::NotFound(_) => exit_codes::USER_ERROR,
            PinboardError::StoreError(_) => exit_codes::STORE_FAILURE,
            PinboardError::Conflict { .. } => exit_codes::CONTENTION,
            PinboardError::LockError(_) => exit_codes::CONTENTION,
            PinboardError::ExecError(_) => exit_codes::EXEC_FAILURE,
        }
    }

    /// Whether retrying the same write against a fresh read may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            PinboardError::Conflict { .. } | PinboardError::LockError(_)
        )
    }
}

/// Result type alias for pinboard operations.
pub type Result<T> = std::result::Result<T, PinboardError>;
