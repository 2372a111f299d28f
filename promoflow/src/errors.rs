//! Error types for promotion orchestration.
//!
//! Collaborators report [`StoreError`]. The two entry operations report
//! [`PromotionError`], whose [`ErrorCode`] is what a transport layer maps to
//! its own status codes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external collaborator (store, reader, writer).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed or could not be reached.
    #[error("{0}")]
    Backend(String),

    /// A resource with the same identity already exists.
    #[error("{kind} {name:?} already exists in namespace {namespace:?}")]
    AlreadyExists {
        /// Resource kind.
        kind: String,
        /// Namespace of the colliding resource.
        namespace: String,
        /// Name of the colliding resource.
        name: String,
    },

    /// The store rejected the shape of an object.
    #[error("invalid object: {0}")]
    Invalid(String),

    /// The caller cancelled the request while the call was in flight.
    #[error("context canceled: {0}")]
    Cancelled(String),

    /// The request deadline passed before the call completed.
    #[error("context deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// An object could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a backend error from any message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Returns a short type name for structured reporting.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Backend(_) => "Backend",
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::Invalid(_) => "Invalid",
            Self::Cancelled(_) => "Cancelled",
            Self::DeadlineExceeded(_) => "DeadlineExceeded",
            Self::Serialization(_) => "Serialization",
        }
    }
}

/// Status class of a [`PromotionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A required identifier was missing.
    InvalidArgument,
    /// The stage, qualified freight, or subscribers could not be found.
    NotFound,
    /// The caller may not act on the project.
    PermissionDenied,
    /// A collaborator failed.
    Internal,
}

impl ErrorCode {
    /// Returns the canonical lowercase name of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned by the promotion entry operations.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// A required identifier was empty.
    #[error("{0}")]
    InvalidArgument(String),

    /// Something the request refers to does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The project validator refused the request.
    #[error("{0}")]
    PermissionDenied(String),

    /// A single collaborator call failed.
    #[error("{0}")]
    Internal(#[from] StoreError),

    /// One or more fan-out writes failed.
    #[error("{0}")]
    PartialFailure(#[from] JoinedError),
}

impl PromotionError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a permission denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Returns the status class of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Internal(_) | Self::PartialFailure(_) => ErrorCode::Internal,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code().as_str()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        match self {
            Self::Internal(err) => {
                map.insert("cause".to_string(), serde_json::json!(err.type_name()));
            }
            Self::PartialFailure(joined) => {
                map.insert(
                    "failures".to_string(),
                    serde_json::json!(joined
                        .failures()
                        .iter()
                        .map(|f| serde_json::json!({
                            "stage": f.stage,
                            "error": f.error.to_string(),
                            "error_type": f.error.type_name(),
                        }))
                        .collect::<Vec<_>>()),
                );
            }
            _ => {}
        }
        map
    }
}

/// A failed write for one subscriber in a cascade.
#[derive(Debug)]
pub struct WriteFailure {
    /// Name of the subscriber stage whose promotion was not created.
    pub stage: String,
    /// The collaborator error.
    pub error: StoreError,
}

impl WriteFailure {
    /// Creates a new write failure.
    pub fn new(stage: impl Into<String>, error: StoreError) -> Self {
        Self {
            stage: stage.into(),
            error,
        }
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error creating Promotion for Stage {:?}: {}",
            self.stage, self.error
        )
    }
}

/// Every failure of a fan-out, joined one per line.
#[derive(Debug, Default)]
pub struct JoinedError {
    failures: Vec<WriteFailure>,
}

impl JoinedError {
    /// Creates a joined error from a list of failures.
    #[must_use]
    pub fn new(failures: Vec<WriteFailure>) -> Self {
        Self { failures }
    }

    /// Returns the individual failures.
    #[must_use]
    pub fn failures(&self) -> &[WriteFailure] {
        &self.failures
    }

    /// Returns the number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the names of the stages that failed.
    #[must_use]
    pub fn failed_stages(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.stage.as_str()).collect()
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinedError {}
