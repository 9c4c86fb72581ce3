/// Failure taxonomy shared by every operation
///
/// Each failure has a kind and a stable machine-readable [`code`](CoreError::code).
/// Messages are safe to show to callers: store error text is logged where
/// the conversion happens and never carried forward.
///
/// | Kind | Code | Retryable |
/// |---|---|---|
/// | `Unauthorized` | `unauthorized` | no |
/// | `NotFound` | `not_found` | no |
/// | `Validation` | `validation_error` | no |
/// | `Consistency` | `consistency_error` | no |
/// | `Unavailable` | `unavailable` | yes |
/// | `Internal` | `internal_error` | no |
///
/// # Example
///
/// ```
/// use tankkeeper_shared::error::CoreError;
/// use uuid::Uuid;
///
/// let err = CoreError::not_found("tank", Uuid::nil());
/// assert_eq!(err.code(), "not_found");
/// assert!(!err.is_retryable());
/// ```

use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::auth::authorization::AuthzError;
use crate::store::StoreError;

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Caller tier is insufficient
    #[error("Not authorized to perform this operation")]
    Unauthorized,

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Malformed input, rejected before any store access
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    /// A multi-step relationship change could not be completed
    #[error("{message}")]
    Consistency { message: String },

    /// Store unreachable or timed out
    #[error("Storage is temporarily unavailable")]
    Unavailable,

    /// Unexpected store failure
    #[error("An internal error occurred")]
    Internal,
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Validation failure without field detail
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        CoreError::Consistency {
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Unauthorized => "unauthorized",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Validation { .. } => "validation_error",
            CoreError::Consistency { .. } => "consistency_error",
            CoreError::Unavailable => "unavailable",
            CoreError::Internal => "internal_error",
        }
    }

    /// Only transient store failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Unavailable)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { message } => {
                warn!(%message, "Store unavailable");
                CoreError::Unavailable
            }
            StoreError::Constraint { message } | StoreError::Query { message } => {
                error!(%message, "Store call failed");
                CoreError::Internal
            }
        }
    }
}

impl From<AuthzError> for CoreError {
    fn from(_: AuthzError) -> Self {
        CoreError::Unauthorized
    }
}

/// Flattens nested validator output into `field.path[index]` entries
fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let name: &str = &**field;
        let path = match (prefix.is_empty(), name) {
            (true, "__all__") => "input".to_string(),
            (false, "__all__") => prefix.to_string(),
            (true, name) => name.to_string(),
            (false, name) => format!("{}.{}", prefix, name),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldError {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors("", &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        CoreError::Validation {
            message: "Input validation failed".to_string(),
            fields,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::validation(format!("Malformed input: {}", err))
    }
}
