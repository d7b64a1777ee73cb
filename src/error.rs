//! Error types for the credential provider client.
//!
//! [`ErrorInfo`] is what the SDK tells us went wrong, and only
//! [`crate::provider::translate`] builds one. [`Error`] is the unified type
//! every public operation returns; it wraps an [`ErrorInfo`] or reports a
//! problem detected on our side before any native call was made.

/// Literal prefix of every rendered [`ErrorInfo`].
pub const ERROR_PREFIX: &str = "error code:";

/// Whether `text` is a rendered vault error.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}

/// Diagnostic reported by the vault runtime for a failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorInfo {
    /// A null or unusable handle was presented. No native code exists.
    #[error("error code: none, error message: nil handle is invalid")]
    InvalidHandle,

    /// The runtime recorded a non-success code on the handle. Both fields
    /// are passed through unmodified.
    #[error("error code: {code}, error message: {message}")]
    Native { code: i32, message: String },
}

impl ErrorInfo {
    /// The native error code, if the runtime supplied one.
    pub fn code(&self) -> Option<i32> {
        match self {
            ErrorInfo::InvalidHandle => None,
            ErrorInfo::Native { code, .. } => Some(*code),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ErrorInfo::InvalidHandle => "nil handle is invalid",
            ErrorInfo::Native { message, .. } => message,
        }
    }

    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, ErrorInfo::InvalidHandle)
    }
}

/// Unified error type for the credential provider client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The vault runtime reported a failure.
    #[error(transparent)]
    Vault(#[from] ErrorInfo),

    /// The runtime returned no value for an attribute without reporting an
    /// error of its own.
    #[error("attribute {name} has no value")]
    MissingAttribute { name: String },

    /// A caller-supplied value cannot be passed to the runtime.
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl Error {
    pub(crate) fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The runtime diagnostic, if this error came from the vault.
    pub fn vault_info(&self) -> Option<&ErrorInfo> {
        match self {
            Error::Vault(info) => Some(info),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
