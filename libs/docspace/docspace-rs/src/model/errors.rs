use std::backtrace::Backtrace;
use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Serializer};

use crate::io::remote::ApiError;

pub type DsResult<T> = Result<T, DsErr>;

#[derive(Debug)]
pub struct DsErr {
    pub kind: DsErrKind,
    pub backtrace: Option<Backtrace>,
}

impl Serialize for DsErr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.kind.to_string())
    }
}

impl Display for DsErr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for DsErr {}

/// The purpose of this Display implementation is to provide uniformity for the
/// description of errors a console user may see. Kinds that are not expected
/// to leave this crate use a debug rendering of their details.
impl Display for DsErrKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DsErrKind::Cancelled => write!(f, "The request was superseded"),
            DsErrKind::Conflict(reason) => write!(f, "{reason}"),
            DsErrKind::CsvInvalid { line, reason } => {
                write!(f, "Line {line} of the upload is invalid: {reason}")
            }
            DsErrKind::CursorUnavailable(page) => {
                write!(f, "Page {page} cannot be fetched before the page preceding it")
            }
            DsErrKind::FileNameContainsSlash => write!(f, "A file name cannot contain slashes"),
            DsErrKind::FileNameEmpty => write!(f, "A file name cannot be empty"),
            DsErrKind::InsufficientPermission => {
                write!(f, "You don't have the permission to do that")
            }
            DsErrKind::InvalidTransition { from, to } => {
                write!(f, "An entry cannot go from {from:?} to {to:?}")
            }
            DsErrKind::MemberNotFound(member) => write!(f, "No member named {member}"),
            DsErrKind::NoSpaceSelected => write!(f, "Select a space first"),
            DsErrKind::PurgeRequiresArchiveView => {
                write!(f, "Only archived entries can be permanently deleted")
            }
            DsErrKind::ServerRejected { reason, .. } => match reason {
                Some(reason) => write!(f, "{reason}"),
                None => write!(f, "Failed to fetch data"),
            },
            DsErrKind::ServerUnreachable(msg) => write!(f, "Could not reach server: {msg}"),
            DsErrKind::Unexpected(msg) => write!(f, "Unexpected error: {msg}"),
        }
    }
}

impl From<DsErrKind> for DsErr {
    fn from(kind: DsErrKind) -> Self {
        Self { kind, backtrace: Some(Backtrace::force_capture()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsErrKind {
    /// A request was cancelled by a superseding request or the end of its
    /// view's lifetime.
    Cancelled,
    /// The server rejected the change because it conflicts with existing
    /// state, e.g. renaming onto an existing name.
    Conflict(String),
    CsvInvalid {
        line: usize,
        reason: String,
    },
    CursorUnavailable(usize),
    FileNameContainsSlash,
    FileNameEmpty,
    InsufficientPermission,
    InvalidTransition {
        from: crate::service::archive::ArchiveState,
        to: crate::service::archive::ArchiveState,
    },
    MemberNotFound(String),
    NoSpaceSelected,
    PurgeRequiresArchiveView,
    /// The server responded with a non-success status.
    ServerRejected {
        status: u16,
        reason: Option<String>,
    },
    /// The request never completed.
    ServerUnreachable(String),

    /// If no programmer in any part of the stack (including tests) expects
    /// to see a particular error, we debug format the underlying error to
    /// keep the number of error types in check.
    Unexpected(String),
}

impl DsErrKind {
    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, DsErrKind::ServerUnreachable(_) | DsErrKind::Cancelled)
    }
}

pub fn core_err_unexpected<T: fmt::Debug>(err: T) -> DsErrKind {
    DsErrKind::Unexpected(format!("{:?}", err))
}

impl From<ApiError> for DsErrKind {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::SendFailed(msg) | ApiError::ReceiveFailed(msg) => {
                DsErrKind::ServerUnreachable(msg)
            }
            ApiError::Cancelled => DsErrKind::Cancelled,
            ApiError::Forbidden => DsErrKind::InsufficientPermission,
            ApiError::Conflict(reason) => DsErrKind::Conflict(reason),
            ApiError::Endpoint { status, reason } => DsErrKind::ServerRejected { status, reason },
            e @ (ApiError::Serialize(_) | ApiError::Deserialize(_)) => core_err_unexpected(e),
        }
    }
}

impl From<ApiError> for DsErr {
    fn from(err: ApiError) -> Self {
        DsErrKind::from(err).into()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn transport_failures_keep_their_message() {
        let kind = DsErrKind::from(ApiError::SendFailed("connection refused".into()));
        assert!(kind.is_transport());
        assert_eq!(kind.to_string(), "Could not reach server: connection refused");
    }

    #[test]
    fn rejections_without_reason_read_as_fetch_failures() {
        let kind = DsErrKind::from(ApiError::Endpoint { status: 500, reason: None });
        assert!(!kind.is_transport());
        assert_eq!(kind.to_string(), "Failed to fetch data");
    }

    #[test]
    fn conflicts_show_the_server_reason() {
        let kind = DsErrKind::from(ApiError::Conflict("report.pdf already exists".into()));
        assert_eq!(kind.to_string(), "report.pdf already exists");
    }
}
