//! Error taxonomy shared by the normalizer, the coordinator, and remote collaborators.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::model::{CategoryId, ItemId};

/// Input rejected before any remote call is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Item title cannot be empty")]
    EmptyTitle,
    #[error("Category name cannot be empty")]
    EmptyName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Transport,
    Server,
    Conflict,
    NotFound,
    Unauthorized,
    Timeout,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::Transport => "transport",
            RemoteErrorKind::Server => "server",
            RemoteErrorKind::Conflict => "conflict",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any failure reported by a remote collaborator. The coordinator treats every kind the same
/// way; the kind only shapes the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed ({kind}): {message}")]
pub struct RemoteError {
    pub operation: &'static str,
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(operation: &'static str, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::new(
            operation,
            RemoteErrorKind::Timeout,
            format!("no response after {} ms", after.as_millis()),
        )
    }

    pub fn not_found(operation: &'static str, what: impl fmt::Display) -> Self {
        Self::new(operation, RemoteErrorKind::NotFound, format!("{what} not found"))
    }
}

/// Identity a mutation is serialized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Item(ItemId),
    Category(CategoryId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Item(id) => write!(f, "item {id}"),
            EntityKey::Category(id) => write!(f, "category {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0} already has a mutation in flight")]
    Busy(EntityKey),
    #[error("{0} is not in the local store")]
    UnknownEntity(EntityKey),
}

impl SyncError {
    /// Validation failures end the save silently; everything else is shown to the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SyncError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_message_names_operation_and_kind() {
        let err = RemoteError::timeout("update item", Duration::from_millis(250));
        assert_eq!(
            err.to_string(),
            "update item failed (timeout): no response after 250 ms"
        );
    }

    #[test]
    fn validation_errors_are_not_user_visible() {
        assert!(!SyncError::from(ValidationError::EmptyTitle).is_user_visible());
        assert!(SyncError::Busy(EntityKey::Item(ItemId(3))).is_user_visible());
    }
}
