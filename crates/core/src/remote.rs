//! Contracts for the remote collaborators the coordinator drives.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::model::{Category, CategoryDraft, CategoryId, Item, ItemDraft, ItemId};
use crate::session::SessionContext;

#[async_trait]
pub trait ItemRemote: Send + Sync {
    async fn list(&self, session: &SessionContext) -> Result<Vec<Item>, RemoteError>;

    async fn list_by_category(
        &self,
        session: &SessionContext,
        category: CategoryId,
    ) -> Result<Vec<Item>, RemoteError>;

    /// Returns the persisted item with its server-assigned identity and timestamps.
    async fn create(&self, session: &SessionContext, draft: &ItemDraft)
        -> Result<Item, RemoteError>;

    async fn update(
        &self,
        session: &SessionContext,
        id: ItemId,
        item: &Item,
    ) -> Result<Item, RemoteError>;

    async fn delete(&self, session: &SessionContext, id: ItemId) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait CategoryRemote: Send + Sync {
    async fn list(&self, session: &SessionContext) -> Result<Vec<Category>, RemoteError>;

    async fn get(&self, session: &SessionContext, id: CategoryId)
        -> Result<Category, RemoteError>;

    async fn create(
        &self,
        session: &SessionContext,
        draft: &CategoryDraft,
    ) -> Result<Category, RemoteError>;

    async fn update(
        &self,
        session: &SessionContext,
        id: CategoryId,
        category: &Category,
    ) -> Result<Category, RemoteError>;

    async fn delete(&self, session: &SessionContext, id: CategoryId) -> Result<(), RemoteError>;
}

/// Yes/no gate shown before an irreversible delete.
pub trait ConfirmationPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmationPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

pub struct AlwaysConfirm;

impl ConfirmationPrompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

pub struct NeverConfirm;

impl ConfirmationPrompt for NeverConfirm {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}
