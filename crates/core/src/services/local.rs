use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::database::{Database, StorageError};
use crate::error::{RemoteError, RemoteErrorKind};
use crate::model::{Category, CategoryDraft, CategoryId, Item, ItemDraft, ItemId};
use crate::remote::{CategoryRemote, ItemRemote};
use crate::session::SessionContext;

/// Item and category service backed by the SQLite [`Database`] in the configured data directory.
#[derive(Debug, Clone)]
pub struct LocalService {
    config: AppConfig,
}

impl LocalService {
    pub fn new(config: AppConfig) -> Result<Self> {
        Database::initialize(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    async fn run<T, F>(
        &self,
        operation: &'static str,
        session: &SessionContext,
        f: F,
    ) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &str) -> Result<T> + Send + 'static,
    {
        if !session.is_authenticated() {
            return Err(RemoteError::new(
                operation,
                RemoteErrorKind::Unauthorized,
                "no signed-in user",
            ));
        }
        tracing::debug!(operation, user = session.user(), "local service call");

        let config = self.config.clone();
        let owner = session.user().to_string();
        tokio::task::spawn_blocking(move || {
            let db = Database::initialize(&config)?;
            f(&db, &owner)
        })
        .await
        .map_err(|err| {
            RemoteError::new(
                operation,
                RemoteErrorKind::Transport,
                format!("blocking task failed: {err}"),
            )
        })?
        .map_err(|err| storage_failure(operation, err))
    }
}

fn storage_failure(operation: &'static str, err: anyhow::Error) -> RemoteError {
    let kind = match err.downcast_ref::<StorageError>() {
        Some(StorageError::DuplicateCategory(_)) => RemoteErrorKind::Conflict,
        Some(StorageError::MissingCategory(_)) => RemoteErrorKind::NotFound,
        None => RemoteErrorKind::Server,
    };
    tracing::warn!(operation, error = %err, "local service call failed");
    RemoteError::new(operation, kind, format!("{err:#}"))
}

fn found<T>(
    operation: &'static str,
    value: Option<T>,
    what: impl fmt::Display,
) -> Result<T, RemoteError> {
    value.ok_or_else(|| RemoteError::not_found(operation, what))
}

#[async_trait]
impl ItemRemote for LocalService {
    async fn list(&self, session: &SessionContext) -> Result<Vec<Item>, RemoteError> {
        self.run("list items", session, |db, owner| db.list_items(owner))
            .await
    }

    async fn list_by_category(
        &self,
        session: &SessionContext,
        category: CategoryId,
    ) -> Result<Vec<Item>, RemoteError> {
        self.run("list items by category", session, move |db, owner| {
            db.list_items_by_category(owner, category)
        })
        .await
    }

    async fn create(
        &self,
        session: &SessionContext,
        draft: &ItemDraft,
    ) -> Result<Item, RemoteError> {
        let draft = draft.clone();
        self.run("create item", session, move |db, owner| {
            db.insert_item(owner, &draft)
        })
        .await
    }

    async fn update(
        &self,
        session: &SessionContext,
        id: ItemId,
        item: &Item,
    ) -> Result<Item, RemoteError> {
        let item = item.clone();
        let updated = self
            .run("update item", session, move |db, owner| {
                db.update_item(owner, id, &item)
            })
            .await?;
        found("update item", updated, format_args!("item {id}"))
    }

    async fn delete(&self, session: &SessionContext, id: ItemId) -> Result<(), RemoteError> {
        let deleted = self
            .run("delete item", session, move |db, owner| db.delete_item(owner, id))
            .await?;
        found("delete item", deleted.then_some(()), format_args!("item {id}"))
    }
}

#[async_trait]
impl CategoryRemote for LocalService {
    async fn list(&self, session: &SessionContext) -> Result<Vec<Category>, RemoteError> {
        self.run("list categories", session, |db, owner| {
            db.list_categories(owner)
        })
        .await
    }

    async fn get(&self, session: &SessionContext, id: CategoryId) -> Result<Category, RemoteError> {
        let category = self
            .run("get category", session, move |db, owner| {
                db.fetch_category(owner, id)
            })
            .await?;
        found("get category", category, format_args!("category {id}"))
    }

    async fn create(
        &self,
        session: &SessionContext,
        draft: &CategoryDraft,
    ) -> Result<Category, RemoteError> {
        let draft = draft.clone();
        self.run("create category", session, move |db, owner| {
            db.insert_category(owner, &draft)
        })
        .await
    }

    async fn update(
        &self,
        session: &SessionContext,
        id: CategoryId,
        category: &Category,
    ) -> Result<Category, RemoteError> {
        let category = category.clone();
        let updated = self
            .run("update category", session, move |db, owner| {
                db.update_category(owner, id, &category)
            })
            .await?;
        found("update category", updated, format_args!("category {id}"))
    }

    async fn delete(&self, session: &SessionContext, id: CategoryId) -> Result<(), RemoteError> {
        let deleted = self
            .run("delete category", session, move |db, owner| {
                db.delete_category(owner, id)
            })
            .await?;
        found(
            "delete category",
            deleted.then_some(()),
            format_args!("category {id}"),
        )
    }
}
