//! Applies mutation intents against the remote collaborators and reconciles the local store.
//!
//! Reconciliation is decided once, by [`MutationKind::policy`]: mutations that cannot affect
//! anything outside the entity (delete, toggle) or whose echo is the complete new state (create)
//! patch the store directly; anything that can ripple into derived cross-entity state reloads.

mod guard;
mod policy;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{AppConfig, DEFAULT_REMOTE_TIMEOUT};
use crate::error::{EntityKey, RemoteError, RemoteErrorKind, SyncError};
use crate::filter::{category_counts, visible_items, CategoryCounts, FilterCriteria};
use crate::model::{Category, CategoryDraft, CategoryId, Item, ItemDraft, ItemId};
use crate::normalizer::{CategoryIntent, MutationIntent};
use crate::remote::{CategoryRemote, ConfirmationPrompt, ItemRemote};
use crate::session::SessionContext;
use crate::store::EntityStore;
use crate::telemetry::{self, Event};

use guard::PendingGuard;
pub use policy::{MutationKind, Reconcile, ReconcilePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Nothing to do (dismissed dialog, edit continuation).
    Skipped,
    /// The confirmation prompt was answered "no"; no remote call was made.
    Declined,
    Applied { kind: MutationKind, key: EntityKey },
}

/// Copy of the store contents at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub items: Vec<Item>,
    pub categories: Vec<Category>,
    pub version: u64,
}

/// What a successful remote call hands to reconciliation.
#[derive(Debug)]
enum Settled {
    Item(Item),
    Category(Category),
    RemovedItem(ItemId),
    RemovedCategory(CategoryId),
}

pub struct MutationCoordinator {
    items: Arc<dyn ItemRemote>,
    categories: Arc<dyn CategoryRemote>,
    session: SessionContext,
    store: Mutex<EntityStore>,
    pending: PendingGuard,
    telemetry: telemetry::Handle,
    timeout: Duration,
}

impl MutationCoordinator {
    pub fn new(
        items: Arc<dyn ItemRemote>,
        categories: Arc<dyn CategoryRemote>,
        session: SessionContext,
    ) -> Self {
        Self {
            items,
            categories,
            session,
            store: Mutex::new(EntityStore::new()),
            pending: PendingGuard::default(),
            telemetry: telemetry::Handle::new(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Coordinator over a single service implementing both collections, configured from
    /// [`AppConfig`].
    pub fn from_config<R>(config: &AppConfig, remote: Arc<R>, session: SessionContext) -> Self
    where
        R: ItemRemote + CategoryRemote + 'static,
    {
        let items: Arc<dyn ItemRemote> = remote.clone();
        let categories: Arc<dyn CategoryRemote> = remote;
        Self::new(items, categories, session).with_timeout(config.remote_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn telemetry(&self) -> &telemetry::Handle {
        &self.telemetry
    }

    pub fn state_of(&self, key: EntityKey) -> MutationState {
        if self.pending.is_pending(key) {
            MutationState::Pending
        } else {
            MutationState::Idle
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn with_store<R>(&self, f: impl FnOnce(&EntityStore) -> R) -> R {
        f(&self.store.lock())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let store = self.store.lock();
        StoreSnapshot {
            items: store.items().as_slice().to_vec(),
            categories: store.categories().as_slice().to_vec(),
            version: store.version(),
        }
    }

    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.store.lock().items().get(id).cloned()
    }

    pub fn category(&self, id: CategoryId) -> Option<Category> {
        self.store.lock().categories().get(id).cloned()
    }

    pub fn visible(&self, criteria: &FilterCriteria) -> Vec<Item> {
        let store = self.store.lock();
        visible_items(
            store.items().as_slice(),
            store.categories().as_slice(),
            criteria,
        )
        .into_iter()
        .cloned()
        .collect()
    }

    pub fn counts(&self) -> CategoryCounts {
        let store = self.store.lock();
        category_counts(store.items().as_slice(), store.categories().as_slice())
    }

    /// Initial load: categories first so item references resolve on the first render.
    pub async fn load_all(&self) -> Result<(), SyncError> {
        self.load_all_remote().await?;
        Ok(())
    }

    pub async fn reload_items(&self) -> Result<usize, RemoteError> {
        match self.call("list items", self.items.list(&self.session)).await {
            Ok(items) => {
                let count = items.len();
                self.store.lock().replace_items(items);
                self.telemetry.record(Event::ReloadCompleted {
                    collection: "items",
                    count,
                });
                tracing::debug!(count, "items reloaded");
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(error = %err, "item reload failed; keeping last known items");
                self.telemetry.record(Event::ReloadFailed {
                    collection: "items",
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub async fn reload_categories(&self) -> Result<usize, RemoteError> {
        match self
            .call("list categories", self.categories.list(&self.session))
            .await
        {
            Ok(categories) => {
                let count = categories.len();
                self.store.lock().replace_categories(categories);
                self.telemetry.record(Event::ReloadCompleted {
                    collection: "categories",
                    count,
                });
                tracing::debug!(count, "categories reloaded");
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(error = %err, "category reload failed; keeping last known categories");
                self.telemetry.record(Event::ReloadFailed {
                    collection: "categories",
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Server-side category listing. Read-only: the store is not touched.
    pub async fn load_items_for_category(&self, id: CategoryId) -> Result<Vec<Item>, SyncError> {
        let items = self
            .call(
                "list items by category",
                self.items.list_by_category(&self.session, id),
            )
            .await?;
        Ok(items)
    }

    /// Fresh copy of one category from the server, upserted into the store. A category that
    /// no longer exists is dropped locally before the error is returned.
    pub async fn fetch_category(&self, id: CategoryId) -> Result<Category, SyncError> {
        match self
            .call("get category", self.categories.get(&self.session, id))
            .await
        {
            Ok(category) => {
                self.store.lock().upsert_category(category.clone());
                Ok(category)
            }
            Err(err) => {
                if err.kind == RemoteErrorKind::NotFound {
                    self.store.lock().remove_category(id);
                }
                Err(err.into())
            }
        }
    }

    pub async fn apply(&self, intent: MutationIntent) -> Result<MutationOutcome, SyncError> {
        match intent {
            MutationIntent::None => Ok(MutationOutcome::Skipped),
            MutationIntent::Create(draft) => self.create_item(draft).await,
            MutationIntent::Replace(item) => self.replace_item(item).await,
            MutationIntent::Delete(id) => self.delete_item(id).await,
            MutationIntent::ToggleCompletion { id, completed } => {
                self.toggle_completion(id, completed).await
            }
        }
    }

    pub async fn apply_category(
        &self,
        intent: CategoryIntent,
        prompt: &dyn ConfirmationPrompt,
    ) -> Result<MutationOutcome, SyncError> {
        match intent {
            CategoryIntent::None => Ok(MutationOutcome::Skipped),
            CategoryIntent::Create(draft) => self.create_category(draft).await,
            CategoryIntent::Update(category) => self.update_category(category).await,
            CategoryIntent::Delete(id) => self.delete_category(id, prompt).await,
        }
    }

    pub async fn create_item(&self, draft: ItemDraft) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::CreateItem;
        let draft = draft.normalized()?;
        self.begin(kind, None);

        let created = self
            .call(kind.label(), self.items.create(&self.session, &draft))
            .await
            .map_err(|err| self.fail(kind, err))?;
        let key = EntityKey::Item(created.id);
        self.settle(kind, Settled::Item(created)).await?;
        Ok(MutationOutcome::Applied { kind, key })
    }

    /// Replace is not optimistic: the store only changes through the reload that follows a
    /// successful update, so a failure leaves it untouched.
    pub async fn replace_item(&self, item: Item) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::ReplaceItem;
        let item = item.normalized()?;
        let key = EntityKey::Item(item.id);
        let _token = self.claim(kind, key)?;
        self.begin(kind, Some(key));

        let echoed = self
            .call(kind.label(), self.items.update(&self.session, item.id, &item))
            .await
            .map_err(|err| self.fail(kind, err))?;
        self.settle(kind, Settled::Item(echoed)).await?;
        Ok(MutationOutcome::Applied { kind, key })
    }

    pub async fn delete_item(&self, id: ItemId) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::DeleteItem;
        let key = EntityKey::Item(id);
        let _token = self.claim(kind, key)?;
        self.begin(kind, Some(key));

        self.call(kind.label(), self.items.delete(&self.session, id))
            .await
            .map_err(|err| self.fail(kind, err))?;
        self.settle(kind, Settled::RemovedItem(id)).await?;
        Ok(MutationOutcome::Applied { kind, key })
    }

    /// Flip the flag locally first, then confirm remotely. A failed call restores the
    /// previous flag before the error is returned.
    pub async fn toggle_completion(
        &self,
        id: ItemId,
        completed: bool,
    ) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::ToggleCompletion;
        let key = EntityKey::Item(id);
        let _token = self.claim(kind, key)?;

        let (payload, previous) = {
            let mut store = self.store.lock();
            let Some(mut payload) = store.items().get(id).cloned() else {
                drop(store);
                return Err(self.reject(kind, SyncError::UnknownEntity(key)));
            };
            let previous = payload.completed;
            payload.completed = completed;
            if kind.policy().optimistic {
                store.set_completed(id, completed);
            }
            (payload, previous)
        };
        self.begin(kind, Some(key));

        match self
            .call(kind.label(), self.items.update(&self.session, id, &payload))
            .await
        {
            Ok(echoed) => {
                self.settle(kind, Settled::Item(echoed)).await?;
                Ok(MutationOutcome::Applied { kind, key })
            }
            Err(err) => {
                self.compensate_toggle(id, previous).await;
                Err(self.fail(kind, err))
            }
        }
    }

    pub async fn create_category(
        &self,
        draft: CategoryDraft,
    ) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::CreateCategory;
        let draft = draft.normalized()?;
        self.begin(kind, None);

        let created = self
            .call(kind.label(), self.categories.create(&self.session, &draft))
            .await
            .map_err(|err| self.fail(kind, err))?;
        let key = EntityKey::Category(created.id);
        self.settle(kind, Settled::Category(created)).await?;
        Ok(MutationOutcome::Applied { kind, key })
    }

    pub async fn update_category(&self, category: Category) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::UpdateCategory;
        let category = category.normalized()?;
        let key = EntityKey::Category(category.id);
        let _token = self.claim(kind, key)?;
        self.begin(kind, Some(key));

        let echoed = self
            .call(
                kind.label(),
                self.categories.update(&self.session, category.id, &category),
            )
            .await
            .map_err(|err| self.fail(kind, err))?;
        self.settle(kind, Settled::Category(echoed)).await?;
        Ok(MutationOutcome::Applied { kind, key })
    }

    /// Deleting a category is irreversible, so the prompt must answer yes before the remote
    /// call is made.
    pub async fn delete_category(
        &self,
        id: CategoryId,
        prompt: &dyn ConfirmationPrompt,
    ) -> Result<MutationOutcome, SyncError> {
        let kind = MutationKind::DeleteCategory;
        let key = EntityKey::Category(id);
        let _token = self.claim(kind, key)?;

        let message = match self.category(id) {
            Some(category) => format!(
                "Delete category '{}'? Its items will become uncategorized.",
                category.name
            ),
            None => format!("Delete category {id}?"),
        };
        if !prompt.confirm(&message) {
            tracing::debug!(category = id.0, "category delete declined");
            self.telemetry.record(Event::MutationRejected {
                kind,
                reason: "declined".into(),
            });
            return Ok(MutationOutcome::Declined);
        }
        self.begin(kind, Some(key));

        self.call(kind.label(), self.categories.delete(&self.session, id))
            .await
            .map_err(|err| self.fail(kind, err))?;
        self.settle(kind, Settled::RemovedCategory(id)).await?;
        Ok(MutationOutcome::Applied { kind, key })
    }

    async fn call<T, F>(&self, operation: &'static str, request: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::timeout(operation, self.timeout)),
        }
    }

    fn claim(&self, kind: MutationKind, key: EntityKey) -> Result<guard::PendingToken, SyncError> {
        self.pending.acquire(key).map_err(|err| self.reject(kind, err))
    }

    fn begin(&self, kind: MutationKind, key: Option<EntityKey>) {
        match key {
            Some(key) => tracing::debug!(kind = kind.label(), entity = %key, "mutation pending"),
            None => tracing::debug!(kind = kind.label(), "mutation pending"),
        }
        self.telemetry.record(Event::MutationStarted(kind));
    }

    fn reject(&self, kind: MutationKind, err: SyncError) -> SyncError {
        tracing::warn!(kind = kind.label(), error = %err, "mutation rejected");
        self.telemetry.record(Event::MutationRejected {
            kind,
            reason: err.to_string(),
        });
        err
    }

    fn fail(&self, kind: MutationKind, err: RemoteError) -> SyncError {
        tracing::warn!(kind = kind.label(), error = %err, "mutation failed");
        self.telemetry.record(Event::MutationFailed {
            kind,
            error: err.to_string(),
        });
        SyncError::Remote(err)
    }

    async fn settle(&self, kind: MutationKind, settled: Settled) -> Result<(), SyncError> {
        self.reconcile(kind.policy().reconcile, settled)
            .await
            .map_err(|err| self.fail(kind, err))?;
        tracing::debug!(kind = kind.label(), "mutation applied");
        self.telemetry.record(Event::MutationApplied(kind));
        Ok(())
    }

    async fn reconcile(&self, reconcile: Reconcile, settled: Settled) -> Result<(), RemoteError> {
        match (reconcile, settled) {
            (Reconcile::UpsertEcho | Reconcile::PatchLocal, Settled::Item(item)) => {
                self.store.lock().upsert_item(item);
            }
            (Reconcile::UpsertEcho, Settled::Category(category)) => {
                self.store.lock().upsert_category(category);
            }
            (Reconcile::RemoveLocal, Settled::RemovedItem(id)) => {
                self.store.lock().remove_item(id);
            }
            (Reconcile::ReloadItems, _) => {
                self.reload_items().await?;
            }
            (Reconcile::ReloadCategoriesAndItems, _) => {
                self.reload_categories().await?;
                self.reload_items().await?;
            }
            (Reconcile::RemoveAndReloadItems, Settled::RemovedCategory(id)) => {
                self.store.lock().remove_category(id);
                self.reload_items().await?;
            }
            (reconcile, settled) => {
                tracing::warn!(?reconcile, ?settled, "policy does not match result; full reload");
                self.load_all_remote().await?;
            }
        }
        Ok(())
    }

    async fn load_all_remote(&self) -> Result<(), RemoteError> {
        self.reload_categories().await?;
        self.reload_items().await?;
        Ok(())
    }

    /// Put the previous flag back, then rebuild the store from the server: the failure may
    /// come from state this session has not seen yet (a category deleted elsewhere).
    async fn compensate_toggle(&self, id: ItemId, previous: bool) {
        let reverted = self.store.lock().set_completed(id, previous).is_some();
        if reverted {
            tracing::warn!(item = id.0, previous, "reverted optimistic completion toggle");
            self.telemetry
                .record(Event::Compensated(MutationKind::ToggleCompletion));
        } else {
            tracing::warn!(item = id.0, "toggled item vanished before revert");
        }

        if let Err(err) = self.load_all_remote().await {
            tracing::warn!(error = %err, "reload after failed toggle also failed");
        }
    }
}
