use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EntityKey, SyncError};

/// Tracks identities with a mutation in flight. A second mutation on the same identity is
/// rejected until the first settles and its token is dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingGuard {
    pending: Arc<Mutex<HashSet<EntityKey>>>,
}

impl PendingGuard {
    pub(crate) fn acquire(&self, key: EntityKey) -> Result<PendingToken, SyncError> {
        if !self.pending.lock().insert(key) {
            return Err(SyncError::Busy(key));
        }
        Ok(PendingToken {
            key,
            pending: Arc::clone(&self.pending),
        })
    }

    pub(crate) fn is_pending(&self, key: EntityKey) -> bool {
        self.pending.lock().contains(&key)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

#[derive(Debug)]
pub(crate) struct PendingToken {
    key: EntityKey,
    pending: Arc<Mutex<HashSet<EntityKey>>>,
}

impl Drop for PendingToken {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryId, ItemId};

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let guard = PendingGuard::default();
        let key = EntityKey::Item(ItemId(1));

        let token = guard.acquire(key).unwrap();
        assert!(guard.is_pending(key));
        assert_eq!(guard.acquire(key).unwrap_err(), SyncError::Busy(key));

        drop(token);
        assert!(!guard.is_pending(key));
        assert!(guard.acquire(key).is_ok());
    }

    #[test]
    fn identities_are_independent() {
        let guard = PendingGuard::default();
        let _item = guard.acquire(EntityKey::Item(ItemId(1))).unwrap();
        let _category = guard.acquire(EntityKey::Category(CategoryId(1))).unwrap();
        let _other = guard.acquire(EntityKey::Item(ItemId(2))).unwrap();
        assert_eq!(guard.len(), 3);
    }
}
