use std::fmt;

/// Every mutation the coordinator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreateItem,
    ReplaceItem,
    DeleteItem,
    ToggleCompletion,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
}

/// How the store is brought back in line once the remote call succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Insert the entity the server echoed back.
    UpsertEcho,
    /// Keep the local patch applied before the call; accept the echo over it.
    PatchLocal,
    /// Refetch items, since the change can ripple into other derived state.
    ReloadItems,
    /// Drop the entity locally.
    RemoveLocal,
    /// Refetch categories, then items, so resolved category names are current.
    ReloadCategoriesAndItems,
    /// Drop the category locally, then refetch items that referenced it.
    RemoveAndReloadItems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Local state changes before the remote call and is reverted if it fails.
    pub optimistic: bool,
    pub reconcile: Reconcile,
}

impl ReconcilePolicy {
    const fn confirmed(reconcile: Reconcile) -> Self {
        Self {
            optimistic: false,
            reconcile,
        }
    }

    const fn optimistic(reconcile: Reconcile) -> Self {
        Self {
            optimistic: true,
            reconcile,
        }
    }
}

impl MutationKind {
    pub const ALL: [MutationKind; 7] = [
        MutationKind::CreateItem,
        MutationKind::ReplaceItem,
        MutationKind::DeleteItem,
        MutationKind::ToggleCompletion,
        MutationKind::CreateCategory,
        MutationKind::UpdateCategory,
        MutationKind::DeleteCategory,
    ];

    pub const fn policy(self) -> ReconcilePolicy {
        match self {
            MutationKind::CreateItem => ReconcilePolicy::confirmed(Reconcile::UpsertEcho),
            MutationKind::ReplaceItem => ReconcilePolicy::confirmed(Reconcile::ReloadItems),
            MutationKind::DeleteItem => ReconcilePolicy::confirmed(Reconcile::RemoveLocal),
            MutationKind::ToggleCompletion => ReconcilePolicy::optimistic(Reconcile::PatchLocal),
            MutationKind::CreateCategory => ReconcilePolicy::confirmed(Reconcile::UpsertEcho),
            MutationKind::UpdateCategory => {
                ReconcilePolicy::confirmed(Reconcile::ReloadCategoriesAndItems)
            }
            MutationKind::DeleteCategory => {
                ReconcilePolicy::confirmed(Reconcile::RemoveAndReloadItems)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::CreateItem => "create item",
            MutationKind::ReplaceItem => "update item",
            MutationKind::DeleteItem => "delete item",
            MutationKind::ToggleCompletion => "toggle completion",
            MutationKind::CreateCategory => "create category",
            MutationKind::UpdateCategory => "update category",
            MutationKind::DeleteCategory => "delete category",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
