pub mod config;
pub mod coordinator;
pub mod database;
pub mod dialog;
pub mod error;
pub mod filter;
pub mod markup;
pub mod model;
pub mod normalizer;
pub mod remote;
pub mod services;
pub mod session;
pub mod store;
pub mod telemetry;

pub use config::AppConfig;
pub use coordinator::{MutationCoordinator, MutationKind, MutationOutcome, MutationState};
pub use database::Database;
pub use dialog::{CategoryDialogResult, ItemDialogResult, PayloadError};
pub use error::{EntityKey, RemoteError, RemoteErrorKind, SyncError, ValidationError};
pub use filter::{CategorySelector, FilterCriteria, FilteredView};
pub use model::*;
pub use normalizer::{classify, classify_category, CategoryIntent, MutationIntent};
pub use remote::{AlwaysConfirm, CategoryRemote, ConfirmationPrompt, ItemRemote, NeverConfirm};
pub use services::LocalService;
pub use session::SessionContext;
pub use store::EntityStore;
