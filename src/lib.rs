pub use tasksync_cli::cli;
pub use tasksync_cli::commands;
pub use tasksync_cli::config;
pub use tasksync_cli::prompt;
pub use tasksync_cli::{init_tracing, AppConfig};

pub use tasksync_core as core;
pub use tasksync_core::database as db;
pub use tasksync_core::model;
