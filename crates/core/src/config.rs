use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static DEFAULT_DB_NAME: &str = "tasksync.sqlite3";
static ENV_DATA_DIR: &str = "TASKSYNC_DATA_DIR";
static ENV_REMOTE_TIMEOUT_MS: &str = "TASKSYNC_REMOTE_TIMEOUT_MS";
static ENV_USER: &str = "TASKSYNC_USER";

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER: &str = "local";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "tasksync", "tasksync"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    remote_timeout: Duration,
    user: String,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let mut config = Self::from_data_dir(data_dir)?;
        if let Some(timeout) = resolve_remote_timeout()? {
            config.remote_timeout = timeout;
        }
        if let Ok(user) = env::var(ENV_USER) {
            config = config.with_user(user);
        }
        Ok(config)
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        Ok(Self {
            data_dir,
            db_path,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            user: DEFAULT_USER.to_string(),
        })
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Blank user names are ignored so the default owner stays in place.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        let user = user.into();
        let trimmed = user.trim();
        if !trimmed.is_empty() {
            self.user = trimmed.to_string();
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

fn resolve_remote_timeout() -> Result<Option<Duration>> {
    let Ok(raw) = env::var(ENV_REMOTE_TIMEOUT_MS) else {
        return Ok(None);
    };
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{ENV_REMOTE_TIMEOUT_MS} must be a number of milliseconds"))?;
    Ok(Some(Duration::from_millis(millis)))
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-tasksync");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".tasksync"));
    }

    Ok(env::current_dir()?.join(".tasksync"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_data_dir_uses_defaults() {
        let config = AppConfig::from_data_dir(PathBuf::from("/tmp/tasksync-test")).unwrap();
        assert_eq!(
            config.db_path(),
            Path::new("/tmp/tasksync-test/tasksync.sqlite3")
        );
        assert_eq!(config.remote_timeout(), DEFAULT_REMOTE_TIMEOUT);
        assert_eq!(config.user(), DEFAULT_USER);
    }

    #[test]
    fn blank_user_keeps_default() {
        let config = AppConfig::from_data_dir(PathBuf::from("/tmp/x"))
            .unwrap()
            .with_user("   ");
        assert_eq!(config.user(), DEFAULT_USER);

        let config = config.with_user(" alice ");
        assert_eq!(config.user(), "alice");
    }
}
