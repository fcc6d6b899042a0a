use std::time::Duration;

pub use tasksync_core::config::*;

use crate::cli::Cli;

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::discover(cli.data_dir.clone())?;
    if let Some(millis) = cli.timeout_ms {
        config = config.with_remote_timeout(Duration::from_millis(millis));
    }
    if let Some(user) = &cli.user {
        config = config.with_user(user.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn flags_override_discovered_values() {
        let dir = TempDir::new().expect("temp dir");
        let data_dir = dir.path().join("nested");
        let cli = Cli::try_parse_from([
            "tasksync",
            "--data-dir",
            data_dir.to_str().expect("utf8 path"),
            "--user",
            "alice",
            "--timeout-ms",
            "1500",
        ])
        .unwrap();

        let config = from_cli(&cli).unwrap();

        assert!(data_dir.exists());
        assert_eq!(config.user(), "alice");
        assert_eq!(config.remote_timeout(), Duration::from_millis(1500));
    }
}
