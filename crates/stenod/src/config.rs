//! Daemon configuration
//!
//! Resolution order: built-in defaults, then the optional TOML file, then
//! CLI flags and environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use stenolink_protocol::Delimiters;

/// File-level configuration. Every field is optional so partial files work.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub feed_port: Option<u16>,
    pub viewer_port: Option<u16>,
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub delimiters: Option<String>,
    pub refresh_tolerance_secs: Option<f64>,
    pub metrics_port: Option<u16>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Parsing config file {}", path.display()))
    }
}

/// Fully resolved daemon settings.
#[derive(Debug)]
pub struct Settings {
    pub feed_port: u16,
    pub viewer_port: u16,
    pub bind: String,
    pub log_level: String,
    pub delimiters: Delimiters,
    pub refresh_tolerance_secs: f64,
    pub metrics_port: Option<u16>,
}

impl Settings {
    /// Merge CLI values over file values over defaults.
    pub fn resolve(
        cli_feed_port: Option<u16>,
        cli_viewer_port: Option<u16>,
        cli_bind: Option<String>,
        cli_log_level: Option<String>,
        cli_delimiters: Option<String>,
        cli_refresh_tolerance: Option<f64>,
        cli_metrics_port: Option<u16>,
        file: FileConfig,
    ) -> Result<Self> {
        let delimiters = cli_delimiters
            .or(file.delimiters)
            .unwrap_or_else(|| "control".into());
        let delimiters: Delimiters = delimiters
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        let refresh_tolerance_secs = cli_refresh_tolerance
            .or(file.refresh_tolerance_secs)
            .unwrap_or(5.0);
        if !refresh_tolerance_secs.is_finite() || refresh_tolerance_secs < 0.0 {
            anyhow::bail!(
                "Refresh tolerance must be a non-negative number of seconds, got {}",
                refresh_tolerance_secs
            );
        }

        Ok(Self {
            feed_port: cli_feed_port.or(file.feed_port).unwrap_or(5500),
            viewer_port: cli_viewer_port.or(file.viewer_port).unwrap_or(5501),
            bind: cli_bind.or(file.bind).unwrap_or_else(|| "0.0.0.0".into()),
            log_level: cli_log_level
                .or(file.log_level)
                .unwrap_or_else(|| "info".into()),
            delimiters,
            refresh_tolerance_secs,
            metrics_port: cli_metrics_port.or(file.metrics_port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings =
            Settings::resolve(None, None, None, None, None, None, None, FileConfig::default())
                .unwrap();
        assert_eq!(settings.feed_port, 5500);
        assert_eq!(settings.viewer_port, 5501);
        assert_eq!(settings.bind, "0.0.0.0");
        assert_eq!(settings.delimiters, Delimiters::Control);
        assert_eq!(settings.refresh_tolerance_secs, 5.0);
        assert_eq!(settings.metrics_port, None);
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "feed_port = 7000\ndelimiters = \"bracket\"\nrefresh_tolerance_secs = 2.5"
        )
        .unwrap();
        let file_config = FileConfig::load(file.path()).unwrap();

        let settings = Settings::resolve(
            Some(8000),
            None,
            None,
            None,
            None,
            None,
            None,
            file_config,
        )
        .unwrap();
        assert_eq!(settings.feed_port, 8000); // CLI wins
        assert_eq!(settings.delimiters, Delimiters::Bracket); // file wins
        assert_eq!(settings.refresh_tolerance_secs, 2.5);
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not_a_setting = 1").unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_bad_delimiters_rejected() {
        let result = Settings::resolve(
            None,
            None,
            None,
            None,
            Some("caret".into()),
            None,
            None,
            FileConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let result = Settings::resolve(
            None,
            None,
            None,
            None,
            None,
            Some(-1.0),
            None,
            FileConfig::default(),
        );
        assert!(result.is_err());
    }
}
