mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::conversion::format::resolve_format;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./imageforged.toml",
        "~/.config/imageforged/config.toml",
        "/etc/imageforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Upper bound for `server.session_timeout_hours` (one year).
pub const MAX_SESSION_TIMEOUT_HOURS: u64 = 24 * 365;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be greater than 0");
    }

    if !(1..=MAX_SESSION_TIMEOUT_HOURS).contains(&config.server.session_timeout_hours) {
        anyhow::bail!(
            "server.session_timeout_hours must be between 1 and {}",
            MAX_SESSION_TIMEOUT_HOURS
        );
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    if config.store.max_batches == 0 {
        anyhow::bail!("store.max_batches must be greater than 0");
    }

    if config.store.sweep_interval_secs == 0 {
        anyhow::bail!("store.sweep_interval_secs must be greater than 0");
    }

    resolve_format(&config.conversion.default_format).with_context(|| {
        format!(
            "conversion.default_format '{}' is not supported",
            config.conversion.default_format
        )
    })?;

    if config.conversion.preview_max_dimension == 0 {
        anyhow::bail!("conversion.preview_max_dimension must be greater than 0");
    }

    if !(1..=100).contains(&config.conversion.preview_quality) {
        anyhow::bail!("conversion.preview_quality must be between 1 and 100");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_session_timeout() {
        let mut config = Config::default();
        config.server.session_timeout_hours = 0;
        assert!(validate_config(&config).is_err());

        config.server.session_timeout_hours = u64::MAX;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("session_timeout_hours"));

        config.server.session_timeout_hours = MAX_SESSION_TIMEOUT_HOURS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_unknown_default_format() {
        let mut config = Config::default();
        config.conversion.default_format = "GIF".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("GIF"));
    }

    #[test]
    fn test_rejects_bad_preview_quality() {
        let mut config = Config::default();
        config.conversion.preview_quality = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 5000\n\n[conversion]\ndefault_format = \"webp\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.conversion.default_format, "webp");
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(load_config(&path).is_err());
    }
}
