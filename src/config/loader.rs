//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Mode, ProbeConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProbeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ProbeConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

impl ProbeConfig {
    /// Apply recognized environment overrides on top of the loaded file.
    ///
    /// Delay variables are in seconds (fractional allowed), mirroring how
    /// operators of the original tool set them.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override application with an injectable lookup, so tests never touch
    /// process-global environment state.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = get("MODE") {
            match raw.parse::<Mode>() {
                Ok(mode) => self.mode = mode,
                Err(e) => tracing::warn!(value = %raw, "Ignoring MODE override: {}", e),
            }
        }
        if let Some(raw) = get("MAX_CONCURRENT") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.scan.max_concurrent = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid MAX_CONCURRENT override"),
            }
        }
        if let Some(raw) = get("TARGET_SCANS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => self.scan.target_scans = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid TARGET_SCANS override"),
            }
        }
        if let Some(ms) = parse_secs_to_ms(&get, "BTC_DELAY") {
            self.services.btc.min_delay_ms = ms;
        }
        if let Some(ms) = parse_secs_to_ms(&get, "ETH_DELAY") {
            self.services.eth.min_delay_ms = ms;
        }
        if let Some(ms) = parse_secs_to_ms(&get, "ACQUIRE_TIMEOUT") {
            self.services.acquire_timeout_ms = ms;
        }
        if let Some(raw) = get("POOL_SIZE") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => {
                    self.services.btc.pool_size = n;
                    self.services.eth.pool_size = n;
                }
                _ => tracing::warn!(value = %raw, "Ignoring invalid POOL_SIZE override"),
            }
        }
        if let Some(raw) = get("RUN_DEADLINE") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.scan.run_deadline_secs = Some(secs),
                _ => tracing::warn!(value = %raw, "Ignoring invalid RUN_DEADLINE override"),
            }
        }
    }
}

fn parse_secs_to_ms(get: impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = get(key)?;
    match raw.parse::<f64>() {
        Ok(secs) if secs >= 0.0 && secs.is_finite() => Some((secs * 1000.0).round() as u64),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid delay override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_apply_recognized_keys() {
        let vars = env(&[
            ("MODE", "live"),
            ("MAX_CONCURRENT", "30"),
            ("BTC_DELAY", "1.5"),
            ("ETH_DELAY", "0.25"),
            ("POOL_SIZE", "2"),
            ("RUN_DEADLINE", "120"),
        ]);
        let mut config = ProbeConfig::default();
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.scan.max_concurrent, 30);
        assert_eq!(config.services.btc.min_delay_ms, 1500);
        assert_eq!(config.services.eth.min_delay_ms, 250);
        assert_eq!(config.services.btc.pool_size, 2);
        assert_eq!(config.scan.run_deadline_secs, Some(120));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let vars = env(&[("MODE", "maybe"), ("MAX_CONCURRENT", "zero"), ("BTC_DELAY", "-1")]);
        let mut config = ProbeConfig::default();
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.mode, Mode::Test);
        assert_eq!(config.scan.max_concurrent, 15);
        assert_eq!(config.services.btc.min_delay_ms, 500);
    }

    #[test]
    fn load_config_rejects_invalid_file() {
        let dir = std::env::temp_dir().join("chain-probe-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "[scan]\ntarget_scans = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
