pub mod schema;

pub use schema::{AgentConfig, StrategyTable, MAX_CLICK_FREQUENCY};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Config file name inside the agent home directory.
pub const CONFIG_FILE: &str = "agent.toml";

/// Default agent home directory (~/.idle-agent).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".idle-agent"))
        .unwrap_or_else(|| PathBuf::from(".idle-agent"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path).context("Failed to read agent config file")?;
        let config: AgentConfig =
            toml::from_str(&contents).context("Failed to parse agent config (TOML)")?;
        Ok(config)
    } else {
        Ok(AgentConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &AgentConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("idle-agent-missing-{}.toml", ulid::Ulid::new()));
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.click_frequency, AgentConfig::default().click_frequency);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("idle-agent-cfg-{}", ulid::Ulid::new()));
        let path = dir.join(CONFIG_FILE);
        let cfg = AgentConfig {
            session_duration_secs: 300,
            rng_seed: Some(7),
            ..AgentConfig::default()
        };
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.session_duration_secs, 300);
        assert_eq!(loaded.rng_seed, Some(7));
        let _ = std::fs::remove_dir_all(dir);
    }
}
