//! First-run interactive setup wizard.
//!
//! Steps:
//! 1. Display banner
//! 2. Pick a session preset (or custom duration and click rate)
//! 3. Collect the game bridge URL and agent name
//! 4. Write agent.toml and create the reports directory

use crate::config::{self, AgentConfig, CONFIG_FILE, MAX_CLICK_FREQUENCY};
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

const BANNER: &str = r#"
   _     _ _                                  _
  (_) __| | | ___        __ _  __ _  ___ _ __ | |_
  | |/ _` | |/ _ \_____ / _` |/ _` |/ _ \ '_ \| __|
  | | (_| | |  __/_____| (_| | (_| |  __/ | | | |_
  |_|\__,_|_|\___|      \__,_|\__, |\___|_| |_|\__|
                              |___/
            Autonomous incremental-game player
"#;

/// Session shape picked in the wizard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preset {
    Quick,
    Standard,
    Long,
    Custom { minutes: u64, clicks_per_sec: f64 },
}

impl Preset {
    /// Menu choice "1".."4". Custom minutes are at least 1, custom clicks 1..=30.
    pub fn from_choice(choice: &str, custom_minutes: u64, custom_clicks: f64) -> Option<Self> {
        match choice.trim() {
            "1" | "quick" => Some(Self::Quick),
            "" | "2" | "standard" => Some(Self::Standard),
            "3" | "long" => Some(Self::Long),
            "4" | "custom" => Some(Self::Custom {
                minutes: custom_minutes.max(1),
                clicks_per_sec: custom_clicks.clamp(1.0, MAX_CLICK_FREQUENCY),
            }),
            _ => None,
        }
    }

    /// (minutes, clicks per second)
    pub fn shape(&self) -> (u64, f64) {
        match *self {
            Self::Quick => (5, 20.0),
            Self::Standard => (15, 15.0),
            Self::Long => (30, 10.0),
            Self::Custom {
                minutes,
                clicks_per_sec,
            } => (minutes, clicks_per_sec),
        }
    }
}

/// Apply a preset on top of an existing config.
pub fn apply_preset(config: AgentConfig, preset: Preset) -> AgentConfig {
    let (minutes, clicks_per_sec) = preset.shape();
    AgentConfig {
        session_duration_secs: minutes * 60,
        click_frequency: clicks_per_sec,
        ..config
    }
}

/// Run the interactive setup wizard.
pub fn run_setup_wizard(home_dir: &Path) -> Result<AgentConfig> {
    println!("{}", BANNER);
    println!("Welcome to idle-agent setup.\n");

    let stdin = io::stdin();
    let mut reader = stdin.lock();

    let config_path = home_dir.join(CONFIG_FILE);
    let existing = config::load_config(&config_path)?;

    // Step 1: Preset
    println!("[1/3] Session preset");
    println!("  1) quick     5 min, 20 clicks/s");
    println!("  2) standard 15 min, 15 clicks/s");
    println!("  3) long     30 min, 10 clicks/s");
    println!("  4) custom");
    let preset = loop {
        let choice = prompt_with_default(&mut reader, "  Choice", "2")?;
        let (minutes, clicks) = if matches!(choice.trim(), "4" | "custom") {
            let minutes = prompt_with_default(&mut reader, "  Minutes", "10")?;
            let clicks = prompt_with_default(&mut reader, "  Clicks per second (1-30)", "15")?;
            (minutes.parse().unwrap_or(10), clicks.parse().unwrap_or(15.0))
        } else {
            (0, 0.0)
        };
        match Preset::from_choice(&choice, minutes, clicks) {
            Some(p) => break p,
            None => println!("  Pick 1, 2, 3 or 4."),
        }
    };

    // Step 2: Game bridge and identity
    println!("\n[2/3] Game bridge");
    let bridge_url = prompt_with_default(&mut reader, "  Bridge URL", &existing.bridge_url)?;
    let name = prompt_with_default(&mut reader, "  Agent name", &existing.name)?;

    // Step 3: Write files
    println!("\n[3/3] Writing configuration...");
    let config = apply_preset(
        AgentConfig {
            name,
            bridge_url,
            ..existing
        },
        preset,
    );
    config.validate()?;

    std::fs::create_dir_all(home_dir)?;
    config::save_config(&config, &config_path)?;
    println!("  Written: {}", CONFIG_FILE);

    std::fs::create_dir_all(config.resolved_reports_dir())?;
    println!("  Reports: {}", config.resolved_reports_dir());

    let (minutes, clicks) = preset.shape();
    println!(
        "\nSetup complete ({} min at {} clicks/s). Run `idle-agent run` to start, or `idle-agent run --simulate` to try it offline.\n",
        minutes, clicks
    );

    Ok(config)
}

/// Prompt with a default value.
fn prompt_with_default(reader: &mut impl BufRead, label: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush()?;
    let mut input = String::new();
    reader.read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_shape_the_session() {
        let cfg = apply_preset(AgentConfig::default(), Preset::Quick);
        assert_eq!(cfg.session_duration_secs, 300);
        assert_eq!(cfg.click_frequency, 20.0);

        let cfg = apply_preset(AgentConfig::default(), Preset::Long);
        assert_eq!(cfg.session_duration_secs, 1_800);
        assert_eq!(cfg.click_frequency, 10.0);
    }

    #[test]
    fn custom_clicks_are_clamped_but_minutes_only_floored() {
        let preset = Preset::from_choice("4", 90, 100.0).unwrap();
        assert_eq!(preset.shape(), (90, 30.0));
        let cfg = apply_preset(AgentConfig::default(), preset);
        assert_eq!(cfg.session_duration_secs, 5_400);
        assert!(cfg.validate().is_ok());
        let preset = Preset::from_choice("custom", 0, 0.2).unwrap();
        assert_eq!(preset.shape(), (1, 1.0));
        assert!(apply_preset(AgentConfig::default(), preset).validate().is_ok());
    }

    #[test]
    fn empty_choice_is_standard() {
        assert_eq!(Preset::from_choice("", 0, 0.0), Some(Preset::Standard));
        assert_eq!(Preset::from_choice("9", 0, 0.0), None);
    }

    #[test]
    fn prompt_falls_back_to_default() {
        let mut input = io::Cursor::new("\nhttp://game:1\n");
        assert_eq!(prompt_with_default(&mut input, "x", "d").unwrap(), "d");
        assert_eq!(prompt_with_default(&mut input, "x", "d").unwrap(), "http://game:1");
    }
}
