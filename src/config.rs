//! Runtime configuration: command-line flags with environment fallbacks,
//! layered over the settings remembered from the previous run.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::{
    infra::{history::DEFAULT_COFLNET_URL, hypixel, HistoryRange},
    util::persistence::PersistedSettings,
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("purchase quantity must be a finite, non-negative number (got {0})")]
    InvalidQuantity(f64),
    #[error("refresh interval must be at least one second")]
    InvalidRefresh,
}

#[derive(Debug, Parser)]
#[command(name = "bazaar-tracker", version, about = "Rank Hypixel SkyBlock bazaar crafting flips")]
pub struct Cli {
    /// Raw units to buy per flip.
    #[arg(long, short = 'q')]
    pub quantity: Option<f64>,

    /// Craft through to the stage-2 product where a recipe has one.
    #[arg(long)]
    pub two_stage: Option<bool>,

    /// Minecraft username used to check recipe unlocks.
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Hypixel API key; passed through to the profiles endpoint only.
    #[arg(long, env = "HYPIXEL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print one ranking and exit.
    #[arg(long)]
    pub once: bool,

    /// Print the price history of a bazaar product and exit.
    #[arg(long, value_name = "ITEM")]
    pub history: Option<String>,

    /// History window: 1h, 1d, 1w or 1m.
    #[arg(long, default_value = "1d")]
    pub range: HistoryRange,

    /// Rows to print; all when omitted.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Seconds between snapshot refreshes.
    #[arg(long, env = "BAZAAR_TRACKER_REFRESH_SECS", default_value_t = 60)]
    pub refresh_secs: u64,

    #[arg(long, env = "BAZAAR_TRACKER_HYPIXEL_URL", default_value = hypixel::DEFAULT_HYPIXEL_URL)]
    pub hypixel_url: String,

    #[arg(long, env = "BAZAAR_TRACKER_MOJANG_URL", default_value = hypixel::DEFAULT_MOJANG_URL)]
    pub mojang_url: String,

    #[arg(long, env = "BAZAAR_TRACKER_COFLNET_URL", default_value = DEFAULT_COFLNET_URL)]
    pub coflnet_url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub quantity: f64,
    pub two_stage: bool,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub once: bool,
    pub history: Option<String>,
    pub range: HistoryRange,
    pub limit: Option<usize>,
    pub refresh: Duration,
    pub hypixel_url: String,
    pub mojang_url: String,
    pub coflnet_url: String,
}

impl AppConfig {
    /// Flags win over remembered settings.
    pub fn resolve(cli: Cli, saved: PersistedSettings) -> Result<Self, ConfigError> {
        let quantity = cli.quantity.unwrap_or(saved.purchase_quantity);
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(ConfigError::InvalidQuantity(quantity));
        }
        if cli.refresh_secs == 0 {
            return Err(ConfigError::InvalidRefresh);
        }

        Ok(Self {
            quantity,
            two_stage: cli.two_stage.unwrap_or(saved.use_two_stage_path),
            username: cli.username.or(saved.username).filter(|name| !name.trim().is_empty()),
            api_key: cli.api_key.filter(|key| !key.trim().is_empty()),
            once: cli.once,
            history: cli.history,
            range: cli.range,
            limit: cli.limit,
            refresh: Duration::from_secs(cli.refresh_secs),
            hypixel_url: cli.hypixel_url,
            mojang_url: cli.mojang_url,
            coflnet_url: cli.coflnet_url,
        })
    }

    pub fn to_settings(&self) -> PersistedSettings {
        PersistedSettings {
            purchase_quantity: self.quantity,
            use_two_stage_path: self.two_stage,
            username: self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("bazaar-tracker").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_saved_settings() {
        let saved = PersistedSettings {
            purchase_quantity: 100.0,
            use_two_stage_path: true,
            username: Some("saved".into()),
        };
        let config = AppConfig::resolve(
            parse(&["--quantity", "640", "--two-stage", "false", "-u", "fresh"]),
            saved,
        )
        .unwrap();

        assert_eq!(config.quantity, 640.0);
        assert!(!config.two_stage);
        assert_eq!(config.username.as_deref(), Some("fresh"));
        assert_eq!(config.refresh, Duration::from_secs(60));
    }

    #[test]
    fn saved_settings_fill_missing_flags() {
        let saved = PersistedSettings {
            purchase_quantity: 100.0,
            use_two_stage_path: true,
            username: Some("saved".into()),
        };
        let config = AppConfig::resolve(parse(&["--range", "1w"]), saved.clone()).unwrap();

        assert_eq!(config.quantity, 100.0);
        assert!(config.two_stage);
        assert_eq!(config.range, HistoryRange::Week);
        assert_eq!(config.to_settings(), saved);
    }

    #[test]
    fn rejects_negative_quantity_and_zero_refresh() {
        let err = AppConfig::resolve(parse(&["--quantity=-5"]), PersistedSettings::default());
        assert_eq!(err, Err(ConfigError::InvalidQuantity(-5.0)));

        let err = AppConfig::resolve(parse(&["--refresh-secs", "0"]), PersistedSettings::default());
        assert_eq!(err, Err(ConfigError::InvalidRefresh));
    }
}
