use std::time::SystemTime;

use anyhow::Context;
use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use bazaar_flip_tracker::{
    app::Tracker,
    config::{AppConfig, Cli},
    domain::{Catalog, UserParameters},
    infra::{filter_range, HistoryClient, HypixelClient},
    ui::{build_rows, humanize_age, render_history, render_table},
    util::persistence::{load_settings, save_settings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::resolve(Cli::parse(), load_settings().unwrap_or_default())?;

    if let Some(item_id) = config.history.as_deref() {
        return print_history(&config, item_id).await;
    }

    if let Err(err) = save_settings(&config.to_settings()) {
        warn!(%err, "failed to persist settings");
    }

    let catalog = Catalog::builtin().context("built-in flip catalog is invalid")?;
    let client = HypixelClient::with_endpoints(&config.hypixel_url, &config.mojang_url)
        .context("failed to initialise Hypixel client")?;
    let tracker = Tracker::new(catalog, client);

    if let (Some(username), Some(api_key)) = (config.username.as_deref(), config.api_key.as_deref()) {
        match tracker.verify(username, api_key).await {
            Ok(count) => info!(username, collections = count, "recipe unlocks loaded"),
            Err(err) => warn!(%err, "verification failed; showing every recipe as unlocked"),
        }
    }

    let mut ticker = interval(config.refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match tracker.refresh().await {
            Ok(_) => print_ranking(&tracker, &config).await,
            Err(err) => warn!(%err, "bazaar refresh failed"),
        }
        if config.once {
            return Ok(());
        }
    }
}

async fn print_ranking(tracker: &Tracker, config: &AppConfig) {
    let Some(applied) = tracker.snapshot().await else {
        return;
    };
    let params = UserParameters {
        purchase_quantity: config.quantity,
        use_two_stage_path: config.two_stage,
        collection_levels: tracker.collection_levels().await,
    };

    let ranked = tracker.rank(&applied.snapshot, &params);
    let rows = build_rows(&ranked, &params.collection_levels, config.limit);
    println!(
        "\nBazaar flips | qty {} | {} | data {} ({:?})",
        config.quantity,
        if params.use_two_stage_path { "stage 2" } else { "stage 1" },
        humanize_age(applied.snapshot.fetched_at),
        applied.status,
    );
    print!("{}", render_table(&rows));
}

async fn print_history(config: &AppConfig, item_id: &str) -> anyhow::Result<()> {
    let client = HistoryClient::with_base_url(&config.coflnet_url)
        .context("failed to initialise history client")?;
    let points = client.fetch_history(item_id).await;
    let shown = filter_range(&points, config.range, SystemTime::now());
    print!("{}", render_history(item_id, config.range.label(), &shown));
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();
}
