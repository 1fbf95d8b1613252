//! Discord webhook connectivity check
//!
//! Posts a single test embed to the configured webhook and exits. Run this
//! once after setting `DISCORD_WEBHOOK_URL` to confirm alerts will land.
//!
//! Usage:
//!   cargo run --release --bin webhook_verify

use dotenv::dotenv;
use log::{error, info};
use sentiflow::config::AppConfig;
use sentiflow::pipeline::DiscordNotifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AppConfig::from_env()?;

    let Some(webhook_url) = &config.discord_webhook_url else {
        info!("No Discord webhook URL configured");
        return Ok(());
    };

    let notifier = DiscordNotifier::new(webhook_url, config.api_timeout)?;

    match notifier.send_test().await {
        Ok(()) => {
            info!("✅ Discord webhook test successful!");
            Ok(())
        }
        Err(e) => {
            error!("❌ Discord webhook test failed: {}", e);
            Err(e.into())
        }
    }
}
