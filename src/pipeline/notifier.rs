//! Discord webhook notifier
//!
//! Best-effort fan-out: one aggregate embed per run, itemizing at most
//! `MAX_ALERTS_PER_EMBED` alerts. Transport failures surface as
//! `NotificationFailed` and the engine swallows them; a notification can
//! never fail a processing run.

use super::error::PipelineError;
use super::types::{ChangeType, SentimentAlert};
use crate::constants::{COLOR_ERROR, COLOR_SUCCESS, MAX_ALERTS_PER_EMBED};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Seam for the outbound alert channel.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, alerts: &[SentimentAlert]) -> Result<(), PipelineError>;
}

/// Build the aggregate embed payload for a batch of alerts.
///
/// Red when any drop is present, green otherwise. The itemized field list
/// is truncated to the first `MAX_ALERTS_PER_EMBED` entries; the
/// description still reports the full count.
pub fn build_embed(alerts: &[SentimentAlert]) -> serde_json::Value {
    let noun = if alerts.len() == 1 { "change" } else { "changes" };
    let color = if alerts.iter().any(|a| a.change_type == ChangeType::Drop) {
        COLOR_ERROR
    } else {
        COLOR_SUCCESS
    };

    let fields: Vec<serde_json::Value> = alerts
        .iter()
        .take(MAX_ALERTS_PER_EMBED)
        .map(|alert| {
            json!({
                "name": format!("{} {}", alert.symbol, alert.change_type.glyph()),
                "value": alert.message,
                "inline": false,
            })
        })
        .collect();

    json!({
        "title": "\u{1F6A8} Crypto Sentiment Alerts",
        "description": format!("{} significant sentiment {} detected", alerts.len(), noun),
        "color": color,
        "fields": fields,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "footer": {
            "text": "Social Sentiment Processor \u{2022} Powered by LunarCrush",
        },
    })
}

/// Connectivity-check embed, sent by `webhook_verify` before going live.
pub fn build_test_embed() -> serde_json::Value {
    json!({
        "title": "\u{1F9EA} Discord Integration Test",
        "description": "Your LunarCrush sentiment processor is connected!",
        "color": COLOR_SUCCESS,
        "fields": [
            {
                "name": "Status",
                "value": "\u{2705} Successfully connected",
                "inline": true,
            },
            {
                "name": "Next Step",
                "value": "Monitor real sentiment changes",
                "inline": true,
            },
        ],
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "footer": {
            "text": "Social Sentiment Processor \u{2022} Powered by LunarCrush",
        },
    })
}

/// Webhook-backed `AlertSink`.
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url: webhook_url.to_string(),
            client,
        })
    }

    /// Post the connectivity-check embed to the configured webhook.
    pub async fn send_test(&self) -> Result<(), PipelineError> {
        let payload = json!({ "embeds": [build_test_embed()] });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::NotificationFailed(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl AlertSink for DiscordNotifier {
    async fn notify(&self, alerts: &[SentimentAlert]) -> Result<(), PipelineError> {
        let payload = json!({ "embeds": [build_embed(alerts)] });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::NotificationFailed(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        log::info!("📣 Sent {} alert(s) to Discord", alerts.len());
        Ok(())
    }
}
