//! LunarCrush API Integration
//!
//! Two upstream endpoint shapes feed one canonical `CoinMetric`:
//!
//! - Bulk listing `/coins/list/v1` returns `{data: [...]}` with the full
//!   social field set (sentiment, interactions, social volume/dominance).
//! - Per-symbol `/coins/{SYMBOL}/v1` returns a `{config, data}` envelope
//!   with a disjoint field set (7d/30d changes, volatility, market cap
//!   rank) and none of the social fields, which normalize to zero.
//!
//! The two shapes are kept apart as `ProviderResponse` variants with one
//! explicit normalization path each.
//!
//! Batch sentiment processing always goes through the bulk listing (richer
//! data than any per-symbol call) and dedups same-symbol entries by keeping
//! the one with the greatest market capitalization.

use super::backoff::ExponentialBackoff;
use super::error::PipelineError;
use super::types::CoinMetric;
use crate::constants::{COINS_LIST_V1, RETRY_ATTEMPTS, RETRY_DELAY_MS, SINGLE_COIN};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Seam between the pipeline and the social-data provider.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Current metrics for the requested symbols (or every listed symbol
    /// when `symbols` is `None`), deduplicated, with sentiment populated.
    async fn coins_with_sentiment(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<Vec<CoinMetric>, PipelineError>;
}

/// Bulk listing response shape.
#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    pub data: Vec<CoinMetric>,
}

/// Per-symbol response envelope. Field set is disjoint from the listing.
#[derive(Debug, Deserialize)]
pub struct SingleCoinEnvelope {
    pub config: SingleCoinConfig,
    pub data: SingleCoinData,
}

#[derive(Debug, Deserialize)]
pub struct SingleCoinConfig {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub topic: String,
    pub generated: i64,
}

#[derive(Debug, Deserialize)]
pub struct SingleCoinData {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub price_btc: f64,
    pub market_cap: f64,
    pub percent_change_24h: f64,
    pub percent_change_7d: f64,
    pub percent_change_30d: f64,
    pub volume_24h: f64,
    pub max_supply: Option<f64>,
    pub circulating_supply: f64,
    pub close: f64,
    pub galaxy_score: f64,
    pub alt_rank: i64,
    pub volatility: f64,
    pub market_cap_rank: i64,
}

/// Tagged union of the two upstream payload shapes.
pub enum ProviderResponse {
    Listing(ListingResponse),
    Single(Box<SingleCoinEnvelope>),
}

impl ProviderResponse {
    /// Normalize either variant into canonical metrics.
    pub fn into_metrics(self) -> Vec<CoinMetric> {
        match self {
            ProviderResponse::Listing(listing) => listing.data,
            ProviderResponse::Single(envelope) => vec![normalize_single(*envelope)],
        }
    }
}

/// Normalize the per-symbol envelope into a `CoinMetric`.
///
/// The single-coin endpoint carries no sentiment, interaction, social
/// volume, or dominance fields; all four are synthesized as zero.
fn normalize_single(envelope: SingleCoinEnvelope) -> CoinMetric {
    let data = envelope.data;
    let logo = format!("https://cdn.lunarcrush.com/{}.png", data.symbol.to_lowercase());

    CoinMetric {
        id: data.id,
        symbol: data.symbol,
        name: data.name,
        price: data.price,
        sentiment: 0.0,
        interactions_24h: 0.0,
        social_volume_24h: 0.0,
        social_dominance: 0.0,
        percent_change_24h: data.percent_change_24h,
        galaxy_score: data.galaxy_score,
        alt_rank: data.alt_rank,
        market_cap: data.market_cap,
        last_updated_price: chrono::Utc::now().timestamp() as f64,
        topic: Some(envelope.config.topic),
        logo: Some(logo),
    }
}

/// Deduplicate same-symbol entries, keeping the greatest market cap.
///
/// First-seen order of the surviving symbols is preserved; ties keep the
/// earlier entry (strictly greater market cap wins).
pub fn dedup_by_market_cap(coins: Vec<CoinMetric>) -> Vec<CoinMetric> {
    let mut order: Vec<String> = Vec::new();
    let mut winners: HashMap<String, CoinMetric> = HashMap::new();

    for coin in coins {
        let key = coin.symbol.to_uppercase();
        match winners.get(&key) {
            Some(existing) if coin.market_cap <= existing.market_cap => {}
            Some(_) => {
                winners.insert(key, coin);
            }
            None => {
                order.push(key.clone());
                winners.insert(key, coin);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| winners.remove(&key))
        .collect()
}

/// Sort by market cap descending and keep the first `limit` entries.
pub fn rank_by_market_cap(mut coins: Vec<CoinMetric>, limit: usize) -> Vec<CoinMetric> {
    coins.sort_by(|a, b| {
        b.market_cap
            .partial_cmp(&a.market_cap)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    coins.truncate(limit);
    coins
}

fn status_to_error(status: StatusCode) -> PipelineError {
    match status {
        StatusCode::UNAUTHORIZED => PipelineError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => PipelineError::RateLimited,
        s if s.is_server_error() => PipelineError::UpstreamUnavailable,
        s => PipelineError::MalformedResponse(format!("unexpected status: {}", s)),
    }
}

fn transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() || err.is_connect() {
        PipelineError::UpstreamUnavailable
    } else if err.is_decode() {
        PipelineError::MalformedResponse(err.to_string())
    } else {
        PipelineError::UpstreamUnavailable
    }
}

/// Bearer-authenticated LunarCrush HTTP client.
pub struct LunarCrushClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl LunarCrushClient {
    /// Build a client with a bounded request timeout. Credentials arrive
    /// explicitly from configuration, never from ambient environment state.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn get(&self, endpoint: &str) -> Result<reqwest::Response, PipelineError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_to_error(response.status()));
        }

        Ok(response)
    }

    /// Fetch the full provider listing.
    pub async fn all_coins(&self) -> Result<Vec<CoinMetric>, PipelineError> {
        let response = self.get(COINS_LIST_V1).await?;

        let listing: ListingResponse = response.json().await.map_err(transport_error)?;

        Ok(ProviderResponse::Listing(listing).into_metrics())
    }

    /// Fetch one symbol via the per-symbol endpoint. Unknown symbols return
    /// `Ok(None)` rather than an error.
    pub async fn coin_by_symbol(&self, symbol: &str) -> Result<Option<CoinMetric>, PipelineError> {
        let endpoint = format!("{}/{}/v1", SINGLE_COIN, symbol.to_uppercase());
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_to_error(response.status()));
        }

        let envelope: SingleCoinEnvelope = response.json().await.map_err(transport_error)?;

        Ok(ProviderResponse::Single(Box::new(envelope))
            .into_metrics()
            .pop())
    }

    /// Concurrent individual lookups for a set of symbols. Per-symbol
    /// failures are logged and dropped; the call itself never fails.
    pub async fn coins_by_symbols(&self, symbols: &[String]) -> Vec<CoinMetric> {
        let lookups = symbols.iter().map(|symbol| self.coin_by_symbol(symbol));
        let results = join_all(lookups).await;

        results
            .into_iter()
            .zip(symbols)
            .filter_map(|(result, symbol)| match result {
                Ok(coin) => coin,
                Err(e) => {
                    log::warn!("⚠️  Lookup failed for {}: {}", symbol, e);
                    None
                }
            })
            .collect()
    }

    /// Top `limit` coins by market capitalization, descending.
    pub async fn top_coins(&self, limit: usize) -> Result<Vec<CoinMetric>, PipelineError> {
        let coins = self.all_coins().await?;
        Ok(rank_by_market_cap(coins, limit))
    }
}

#[async_trait]
impl MetricsSource for LunarCrushClient {
    async fn coins_with_sentiment(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<Vec<CoinMetric>, PipelineError> {
        let mut backoff = ExponentialBackoff::new(RETRY_DELAY_MS, RETRY_DELAY_MS * 8, RETRY_ATTEMPTS);

        let all_coins = loop {
            match self.all_coins().await {
                Ok(coins) => break coins,
                Err(e) if e.is_transient() => {
                    log::warn!("⚠️  Provider fetch failed ({}), retrying", e);
                    if backoff.sleep().await.is_err() {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        };

        let filtered = match symbols {
            Some(symbols) if !symbols.is_empty() => {
                let wanted: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
                all_coins
                    .into_iter()
                    .filter(|coin| wanted.contains(&coin.symbol.to_uppercase()))
                    .collect()
            }
            _ => all_coins,
        };

        Ok(dedup_by_market_cap(filtered))
    }
}
