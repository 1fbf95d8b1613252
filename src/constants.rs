//! Fixed parameters shared across the pipeline

/// Symbols checked when a trigger event carries no explicit coin list.
pub const MONITORED_COINS: [&str; 8] = [
    "BTC", "ETH", "SOL", "DOGE", "SHIB", "PEPE", "WIF", "BONK",
];

/// Upper bound on symbols processed in a single run.
pub const MAX_COINS_TO_PROCESS: usize = 100;

/// Outbound HTTP timeout (provider and webhook calls).
pub const API_TIMEOUT_MS: u64 = 10_000;

/// Bounded retry policy for transient provider failures.
pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY_MS: u64 = 1_000;

/// LunarCrush public API.
pub const LUNARCRUSH_BASE_URL: &str = "https://lunarcrush.com/api4/public";
pub const COINS_LIST_V1: &str = "/coins/list/v1";
pub const SINGLE_COIN: &str = "/coins";

/// Sentiment bounds that qualify a symbol seen for the first time.
pub const FIRST_SIGHTING_HIGH: f64 = 80.0;
pub const FIRST_SIGHTING_LOW: f64 = 20.0;

/// Discord embed colors.
pub const COLOR_SUCCESS: u32 = 0x00FF00;
pub const COLOR_ERROR: u32 = 0xFF0000;

/// Itemized alert entries per outbound notification.
pub const MAX_ALERTS_PER_EMBED: usize = 10;
