//! Sentiment change classification
//!
//! Pure and synchronous: a classification is a function of
//! `(current, previous, profile)` and nothing else.
//!
//! Two named profiles exist and both are load-bearing:
//! - `production`: 10% move crossing the 70/30 bands (scheduled runs)
//! - `manual`: 20% move crossing the 80/20 bands (manual/presentation runs)
//!
//! A symbol with no prior observation is classified by absolute extremes
//! instead: >= 80 spikes, <= 20 drops, regardless of profile.

use super::types::ChangeType;
use crate::constants::{FIRST_SIGHTING_HIGH, FIRST_SIGHTING_LOW};

/// Named parameter set governing classification sensitivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeProfile {
    /// Minimum relative move, exclusive (`pct > threshold` qualifies).
    pub threshold: f64,
    /// Spike band floor, inclusive (`current >= high_band` qualifies).
    pub high_band: f64,
    /// Drop band ceiling, inclusive (`current <= low_band` qualifies).
    pub low_band: f64,
}

impl ChangeProfile {
    /// 10% threshold crossing the 70/30 bands.
    pub fn production() -> Self {
        Self {
            threshold: 0.10,
            high_band: 70.0,
            low_band: 30.0,
        }
    }

    /// 20% threshold crossing the 80/20 bands.
    pub fn manual() -> Self {
        Self {
            threshold: 0.20,
            high_band: 80.0,
            low_band: 20.0,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "production" => Some(Self::production()),
            "manual" => Some(Self::manual()),
            _ => None,
        }
    }
}

/// Classify a sentiment reading against the most recent prior value.
///
/// With a prior value the relative move must strictly exceed the profile
/// threshold AND the current value must sit inside the qualifying band
/// (band boundaries inclusive). A prior value of exactly zero makes the
/// relative move undefined and classifies as `Normal`.
///
/// Without a prior value, first-sighting extremes apply.
pub fn classify(current: f64, previous: Option<f64>, profile: &ChangeProfile) -> ChangeType {
    match previous {
        Some(prev) if prev > 0.0 => {
            let delta = current - prev;
            let pct = delta.abs() / prev;

            if pct > profile.threshold {
                if delta > 0.0 && current >= profile.high_band {
                    return ChangeType::Spike;
                }
                if delta < 0.0 && current <= profile.low_band {
                    return ChangeType::Drop;
                }
            }

            ChangeType::Normal
        }
        // Division by zero would make the percent move infinite
        Some(_) => ChangeType::Normal,
        None => {
            if current >= FIRST_SIGHTING_HIGH {
                ChangeType::Spike
            } else if current <= FIRST_SIGHTING_LOW {
                ChangeType::Drop
            } else {
                ChangeType::Normal
            }
        }
    }
}

/// Human-readable alert message for a qualifying change.
///
/// With history: embeds the signed absolute delta and signed percent delta,
/// one decimal place each. Without history: a "first analysis" framing that
/// states only the qualitative high/low determination.
pub fn alert_message(
    symbol: &str,
    sentiment: f64,
    change_type: ChangeType,
    previous: Option<f64>,
) -> String {
    let glyph = change_type.glyph();

    match previous {
        Some(prev) => {
            let delta = sentiment - prev;
            let pct = (delta / prev) * 100.0;
            let delta_sign = if delta > 0.0 { "+" } else { "" };
            let pct_sign = if pct > 0.0 { "+" } else { "" };
            format!(
                "{glyph} {symbol} sentiment {change_type}! Now at {sentiment}/100 \
                 ({delta_sign}{delta:.1} from {prev}, {pct_sign}{pct:.1}%)"
            )
        }
        None => {
            let level = if change_type == ChangeType::Spike {
                "high"
            } else {
                "low"
            };
            format!("{glyph} {symbol} has {level} sentiment at {sentiment}/100 (first analysis)")
        }
    }
}
