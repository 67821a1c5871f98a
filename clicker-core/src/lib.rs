pub use crate::upgrades::{Upgrade, UpgradeEffect, UpgradeKind, UnknownUpgrade};

use serde::{Serialize, Deserialize};

mod upgrades;

/// Body of a successful `POST /mine`. The server sends an integer count, readers may accept any number.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct MineResponse<N = i64> {
    pub blocks: N,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// Missing in the request body reads as empty, which names no upgrade.
    #[serde(default)]
    pub upgrade_type: String,
}

impl UpgradeRequest {
    pub fn new(kind: UpgradeKind) -> Self {
        Self {
            upgrade_type: kind.name().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeResponse {
    pub blocks: i64,
    pub bpc: i64,
    pub bps: f64,
    pub level: u32,
    pub next_cost: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Renders a per-second rate the way it appears in JSON responses, so `1.0` stays `1.0`.
pub fn format_rate(rate: f64) -> String {
    if rate.is_finite() && rate.fract() == 0.0 {
        format!("{rate:.1}")
    } else {
        rate.to_string()
    }
}
