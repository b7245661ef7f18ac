use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Past tense used in confirmations.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Buy => "bought",
            Self::Sell => "sold",
        }
    }
}

/// One confirmed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ticker: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub total_price: f64,
    pub at: DateTime<Utc>,
}

/// Simulated brokerage: confirmed trades and net share positions.
///
/// Sells are not checked against holdings, so positions can go negative.
#[derive(Debug, Default)]
pub struct PaperLedger {
    trades: Mutex<Vec<TradeRecord>>,
}

impl PaperLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, side: TradeSide, ticker: &str, quantity: i64, total_price: f64) -> TradeRecord {
        let record = TradeRecord {
            ticker: ticker.trim().to_uppercase(),
            side,
            quantity,
            total_price,
            at: Utc::now(),
        };
        tracing::info!(
            ticker = %record.ticker,
            side = %side,
            quantity,
            total_price,
            "trade recorded"
        );
        self.trades
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        record
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Net shares per ticker.
    pub fn positions(&self) -> BTreeMap<String, i64> {
        let mut positions = BTreeMap::new();
        for trade in self.trades.lock().unwrap_or_else(PoisonError::into_inner).iter() {
            let delta = match trade.side {
                TradeSide::Buy => trade.quantity,
                TradeSide::Sell => -trade.quantity,
            };
            *positions.entry(trade.ticker.clone()).or_insert(0) += delta;
        }
        positions
    }

    pub fn position(&self, ticker: &str) -> i64 {
        self.positions()
            .get(&ticker.trim().to_uppercase())
            .copied()
            .unwrap_or(0)
    }
}
