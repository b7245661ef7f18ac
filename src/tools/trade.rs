use super::args::parse_args;
use super::ledger::{PaperLedger, TradeSide};
use super::traits::Tool;
use super::types::{Suspension, ToolOutcome, ToolResult};
use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const CANCELLED: &str = "❌ Transaction cancelled.";

/// Order details carried through the confirmation round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub ticker_symbol: String,
    pub quantity: i64,
    pub total_price: f64,
}

/// Whole prices keep one decimal place, so 1500 reads as `1500.0`.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.1}")
    } else {
        price.to_string()
    }
}

/// `yes` in any case, surrounding whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Buy or sell shares after a human says yes.
pub struct TradeTool {
    side: TradeSide,
    ledger: Arc<PaperLedger>,
}

impl TradeTool {
    pub const BUY: &'static str = "buy_stocks";
    pub const SELL: &'static str = "sell_stocks";

    pub fn buy(ledger: Arc<PaperLedger>) -> Self {
        Self {
            side: TradeSide::Buy,
            ledger,
        }
    }

    pub fn sell(ledger: Arc<PaperLedger>) -> Self {
        Self {
            side: TradeSide::Sell,
            ledger,
        }
    }

    fn question(&self, order: &TradeOrder) -> String {
        format!(
            "Do you want to {} {} shares of {} for ${}? (yes/no)",
            self.side,
            order.quantity,
            order.ticker_symbol,
            format_price(order.total_price)
        )
    }

    fn confirmation(&self, order: &TradeOrder) -> String {
        format!(
            "✅ You {} {} shares of {} for ${}.",
            self.side.past_tense(),
            order.quantity,
            order.ticker_symbol,
            format_price(order.total_price)
        )
    }

    /// Local checks that never need a human.
    fn reject(order: &TradeOrder) -> Option<&'static str> {
        if order.quantity <= 0 {
            return Some("❌ Error: Quantity must be positive");
        }
        if order.total_price <= 0.0 || !order.total_price.is_finite() {
            return Some("❌ Error: Total price must be positive");
        }
        None
    }
}

impl Tool for TradeTool {
    fn name(&self) -> &str {
        match self.side {
            TradeSide::Buy => Self::BUY,
            TradeSide::Sell => Self::SELL,
        }
    }

    fn description(&self) -> &str {
        match self.side {
            TradeSide::Buy => {
                "Buy a quantity of shares of the given ticker symbol for a total price. \
                 Asks the user to confirm before the order is placed."
            }
            TradeSide::Sell => {
                "Sell a quantity of shares of the given ticker symbol for a total price. \
                 Asks the user to confirm before the order is placed."
            }
        }
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ticker_symbol": {
                    "type": "string",
                    "description": "The ticker symbol to trade"
                },
                "quantity": {
                    "type": "integer",
                    "description": "Number of shares"
                },
                "total_price": {
                    "type": "number",
                    "description": "Total price of the order"
                }
            },
            "required": ["ticker_symbol", "quantity", "total_price"]
        })
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let order: TradeOrder = parse_args(self.name(), args)?;
            if let Some(reason) = Self::reject(&order) {
                return Ok(ToolResult::failure(reason).into());
            }

            let payload = serde_json::to_value(&order).map_err(|e| ToolError::Execution {
                name: self.name().to_string(),
                message: e.to_string(),
            })?;
            Ok(ToolOutcome::Suspend(Suspension {
                question: self.question(&order),
                payload,
            }))
        })
    }

    fn resume<'a>(
        &'a self,
        payload: serde_json::Value,
        answer: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ToolResult, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let order: TradeOrder = parse_args(self.name(), payload)?;
            if !is_affirmative(answer) {
                tracing::info!(tool = self.name(), ticker = %order.ticker_symbol, "trade declined");
                return Ok(ToolResult::ok(CANCELLED));
            }
            self.ledger
                .record(self.side, &order.ticker_symbol, order.quantity, order.total_price);
            Ok(ToolResult::ok(self.confirmation(&order)))
        })
    }
}
