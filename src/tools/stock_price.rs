use super::args::parse_args;
use super::traits::Tool;
use super::types::{ToolOutcome, ToolResult};
use crate::error::ToolError;
use crate::llm::{api_error, build_http_client};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::Url;

/// History windows the quote backend understands.
pub const PERIODS: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

pub const DEFAULT_PERIOD: &str = "1d";

/// Source of daily closing prices.
pub trait MarketData: Send + Sync {
    /// Closing prices over `period`, oldest first. Empty when the symbol
    /// has no data.
    fn closing_prices<'a>(
        &'a self,
        symbol: &'a str,
        period: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<f64>>> + Send + 'a>>;
}

/// Yahoo Finance chart endpoint.
pub struct YahooFinance {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl YahooFinance {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: build_http_client(timeout_secs),
        }
    }

    /// Chart URL with `symbol` as one escaped path segment.
    fn chart_url(&self, symbol: &str) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.endpoint)?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("quote endpoint {} cannot carry a path", self.endpoint))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

impl MarketData for YahooFinance {
    fn closing_prices<'a>(
        &'a self,
        symbol: &'a str,
        period: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<f64>>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.chart_url(symbol)?;
            let response = self
                .client
                .get(url)
                .query(&[("range", period), ("interval", "1d")])
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            if !response.status().is_success() {
                return Err(api_error("Yahoo Finance", response).await);
            }

            let envelope: ChartEnvelope = response.json().await?;
            let closes = envelope
                .chart
                .result
                .unwrap_or_default()
                .into_iter()
                .next()
                .and_then(|result| result.indicators.quote.into_iter().next())
                .map(|quote| quote.close.into_iter().flatten().collect())
                .unwrap_or_default();
            Ok(closes)
        })
    }
}

fn default_period() -> String {
    DEFAULT_PERIOD.to_string()
}

#[derive(Deserialize)]
struct StockPriceArgs {
    ticker_symbol: String,
    #[serde(default = "default_period")]
    period: String,
}

/// Latest closing price for a ticker.
pub struct StockPriceTool {
    market: Arc<dyn MarketData>,
}

impl StockPriceTool {
    pub const NAME: &'static str = "get_stock_price";

    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }

    async fn quote(&self, symbol: &str, period: &str) -> ToolResult {
        if !PERIODS.contains(&period) {
            return ToolResult::failure(format!(
                "Error: Unsupported period '{period}'. Use one of: {}",
                PERIODS.join(", ")
            ));
        }

        match self.market.closing_prices(symbol, period).await {
            Ok(closes) => match closes.last() {
                Some(last) => {
                    let rounded = (last * 100.0).round() / 100.0;
                    ToolResult::ok(format!("{rounded:.2}"))
                }
                None => ToolResult::failure(format!(
                    "Error: No data found for symbol '{symbol}'. Check if the ticker is correct."
                )),
            },
            Err(e) => {
                tracing::warn!(tool = Self::NAME, symbol, error = %e, "quote lookup failed");
                ToolResult::failure(format!("An error occurred: {e}"))
            }
        }
    }
}

impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Fetch the current stock price for a ticker symbol, e.g. 'TSLA', 'AAPL', \
         'RELIANCE.NS'. Optional period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ticker_symbol": {
                    "type": "string",
                    "description": "The ticker symbol to look up"
                },
                "period": {
                    "type": "string",
                    "description": "History window (default: 1d)"
                }
            },
            "required": ["ticker_symbol"]
        })
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let args: StockPriceArgs = parse_args(Self::NAME, args)?;
            let symbol = args.ticker_symbol.trim().to_uppercase();
            if symbol.is_empty() {
                return Ok(ToolResult::failure("Error: ticker symbol is empty").into());
            }
            Ok(self.quote(&symbol, args.period.trim()).await.into())
        })
    }
}
