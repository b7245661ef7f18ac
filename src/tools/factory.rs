use super::calculator::CalculatorTool;
use super::datetime::DateTimeTool;
use super::ledger::PaperLedger;
use super::registry::ToolRegistry;
use super::stock_price::{MarketData, StockPriceTool, YahooFinance};
use super::trade::TradeTool;
use super::web_search::{DuckDuckGoBackend, SearchBackend, WebSearchTool};
use crate::config::ToolsConfig;
use std::sync::Arc;

/// General chatbot: web search, clock, calculator.
pub fn chatbot_tools(search: Arc<dyn SearchBackend>) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebSearchTool::new(search)))?;
    registry.register(Arc::new(DateTimeTool::new()))?;
    registry.register(Arc::new(CalculatorTool))?;
    Ok(registry)
}

/// Stock agent: quotes, confirmed trades, clock.
pub fn stock_tools(
    market: Arc<dyn MarketData>,
    ledger: Arc<PaperLedger>,
) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StockPriceTool::new(market)))?;
    registry.register(Arc::new(TradeTool::buy(ledger.clone())))?;
    registry.register(Arc::new(TradeTool::sell(ledger)))?;
    registry.register(Arc::new(DateTimeTool::named(DateTimeTool::STOCK_NAME)))?;
    Ok(registry)
}

pub fn search_backend(config: &ToolsConfig) -> Arc<dyn SearchBackend> {
    Arc::new(DuckDuckGoBackend::new(
        &config.search_endpoint,
        config.max_search_results,
        config.request_timeout_secs,
    ))
}

pub fn market_data(config: &ToolsConfig) -> Arc<dyn MarketData> {
    Arc::new(YahooFinance::new(
        &config.market_data_endpoint,
        config.request_timeout_secs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chatbot_toolset_names() {
        let registry = chatbot_tools(search_backend(&ToolsConfig::default())).unwrap();
        assert_eq!(
            registry.tool_names(),
            vec!["calculator_tool", "get_date_time", "search_web"]
        );
    }

    #[test]
    fn stock_toolset_names() {
        let registry = stock_tools(
            market_data(&ToolsConfig::default()),
            Arc::new(PaperLedger::new()),
        )
        .unwrap();
        assert_eq!(
            registry.tool_names(),
            vec![
                "buy_stocks",
                "get_current_datetime",
                "get_stock_price",
                "sell_stocks"
            ]
        );
    }
}
