pub mod args;
pub mod arithmetic;
pub mod calculator;
pub mod datetime;
pub mod factory;
pub mod ledger;
pub mod registry;
pub mod stock_price;
pub mod trade;
pub mod traits;
pub mod types;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use datetime::DateTimeTool;
pub use factory::{chatbot_tools, market_data, search_backend, stock_tools};
pub use ledger::{PaperLedger, TradeRecord, TradeSide};
pub use registry::ToolRegistry;
pub use stock_price::{MarketData, StockPriceTool, YahooFinance};
pub use trade::TradeTool;
pub use traits::Tool;
pub use types::{Suspension, ToolOutcome, ToolResult, ToolSpec};
pub use web_search::{DuckDuckGoBackend, SearchBackend, SearchHit, WebSearchTool};
