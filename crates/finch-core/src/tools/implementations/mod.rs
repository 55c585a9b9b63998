//! Financial data tools
//!
//! The seven tools offered to the tool-selection model. `FinanceTool` is the
//! closed set of them; each variant maps to exactly one handler.

mod dividends;
mod historical_data;
mod key_metrics;
mod news;
mod statements;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

pub use dividends::DividendsTool;
pub use historical_data::HistoricalDataTool;
pub use key_metrics::KeyMetricsTool;
pub use news::LatestNewsTool;
pub use statements::StatementTool;

use crate::config::ConfigError;
use crate::finance::{MarketData, StatementKind, Ticker};
use crate::tools::registry::{Tool, ToolError, ToolRegistry};

/// Every financial tool the assistant knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinanceTool {
    HistoricalData,
    LatestNews,
    KeyFinancialMetrics,
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
    Dividends,
}

impl FinanceTool {
    pub const ALL: [FinanceTool; 7] = [
        FinanceTool::HistoricalData,
        FinanceTool::KeyFinancialMetrics,
        FinanceTool::BalanceSheet,
        FinanceTool::Dividends,
        FinanceTool::LatestNews,
        FinanceTool::IncomeStatement,
        FinanceTool::CashFlowStatement,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FinanceTool::HistoricalData => "get_historical_data",
            FinanceTool::LatestNews => "get_latest_news",
            FinanceTool::KeyFinancialMetrics => "get_key_financial_metrics",
            FinanceTool::BalanceSheet => "get_balance_sheet",
            FinanceTool::IncomeStatement => "get_income_statement",
            FinanceTool::CashFlowStatement => "get_cash_flow_statement",
            FinanceTool::Dividends => "get_dividends",
        }
    }

    /// One-line purpose, used in the system prompt
    pub fn purpose(&self) -> &'static str {
        match self {
            FinanceTool::HistoricalData => {
                "use this to get the historical stock price data for a specific stock"
            }
            FinanceTool::LatestNews => "use this to get the latest news about a specific stock",
            FinanceTool::KeyFinancialMetrics => {
                "use this to get the key financial metrics for a specific stock"
            }
            FinanceTool::BalanceSheet => "use this to get the balance sheet for a specific stock",
            FinanceTool::IncomeStatement => {
                "use this to get the income statement for a specific stock"
            }
            FinanceTool::CashFlowStatement => {
                "use this to get the cash flow statement for a specific stock"
            }
            FinanceTool::Dividends => {
                "use this to get the dividend information for a specific stock"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Build the handler for this tool
    pub fn handler(&self, data: Arc<dyn MarketData>) -> Arc<dyn Tool> {
        match self {
            FinanceTool::HistoricalData => Arc::new(HistoricalDataTool::new(data)),
            FinanceTool::LatestNews => Arc::new(LatestNewsTool::new(data)),
            FinanceTool::KeyFinancialMetrics => Arc::new(KeyMetricsTool::new(data)),
            FinanceTool::BalanceSheet => {
                Arc::new(StatementTool::new(data, StatementKind::BalanceSheet))
            }
            FinanceTool::IncomeStatement => {
                Arc::new(StatementTool::new(data, StatementKind::IncomeStatement))
            }
            FinanceTool::CashFlowStatement => {
                Arc::new(StatementTool::new(data, StatementKind::CashFlow))
            }
            FinanceTool::Dividends => Arc::new(DividendsTool::new(data)),
        }
    }
}

/// Registry holding all seven finance tools backed by `data`
pub fn finance_registry(data: Arc<dyn MarketData>) -> Result<ToolRegistry, ConfigError> {
    FinanceTool::ALL
        .iter()
        .fold(ToolRegistry::builder(), |builder, tool| {
            builder.register(tool.handler(data.clone()))
        })
        .build()
}

/// Arguments shared by the single-ticker tools
#[derive(Deserialize)]
struct TickerParams {
    ticker: String,
}

fn parse_ticker(raw: &str) -> Result<Ticker, ToolError> {
    Ticker::parse(raw).map_err(ToolError::InvalidArguments)
}

fn ticker_property() -> Value {
    json!({
        "type": "string",
        "description": "The ticker symbol of the company e.g. \"MSFT\"."
    })
}

fn ticker_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "ticker": ticker_property() },
        "required": ["ticker"]
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory `MarketData` for tool tests

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    use crate::finance::{
        Dividend, FinancialStatement, HistoryWindow, MarketData, NewsItem, Period, PriceBar,
        StatementKind, StatementRow, Ticker,
    };

    #[derive(Default)]
    pub struct FakeMarketData {
        pub windows: Mutex<Vec<HistoryWindow>>,
        pub periods: Mutex<Vec<Period>>,
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[async_trait]
    impl MarketData for FakeMarketData {
        async fn price_history(
            &self,
            ticker: &Ticker,
            window: HistoryWindow,
        ) -> Result<Vec<PriceBar>> {
            if ticker.as_str() == "MISSING" {
                bail!("no data found for {ticker}");
            }
            self.windows.lock().unwrap().push(window);
            Ok(vec![PriceBar {
                date: date(2024, 12, 2),
                open: 138.26,
                high: 140.45,
                low: 137.82,
                close: 138.63,
                volume: 171_682_800,
            }])
        }

        async fn dividends(&self, _ticker: &Ticker, period: Period) -> Result<Vec<Dividend>> {
            self.periods.lock().unwrap().push(period);
            Ok(vec![Dividend {
                date: date(2024, 12, 5),
                amount: 0.01,
            }])
        }

        async fn news(&self, _ticker: &Ticker, limit: usize) -> Result<Vec<NewsItem>> {
            Ok((0..limit + 3)
                .map(|i| NewsItem {
                    id: format!("n{i}"),
                    title: format!("Headline {i}"),
                    summary: None,
                    pub_date: None,
                    provider: Some("Reuters".into()),
                    content_type: None,
                })
                .collect())
        }

        async fn company_info(&self, _ticker: &Ticker) -> Result<Map<String, Value>> {
            let info = json!({
                "currentPrice": 182.55,
                "marketCap": 4_450_000_000_000i64,
                "trailingPE": 52.1,
                "longBusinessSummary": "Designs GPUs.",
                "targetMeanPrice": 210.3
            });
            Ok(info.as_object().cloned().unwrap_or_default())
        }

        async fn statement(
            &self,
            _ticker: &Ticker,
            kind: StatementKind,
        ) -> Result<FinancialStatement> {
            let name = match kind {
                StatementKind::BalanceSheet => "TotalAssets",
                StatementKind::IncomeStatement => "TotalRevenue",
                StatementKind::CashFlow => "FreeCashFlow",
            };
            Ok(FinancialStatement {
                periods: vec![date(2025, 1, 26)],
                rows: vec![StatementRow {
                    name: name.into(),
                    values: vec![Some(1_000.0)],
                }],
            })
        }
    }
}
