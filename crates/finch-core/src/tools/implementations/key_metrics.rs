//! Key financial metrics tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{parse_ticker, ticker_only_schema, TickerParams};
use crate::finance::MarketData;
use crate::tools::registry::{parse_params, Tool, ToolError};

/// Reported keys, in output order
const KEY_METRICS: &[&str] = &[
    // Price
    "currentPrice",
    // Valuation
    "marketCap",
    "trailingPE",
    "forwardPE",
    "priceToBook",
    "priceToSalesTrailing12Months",
    // Revenue & earnings
    "totalRevenue",
    "revenueGrowth",
    "earningsGrowth",
    // Margins
    "profitMargins",
    "grossMargins",
    "operatingMargins",
    "ebitdaMargins",
    // Balance sheet
    "totalCash",
    "totalDebt",
    "debtToEquity",
    "currentRatio",
    "quickRatio",
    // Cash flow
    "operatingCashflow",
    "freeCashflow",
    // Dividends
    "dividendRate",
    "dividendYield",
    "payoutRatio",
    // Analysts
    "targetMeanPrice",
];

pub struct KeyMetricsTool {
    data: Arc<dyn MarketData>,
}

impl KeyMetricsTool {
    pub fn new(data: Arc<dyn MarketData>) -> Self {
        Self { data }
    }
}

/// Keep only the metrics that are present, in `KEY_METRICS` order
fn select_metrics(info: &Map<String, Value>) -> Map<String, Value> {
    KEY_METRICS
        .iter()
        .filter_map(|key| {
            info.get(*key)
                .filter(|v| !v.is_null())
                .map(|v| (key.to_string(), v.clone()))
        })
        .collect()
}

#[async_trait]
impl Tool for KeyMetricsTool {
    fn name(&self) -> &str {
        "get_key_financial_metrics"
    }

    fn description(&self) -> &str {
        "Get most important financial metrics, e.g. current price, market cap, P/E ratios, revenue, earnings, margins, cash flow, dividends, analyst target price."
    }

    fn parameters_schema(&self) -> Value {
        ticker_only_schema()
    }

    async fn invoke(&self, params: Value) -> Result<String, ToolError> {
        let params: TickerParams = parse_params(params)?;
        let ticker = parse_ticker(&params.ticker)?;

        let info = self.data.company_info(&ticker).await?;
        serde_json::to_string_pretty(&select_metrics(&info))
            .map_err(|e| ToolError::Upstream(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::implementations::testing::FakeMarketData;
    use serde_json::json;

    #[tokio::test]
    async fn reports_known_keys_in_order() {
        let tool = KeyMetricsTool::new(Arc::new(FakeMarketData::default()));

        let output = tool.invoke(json!({ "ticker": "NVDA" })).await.unwrap();
        assert!(output.contains("\"currentPrice\": 182.55"));
        assert!(!output.contains("longBusinessSummary"));

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["targetMeanPrice"], json!(210.3));

        let price_at = output.find("currentPrice").unwrap();
        let target_at = output.find("targetMeanPrice").unwrap();
        assert!(price_at < target_at);
    }

    #[test]
    fn missing_metrics_are_skipped() {
        let mut info = Map::new();
        info.insert("dividendYield".into(), Value::Null);
        info.insert("quickRatio".into(), json!(3.67));
        let selected = select_metrics(&info);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected["quickRatio"], json!(3.67));
    }
}
