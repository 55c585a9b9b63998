//! Dividends tool

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_ticker, ticker_property};
use crate::finance::format::dividends_csv;
use crate::finance::{MarketData, Period};
use crate::tools::registry::{parse_params, Tool, ToolError};

pub struct DividendsTool {
    data: Arc<dyn MarketData>,
}

impl DividendsTool {
    pub fn new(data: Arc<dyn MarketData>) -> Self {
        Self { data }
    }
}

#[derive(Deserialize)]
struct Params {
    ticker: String,
    #[serde(default)]
    time_period: Option<String>,
}

#[async_trait]
impl Tool for DividendsTool {
    fn name(&self) -> &str {
        "get_dividends"
    }

    fn description(&self) -> &str {
        "Get the dividends of a company given its ticker symbol. Returns CSV with Date and Dividends columns."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": ticker_property(),
                "time_period": {
                    "type": "string",
                    "description": format!(
                        "How far back in the past from today to fetch dividends. Valid periods: {}. Default: 1mo",
                        Period::valid_values()
                    )
                }
            },
            "required": ["ticker"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<String, ToolError> {
        let params: Params = parse_params(params)?;
        let ticker = parse_ticker(&params.ticker)?;
        let period = match params.time_period.as_deref() {
            Some(raw) => raw.parse().map_err(ToolError::InvalidArguments)?,
            None => Period::OneMonth,
        };

        let dividends = self.data.dividends(&ticker, period).await?;
        Ok(dividends_csv(&dividends)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::implementations::testing::FakeMarketData;

    #[tokio::test]
    async fn default_period_is_one_month() {
        let data = Arc::new(FakeMarketData::default());
        let tool = DividendsTool::new(data.clone());

        let csv = tool.invoke(json!({ "ticker": "NVDA" })).await.unwrap();
        assert_eq!(csv, "Date,Dividends\n2024-12-05,0.01\n");

        tool.invoke(json!({ "ticker": "NVDA", "time_period": "1y" }))
            .await
            .unwrap();
        assert_eq!(
            data.periods.lock().unwrap().as_slice(),
            &[Period::OneMonth, Period::OneYear]
        );
    }
}
