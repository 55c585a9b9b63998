//! Historical price data tool

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_ticker, ticker_property};
use crate::finance::format::price_history_csv;
use crate::finance::{HistoryWindow, MarketData, Period};
use crate::tools::registry::{parse_params, Tool, ToolError};

pub struct HistoricalDataTool {
    data: Arc<dyn MarketData>,
}

impl HistoricalDataTool {
    pub fn new(data: Arc<dyn MarketData>) -> Self {
        Self { data }
    }
}

#[derive(Deserialize)]
struct Params {
    ticker: String,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ToolError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ToolError::InvalidArguments(format!("{field} must be YYYY-MM-DD, got {raw:?}"))
            }),
    }
}

#[async_trait]
impl Tool for HistoricalDataTool {
    fn name(&self) -> &str {
        "get_historical_data"
    }

    fn description(&self) -> &str {
        "Get historical market price data for a given ticker symbol. Returns CSV with Date, Open, High, Low, Close and Volume columns."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": ticker_property(),
                "period": {
                    "type": "string",
                    "description": format!(
                        "The period over which to fetch data. Valid periods: {}. Default: 1d. Combined with start, the data spans one period from start.",
                        Period::valid_values()
                    )
                },
                "start": {
                    "type": "string",
                    "description": "Start date in 'YYYY-MM-DD' format. Optional."
                },
                "end": {
                    "type": "string",
                    "description": "End date (exclusive) in 'YYYY-MM-DD' format. Optional."
                }
            },
            "required": ["ticker"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<String, ToolError> {
        let params: Params = parse_params(params)?;
        let ticker = parse_ticker(&params.ticker)?;
        let period: Period = params
            .period
            .as_deref()
            .map(str::parse::<Period>)
            .transpose()
            .map_err(ToolError::InvalidArguments)?
            .unwrap_or(Period::OneDay);
        let start = parse_date("start", params.start.as_deref())?;
        let end = parse_date("end", params.end.as_deref())?;

        let window = HistoryWindow::resolve(period, start, end, Utc::now().date_naive())
            .map_err(ToolError::InvalidArguments)?;

        let bars = self.data.price_history(&ticker, window).await?;
        Ok(price_history_csv(&bars)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::implementations::testing::{date, FakeMarketData};

    #[tokio::test]
    async fn defaults_to_one_day() {
        let data = Arc::new(FakeMarketData::default());
        let tool = HistoricalDataTool::new(data.clone());

        let csv = tool.invoke(json!({ "ticker": "nvda" })).await.unwrap();
        assert!(csv.starts_with("Date,Open,High,Low,Close,Volume\n2024-12-02,138.26"));
        assert_eq!(
            data.windows.lock().unwrap().as_slice(),
            &[HistoryWindow::Trailing(Period::OneDay)]
        );
    }

    #[tokio::test]
    async fn start_and_period_make_a_window() {
        let data = Arc::new(FakeMarketData::default());
        let tool = HistoricalDataTool::new(data.clone());

        tool.invoke(json!({ "ticker": "NVDA", "period": "5d", "start": "2024-03-01" }))
            .await
            .unwrap();
        assert_eq!(
            data.windows.lock().unwrap().as_slice(),
            &[HistoryWindow::Between {
                start: date(2024, 3, 1),
                end: date(2024, 3, 6)
            }]
        );
    }

    #[tokio::test]
    async fn rejects_bad_arguments() {
        let tool = HistoricalDataTool::new(Arc::new(FakeMarketData::default()));

        let err = tool
            .invoke(json!({ "ticker": "NVDA", "period": "2w" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = tool
            .invoke(json!({ "ticker": "NVDA", "start": "03/01/2024" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start must be YYYY-MM-DD"));

        let err = tool.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn upstream_failure_is_reported() {
        let tool = HistoricalDataTool::new(Arc::new(FakeMarketData::default()));
        let err = tool.invoke(json!({ "ticker": "MISSING" })).await.unwrap_err();
        assert_eq!(err, ToolError::Upstream("no data found for MISSING".into()));
    }
}
