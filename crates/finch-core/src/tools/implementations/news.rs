//! Latest news tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{parse_ticker, ticker_only_schema, TickerParams};
use crate::constants::tools::NEWS_LIMIT;
use crate::finance::MarketData;
use crate::tools::registry::{parse_params, Tool, ToolError};

pub struct LatestNewsTool {
    data: Arc<dyn MarketData>,
}

impl LatestNewsTool {
    pub fn new(data: Arc<dyn MarketData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for LatestNewsTool {
    fn name(&self) -> &str {
        "get_latest_news"
    }

    fn description(&self) -> &str {
        "Get the latest news articles for a given ticker symbol."
    }

    fn parameters_schema(&self) -> Value {
        ticker_only_schema()
    }

    async fn invoke(&self, params: Value) -> Result<String, ToolError> {
        let params: TickerParams = parse_params(params)?;
        let ticker = parse_ticker(&params.ticker)?;

        let mut items = self.data.news(&ticker, NEWS_LIMIT).await?;
        items.truncate(NEWS_LIMIT);

        serde_json::to_string_pretty(&items).map_err(|e| ToolError::Upstream(e.to_string()))
    }
}
