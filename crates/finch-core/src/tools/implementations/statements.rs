//! Balance sheet, income statement and cash flow statement tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{parse_ticker, ticker_only_schema, TickerParams};
use crate::finance::format::statement_csv;
use crate::finance::{MarketData, StatementKind};
use crate::tools::registry::{parse_params, Tool, ToolError};

/// One financial statement, selected by `kind`
pub struct StatementTool {
    data: Arc<dyn MarketData>,
    kind: StatementKind,
}

impl StatementTool {
    pub fn new(data: Arc<dyn MarketData>, kind: StatementKind) -> Self {
        Self { data, kind }
    }
}

#[async_trait]
impl Tool for StatementTool {
    fn name(&self) -> &str {
        match self.kind {
            StatementKind::BalanceSheet => "get_balance_sheet",
            StatementKind::IncomeStatement => "get_income_statement",
            StatementKind::CashFlow => "get_cash_flow_statement",
        }
    }

    fn description(&self) -> &str {
        match self.kind {
            StatementKind::BalanceSheet => {
                "Get the balance sheet of a company given its ticker symbol. The balance sheet provides a snapshot of the company's assets, liabilities, and shareholders' equity at a specific point in time."
            }
            StatementKind::IncomeStatement => {
                "Get the income statement of a company given its ticker symbol. The income statement provides insights into the company's revenues, expenses, and profits over a specific period."
            }
            StatementKind::CashFlow => {
                "Get the cash flow statement of a company given its ticker symbol. The cash flow statement provides insights into the cash inflows and outflows from operating, investing, and financing activities."
            }
        }
    }

    fn parameters_schema(&self) -> Value {
        ticker_only_schema()
    }

    async fn invoke(&self, params: Value) -> Result<String, ToolError> {
        let params: TickerParams = parse_params(params)?;
        let ticker = parse_ticker(&params.ticker)?;

        let statement = self.data.statement(&ticker, self.kind).await?;
        Ok(statement_csv(&statement)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::implementations::testing::FakeMarketData;
    use serde_json::json;

    #[tokio::test]
    async fn each_kind_fetches_its_statement() {
        let data = Arc::new(FakeMarketData::default());
        let cases = [
            (StatementKind::BalanceSheet, "TotalAssets"),
            (StatementKind::IncomeStatement, "TotalRevenue"),
            (StatementKind::CashFlow, "FreeCashFlow"),
        ];

        for (kind, row) in cases {
            let tool = StatementTool::new(data.clone(), kind);
            let csv = tool.invoke(json!({ "ticker": "MSFT" })).await.unwrap();
            assert_eq!(csv, format!(",2025-01-26\n{row},1000\n"));
        }
    }
}
