//! CSV rendering for tool output

use anyhow::{Context, Result};

use super::{Dividend, FinancialStatement, PriceBar};

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Prices to two decimals, matching how quotes are displayed
fn price(value: f64) -> String {
    format!("{value:.2}")
}

/// `Date,Open,High,Low,Close,Volume`
pub fn price_history_csv(bars: &[PriceBar]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
    for bar in bars {
        writer.write_record([
            bar.date.to_string(),
            price(bar.open),
            price(bar.high),
            price(bar.low),
            price(bar.close),
            bar.volume.to_string(),
        ])?;
    }
    finish(writer)
}

/// `Date,Dividends`
pub fn dividends_csv(dividends: &[Dividend]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Date", "Dividends"])?;
    for dividend in dividends {
        writer.write_record([dividend.date.to_string(), dividend.amount.to_string()])?;
    }
    finish(writer)
}

/// One row per line item, one column per period; missing values are empty
pub fn statement_csv(statement: &FinancialStatement) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![String::new()];
    header.extend(statement.periods.iter().map(|p| p.to_string()));
    writer.write_record(&header)?;

    for row in &statement.rows {
        let mut record = vec![row.name.clone()];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    finish(writer)
}
