//! Yahoo Finance client
//!
//! Uses the public chart, quoteSummary and search endpoints. quoteSummary
//! needs a session cookie plus a "crumb" token, fetched lazily and cached.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    Dividend, FinancialStatement, HistoryWindow, MarketData, NewsItem, Period, PriceBar,
    StatementKind, StatementRow, Ticker,
};

const QUERY1: &str = "https://query1.finance.yahoo.com";
const QUERY2: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// quoteSummary modules merged into `company_info`, in precedence order
const INFO_MODULES: &[&str] = &["financialData", "defaultKeyStatistics", "summaryDetail", "price"];

pub struct YahooFinance {
    http: reqwest::Client,
    crumb: Mutex<Option<String>>,
}

impl YahooFinance {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Yahoo Finance HTTP client")?;
        Ok(Self {
            http,
            crumb: Mutex::new(None),
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        debug!(url, "Yahoo Finance request");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Force a fresh cookie + crumb on the next quoteSummary call
            self.crumb.lock().await.take();
        }

        response
            .json()
            .await
            .with_context(|| format!("{url} returned a non-JSON body ({status})"))
    }

    async fn crumb(&self) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie matters; this endpoint answers 404
        if let Err(e) = self.http.get(COOKIE_URL).send().await {
            warn!("Yahoo cookie request failed: {}", e);
        }

        let crumb = self
            .http
            .get(format!("{QUERY1}/v1/test/getcrumb"))
            .send()
            .await
            .context("crumb request failed")?
            .text()
            .await
            .context("crumb response unreadable")?;

        let crumb = crumb.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') || crumb.contains(' ') {
            bail!("Yahoo Finance did not issue a crumb");
        }

        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn quote_summary(&self, ticker: &Ticker, modules: &[&str]) -> Result<Value> {
        let crumb = self.crumb().await?;
        let body = self
            .get_json(
                &format!("{QUERY2}/v10/finance/quoteSummary/{ticker}"),
                &[("modules", modules.join(",")), ("crumb", crumb)],
            )
            .await?;
        first_result(&body, "quoteSummary", ticker)
    }

    async fn chart(&self, ticker: &Ticker, window: HistoryWindow) -> Result<ChartData> {
        let mut query = vec![
            ("interval", "1d".to_string()),
            ("events", "div".to_string()),
        ];
        match window {
            HistoryWindow::Trailing(period) => query.push(("range", period.as_str().to_string())),
            HistoryWindow::Between { start, end } => {
                query.push(("period1", unix_seconds(start).to_string()));
                query.push(("period2", unix_seconds(end).to_string()));
            }
        }

        let body = self
            .get_json(&format!("{QUERY1}/v8/finance/chart/{ticker}"), &query)
            .await?;
        parse_chart(&body, ticker)
    }
}

#[async_trait]
impl MarketData for YahooFinance {
    async fn price_history(&self, ticker: &Ticker, window: HistoryWindow) -> Result<Vec<PriceBar>> {
        Ok(self.chart(ticker, window).await?.bars)
    }

    async fn dividends(&self, ticker: &Ticker, period: Period) -> Result<Vec<Dividend>> {
        Ok(self
            .chart(ticker, HistoryWindow::Trailing(period))
            .await?
            .dividends)
    }

    async fn news(&self, ticker: &Ticker, limit: usize) -> Result<Vec<NewsItem>> {
        let body = self
            .get_json(
                &format!("{QUERY2}/v1/finance/search"),
                &[
                    ("q", ticker.to_string()),
                    ("quotesCount", "0".to_string()),
                    ("newsCount", limit.to_string()),
                ],
            )
            .await?;
        Ok(parse_news(&body, limit))
    }

    async fn company_info(&self, ticker: &Ticker) -> Result<Map<String, Value>> {
        let result = self.quote_summary(ticker, INFO_MODULES).await?;
        Ok(flatten_modules(&result, INFO_MODULES))
    }

    async fn statement(&self, ticker: &Ticker, kind: StatementKind) -> Result<FinancialStatement> {
        let (module, _) = statement_keys(kind);
        let result = self.quote_summary(ticker, &[module]).await?;
        parse_statement(&result, kind)
    }
}

struct ChartData {
    bars: Vec<PriceBar>,
    dividends: Vec<Dividend>,
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Calendar date of a timestamp in the exchange's local time
fn local_date(timestamp: i64, gmt_offset: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp + gmt_offset, 0).map(|dt| dt.date_naive())
}

/// Unwrap `{"<root>": {"result": [first, ..], "error": ...}}`
fn first_result(body: &Value, root: &str, ticker: &Ticker) -> Result<Value> {
    let section = body
        .get(root)
        .ok_or_else(|| anyhow!("unexpected Yahoo Finance response for {ticker}"))?;

    if let Some(error) = section.get("error").filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown error");
        bail!("Yahoo Finance error for {ticker}: {description}");
    }

    section
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .cloned()
        .ok_or_else(|| anyhow!("no data found for {ticker}"))
}

fn parse_chart(body: &Value, ticker: &Ticker) -> Result<ChartData> {
    let result = first_result(body, "chart", ticker)?;
    let gmt_offset = result
        .pointer("/meta/gmtoffset")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let timestamps: Vec<i64> = result
        .get("timestamp")
        .and_then(|t| t.as_array())
        .map(|t| t.iter().filter_map(|v| v.as_i64()).collect())
        .unwrap_or_default();

    let quote = result.pointer("/indicators/quote/0");
    let series = |key: &str| -> Vec<Option<f64>> {
        quote
            .and_then(|q| q.get(key))
            .and_then(|v| v.as_array())
            .map(|values| values.iter().map(|v| v.as_f64()).collect())
            .unwrap_or_default()
    };
    let (open, high, low, close, volume) = (
        series("open"),
        series("high"),
        series("low"),
        series("close"),
        series("volume"),
    );
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    // Rows with gaps (halts, partial days) are skipped
    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            Some(PriceBar {
                date: local_date(*ts, gmt_offset)?,
                open: at(&open, i)?,
                high: at(&high, i)?,
                low: at(&low, i)?,
                close: at(&close, i)?,
                volume: at(&volume, i).unwrap_or(0.0) as u64,
            })
        })
        .collect();

    let mut dividends: Vec<Dividend> = result
        .pointer("/events/dividends")
        .and_then(|d| d.as_object())
        .map(|events| {
            events
                .values()
                .filter_map(|event| {
                    Some(Dividend {
                        date: local_date(event.get("date")?.as_i64()?, gmt_offset)?,
                        amount: event.get("amount")?.as_f64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    dividends.sort_by_key(|d| d.date);

    Ok(ChartData { bars, dividends })
}

/// Yahoo wraps numbers as `{"raw": 1.2, "fmt": "1.20"}`
fn raw_value(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => map.get("raw").filter(|v| !v.is_null()).cloned(),
        Value::Null | Value::Array(_) => None,
        scalar => Some(scalar.clone()),
    }
}

/// Merge quoteSummary modules into one flat map; earlier modules win
fn flatten_modules(result: &Value, modules: &[&str]) -> Map<String, Value> {
    let mut info = Map::new();
    for module in modules {
        let Some(fields) = result.get(*module).and_then(|m| m.as_object()) else {
            continue;
        };
        for (key, value) in fields {
            if key == "maxAge" || info.contains_key(key) {
                continue;
            }
            if let Some(raw) = raw_value(value) {
                info.insert(key.clone(), raw);
            }
        }
    }
    info
}

fn statement_keys(kind: StatementKind) -> (&'static str, &'static str) {
    match kind {
        StatementKind::BalanceSheet => ("balanceSheetHistory", "balanceSheetStatements"),
        StatementKind::IncomeStatement => ("incomeStatementHistory", "incomeStatementHistory"),
        StatementKind::CashFlow => ("cashflowStatementHistory", "cashflowStatements"),
    }
}

/// `totalAssets` -> `TotalAssets`
fn line_item_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_statement(result: &Value, kind: StatementKind) -> Result<FinancialStatement> {
    let (module, list_key) = statement_keys(kind);
    let Some(entries) = result
        .get(module)
        .and_then(|m| m.get(list_key))
        .and_then(|l| l.as_array())
    else {
        bail!("no {} data available", kind.label());
    };

    let mut statement = FinancialStatement::default();
    let mut row_index: Vec<String> = Vec::new();

    for entry in entries {
        let Some(fields) = entry.as_object() else {
            continue;
        };
        let Some(period) = fields
            .get("endDate")
            .and_then(|d| d.get("raw"))
            .and_then(|d| d.as_i64())
            .and_then(|ts| local_date(ts, 0))
        else {
            continue;
        };

        let column = statement.periods.len();
        statement.periods.push(period);
        for row in &mut statement.rows {
            row.values.push(None);
        }

        for (key, value) in fields {
            if key == "endDate" || key == "maxAge" {
                continue;
            }
            let Some(number) = raw_value(value).and_then(|v| v.as_f64()) else {
                continue;
            };
            let idx = match row_index.iter().position(|k| k == key) {
                Some(idx) => idx,
                None => {
                    row_index.push(key.clone());
                    statement.rows.push(StatementRow {
                        name: line_item_name(key),
                        values: vec![None; column + 1],
                    });
                    row_index.len() - 1
                }
            };
            statement.rows[idx].values[column] = Some(number);
        }
    }

    if statement.periods.is_empty() {
        bail!("no {} data available", kind.label());
    }
    Ok(statement)
}

fn parse_news(body: &Value, limit: usize) -> Vec<NewsItem> {
    let Some(items) = body.get("news").and_then(|n| n.as_array()) else {
        return Vec::new();
    };

    let text = |item: &Value, key: &str| {
        item.get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    items
        .iter()
        .filter_map(|item| {
            Some(NewsItem {
                id: text(item, "uuid")?,
                title: text(item, "title")?,
                summary: text(item, "summary"),
                pub_date: item
                    .get("providerPublishTime")
                    .and_then(|t| t.as_i64())
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
                    .map(|dt| dt.to_rfc3339()),
                provider: text(item, "publisher"),
                content_type: text(item, "type"),
            })
        })
        .take(limit)
        .collect()
}
