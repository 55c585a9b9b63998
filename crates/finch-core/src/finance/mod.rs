//! Market data access
//!
//! `MarketData` is what the finance tools call; `YahooFinance` implements it
//! against Yahoo's public HTTP endpoints.

pub mod format;
pub mod yahoo;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

pub use yahoo::YahooFinance;

static TICKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9.^=-]{1,15}$").expect("valid ticker regex"));

/// Upper-cased, validated ticker symbol (`NVDA`, `BRK-B`, `^GSPC`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let symbol = raw.trim().to_ascii_uppercase();
        if !TICKER_PATTERN.is_match(&symbol) {
            return Err(format!("invalid ticker symbol: {raw:?}"));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookback window accepted by the history and dividend tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// Comma separated list for tool descriptions and error messages
    pub fn valid_values() -> String {
        Self::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
    }

    fn months(&self) -> Option<u32> {
        match self {
            Period::OneMonth => Some(1),
            Period::ThreeMonths => Some(3),
            Period::SixMonths => Some(6),
            Period::OneYear => Some(12),
            Period::TwoYears => Some(24),
            Period::FiveYears => Some(60),
            Period::TenYears => Some(120),
            _ => None,
        }
    }

    fn days(&self) -> Option<u64> {
        match self {
            Period::OneDay => Some(1),
            Period::FiveDays => Some(5),
            _ => None,
        }
    }

    /// `date` moved forward by this period; open-ended periods give `None`
    pub fn after(&self, date: NaiveDate) -> Option<NaiveDate> {
        if let Some(days) = self.days() {
            return date.checked_add_days(chrono::Days::new(days));
        }
        self.months()
            .and_then(|m| date.checked_add_months(Months::new(m)))
    }

    /// Start of the window that ends at `date`
    pub fn before(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::YearToDate => NaiveDate::from_ymd_opt(date.year(), 1, 1),
            Period::Max => NaiveDate::from_ymd_opt(1970, 1, 1),
            _ => match self.days() {
                Some(days) => date.checked_sub_days(chrono::Days::new(days)),
                None => self
                    .months()
                    .and_then(|m| date.checked_sub_months(Months::new(m))),
            },
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("invalid period {s:?}, expected one of: {}", Self::valid_values()))
    }
}

/// What slice of history to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// Trailing window ending now
    Trailing(Period),
    /// Explicit dates; `end` is exclusive
    Between { start: NaiveDate, end: NaiveDate },
}

impl HistoryWindow {
    /// Combine a period with optional explicit bounds
    ///
    /// With only `start`, the window spans one period from it (up to
    /// `today` for open-ended periods). With only `end`, it spans one period
    /// back from it.
    pub fn resolve(
        period: Period,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, String> {
        let window = match (start, end) {
            (None, None) => return Ok(HistoryWindow::Trailing(period)),
            (Some(start), Some(end)) => HistoryWindow::Between { start, end },
            (Some(start), None) => HistoryWindow::Between {
                start,
                end: period.after(start).unwrap_or(today),
            },
            (None, Some(end)) => HistoryWindow::Between {
                start: period
                    .before(end)
                    .ok_or_else(|| format!("cannot compute start date from {end}"))?,
                end,
            },
        };

        if let HistoryWindow::Between { start, end } = window {
            if start >= end {
                return Err(format!("start date {start} must be before end date {end}"));
            }
        }
        Ok(window)
    }
}

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dividend {
    pub date: NaiveDate,
    pub amount: f64,
}

/// A news headline about a ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Which financial statement to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl StatementKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "balance sheet",
            StatementKind::IncomeStatement => "income statement",
            StatementKind::CashFlow => "cash flow statement",
        }
    }
}

/// Line items by reporting period
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialStatement {
    /// Period end dates, newest first
    pub periods: Vec<NaiveDate>,
    pub rows: Vec<StatementRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub name: String,
    /// One value per entry in `periods`
    pub values: Vec<Option<f64>>,
}

/// Source of market data for the finance tools
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Daily price bars
    async fn price_history(&self, ticker: &Ticker, window: HistoryWindow) -> Result<Vec<PriceBar>>;

    /// Dividends paid within a trailing period
    async fn dividends(&self, ticker: &Ticker, period: Period) -> Result<Vec<Dividend>>;

    /// Latest headlines, newest first
    async fn news(&self, ticker: &Ticker, limit: usize) -> Result<Vec<NewsItem>>;

    /// Flat map of company facts and ratios (`currentPrice`, `marketCap`, ...)
    async fn company_info(&self, ticker: &Ticker) -> Result<Map<String, Value>>;

    /// Annual financial statement
    async fn statement(&self, ticker: &Ticker, kind: StatementKind) -> Result<FinancialStatement>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ticker_is_normalized() {
        assert_eq!(Ticker::parse(" nvda ").unwrap().as_str(), "NVDA");
        assert_eq!(Ticker::parse("brk-b").unwrap().as_str(), "BRK-B");
        assert_eq!(Ticker::parse("^gspc").unwrap().as_str(), "^GSPC");
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("NV DA").is_err());
        assert!(Ticker::parse("../etc").is_err());
    }

    #[test]
    fn period_parsing() {
        assert_eq!("1mo".parse::<Period>().unwrap(), Period::OneMonth);
        assert_eq!("YTD".parse::<Period>().unwrap(), Period::YearToDate);
        let err = "2mo".parse::<Period>().unwrap_err();
        assert!(err.contains("1d, 5d, 1mo"));
    }

    #[test]
    fn window_from_start_spans_one_period() {
        let today = date(2025, 6, 1);
        let window =
            HistoryWindow::resolve(Period::OneMonth, Some(date(2024, 1, 31)), None, today).unwrap();
        assert_eq!(
            window,
            HistoryWindow::Between {
                start: date(2024, 1, 31),
                end: date(2024, 2, 29)
            }
        );

        let open_ended =
            HistoryWindow::resolve(Period::Max, Some(date(2024, 1, 1)), None, today).unwrap();
        assert_eq!(
            open_ended,
            HistoryWindow::Between {
                start: date(2024, 1, 1),
                end: today
            }
        );
    }

    #[test]
    fn window_from_end_and_trailing() {
        let today = date(2025, 6, 1);
        assert_eq!(
            HistoryWindow::resolve(Period::FiveDays, None, Some(date(2024, 3, 10)), today).unwrap(),
            HistoryWindow::Between {
                start: date(2024, 3, 5),
                end: date(2024, 3, 10)
            }
        );
        assert_eq!(
            HistoryWindow::resolve(Period::OneYear, None, None, today).unwrap(),
            HistoryWindow::Trailing(Period::OneYear)
        );
    }

    #[test]
    fn window_rejects_reversed_dates() {
        let today = date(2025, 6, 1);
        assert!(HistoryWindow::resolve(
            Period::OneDay,
            Some(date(2024, 5, 1)),
            Some(date(2024, 4, 1)),
            today
        )
        .is_err());
    }
}
