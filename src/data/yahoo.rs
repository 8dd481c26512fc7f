//! Yahoo Finance chart API client.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{FetchKey, PriceSource, price_labels};
use crate::error::FetchError;
use crate::table::{Cell, RawTable};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; stockcast)";

pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Build a client, honouring `STOCKCAST_YAHOO_URL` and `STOCKCAST_USER_AGENT`
    /// (also read from `.env`).
    pub fn from_env() -> Result<Self, FetchError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("STOCKCAST_YAHOO_URL").unwrap_or_else(|_| BASE_URL.to_string());
        let user_agent =
            std::env::var("STOCKCAST_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Io(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }
}

impl PriceSource for YahooClient {
    fn fetch(&self, key: &FetchKey) -> Result<RawTable, FetchError> {
        let symbol = key.instrument.as_str();
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), symbol);

        // period2 is exclusive upstream
        let period1 = key.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (key.end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc().timestamp();

        info!(%symbol, start = %key.start, end = %key.end, "downloading daily bars");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .map_err(|e| FetchError::Request {
                symbol: symbol.to_string(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().map_err(|e| FetchError::Request {
            symbol: symbol.to_string(),
            message: e.to_string(),
        })?;
        parse_chart(symbol, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Decode a chart response body into a raw table.
///
/// Each bar is dated at local midnight of its exchange day and carries the
/// exchange's UTC offset. Missing values stay `Cell::Missing`.
pub fn parse_chart(symbol: &str, body: &str) -> Result<RawTable, FetchError> {
    let decode = |message: String| FetchError::Decode {
        symbol: symbol.to_string(),
        message,
    };

    let parsed: ChartResponse = serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;
    if let Some(err) = parsed.chart.error {
        return Err(decode(err.description.unwrap_or_else(|| "unknown chart error".to_string())));
    }
    let result = parsed
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::Empty {
            symbol: symbol.to_string(),
        })?;
    if result.timestamp.is_empty() {
        return Err(FetchError::Empty {
            symbol: symbol.to_string(),
        });
    }

    let offset = FixedOffset::east_opt(result.meta.gmtoffset)
        .ok_or_else(|| decode(format!("invalid gmtoffset {}", result.meta.gmtoffset)))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut table = RawTable::new(price_labels(symbol));
    for (i, ts) in result.timestamp.iter().enumerate() {
        let date = exchange_midnight(*ts, offset)
            .ok_or_else(|| decode(format!("timestamp {ts} out of range")))?;
        let pick = |values: &[Option<f64>]| match values.get(i).copied().flatten() {
            Some(v) => Cell::Number(v),
            None => Cell::Missing,
        };
        table.push_row(vec![
            Cell::Zoned(date),
            pick(&quote.open),
            pick(&quote.high),
            pick(&quote.low),
            pick(&quote.close),
            pick(&adjclose),
            pick(&quote.volume),
        ]);
    }

    debug!(symbol, rows = table.row_count(), "decoded chart response");
    Ok(table)
}

fn exchange_midnight(ts: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let local = DateTime::from_timestamp(ts, 0)?.with_timezone(&offset);
    local
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::normalize;

    const BODY: &str = r#"{
      "chart": {
        "result": [{
          "meta": {"symbol": "INFY.NS", "gmtoffset": 19800},
          "timestamp": [1704253500, 1704339900],
          "indicators": {
            "quote": [{
              "open": [1540.0, null],
              "high": [1552.0, 1560.5],
              "low": [1530.0, 1541.0],
              "close": [1545.5, 1555.0],
              "volume": [5000000, 4200000]
            }],
            "adjclose": [{"adjclose": [1500.1, 1509.3]}]
          }
        }],
        "error": null
      }
    }"#;

    #[test]
    fn chart_body_becomes_hierarchical_table() {
        let table = parse_chart("INFY.NS", BODY).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 7);

        let first = &table.rows()[0];
        match &first[0] {
            Cell::Zoned(dt) => {
                assert_eq!(dt.to_rfc3339(), "2024-01-03T00:00:00+05:30");
            }
            other => panic!("expected zoned date, got {other:?}"),
        }
        assert_eq!(first[4], Cell::Number(1545.5));
        assert_eq!(table.rows()[1][1], Cell::Missing);

        let normalized = normalize(&table);
        assert!(normalized.has_column("date"));
        assert!(normalized.has_column("close"));
    }

    #[test]
    fn chart_error_is_reported() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("NOPE", body).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn empty_result_is_reported() {
        let body = r#"{"chart": {"result": [{"meta": {"gmtoffset": 0}, "indicators": {"quote": [{}]}}], "error": null}}"#;
        assert!(matches!(
            parse_chart("X", body).unwrap_err(),
            FetchError::Empty { .. }
        ));
    }
}
