//! Price history lookups for charting.
//!
//! Sources are tried in order, each with its own timeout. A source answers
//! when it returns at least one usable record; if none does, the result is an empty
//! series. Failures are logged and never surfaced as errors.

use std::time::{Duration, SystemTime};

use reqwest::{Client, Url};
use serde_json::Value;
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    OffsetDateTime, PrimitiveDateTime,
};
use tracing::{debug, info, warn};

use crate::domain::HistoryPoint;
use crate::infra::hypixel::HypixelClientError;

pub const DEFAULT_COFLNET_URL: &str = "https://sky.coflnet.com/api/";
const SOURCE_TIMEOUT: Duration = Duration::from_secs(8);
/// Points shown when the selected window holds none.
const FALLBACK_POINTS: usize = 50;

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time", "date"];
const BUY_KEYS: &[&str] = &["buyPrice", "buy"];
const SELL_KEYS: &[&str] = &["sellPrice", "sell"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryRange {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl HistoryRange {
    pub fn window(&self) -> Duration {
        const HOUR: u64 = 60 * 60;
        match self {
            Self::Hour => Duration::from_secs(HOUR),
            Self::Day => Duration::from_secs(24 * HOUR),
            Self::Week => Duration::from_secs(7 * 24 * HOUR),
            Self::Month => Duration::from_secs(30 * 24 * HOUR),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hour => "1h",
            Self::Day => "1d",
            Self::Week => "1w",
            Self::Month => "1m",
        }
    }
}

impl std::str::FromStr for HistoryRange {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "1h" => Ok(Self::Hour),
            "1d" => Ok(Self::Day),
            "1w" => Ok(Self::Week),
            "1m" => Ok(Self::Month),
            other => Err(format!("unknown history range {other}; expected 1h, 1d, 1w or 1m")),
        }
    }
}

/// One candidate endpoint; `{item}` in the path is replaced by the product id.
#[derive(Clone, Debug)]
pub struct HistorySource {
    pub path: String,
    pub timeout: Duration,
}

impl HistorySource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timeout: SOURCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone)]
pub struct HistoryClient {
    http: Client,
    base_url: Url,
    sources: Vec<HistorySource>,
}

impl HistoryClient {
    pub fn new() -> Result<Self, HypixelClientError> {
        Self::with_base_url(DEFAULT_COFLNET_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, HypixelClientError> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: Url::parse(base)?,
            sources: vec![
                HistorySource::new("bazaar/{item}/history"),
                HistorySource::new("item/{item}/history"),
            ],
        })
    }

    pub fn with_sources(mut self, sources: Vec<HistorySource>) -> Self {
        self.sources = sources;
        self
    }

    /// Normalized, time-ordered history for `item_id`; empty when no source answers.
    pub async fn fetch_history(&self, item_id: &str) -> Vec<HistoryPoint> {
        for source in &self.sources {
            match self.fetch_source(source, item_id).await {
                Ok(Some(entries)) => {
                    let points = normalize_history(&entries);
                    if points.is_empty() {
                        debug!(item_id, source = %source.path, "history source had no usable records");
                        continue;
                    }
                    info!(item_id, records = points.len(), source = %source.path, "history loaded");
                    return points;
                }
                Ok(None) => {
                    debug!(item_id, source = %source.path, "history source returned no data");
                }
                Err(error) => {
                    warn!(item_id, source = %source.path, %error, "history source failed");
                }
            }
        }
        Vec::new()
    }

    async fn fetch_source(
        &self,
        source: &HistorySource,
        item_id: &str,
    ) -> Result<Option<Vec<Value>>, HypixelClientError> {
        let url = self.base_url.join(&source.path.replace("{item}", item_id))?;
        let body: Value = self
            .http
            .get(url)
            .timeout(source.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match body {
            Value::Array(entries) if !entries.is_empty() => Ok(Some(entries)),
            _ => Ok(None),
        }
    }
}

/// Maps loosely shaped upstream records onto [`HistoryPoint`]s.
///
/// Records without a readable timestamp are dropped.
pub fn normalize_history(entries: &[Value]) -> Vec<HistoryPoint> {
    let mut points: Vec<HistoryPoint> = entries
        .iter()
        .filter_map(|entry| {
            let time = TIMESTAMP_KEYS
                .iter()
                .find_map(|key| entry.get(*key).filter(|v| !v.is_null()))
                .and_then(parse_timestamp)?;
            Some(HistoryPoint {
                time,
                buy_price: first_price(entry, BUY_KEYS),
                sell_price: first_price(entry, SELL_KEYS),
            })
        })
        .collect();
    points.sort_by_key(|point| point.time);
    points
}

/// Points inside `range` measured back from `now`, or the latest
/// [`FALLBACK_POINTS`] when the window is empty.
pub fn filter_range(points: &[HistoryPoint], range: HistoryRange, now: SystemTime) -> Vec<HistoryPoint> {
    let window = range.window();
    let within: Vec<HistoryPoint> = points
        .iter()
        .filter(|point| {
            now.duration_since(point.time)
                .map(|age| age <= window)
                .unwrap_or(true)
        })
        .copied()
        .collect();

    if within.is_empty() && !points.is_empty() {
        let start = points.len().saturating_sub(FALLBACK_POINTS);
        return points[start..].to_vec();
    }
    within
}

fn first_price(entry: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .filter_map(|key| entry.get(*key).and_then(Value::as_f64))
        .find(|price| price.is_finite() && *price != 0.0)
        .unwrap_or(0.0)
}

fn parse_timestamp(value: &Value) -> Option<SystemTime> {
    match value {
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() || millis < 0.0 {
                return None;
            }
            SystemTime::UNIX_EPOCH.checked_add(Duration::from_millis(millis as u64))
        }
        Value::String(raw) => parse_timestamp_str(raw),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<SystemTime> {
    let parsed = OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, &Iso8601::DEFAULT))
        .or_else(|_| PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(|dt| dt.assume_utc()))
        .ok()?;
    let secs = u64::try_from(parsed.unix_timestamp()).ok()?;
    SystemTime::UNIX_EPOCH
        .checked_add(Duration::from_secs(secs))
        .and_then(|time| time.checked_add(Duration::from_nanos(u64::from(parsed.nanosecond()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn accepts_every_timestamp_and_price_spelling() {
        let entries = vec![
            json!({ "timestamp": "2024-03-01T12:00:00Z", "buyPrice": 10.0, "sellPrice": 9.0 }),
            json!({ "time": 1_709_290_800_000_u64, "buy": 11.0, "sell": 8.5 }),
            json!({ "date": "2024-03-01T10:00:00.500", "buy": 12.0 }),
            json!({ "buy": 99.0 }),
            json!({ "timestamp": "yesterday", "buy": 99.0 }),
        ];

        let points = normalize_history(&entries);
        assert_eq!(points.len(), 3);

        assert_eq!(points[0].time, at(1_709_287_200) + Duration::from_millis(500));
        assert_eq!(points[0].buy_price, 12.0);
        assert_eq!(points[0].sell_price, 0.0);

        assert_eq!(points[1].time, at(1_709_290_800));
        assert_eq!(points[1].sell_price, 8.5);

        assert_eq!(points[2].time, at(1_709_294_400));
        assert_eq!(points[2].buy_price, 10.0);
    }

    #[test]
    fn zero_primary_price_falls_through_to_alias() {
        let entries = vec![json!({ "time": 0, "buyPrice": 0, "buy": 4.0 })];
        let points = normalize_history(&entries);
        assert_eq!(points[0].buy_price, 4.0);
    }

    #[test]
    fn range_filter_falls_back_to_latest_points() {
        let now = at(100 * 24 * 3600);
        let recent = HistoryPoint {
            time: now - Duration::from_secs(30 * 60),
            buy_price: 1.0,
            sell_price: 1.0,
        };
        let old: Vec<HistoryPoint> = (0..60)
            .map(|i| HistoryPoint {
                time: at(i * 60),
                buy_price: i as f64,
                sell_price: 0.0,
            })
            .collect();

        let mut all = old.clone();
        all.push(recent);
        assert_eq!(filter_range(&all, HistoryRange::Hour, now), vec![recent]);

        let fallback = filter_range(&old, HistoryRange::Day, now);
        assert_eq!(fallback.len(), FALLBACK_POINTS);
        assert_eq!(fallback[0].buy_price, 10.0);
        assert!(filter_range(&[], HistoryRange::Week, now).is_empty());
    }

    #[tokio::test]
    async fn no_answering_source_yields_empty_series() {
        let client = HistoryClient::with_base_url("http://127.0.0.1:9/")
            .unwrap()
            .with_sources(vec![
                HistorySource::new("bazaar/{item}/history").with_timeout(Duration::from_millis(200)),
            ]);
        assert!(client.fetch_history("ENCHANTED_CARROT").await.is_empty());

        let client = client.with_sources(Vec::new());
        assert!(client.fetch_history("ENCHANTED_CARROT").await.is_empty());
    }

    /// Serves one canned JSON body per connection, picked by request path prefix.
    fn serve(routes: Vec<(&'static str, &'static str)>, connections: usize) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                let mut buf = [0u8; 4096];
                let read = stream.read(&mut buf).unwrap();
                let request = String::from_utf8_lossy(&buf[..read]);
                let body = routes
                    .iter()
                    .find(|(prefix, _)| request.starts_with(prefix))
                    .map(|(_, body)| *body)
                    .unwrap_or("[]");
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .unwrap();
            }
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn unusable_records_fall_through_to_next_source() {
        let base = serve(
            vec![
                ("GET /bazaar/", r#"[{"buy": 5.0}, {"timestamp": "never"}]"#),
                ("GET /item/", r#"[{"time": 1000, "buy": 2.0, "sell": 1.5}]"#),
            ],
            2,
        );
        let client = HistoryClient::with_base_url(&base).unwrap();

        let points = client.fetch_history("ENCHANTED_CARROT").await;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, SystemTime::UNIX_EPOCH + Duration::from_secs(1));
        assert_eq!(points[0].buy_price, 2.0);
    }

    #[test]
    fn parses_range_labels() {
        assert_eq!("1w".parse::<HistoryRange>(), Ok(HistoryRange::Week));
        assert_eq!(HistoryRange::Month.window(), Duration::from_secs(30 * 24 * 3600));
        assert!("2d".parse::<HistoryRange>().is_err());
    }
}
