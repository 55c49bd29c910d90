//! Upstream JSON wire shapes and boundary normalization.
//!
//! The upstream collapses single-element lists into bare objects
//! (`quotes.quote` is a map for one symbol, a list for several). That
//! ambiguity is resolved here, at the serde boundary, so downstream code
//! only ever sees sequences. Numeric fields are coerced leniently: numbers,
//! numeric strings, anything else (and non-finite values) become `None`.

use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::domain::{DailyBar, Greeks, IntradayBar, Quote};

/// A JSON value that may be a single object or a list of objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(coerce_f64))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(coerce_f64).and_then(|v| {
        if v >= 0.0 {
            Some(v as u64)
        } else {
            None
        }
    }))
}

fn coerce_f64(value: serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

// --- markets/history ---------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryEnvelope {
    #[serde(default)]
    pub history: Option<HistoryBody>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryBody {
    #[serde(default)]
    pub day: Option<OneOrMany<WireDailyBar>>,
}

#[derive(Debug, Deserialize)]
pub struct WireDailyBar {
    pub date: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
}

impl WireDailyBar {
    /// Rows whose date cannot be parsed are dropped: they cannot be ordered.
    pub fn into_domain(self) -> Option<DailyBar> {
        let format = format_description!("[year]-[month]-[day]");
        let date = Date::parse(self.date.trim(), &format).ok()?;
        Some(DailyBar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

// --- markets/timesales -------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TimesalesEnvelope {
    #[serde(default)]
    pub series: Option<TimesalesBody>,
}

#[derive(Debug, Deserialize)]
pub struct TimesalesBody {
    #[serde(default)]
    pub data: Option<OneOrMany<WireIntradayBar>>,
}

#[derive(Debug, Deserialize)]
pub struct WireIntradayBar {
    pub time: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
}

impl WireIntradayBar {
    pub fn into_domain(self) -> Option<IntradayBar> {
        let time = parse_bar_time(self.time.trim())?;
        Some(IntradayBar {
            time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// Timesales timestamps are usually naive local ("2026-02-20T09:35:00") but
/// occasionally carry an offset; both are accepted, the offset discarded.
fn parse_bar_time(value: &str) -> Option<PrimitiveDateTime> {
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(value, &naive) {
        return Some(parsed);
    }
    let offset = OffsetDateTime::parse(value, &Rfc3339).ok()?;
    Some(PrimitiveDateTime::new(offset.date(), offset.time()))
}

// --- markets/quotes ----------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QuotesEnvelope {
    #[serde(default)]
    pub quotes: Option<QuotesBody>,
}

#[derive(Debug, Deserialize)]
pub struct QuotesBody {
    #[serde(default)]
    pub quote: Option<OneOrMany<WireQuote>>,
}

#[derive(Debug, Deserialize)]
pub struct WireQuote {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bid: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ask: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub volume: Option<u64>,
    #[serde(default)]
    pub greeks: Option<WireGreeks>,
    /// Some payloads carry IV at the top level instead of inside greeks.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub iv: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireGreeks {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub iv: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub delta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gamma: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub theta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub vega: Option<f64>,
}

impl WireQuote {
    /// Quotes without a symbol echo cannot be keyed and are dropped.
    pub fn into_domain(self) -> Option<(String, Quote)> {
        let symbol = self.symbol?.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return None;
        }

        let greeks = match (self.greeks, self.iv) {
            (Some(g), _) => Some(Greeks {
                iv: g.iv.or(self.iv),
                delta: g.delta,
                gamma: g.gamma,
                theta: g.theta,
                vega: g.vega,
            }),
            (None, Some(iv)) => Some(Greeks {
                iv: Some(iv),
                ..Greeks::default()
            }),
            (None, None) => None,
        };

        let quote = Quote {
            symbol: symbol.clone(),
            bid: self.bid,
            ask: self.ask,
            last: self.last,
            close: self.close,
            volume: self.volume,
            greeks,
        };
        Some((symbol, quote))
    }
}

// --- markets/clock -----------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ClockEnvelope {
    #[serde(default)]
    pub clock: Option<ClockBody>,
}

#[derive(Debug, Deserialize)]
pub struct ClockBody {
    #[serde(default)]
    pub state: Option<String>,
}
