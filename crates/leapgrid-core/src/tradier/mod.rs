//! Typed fetchers over the Tradier market-data endpoints.
//!
//! Each fetcher normalizes the upstream JSON into domain frames and
//! tolerates absence: an empty payload is an empty series, not an error.
//! Partial failure is salvaged wherever the endpoint allows it.

mod client;
mod wire;

use std::collections::BTreeMap;

use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::domain::{
    DailySeries, IntradaySeries, Interval, MarketState, Quote, SessionFilter, Symbol,
};
use crate::occ::OccSymbol;
use crate::ValidationError;

pub use client::{FetchError, TradierClient, DEFAULT_BASE_URL};
pub use wire::OneOrMany;

/// Per-symbol quote availability, audited into the option P/L artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Ok,
    NotFound,
    Error,
    /// No upstream call was applicable (e.g. the identifier never validated).
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl QuoteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::Error => "error",
            Self::NotApplicable => "n/a",
        }
    }

    pub const fn from_fetch_error(error: &FetchError) -> Self {
        match error {
            FetchError::NotFound { .. } => Self::NotFound,
            _ => Self::Error,
        }
    }
}

/// Result of a batched option-quote fetch with per-symbol salvage.
#[derive(Debug, Default)]
pub struct OptionQuoteOutcome {
    /// Successfully resolved quotes, keyed by OCC code.
    pub quotes: BTreeMap<String, Quote>,
    /// Availability per valid requested code.
    pub statuses: BTreeMap<String, QuoteStatus>,
    /// Codes rejected before any upstream call.
    pub rejected: Vec<(String, ValidationError)>,
    pub warnings: Vec<String>,
}

impl TradierClient {
    /// Daily OHLCV history for one underlying over a date range, oldest first.
    ///
    /// An empty upstream payload yields an empty series.
    pub async fn daily_history(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
    ) -> Result<DailySeries, FetchError> {
        let query = [
            ("symbol", symbol.as_str().to_owned()),
            ("interval", String::from("daily")),
            ("start", format_date(start)),
            ("end", format_date(end)),
        ];
        let value = self.get_json("/markets/history", &query).await?;
        let envelope: wire::HistoryEnvelope = serde_json::from_value(value)
            .map_err(|e| FetchError::Malformed(format!("history: {e}")))?;

        let mut bars: Vec<_> = envelope
            .history
            .and_then(|h| h.day)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter_map(wire::WireDailyBar::into_domain)
            .collect();
        bars.sort_by_key(|bar| bar.date);

        Ok(DailySeries {
            symbol: symbol.clone(),
            bars,
        })
    }

    /// Intraday time-and-sales for one underlying within a session window.
    pub async fn timesales(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
        filter: SessionFilter,
    ) -> Result<IntradaySeries, FetchError> {
        let query = [
            ("symbol", symbol.as_str().to_owned()),
            ("interval", interval.as_str().to_owned()),
            ("start", format_minute(start)),
            ("end", format_minute(end)),
            ("session_filter", filter.as_str().to_owned()),
        ];
        let value = self.get_json("/markets/timesales", &query).await?;
        let envelope: wire::TimesalesEnvelope = serde_json::from_value(value)
            .map_err(|e| FetchError::Malformed(format!("timesales: {e}")))?;

        let mut bars: Vec<_> = envelope
            .series
            .and_then(|s| s.data)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter_map(wire::WireIntradayBar::into_domain)
            .collect();
        bars.sort_by_key(|bar| bar.time);

        Ok(IntradaySeries {
            symbol: symbol.clone(),
            bars,
        })
    }

    /// Session-scoped intraday series with the documented filter fallback:
    /// the strict regular-session filter first, and on an empty result one
    /// retry under the looser all-sessions filter.
    pub async fn intraday_session(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<IntradaySeries, FetchError> {
        let strict = self
            .timesales(symbol, interval, start, end, SessionFilter::Open)
            .await?;
        if !strict.is_empty() {
            return Ok(strict);
        }
        self.timesales(symbol, interval, start, end, SessionFilter::All)
            .await
    }

    /// Batched equity quotes, keyed by upstream symbol echo.
    ///
    /// A single-quote response is normalized to a one-element mapping before
    /// any downstream code sees it, regardless of how many symbols were asked.
    pub async fn equity_quotes(
        &self,
        symbols: &[Symbol],
    ) -> Result<BTreeMap<String, Quote>, FetchError> {
        if symbols.is_empty() {
            return Ok(BTreeMap::new());
        }

        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let value = self
            .get_json("/markets/quotes", &[("symbols", joined)])
            .await?;
        parse_quote_map(value)
    }

    /// Batched option quotes with per-symbol salvage.
    ///
    /// Invalid OCC codes are rejected before any upstream call. After the
    /// batch attempt, every still-unresolved code gets one individual call;
    /// a single bad symbol never discards quotes for the others.
    pub async fn option_quotes(&self, codes: &[String]) -> OptionQuoteOutcome {
        let mut outcome = OptionQuoteOutcome::default();

        let mut valid: Vec<String> = Vec::new();
        for code in codes {
            match OccSymbol::parse(code) {
                Ok(occ) => valid.push(occ.as_str().to_owned()),
                Err(error) => outcome.rejected.push((code.clone(), error)),
            }
        }
        if valid.is_empty() {
            return outcome;
        }

        match self
            .get_json(
                "/markets/quotes",
                &[
                    ("symbols", valid.join(",")),
                    ("greeks", String::from("true")),
                ],
            )
            .await
            .and_then(parse_quote_map)
        {
            Ok(batch) => {
                for code in &valid {
                    if let Some(quote) = batch.get(code) {
                        outcome.quotes.insert(code.clone(), quote.clone());
                        outcome.statuses.insert(code.clone(), QuoteStatus::Ok);
                    }
                }
            }
            Err(error) => {
                outcome.warnings.push(format!(
                    "batch option quotes failed ({error}); falling back per symbol"
                ));
            }
        }

        for code in &valid {
            if outcome.quotes.contains_key(code) {
                continue;
            }
            match self
                .get_json(
                    "/markets/quotes",
                    &[("symbols", code.clone()), ("greeks", String::from("true"))],
                )
                .await
                .and_then(parse_quote_map)
            {
                Ok(map) => match map.get(code) {
                    Some(quote) => {
                        outcome.quotes.insert(code.clone(), quote.clone());
                        outcome.statuses.insert(code.clone(), QuoteStatus::Ok);
                    }
                    None => {
                        outcome.statuses.insert(code.clone(), QuoteStatus::NotFound);
                        outcome
                            .warnings
                            .push(format!("no quote returned for option symbol {code}"));
                    }
                },
                Err(error) => {
                    outcome
                        .statuses
                        .insert(code.clone(), QuoteStatus::from_fetch_error(&error));
                    outcome
                        .warnings
                        .push(format!("option quote failed for {code}: {error}"));
                }
            }
        }

        outcome
    }

    /// Market clock state; any failure is "state unknown", never an error.
    pub async fn market_clock(&self) -> Option<MarketState> {
        let value = self.get_json("/markets/clock", &[]).await.ok()?;
        let envelope: wire::ClockEnvelope = serde_json::from_value(value).ok()?;
        envelope
            .clock
            .and_then(|c| c.state)
            .as_deref()
            .and_then(MarketState::parse)
    }
}

fn parse_quote_map(value: serde_json::Value) -> Result<BTreeMap<String, Quote>, FetchError> {
    let envelope: wire::QuotesEnvelope =
        serde_json::from_value(value).map_err(|e| FetchError::Malformed(format!("quotes: {e}")))?;

    Ok(envelope
        .quotes
        .and_then(|b| b.quote)
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(wire::WireQuote::into_domain)
        .collect())
}

fn format_date(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(&format)
        .expect("calendar dates are always formattable")
}

fn format_minute(datetime: PrimitiveDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    datetime
        .format(&format)
        .expect("datetimes are always formattable")
}
