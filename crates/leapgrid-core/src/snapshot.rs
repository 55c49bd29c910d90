//! One full acquisition-and-compute pass: daily trend indicators, session
//! VWAP, gap screen, and option P/L for every configured position.
//!
//! The pass is salvage-oriented: any per-symbol failure becomes a warning
//! and the remaining symbols still produce rows. Only a missing credential
//! or an unwritable artifact destination fails the run as a whole.

use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, Duration, PrimitiveDateTime};

use crate::artifacts::{self, ArtifactError, GapRow, OptionPlRow, OverlayRow};
use crate::config::RunConfig;
use crate::domain::{MarketState, Quote, Symbol};
use crate::indicators::{
    gap_percent, macd, rsi, session_vwap, sma, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_PERIOD,
    SMA_TREND_PERIOD,
};
use crate::occ::OccSymbol;
use crate::tradier::{QuoteStatus, TradierClient};
use crate::valuation::{
    guidance, pl_dollars, pl_percent, resolve_mark, GuidanceInputs, MarkSource, PxVsVwap,
};
use crate::ValidationError;

/// Gap threshold, in percent, for admission to the gap-down screen.
const GAP_DOWN_THRESHOLD_PCT: f64 = -1.0;
const NOTE_UNVALUED: &str = "No quote and no spot; unable to value";

/// Session bounds in exchange-local time for one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

impl SessionWindow {
    /// Window for the trading day containing `as_of`: configured session
    /// open through the configured cutoff, or through `as_of` itself when
    /// no cutoff is set.
    pub fn for_day(config: &RunConfig, as_of: PrimitiveDateTime) -> Result<Self, ValidationError> {
        let start = PrimitiveDateTime::new(as_of.date(), config.session_start_time()?);
        let end = match config.session_end_time()? {
            Some(cutoff) => PrimitiveDateTime::new(as_of.date(), cutoff),
            None => as_of,
        };
        Ok(Self { start, end })
    }

    pub fn trading_day(&self) -> Date {
        self.end.date()
    }
}

/// Everything one pass produced, before any artifact hits disk.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub overlay: Vec<OverlayRow>,
    pub gap_screen: Vec<GapRow>,
    pub option_pl: Vec<OptionPlRow>,
    pub market_state: Option<MarketState>,
    pub warnings: Vec<String>,
}

/// Run one full snapshot pass against the upstream.
pub async fn run_snapshot(
    client: &TradierClient,
    config: &RunConfig,
    window: SessionWindow,
) -> SnapshotReport {
    let mut warnings = Vec::new();

    let market_state = client.market_clock().await;

    let equity_quotes = match client.equity_quotes(&config.tickers).await {
        Ok(quotes) => quotes,
        Err(error) => {
            warnings.push(format!("equity quotes unavailable: {error}"));
            BTreeMap::new()
        }
    };

    let (overlay, gap_screen) =
        build_overlay(client, config, window, &equity_quotes, &mut warnings).await;

    let option_pl = build_option_pl(client, config, &equity_quotes, &mut warnings).await;

    SnapshotReport {
        overlay,
        gap_screen,
        option_pl,
        market_state,
        warnings,
    }
}

/// Persist all three CSV artifacts at their configured destinations.
pub fn persist_artifacts(report: &SnapshotReport, config: &RunConfig) -> Result<(), ArtifactError> {
    artifacts::write_overlay(&config.overlay_csv, &report.overlay)?;
    artifacts::write_option_pl(&config.pl_csv, &report.option_pl)?;
    artifacts::write_gap_screen(&config.gap_csv, &report.gap_screen)?;
    Ok(())
}

async fn build_overlay(
    client: &TradierClient,
    config: &RunConfig,
    window: SessionWindow,
    equity_quotes: &BTreeMap<String, Quote>,
    warnings: &mut Vec<String>,
) -> (Vec<OverlayRow>, Vec<GapRow>) {
    let today = window.trading_day();
    let history_start = today - Duration::days(i64::from(config.daily_lookback_days));

    let mut overlay = Vec::new();
    let mut gap_screen = Vec::new();

    for symbol in &config.tickers {
        let daily = match client.daily_history(symbol, history_start, today).await {
            Ok(series) => series,
            Err(error) => {
                warnings.push(format!("daily history failed for {symbol}: {error}"));
                continue;
            }
        };
        if daily.len() < 2 {
            warnings.push(format!(
                "insufficient daily history for {symbol} ({} bars); skipping",
                daily.len()
            ));
            continue;
        }

        let closes = daily.closes();
        let sma100 = sma(&closes, SMA_TREND_PERIOD).last().copied().flatten();
        let rsi14 = rsi(&closes, RSI_PERIOD).last().copied().flatten();
        let macd_over_signal = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL).macd_over_signal();

        let intraday = match client
            .intraday_session(symbol, config.interval, window.start, window.end)
            .await
        {
            Ok(series) => series,
            Err(error) => {
                warnings.push(format!("intraday series failed for {symbol}: {error}"));
                crate::domain::IntradaySeries::empty(symbol.clone())
            }
        };

        let vwap = session_vwap(&intraday.bars);
        let last_px = intraday
            .last_close()
            .or_else(|| equity_quotes.get(symbol.as_str()).and_then(|q| q.last));

        let today_bar = daily.last_bar();
        let gap = gap_percent(
            today_bar.and_then(|bar| bar.open),
            daily.prior_bar().and_then(|bar| bar.close),
        );

        let px_vs_vwap = PxVsVwap::classify(last_px, vwap);
        let verdict = guidance(&GuidanceInputs {
            above_vwap: px_vs_vwap.above(),
            macd_over_signal,
            rsi: rsi14,
        });

        if let (Some(gap), Some(close), Some(sma100)) =
            (gap, today_bar.and_then(|bar| bar.close), sma100)
        {
            if gap <= GAP_DOWN_THRESHOLD_PCT && close > sma100 {
                gap_screen.push(GapRow {
                    ticker: symbol.as_str().to_owned(),
                    gap_percent: gap,
                    close,
                    sma100,
                });
            }
        }

        overlay.push(OverlayRow {
            ticker: symbol.as_str().to_owned(),
            rsi14,
            macd_over_signal,
            vwap,
            last_px,
            px_vs_vwap,
            sma100,
            gap_percent: gap,
            guidance: verdict,
        });
    }

    overlay.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    gap_screen.sort_by(|a, b| a.gap_percent.total_cmp(&b.gap_percent));
    (overlay, gap_screen)
}

async fn build_option_pl(
    client: &TradierClient,
    config: &RunConfig,
    equity_quotes: &BTreeMap<String, Quote>,
    warnings: &mut Vec<String>,
) -> Vec<OptionPlRow> {
    if config.open_options.is_empty() {
        return Vec::new();
    }

    let codes: Vec<String> = config
        .open_options
        .iter()
        .map(|p| p.occ.clone())
        .collect();
    let outcome = client.option_quotes(&codes).await;
    warnings.extend(outcome.warnings.iter().cloned());

    // Spot per underlying root, resolved once and shared across legs.
    let mut spot_cache: BTreeMap<String, (Option<f64>, QuoteStatus)> = BTreeMap::new();

    let mut rows = Vec::with_capacity(config.open_options.len());
    for position in &config.open_options {
        let occ = match OccSymbol::parse(&position.occ) {
            Ok(occ) => occ,
            Err(error) => {
                warnings.push(format!(
                    "invalid OCC symbol for position '{}': {error}",
                    position.label
                ));
                rows.push(invalid_row(position));
                continue;
            }
        };

        let code = occ.as_str().to_owned();
        let quote = outcome.quotes.get(&code);
        let quote_status = outcome
            .statuses
            .get(&code)
            .copied()
            .unwrap_or(QuoteStatus::NotFound);

        let root = occ.root().clone();
        let (spot, spot_status) = match spot_cache.get(root.as_str()) {
            Some(cached) => *cached,
            None => {
                let resolved = resolve_spot(client, equity_quotes, &root).await;
                spot_cache.insert(root.as_str().to_owned(), resolved);
                resolved
            }
        };

        let (mark, source) = resolve_mark(quote, occ.right(), occ.strike(), spot);
        let (pl_usd, pl_pct) = match mark {
            Some(mark) => (
                Some(pl_dollars(mark, position.entry, position.contracts)),
                pl_percent(mark, position.entry),
            ),
            None => (None, None),
        };

        rows.push(OptionPlRow {
            label: position.label.clone(),
            occ: code,
            bid: quote.and_then(|q| q.bid),
            ask: quote.and_then(|q| q.ask),
            last: quote.and_then(|q| q.last),
            mark,
            entry: position.entry,
            contracts: position.contracts,
            pl_dollars: pl_usd,
            pl_percent: pl_pct,
            iv: quote.and_then(Quote::implied_volatility),
            source,
            invalid_occ: false,
            quote_status,
            spot_status,
            spot,
            strike: Some(occ.strike()),
            right_label: Some(occ.right().label()),
            root: Some(root.as_str().to_owned()),
            expiry: Some(occ.expiry_iso()),
            note: if source == MarkSource::None {
                String::from(NOTE_UNVALUED)
            } else {
                String::new()
            },
        });
    }

    rows
}

/// Underlying spot for intrinsic fallback: reuse the batch equity quote when
/// the root is already watched, otherwise one extra quote call.
async fn resolve_spot(
    client: &TradierClient,
    equity_quotes: &BTreeMap<String, Quote>,
    root: &Symbol,
) -> (Option<f64>, QuoteStatus) {
    if let Some(quote) = equity_quotes.get(root.as_str()) {
        return (quote.spot(), QuoteStatus::Ok);
    }

    match client.equity_quotes(std::slice::from_ref(root)).await {
        Ok(quotes) => match quotes.get(root.as_str()) {
            Some(quote) => (quote.spot(), QuoteStatus::Ok),
            None => (None, QuoteStatus::NotFound),
        },
        Err(error) => (None, QuoteStatus::from_fetch_error(&error)),
    }
}

fn invalid_row(position: &crate::config::OpenPosition) -> OptionPlRow {
    OptionPlRow {
        label: position.label.clone(),
        occ: position.occ.clone(),
        bid: None,
        ask: None,
        last: None,
        mark: None,
        entry: position.entry,
        contracts: position.contracts,
        pl_dollars: None,
        pl_percent: None,
        iv: None,
        source: MarkSource::None,
        invalid_occ: true,
        quote_status: QuoteStatus::NotApplicable,
        spot_status: QuoteStatus::NotApplicable,
        spot: None,
        strike: None,
        right_label: None,
        root: None,
        expiry: None,
        note: String::from("unparseable OCC symbol"),
    }
}
