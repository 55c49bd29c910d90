//! Indicator math over ordered close-price series.
//!
//! Every function degrades to `None` (or per-index `None`s) when the series
//! is shorter than the indicator's required history. Nothing here panics or
//! lets a division by zero leak ±inf into output.
//!
//! RSI zero-average-loss convention: when the rolling average loss is zero
//! and the average gain is positive, RSI is pinned to 100; when gain and
//! loss are both zero (a flat window), RSI is 50.

use crate::domain::IntradayBar;

pub const RSI_PERIOD: usize = 14;
pub const SMA_TREND_PERIOD: usize = 100;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Simple moving average; `None` for indices before `period` observations.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(window_sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Exponential moving average with alpha = 2/(span+1), seeded by the first
/// observation (no look-ahead).
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];
    out.push(current);
    for value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// Relative strength index over rolling mean gain / rolling mean loss.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period + 1 {
        return out;
    }

    // Deltas exist from index 1; a full window of `period` deltas is first
    // available at value index `period`.
    let gains: Vec<f64> = values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect();
    let losses: Vec<f64> = values
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).max(0.0))
        .collect();

    let mut gain_sum: f64 = gains[..period].iter().sum();
    let mut loss_sum: f64 = losses[..period].iter().sum();

    for i in period..values.len() {
        if i > period {
            gain_sum += gains[i - 1] - gains[i - 1 - period];
            loss_sum += losses[i - 1] - losses[i - 1 - period];
        }

        let avg_gain = gain_sum / period as f64;
        let avg_loss = loss_sum / period as f64;

        let value = if avg_loss == 0.0 {
            if avg_gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        out[i] = Some(value);
    }

    out
}

/// MACD line, signal line, and histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn last_macd(&self) -> Option<f64> {
        self.macd.last().copied()
    }

    pub fn last_signal(&self) -> Option<f64> {
        self.signal.last().copied()
    }

    /// Whether the MACD line currently sits above its signal line.
    /// `None` when the series is empty.
    pub fn macd_over_signal(&self) -> Option<bool> {
        match (self.last_macd(), self.last_signal()) {
            (Some(m), Some(s)) => Some(m > s),
            _ => None,
        }
    }
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Session VWAP over intraday bars: cumulative typical-price x volume over
/// cumulative volume, typical price = (high + low + close) / 3.
///
/// Returns `None` for an empty series or zero cumulative volume; a closed
/// market is "unavailable", never 0.0 and never a stale carry-over.
pub fn session_vwap(bars: &[IntradayBar]) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut volume_sum = 0.0;

    for bar in bars {
        let (Some(high), Some(low), Some(close)) = (bar.high, bar.low, bar.close) else {
            continue;
        };
        let volume = bar.volume.unwrap_or(0.0);
        let typical = (high + low + close) / 3.0;
        weighted_sum += typical * volume;
        volume_sum += volume;
    }

    if volume_sum > 0.0 {
        Some(weighted_sum / volume_sum)
    } else {
        None
    }
}

/// Percentage gap between a session's open and the prior session's close.
pub fn gap_percent(today_open: Option<f64>, prior_close: Option<f64>) -> Option<f64> {
    let open = today_open?;
    let prior = prior_close?;
    if !(open.is_finite() && prior.is_finite()) || prior <= 0.0 {
        return None;
    }
    Some((open - prior) / prior * 100.0)
}
