use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

use crate::Symbol;

/// One daily OHLCV bar.
///
/// Numeric fields are nullable: upstream values that fail numeric coercion
/// become `None` at the wire boundary instead of failing the whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: Date,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Ordered daily history for one underlying, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub symbol: Symbol,
    pub bars: Vec<DailyBar>,
}

impl DailySeries {
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            bars: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Close prices in series order, skipping bars without a usable close.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().filter_map(|bar| bar.close).collect()
    }

    pub fn last_bar(&self) -> Option<&DailyBar> {
        self.bars.last()
    }

    pub fn prior_bar(&self) -> Option<&DailyBar> {
        let len = self.bars.len();
        if len < 2 {
            return None;
        }
        self.bars.get(len - 2)
    }
}

/// One intraday time-and-sales bar inside the current session window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayBar {
    pub time: PrimitiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Ordered intraday series scoped to [session open, as-of time].
///
/// Empty when the market is closed or the upstream has no data; that state is
/// meaningful (VWAP becomes unavailable) and is never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradaySeries {
    pub symbol: Symbol,
    pub bars: Vec<IntradayBar>,
}

impl IntradaySeries {
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            bars: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.iter().rev().find_map(|bar| bar.close)
    }
}

/// Point-in-time quote for an equity or an option contract.
///
/// Superseded on each fetch; carries no history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
    pub greeks: Option<Greeks>,
}

impl Quote {
    /// Usable underlying spot for intrinsic-value fallback:
    /// last, then prior close, then bid, then ask.
    pub fn spot(&self) -> Option<f64> {
        self.last
            .or(self.close)
            .or(self.bid)
            .or(self.ask)
            .filter(|v| v.is_finite())
    }

    /// Implied volatility, preferring the greeks block over a flat field.
    pub fn implied_volatility(&self) -> Option<f64> {
        self.greeks.as_ref().and_then(|g| g.iv)
    }
}

/// Option greeks as reported by the upstream; all fields optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub iv: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

/// Market clock state. Absence of the clock endpoint is "state unknown",
/// represented as `Option<MarketState>::None` by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketState {
    Open,
    Closed,
    Premarket,
    Postmarket,
}

impl MarketState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Premarket => "premarket",
            Self::Postmarket => "postmarket",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "premarket" => Some(Self::Premarket),
            "postmarket" => Some(Self::Postmarket),
            _ => None,
        }
    }
}
