//! Option mark resolution, position P/L, and per-underlying guidance.

use serde::{Deserialize, Serialize};

use crate::domain::Quote;
use crate::occ::OptionRight;

/// Standard US equity option multiplier.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Where a resolved mark price came from, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkSource {
    /// Quoted mid: both bid and ask strictly positive.
    Mid,
    /// Last traded price.
    Last,
    /// Intrinsic value against the underlying spot.
    Intrinsic,
    /// Nothing resolvable; the row is still emitted with a note.
    None,
}

impl MarkSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mid => "mid",
            Self::Last => "last",
            Self::Intrinsic => "intrinsic",
            Self::None => "none",
        }
    }
}

/// Resolve a usable mark price for an option position.
///
/// Fallback chain, first satisfied wins:
/// 1. quoted mid when bid > 0 and ask > 0
/// 2. last traded price when present and >= 0
/// 3. intrinsic value against the underlying spot, when spot is available
/// 4. nothing: `(None, MarkSource::None)`
pub fn resolve_mark(
    quote: Option<&Quote>,
    right: OptionRight,
    strike: f64,
    spot: Option<f64>,
) -> (Option<f64>, MarkSource) {
    if let Some(quote) = quote {
        if let (Some(bid), Some(ask)) = (quote.bid, quote.ask) {
            if bid > 0.0 && ask > 0.0 {
                return (Some((bid + ask) / 2.0), MarkSource::Mid);
            }
        }
        if let Some(last) = quote.last {
            if last >= 0.0 && last.is_finite() {
                return (Some(last), MarkSource::Last);
            }
        }
    }

    if let Some(spot) = spot {
        let intrinsic = match right {
            OptionRight::Call => (spot - strike).max(0.0),
            OptionRight::Put => (strike - spot).max(0.0),
        };
        return (Some(intrinsic), MarkSource::Intrinsic);
    }

    (None, MarkSource::None)
}

/// Dollar P/L for a position at the given mark.
pub fn pl_dollars(mark: f64, entry: f64, contracts: u32) -> f64 {
    (mark - entry) * CONTRACT_MULTIPLIER * f64::from(contracts)
}

/// Percent P/L; undefined when the entry price is zero.
pub fn pl_percent(mark: f64, entry: f64) -> Option<f64> {
    if entry == 0.0 {
        return None;
    }
    Some((mark / entry - 1.0) * 100.0)
}

/// Discrete per-underlying guidance label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Guidance {
    Hold,
    Trim,
    Exit,
}

impl Guidance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hold => "HOLD",
            Self::Trim => "TRIM",
            Self::Exit => "EXIT",
        }
    }
}

/// Indicator state feeding the guidance rule. Any unavailable input resolves
/// its condition to false rather than raising.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GuidanceInputs {
    /// Last price strictly above session VWAP; `None` when either side is unknown.
    pub above_vwap: Option<bool>,
    /// MACD line strictly above signal line; `None` when the series is empty.
    pub macd_over_signal: Option<bool>,
    pub rsi: Option<f64>,
}

/// Fixed-precedence guidance rule: EXIT beats TRIM beats HOLD.
pub fn guidance(inputs: &GuidanceInputs) -> Guidance {
    let below_vwap = inputs.above_vwap == Some(false);
    let macd_le_signal = inputs.macd_over_signal == Some(false);
    let rsi_below_45 = inputs.rsi.is_some_and(|r| r < 45.0);
    let rsi_above_70 = inputs.rsi.is_some_and(|r| r > 70.0);

    if below_vwap && macd_le_signal && rsi_below_45 {
        return Guidance::Exit;
    }
    if below_vwap || (rsi_above_70 && macd_le_signal) {
        return Guidance::Trim;
    }
    Guidance::Hold
}

/// Last-price position relative to session VWAP for the overlay artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PxVsVwap {
    Above,
    Below,
    Unknown,
}

impl PxVsVwap {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Above => "Above",
            Self::Below => "Below",
            Self::Unknown => "Unknown",
        }
    }

    /// `Above` requires last price strictly greater than VWAP.
    pub fn classify(last_px: Option<f64>, vwap: Option<f64>) -> Self {
        match (last_px, vwap) {
            (Some(last), Some(vwap)) if last.is_finite() && vwap.is_finite() => {
                if last > vwap {
                    Self::Above
                } else {
                    Self::Below
                }
            }
            _ => Self::Unknown,
        }
    }

    pub fn above(self) -> Option<bool> {
        match self {
            Self::Above => Some(true),
            Self::Below => Some(false),
            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: Option<f64>, ask: Option<f64>, last: Option<f64>) -> Quote {
        Quote {
            symbol: String::from("META260220C00700000"),
            bid,
            ask,
            last,
            ..Quote::default()
        }
    }

    #[test]
    fn mid_wins_over_present_last() {
        let q = quote(Some(10.0), Some(12.0), Some(5.0));
        let (mark, source) = resolve_mark(Some(&q), OptionRight::Call, 700.0, Some(710.0));
        assert_eq!(mark, Some(11.0));
        assert_eq!(source, MarkSource::Mid);
    }

    #[test]
    fn zero_sided_book_falls_back_to_last() {
        let q = quote(Some(0.0), Some(0.0), Some(7.0));
        let (mark, source) = resolve_mark(Some(&q), OptionRight::Call, 700.0, Some(710.0));
        assert_eq!(mark, Some(7.0));
        assert_eq!(source, MarkSource::Last);
    }

    #[test]
    fn missing_quote_falls_back_to_intrinsic() {
        let (mark, source) = resolve_mark(None, OptionRight::Call, 100.0, Some(105.0));
        assert_eq!(mark, Some(5.0));
        assert_eq!(source, MarkSource::Intrinsic);

        let (mark, source) = resolve_mark(None, OptionRight::Put, 100.0, Some(105.0));
        assert_eq!(mark, Some(0.0));
        assert_eq!(source, MarkSource::Intrinsic);
    }

    #[test]
    fn nothing_resolvable_yields_none_source() {
        let (mark, source) = resolve_mark(None, OptionRight::Call, 100.0, None);
        assert_eq!(mark, None);
        assert_eq!(source, MarkSource::None);
    }

    #[test]
    fn pl_uses_contract_multiplier() {
        let pl = pl_dollars(2.86, 1.86, 20);
        assert!((pl - 2_000.0).abs() < 1e-9);

        let pct = pl_percent(2.86, 1.86).expect("entry is non-zero");
        assert!((pct - 53.763).abs() < 0.01);

        assert_eq!(pl_percent(2.86, 0.0), None);
    }

    #[test]
    fn exit_takes_precedence_over_trim() {
        // RSI 40 is below 45; below VWAP and MACD <= signal: must be EXIT
        // even though "below VWAP" alone would trigger TRIM.
        let inputs = GuidanceInputs {
            above_vwap: Some(false),
            macd_over_signal: Some(false),
            rsi: Some(40.0),
        };
        assert_eq!(guidance(&inputs), Guidance::Exit);
    }

    #[test]
    fn below_vwap_alone_trims() {
        let inputs = GuidanceInputs {
            above_vwap: Some(false),
            macd_over_signal: Some(true),
            rsi: Some(55.0),
        };
        assert_eq!(guidance(&inputs), Guidance::Trim);
    }

    #[test]
    fn overbought_with_weak_macd_trims() {
        let inputs = GuidanceInputs {
            above_vwap: Some(true),
            macd_over_signal: Some(false),
            rsi: Some(75.0),
        };
        assert_eq!(guidance(&inputs), Guidance::Trim);
    }

    #[test]
    fn unavailable_inputs_resolve_to_hold() {
        assert_eq!(guidance(&GuidanceInputs::default()), Guidance::Hold);

        // RSI alone below 45 is not enough without the VWAP/MACD legs.
        let inputs = GuidanceInputs {
            above_vwap: None,
            macd_over_signal: None,
            rsi: Some(20.0),
        };
        assert_eq!(guidance(&inputs), Guidance::Hold);
    }

    #[test]
    fn px_vs_vwap_classification() {
        assert_eq!(
            PxVsVwap::classify(Some(101.0), Some(100.0)),
            PxVsVwap::Above
        );
        assert_eq!(
            PxVsVwap::classify(Some(99.0), Some(100.0)),
            PxVsVwap::Below
        );
        // Tie counts as not-above.
        assert_eq!(
            PxVsVwap::classify(Some(100.0), Some(100.0)),
            PxVsVwap::Below
        );
        assert_eq!(PxVsVwap::classify(None, Some(100.0)), PxVsVwap::Unknown);
        assert_eq!(PxVsVwap::classify(Some(100.0), None), PxVsVwap::Unknown);
    }
}
