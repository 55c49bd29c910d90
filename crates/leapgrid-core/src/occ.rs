//! OCC/OSI option symbol codec.
//!
//! Codes look like `META260220C00700000`: a 1-6 letter root, a two-digit
//! year/month/day expiry, a call/put flag, and an 8-digit strike where the
//! first five digits are whole dollars and the last three are thousandths.
//!
//! The expiry year is decoded as `2000 + YY`. That fixed offset covers the
//! practical date range of listed options and is not extended with any
//! century-rollover heuristics.
//!
//! Decoding is pure and total: a code either parses completely or is
//! rejected with a typed error. There are no partial results.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{Symbol, ValidationError};

const DATE_DIGITS: usize = 6;
const STRIKE_DIGITS: usize = 8;
/// Date + right + strike after the variable-length root.
const SUFFIX_LEN: usize = DATE_DIGITS + 1 + STRIKE_DIGITS;
const MIN_ROOT_LEN: usize = 1;
const MAX_ROOT_LEN: usize = 6;

/// Call/put flag of an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    pub const fn as_char(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }

    /// Artifact spelling ("CALL"/"PUT").
    pub const fn label(self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }
}

/// A fully decoded OCC option identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccSymbol {
    code: String,
    root: Symbol,
    expiry: Date,
    right: OptionRight,
    strike: f64,
}

impl OccSymbol {
    /// Decode an OCC code, rejecting anything that deviates from the
    /// fixed-width pattern.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let code = input.trim().to_ascii_uppercase();
        let mismatch = || ValidationError::OccPatternMismatch {
            value: input.trim().to_owned(),
        };

        if !code.is_ascii() || code.len() < MIN_ROOT_LEN + SUFFIX_LEN {
            return Err(mismatch());
        }

        let root_len = code.len() - SUFFIX_LEN;
        if !(MIN_ROOT_LEN..=MAX_ROOT_LEN).contains(&root_len) {
            return Err(mismatch());
        }

        let (root_part, suffix) = code.split_at(root_len);
        if !root_part.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(mismatch());
        }

        let (date_part, rest) = suffix.split_at(DATE_DIGITS);
        let (right_part, strike_part) = rest.split_at(1);

        if !date_part.chars().all(|ch| ch.is_ascii_digit())
            || !strike_part.chars().all(|ch| ch.is_ascii_digit())
        {
            return Err(mismatch());
        }

        let right = match right_part {
            "C" => OptionRight::Call,
            "P" => OptionRight::Put,
            _ => return Err(mismatch()),
        };

        let expiry = decode_expiry(date_part).ok_or(ValidationError::OccInvalidDate {
            value: code.clone(),
        })?;

        // First five digits are whole dollars, last three are thousandths.
        let dollars: u32 = strike_part[..5].parse().map_err(|_| mismatch())?;
        let thousandths: u32 = strike_part[5..].parse().map_err(|_| mismatch())?;
        let strike = f64::from(dollars) + f64::from(thousandths) / 1000.0;

        let root = Symbol::parse(root_part)?;

        Ok(Self {
            code,
            root,
            expiry,
            right,
            strike,
        })
    }

    /// The canonical upstream code (uppercased input).
    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn root(&self) -> &Symbol {
        &self.root
    }

    pub fn expiry(&self) -> Date {
        self.expiry
    }

    /// Expiry formatted as `YYYY-MM-DD` for artifact output.
    pub fn expiry_iso(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.expiry.year(),
            u8::from(self.expiry.month()),
            self.expiry.day()
        )
    }

    pub fn right(&self) -> OptionRight {
        self.right
    }

    /// Strike price with up to three decimal places of precision.
    pub fn strike(&self) -> f64 {
        self.strike
    }
}

impl Display for OccSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_expiry(date_part: &str) -> Option<Date> {
    let yy: i32 = date_part[..2].parse().ok()?;
    let mm: u8 = date_part[2..4].parse().ok()?;
    let dd: u8 = date_part[4..6].parse().ok()?;

    let month = Month::try_from(mm).ok()?;
    Date::from_calendar_date(2000 + yy, month, dd).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn decodes_whole_dollar_strike() {
        let occ = OccSymbol::parse("META260220C00700000").expect("must parse");
        assert_eq!(occ.root().as_str(), "META");
        assert_eq!(occ.expiry(), date!(2026 - 02 - 20));
        assert_eq!(occ.expiry_iso(), "2026-02-20");
        assert_eq!(occ.right(), OptionRight::Call);
        assert_eq!(occ.strike(), 700.0);
        assert_eq!(occ.as_str(), "META260220C00700000");
    }

    #[test]
    fn decodes_small_strike_and_put() {
        let occ = OccSymbol::parse("MSTU260320P00005500").expect("must parse");
        assert_eq!(occ.root().as_str(), "MSTU");
        assert_eq!(occ.right(), OptionRight::Put);
        assert_eq!(occ.strike(), 5.5);
    }

    #[test]
    fn decodes_fractional_strike_to_three_places() {
        let occ = OccSymbol::parse("Q260116C00012125").expect("must parse");
        assert_eq!(occ.root().as_str(), "Q");
        assert!((occ.strike() - 12.125).abs() < 1e-9);
    }

    #[test]
    fn normalizes_lowercase_input() {
        let occ = OccSymbol::parse("meta260220c00700000").expect("must parse");
        assert_eq!(occ.as_str(), "META260220C00700000");
    }

    #[test]
    fn rejects_wrong_length() {
        for code in ["META260220C0070000", "", "C00700000", "TOOLONGROOT260220C00700000"] {
            assert!(
                matches!(
                    OccSymbol::parse(code),
                    Err(ValidationError::OccPatternMismatch { .. })
                ),
                "code {code:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_right_flag() {
        let err = OccSymbol::parse("META260220X00700000").expect_err("must fail");
        assert!(matches!(err, ValidationError::OccPatternMismatch { .. }));
    }

    #[test]
    fn rejects_non_digit_strike() {
        let err = OccSymbol::parse("META260220C0070000A").expect_err("must fail");
        assert!(matches!(err, ValidationError::OccPatternMismatch { .. }));
    }

    #[test]
    fn rejects_impossible_calendar_date() {
        let err = OccSymbol::parse("META261320C00700000").expect_err("must fail");
        assert!(matches!(err, ValidationError::OccInvalidDate { .. }));
    }

    #[test]
    fn round_trips_through_canonical_code() {
        let original = OccSymbol::parse("RKLB270115P00032500").expect("must parse");
        let reparsed = OccSymbol::parse(original.as_str()).expect("must reparse");
        assert_eq!(original, reparsed);
    }
}
