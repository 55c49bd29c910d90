//! Run configuration: watched tickers, open option positions, session
//! window, and artifact destinations.
//!
//! Config is a JSON document loaded once at startup; every field has a
//! default so a minimal file only needs `tickers`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Time;

use crate::domain::{Interval, Symbol};
use crate::ValidationError;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 400;
pub const DEFAULT_SESSION_START: &str = "09:30";
/// US-Eastern regular session offset from UTC. A fixed offset, not a tz
/// database lookup; overridable in config around DST transitions.
pub const DEFAULT_SESSION_UTC_OFFSET_HOURS: i8 = -4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// One open option position to value in the P/L artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    /// Human-readable leg label, echoed into the artifact.
    pub label: String,
    /// OCC option symbol; validated at fetch time, not load time, so one
    /// bad identifier still produces an audited row instead of a dead run.
    pub occ: String,
    /// Per-share entry price.
    pub entry: f64,
    pub contracts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub tickers: Vec<Symbol>,
    pub open_options: Vec<OpenPosition>,

    /// Calendar days of daily history to request for trend indicators.
    pub daily_lookback_days: u32,
    /// Regular session open, HH:MM in exchange-local time.
    pub session_start: String,
    /// Optional session cutoff; defaults to "now" at run time.
    pub session_end: Option<String>,
    pub interval: Interval,
    /// Fixed exchange-local offset from UTC, in hours.
    pub session_utc_offset_hours: i8,

    pub overlay_csv: PathBuf,
    pub pl_csv: PathBuf,
    pub gap_csv: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            open_options: Vec::new(),
            daily_lookback_days: DEFAULT_LOOKBACK_DAYS,
            session_start: String::from(DEFAULT_SESSION_START),
            session_end: None,
            interval: Interval::FiveMinutes,
            session_utc_offset_hours: DEFAULT_SESSION_UTC_OFFSET_HOURS,
            overlay_csv: PathBuf::from("overlay_vwap_macd_rsi.csv"),
            pl_csv: PathBuf::from("option_pl.csv"),
            gap_csv: PathBuf::from("gapdown_above_100sma.csv"),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.session_start_time()?;
        if let Some(end) = &self.session_end {
            parse_clock_time(end)?;
        }
        for position in &self.open_options {
            if !position.entry.is_finite() {
                return Err(ValidationError::NonFiniteValue { field: "entry" });
            }
            if position.entry < 0.0 {
                return Err(ValidationError::NegativeValue { field: "entry" });
            }
            if position.contracts == 0 {
                return Err(ValidationError::NonPositiveContracts {
                    label: position.label.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn session_start_time(&self) -> Result<Time, ValidationError> {
        parse_clock_time(&self.session_start)
    }

    pub fn session_end_time(&self) -> Result<Option<Time>, ValidationError> {
        self.session_end.as_deref().map(parse_clock_time).transpose()
    }
}

/// Parse an "HH:MM" exchange-local clock time.
pub fn parse_clock_time(value: &str) -> Result<Time, ValidationError> {
    let invalid = || ValidationError::InvalidClockTime {
        value: value.to_owned(),
    };

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    Time::from_hms(hours, minutes, 0).map_err(|_| invalid())
}
