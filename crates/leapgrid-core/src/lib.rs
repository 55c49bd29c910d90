//! Core library for leapgrid: resilient market-data acquisition and
//! indicator computation over the Tradier REST API.
//!
//! The crate is organized around one snapshot pass:
//!
//! - [`tradier`] fetches daily history, intraday time-and-sales, and
//!   equity/option quotes over an injectable [`http_client::HttpClient`],
//!   with retry, backoff, and rate-limit adherence.
//! - [`indicators`] computes RSI, SMA, MACD, session VWAP, and gap
//!   percentages over the fetched series.
//! - [`occ`] decodes OCC option identifiers; [`valuation`] resolves option
//!   marks with a documented fallback chain and produces position P/L and
//!   per-underlying guidance.
//! - [`snapshot`] orchestrates a full pass and [`artifacts`] persists the
//!   resulting CSV artifacts atomically.
//!
//! Everything degrades per symbol: one bad ticker or option leg produces a
//! warning and an audited row, never a dead run.

pub mod artifacts;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod occ;
pub mod retry;
pub mod snapshot;
pub mod throttle;
pub mod tradier;
pub mod valuation;

pub use domain::Symbol;
pub use error::{CoreError, ValidationError};
pub use occ::{OccSymbol, OptionRight};
