//! Canonical domain types for leapgrid market data.
//!
//! All models are constructed at the wire boundary by the fetchers; numeric
//! fields that fail coercion arrive as `None`, never as an error or a NaN.

mod interval;
mod models;
mod symbol;

pub use interval::{Interval, SessionFilter};
pub use models::{
    DailyBar, DailySeries, Greeks, IntradayBar, IntradaySeries, MarketState, Quote,
};
pub use symbol::Symbol;
