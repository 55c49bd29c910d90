//! CSV artifact schemas and atomic persistence.
//!
//! Artifacts are replaced atomically: rows are written to a temp file in the
//! destination directory and renamed over the target, so a crash mid-run
//! never leaves a truncated file where yesterday's good one was.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tradier::QuoteStatus;
use crate::valuation::{Guidance, MarkSource, PxVsVwap};

/// Column order for the per-underlying indicator overlay.
pub const OVERLAY_COLUMNS: [&str; 9] = [
    "Ticker",
    "RSI14",
    "MACD>Signal",
    "VWAP",
    "LastPx",
    "Px_vs_VWAP",
    "SMA100",
    "Gap%",
    "Guidance",
];

/// Column order for the option position P/L sheet, including the audit
/// columns naming how each mark and spot were resolved.
pub const OPTION_PL_COLUMNS: [&str; 20] = [
    "Contract",
    "OCC",
    "Bid",
    "Ask",
    "Last",
    "MidUsed",
    "Entry",
    "Contracts",
    "P/L($)",
    "P/L(%)",
    "IV",
    "source",
    "quote_status",
    "spot_status",
    "spot",
    "strike",
    "type",
    "root",
    "expiry",
    "note",
];

/// Column order for the gap-down-above-trend screen.
pub const GAP_COLUMNS: [&str; 4] = ["Ticker", "Gap%", "Close", "SMA100"];

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to atomically replace artifact {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// One overlay row; unavailable indicators serialize as empty cells.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OverlayRow {
    pub ticker: String,
    pub rsi14: Option<f64>,
    pub macd_over_signal: Option<bool>,
    pub vwap: Option<f64>,
    pub last_px: Option<f64>,
    pub px_vs_vwap: PxVsVwap,
    pub sma100: Option<f64>,
    pub gap_percent: Option<f64>,
    pub guidance: Guidance,
}

impl OverlayRow {
    fn record(&self) -> Vec<String> {
        vec![
            self.ticker.clone(),
            fmt_opt(self.rsi14, 2),
            fmt_bool(self.macd_over_signal),
            fmt_opt(self.vwap, 4),
            fmt_opt(self.last_px, 4),
            self.px_vs_vwap.as_str().to_owned(),
            fmt_opt(self.sma100, 4),
            fmt_opt(self.gap_percent, 2),
            self.guidance.as_str().to_owned(),
        ]
    }
}

/// One option P/L row. Rows are emitted for every configured position, even
/// when nothing could be valued; the audit columns say why.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OptionPlRow {
    pub label: String,
    pub occ: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub mark: Option<f64>,
    pub entry: f64,
    pub contracts: u32,
    pub pl_dollars: Option<f64>,
    pub pl_percent: Option<f64>,
    pub iv: Option<f64>,
    pub source: MarkSource,
    /// Overrides `source` in the artifact when the identifier never parsed.
    pub invalid_occ: bool,
    pub quote_status: QuoteStatus,
    pub spot_status: QuoteStatus,
    pub spot: Option<f64>,
    pub strike: Option<f64>,
    pub right_label: Option<&'static str>,
    pub root: Option<String>,
    pub expiry: Option<String>,
    pub note: String,
}

impl OptionPlRow {
    fn source_label(&self) -> &'static str {
        if self.invalid_occ {
            "invalid_occ"
        } else {
            self.source.as_str()
        }
    }

    fn record(&self) -> Vec<String> {
        vec![
            self.label.clone(),
            self.occ.clone(),
            fmt_opt(self.bid, 2),
            fmt_opt(self.ask, 2),
            fmt_opt(self.last, 2),
            fmt_opt(self.mark, 2),
            format!("{:.2}", self.entry),
            self.contracts.to_string(),
            fmt_opt(self.pl_dollars, 2),
            fmt_opt(self.pl_percent, 2),
            fmt_opt(self.iv, 4),
            self.source_label().to_owned(),
            self.quote_status.as_str().to_owned(),
            self.spot_status.as_str().to_owned(),
            fmt_opt(self.spot, 4),
            fmt_opt(self.strike, 3),
            self.right_label.unwrap_or("").to_owned(),
            self.root.clone().unwrap_or_default(),
            self.expiry.clone().unwrap_or_default(),
            self.note.clone(),
        ]
    }
}

/// One row of the gap screen; every numeric input is known by construction,
/// since the screen only admits symbols with complete trend data.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GapRow {
    pub ticker: String,
    pub gap_percent: f64,
    pub close: f64,
    pub sma100: f64,
}

impl GapRow {
    fn record(&self) -> Vec<String> {
        vec![
            self.ticker.clone(),
            format!("{:.2}", self.gap_percent),
            format!("{:.4}", self.close),
            format!("{:.4}", self.sma100),
        ]
    }
}

pub fn write_overlay(path: &Path, rows: &[OverlayRow]) -> Result<(), ArtifactError> {
    let records: Vec<_> = rows.iter().map(OverlayRow::record).collect();
    write_csv(path, &OVERLAY_COLUMNS, &records)
}

pub fn write_option_pl(path: &Path, rows: &[OptionPlRow]) -> Result<(), ArtifactError> {
    let records: Vec<_> = rows.iter().map(OptionPlRow::record).collect();
    write_csv(path, &OPTION_PL_COLUMNS, &records)
}

pub fn write_gap_screen(path: &Path, rows: &[GapRow]) -> Result<(), ArtifactError> {
    let records: Vec<_> = rows.iter().map(GapRow::record).collect();
    write_csv(path, &GAP_COLUMNS, &records)
}

/// Render and atomically persist one CSV artifact. A header-only file is
/// written when there are no rows.
fn write_csv(path: &Path, columns: &[&str], records: &[Vec<String>]) -> Result<(), ArtifactError> {
    let mut body = String::new();
    push_record(&mut body, columns.iter().map(|c| (*c).to_owned()));
    for record in records {
        push_record(&mut body, record.iter().cloned());
    }

    let io_err = |source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(body.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|source| ArtifactError::Persist {
        path: path.to_owned(),
        source,
    })?;
    Ok(())
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_field(&field));
    }
    out.push('\n');
}

/// RFC 4180 quoting: a field containing a comma, quote, or newline is
/// wrapped in quotes with embedded quotes doubled.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        let mut quoted = String::with_capacity(field.len() + 2);
        quoted.push('"');
        for ch in field.chars() {
            if ch == '"' {
                quoted.push('"');
            }
            quoted.push(ch);
        }
        quoted.push('"');
        quoted
    } else {
        field.to_owned()
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => String::new(),
    }
}

fn fmt_bool(value: Option<bool>) -> String {
    match value {
        Some(true) => String::from("true"),
        Some(false) => String::from("false"),
        None => String::new(),
    }
}

/// Minimal quoted-CSV reader, used by tests to check what was persisted.
pub fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_owned(),
        source,
    })?;

    let mut rows = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => record.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut record));
                }
                other => field.push(other),
            }
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        rows.push(record);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay_row() -> OverlayRow {
        OverlayRow {
            ticker: String::from("QQQ"),
            rsi14: Some(61.27),
            macd_over_signal: Some(true),
            vwap: Some(512.3456),
            last_px: Some(513.01),
            px_vs_vwap: PxVsVwap::Above,
            sma100: Some(498.7),
            gap_percent: Some(-1.25),
            guidance: Guidance::Hold,
        }
    }

    #[test]
    fn overlay_record_formats_and_blanks_missing_cells() {
        let mut row = overlay_row();
        row.rsi14 = None;
        row.macd_over_signal = None;

        let record = row.record();
        assert_eq!(record[0], "QQQ");
        assert_eq!(record[1], "");
        assert_eq!(record[2], "");
        assert_eq!(record[3], "512.3456");
        assert_eq!(record[7], "-1.25");
        assert_eq!(record[8], "HOLD");
    }

    #[test]
    fn non_finite_values_serialize_as_empty() {
        assert_eq!(fmt_opt(Some(f64::NAN), 2), "");
        assert_eq!(fmt_opt(Some(f64::INFINITY), 4), "");
        assert_eq!(fmt_opt(Some(1.005), 2), "1.00");
    }

    #[test]
    fn fields_with_commas_and_quotes_are_escaped() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn invalid_occ_overrides_mark_source_label() {
        let row = OptionPlRow {
            label: String::from("bad leg"),
            occ: String::from("NOTANOCC"),
            bid: None,
            ask: None,
            last: None,
            mark: None,
            entry: 1.50,
            contracts: 2,
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
        };
        let record = row.record();
        assert_eq!(record.len(), OPTION_PL_COLUMNS.len());
        assert_eq!(record[11], "invalid_occ");
        assert_eq!(record[12], "n/a");
        assert_eq!(record[13], "n/a");
    }

    #[test]
    fn written_artifact_round_trips_through_reader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("overlay.csv");

        let mut row = overlay_row();
        row.ticker = String::from("BRK.B");
        write_overlay(&path, &[row]).expect("write succeeds");

        let rows = read_csv(&path).expect("read back");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], OVERLAY_COLUMNS.map(str::to_owned).to_vec());
        assert_eq!(rows[1][0], "BRK.B");
    }

    #[test]
    fn replace_keeps_old_artifact_until_new_one_lands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gap.csv");

        write_gap_screen(&path, &[]).expect("header-only write");
        let first = fs::read_to_string(&path).expect("readable");
        assert_eq!(first, "Ticker,Gap%,Close,SMA100\n");

        let row = GapRow {
            ticker: String::from("IWM"),
            gap_percent: -1.42,
            close: 219.55,
            sma100: 214.02,
        };
        write_gap_screen(&path, &[row]).expect("replace");
        let rows = read_csv(&path).expect("read back");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["IWM", "-1.42", "219.5500", "214.0200"]);

        // No stray temp files left behind in the artifact directory.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("listable")
            .filter_map(Result::ok)
            .filter(|e| e.path() != path)
            .collect();
        assert!(leftovers.is_empty());
    }
}
