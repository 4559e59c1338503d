#![recursion_limit = "1024"]
use std::path;

use chrono::NaiveDateTime;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::*;

pub mod args;

pub mod errors {
    error_chain::error_chain! {}
}

pub const TRADES_LIST_FILE: &str = "TradesList.txt";
pub const TRADES_CSV_FILE: &str = "trades.csv";

// Markers the platform appends to flag position boundaries.
static MARKER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(BP|EP|F)$").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static F_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*F$").unwrap());
static SYMBOL_ACCOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\(]+?)(?:\s*\(([^)]+)\))?$").unwrap());

pub struct TradesList<'a> {
    pub path: &'a path::Path,
}

/// One line of the trades list, keyed by the header row. Columns the
/// export leaves out come through as empty strings.
#[derive(Debug, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Symbol", default)]
    pub symbol: String,
    #[serde(rename = "Entry DateTime", default)]
    pub entry_datetime: String,
    #[serde(rename = "Exit DateTime", default)]
    pub exit_datetime: String,
    #[serde(rename = "Trade Type", default)]
    pub trade_type: String,
    #[serde(rename = "Trade Quantity", default)]
    pub quantity: String,
    #[serde(rename = "Entry Price", default)]
    pub entry_price: String,
    #[serde(rename = "Exit Price", default)]
    pub exit_price: String,
    #[serde(rename = "Duration", default)]
    pub duration: String,
    #[serde(rename = "FlatToFlat Profit/Loss (C)", default)]
    pub ftf_profit_loss: String,
    #[serde(rename = "Profit/Loss (C)", default)]
    pub profit_loss: String,
    #[serde(rename = "Cumulative Profit/Loss (C)", default)]
    pub cumulative_pl: String,
    #[serde(rename = "Max Open Loss (C)", default)]
    pub max_open_loss: String,
    #[serde(rename = "Max Open Profit (C)", default)]
    pub max_open_profit: String,
    #[serde(rename = "Commission (C)", default)]
    pub commission: String,
    #[serde(rename = "Note", default)]
    pub note: String,
    #[serde(rename = "Exit Efficiency", default)]
    pub exit_efficiency: String,
    #[serde(rename = "Entry Efficiency", default)]
    pub entry_efficiency: String,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Long,
    Short,
}

impl PositionType {
    pub fn from(trade_type: &str) -> PositionType {
        if trade_type.trim().eq_ignore_ascii_case("long") {
            PositionType::Long
        } else {
            PositionType::Short
        }
    }
}

/// A flat-to-flat position close. Field order is the output column order.
#[derive(Debug, Serialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub account: String,
    pub quantity: String,
    pub position_type: PositionType,
    pub entry_price: String,
    pub exit_price: String,
    pub open_date: String,
    pub open_time: String,
    pub close_date: String,
    pub close_time: String,
    pub duration: String,
    pub profit_loss: String,
    pub cumulative_pl: String,
    pub max_open_loss: String,
    pub max_open_profit: String,
    pub commission: String,
    pub note: String,
    pub exit_efficiency: String,
    pub entry_efficiency: String,
}

/// A single fill, kept even when it doesn't close a position.
#[derive(Debug, Serialize)]
pub struct FillRecord {
    pub symbol: String,
    pub account: String,
    pub quantity: String,
    pub position_type: PositionType,
    pub entry_price: String,
    pub exit_price: String,
    pub open_date: String,
    pub open_time: String,
    pub close_date: String,
    pub close_time: String,
    pub duration: String,
    pub profit_loss: String,
    pub ftf_profit_loss: String,
    pub cumulative_pl: String,
    pub max_open_loss: String,
    pub max_open_profit: String,
    pub commission: String,
    pub note: String,
    pub exit_efficiency: String,
    pub entry_efficiency: String,
    pub is_position_close: String,
}

/// Splits a raw datetime cell like `2025-12-03  09:39:34.000 BP` into
/// (`2025-12-03`, `09:39:34`). A cell that doesn't parse as a datetime
/// comes back cleaned in the date slot with an empty time.
pub fn parse_datetime(raw: &str) -> (String, String) {
    let stripped = MARKER_SUFFIX.replace(raw.trim(), "");
    let clean = WHITESPACE.replace_all(&stripped, " ");

    let parsed = NaiveDateTime::parse_from_str(&clean, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&clean, "%Y-%m-%d %H:%M:%S"));

    match parsed {
        Ok(dt) => (
            dt.format("%Y-%m-%d").to_string(),
            dt.format("%H:%M:%S").to_string(),
        ),
        Err(_) => (clean.into_owned(), String::new()),
    }
}

/// True iff the row closes a flat-to-flat position: the platform marks
/// those with an `F` suffix on the flat-to-flat profit/loss or an `EP`
/// marker in the exit datetime.
pub fn is_position_close(row: &RawRow) -> bool {
    row.ftf_profit_loss.trim().ends_with('F') || row.exit_datetime.contains("EP")
}

/// Removes the trailing `F` marker from a numeric cell. The value itself
/// stays opaque text.
pub fn clean_numeric(value: &str) -> String {
    F_SUFFIX.replace(value.trim(), "").into_owned()
}

/// Splits `MESZ5.CME (LFE050-3T7H2I3H-TEST001)` into base symbol and
/// account; the account is empty when no parenthesized group is present.
pub fn split_symbol(symbol: &str) -> (String, String) {
    let trimmed = symbol.trim();
    match SYMBOL_ACCOUNT.captures(trimmed) {
        Some(caps) => (
            caps.get(1).map_or("", |m| m.as_str()).trim().to_owned(),
            caps.get(2).map_or("", |m| m.as_str()).trim().to_owned(),
        ),
        None => (trimmed.to_owned(), String::new()),
    }
}

impl PositionRecord {
    fn from(row: &RawRow) -> PositionRecord {
        let (symbol, account) = split_symbol(&row.symbol);
        let (open_date, open_time) = parse_datetime(&row.entry_datetime);
        let (close_date, close_time) = parse_datetime(&row.exit_datetime);

        PositionRecord {
            symbol,
            account,
            quantity: row.quantity.trim().to_owned(),
            position_type: PositionType::from(&row.trade_type),
            entry_price: row.entry_price.trim().to_owned(),
            exit_price: row.exit_price.trim().to_owned(),
            open_date,
            open_time,
            close_date,
            close_time,
            duration: row.duration.trim().to_owned(),
            profit_loss: clean_numeric(&row.ftf_profit_loss),
            cumulative_pl: row.cumulative_pl.trim().to_owned(),
            max_open_loss: row.max_open_loss.trim().to_owned(),
            max_open_profit: row.max_open_profit.trim().to_owned(),
            commission: row.commission.trim().to_owned(),
            note: row.note.trim().to_owned(),
            exit_efficiency: row.exit_efficiency.trim().to_owned(),
            entry_efficiency: row.entry_efficiency.trim().to_owned(),
        }
    }
}

impl FillRecord {
    fn from(row: &RawRow) -> FillRecord {
        let (symbol, account) = split_symbol(&row.symbol);
        let (open_date, open_time) = parse_datetime(&row.entry_datetime);
        let (close_date, close_time) = parse_datetime(&row.exit_datetime);

        FillRecord {
            symbol,
            account,
            quantity: row.quantity.trim().to_owned(),
            position_type: PositionType::from(&row.trade_type),
            entry_price: row.entry_price.trim().to_owned(),
            exit_price: row.exit_price.trim().to_owned(),
            open_date,
            open_time,
            close_date,
            close_time,
            duration: row.duration.trim().to_owned(),
            profit_loss: clean_numeric(&row.profit_loss),
            ftf_profit_loss: clean_numeric(&row.ftf_profit_loss),
            cumulative_pl: row.cumulative_pl.trim().to_owned(),
            max_open_loss: row.max_open_loss.trim().to_owned(),
            max_open_profit: row.max_open_profit.trim().to_owned(),
            commission: row.commission.trim().to_owned(),
            note: row.note.trim().to_owned(),
            exit_efficiency: row.exit_efficiency.trim().to_owned(),
            entry_efficiency: row.entry_efficiency.trim().to_owned(),
            is_position_close: if is_position_close(row) { "Y" } else { "N" }.to_owned(),
        }
    }
}

impl TradesList<'_> {
    pub fn open(path: &path::Path) -> Result<TradesList> {
        if path.is_file() {
            Ok(TradesList { path })
        } else {
            error_chain::bail!("Can't find trades list {}", path.to_string_lossy())
        }
    }

    fn rows_fold<R, F>(&self, init: &mut R, f: F) -> Result<()>
    where
        F: Fn(&mut R, RawRow),
    {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(self.path)
            .chain_err(|| format!("Cannot open trades list {}", self.path.to_string_lossy()))?;

        let mut raw_record = csv::StringRecord::new();
        let headers = rdr.headers().chain_err(|| "Can't get headers?")?.clone();

        while rdr
            .read_record(&mut raw_record)
            .chain_err(|| "Trades list not well formed")?
        {
            let row: RawRow = raw_record
                .deserialize(Some(&headers))
                .chain_err(|| "Trades list not well formed")?;
            f(init, row);
        }
        Ok(())
    }

    /// The rows that close a flat-to-flat position, normalized. Rows with
    /// an empty symbol and intermediate fills are dropped.
    pub fn positions(&self) -> Result<Vec<PositionRecord>> {
        let mut trades = Vec::new();
        let f = |acc: &mut Vec<PositionRecord>, row: RawRow| {
            if row.symbol.trim().is_empty() || !is_position_close(&row) {
                return;
            }
            acc.push(PositionRecord::from(&row));
        };
        self.rows_fold(&mut trades, f)?;

        info!(
            "{} position closes in {}",
            trades.len(),
            self.path.to_string_lossy()
        );
        Ok(trades)
    }

    /// Every fill in the list, normalized and flagged with whether it
    /// closes a position. Only rows with an empty symbol are dropped.
    pub fn fills(&self) -> Result<Vec<FillRecord>> {
        let mut trades = Vec::new();
        let f = |acc: &mut Vec<FillRecord>, row: RawRow| {
            if row.symbol.trim().is_empty() {
                return;
            }
            acc.push(FillRecord::from(&row));
        };
        self.rows_fold(&mut trades, f)?;

        info!("{} fills in {}", trades.len(), self.path.to_string_lossy());
        Ok(trades)
    }
}

/// Writes the records as comma separated text, header first, quoting per
/// standard csv conventions. With no records the destination is left
/// untouched.
pub fn write_csv<T: Serialize>(output: &path::Path, records: &[T]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .from_path(output)
        .chain_err(|| format!("Can't open output file {}", output.to_string_lossy()))?;

    for record in records {
        wtr.serialize(record)
            .chain_err(|| "Error serializing one trade")?;
    }
    wtr.flush().chain_err(|| "Error flushing the output file")
}
