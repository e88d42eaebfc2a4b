//! # Inventory table
//!
//! A rectangular table of bins by SKUs, loaded from and written back to
//! comma-separated text. The first column is the row identity (a bin id),
//! every other column is a SKU whose cells hold quantities on hand.
//!
//! ```text
//! Bin No.,WIDGET,GADGET
//! A1,10,0
//! A2,3,
//! ```
//!
//! Cells are kept as text so a table round-trips without reformatting.
//! Quantities are read on demand: a blank, negative or non-numeric cell reads
//! as `0`, and blank cells are written back as `0`. Decrementing a cell that
//! is neither blank nor a whole quantity fails instead of overwriting it.

use std::{collections::HashSet, io, sync::Arc};

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::error::{CellError, NotFound};

/// Why a byte stream could not be turned into a [`Table`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Unreadable(String),
    #[error("{0}")]
    Malformed(String),
}

// Ragged rows are accepted by the reader and rejected in `from_rows`, so
// anything csv reports is an I/O or encoding failure.
impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        Self::Unreadable(err.to_string())
    }
}

/// One bin: its id followed by one cell per SKU, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// The row identity (bin id).
    pub fn bin(&self) -> &str {
        &self.values[0]
    }

    /// Raw cell text for `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.index_of(column).map(|idx| self.values[idx].as_str())
    }

    /// Quantity held in `sku`. Missing columns and unparsable cells read as 0.
    pub fn quantity(&self, sku: &str) -> u64 {
        self.get(sku).map(parse_quantity).unwrap_or(0)
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Outcome of a single-cell decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decrement {
    pub previous: u64,
    pub updated: u64,
}

/// The whole ledger: ordered columns and ordered rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from a header and raw rows, enforcing the shape invariants:
    /// a non-empty header without duplicates, one cell per column in every row,
    /// and unique bin ids.
    pub fn from_rows<I>(columns: Vec<String>, rows: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(ParseError::Malformed("missing header row".into()));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ParseError::Malformed(format!(
                    "duplicate column {column:?}"
                )));
            }
        }

        let columns: Arc<[String]> = columns.into();
        let mut bins = HashSet::new();
        let mut out = Vec::new();
        for (idx, values) in rows.into_iter().enumerate() {
            if values.len() != columns.len() {
                return Err(ParseError::Malformed(format!(
                    "row {} has {} fields, expected {}",
                    idx + 1,
                    values.len(),
                    columns.len()
                )));
            }
            if !bins.insert(values[0].clone()) {
                return Err(ParseError::Malformed(format!(
                    "duplicate bin {:?} at row {}",
                    values[0],
                    idx + 1
                )));
            }
            out.push(Row {
                columns: columns.clone(),
                values,
            });
        }

        Ok(Self { columns, rows: out })
    }

    /// Parse comma-separated text with a header line.
    pub fn from_csv<R: io::Read>(reader: R) -> Result<Self, ParseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect::<Vec<_>>());
        }
        Self::from_rows(columns, rows)
    }

    /// Write the header and every row, identity column first. Blank quantity
    /// cells are written as `0`.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns.iter())?;
        for row in &self.rows {
            let record = row.values.iter().enumerate().map(|(idx, value)| {
                if idx > 0 && value.trim().is_empty() {
                    "0"
                } else {
                    value.as_str()
                }
            });
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// All column names, identity column first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn identity_column(&self) -> &str {
        &self.columns[0]
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, bin: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.bin() == bin)
    }

    /// SKU column names in file order. A table without data rows reports no
    /// SKUs even when its header names some.
    pub fn skus(&self) -> Vec<String> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        self.columns[1..].to_vec()
    }

    /// Rows whose quantity for `sku` is strictly greater than `threshold`,
    /// in table order.
    pub fn search(&self, sku: &str, threshold: i64) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| i128::from(row.quantity(sku)) > i128::from(threshold))
            .cloned()
            .collect()
    }

    /// Subtract `amount` from one cell, flooring at zero.
    ///
    /// The identity column is not a SKU, so naming it fails like any other
    /// unknown column. A blank cell counts as 0; any other cell that is not a
    /// whole quantity is left alone and reported.
    pub fn decrement(
        &mut self,
        bin: &str,
        sku: &str,
        amount: u64,
    ) -> Result<Decrement, CellError> {
        let col = self
            .columns
            .iter()
            .skip(1)
            .position(|c| c == sku)
            .map(|pos| pos + 1);
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.bin() == bin)
            .ok_or_else(|| NotFound::Bin(bin.to_owned()))?;
        let col = col.ok_or_else(|| NotFound::Sku(sku.to_owned()))?;

        let cell = &row.values[col];
        let previous = if cell.trim().is_empty() {
            0
        } else {
            cell.trim()
                .parse::<u64>()
                .map_err(|_| CellError::NotAQuantity {
                    bin: bin.to_owned(),
                    sku: sku.to_owned(),
                    value: cell.clone(),
                })?
        };
        let updated = previous.saturating_sub(amount);
        row.values[col] = updated.to_string();
        Ok(Decrement { previous, updated })
    }
}

fn parse_quantity(cell: &str) -> u64 {
    cell.trim().parse().unwrap_or(0)
}
