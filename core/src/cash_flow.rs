//! Cash-flow history: every fund movement in date order with the running
//! balance after each one.

use crate::{
    config::CashFlowConfig,
    table::{CellValue, ColumnSpec, Table},
    types::RowPosition,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Name of the derived running-balance column.
pub const BALANCE_COLUMN: &str = "Saldo";

/// Both columns are required; rows with an unreadable date are dropped and
/// the rest come back oldest first.
pub fn column_spec(cfg: &CashFlowConfig) -> ColumnSpec {
    ColumnSpec::new()
        .date(&cfg.date_column, &cfg.date_format)
        .required()
        .numeric(&cfg.amount_column)
        .required()
        .sorted_by(&cfg.date_column)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowEntry {
    pub position:  RowPosition,
    pub timestamp: NaiveDateTime,
    pub amount:    f64,
    pub balance:   f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowReport {
    pub entries:         Vec<CashFlowEntry>,
    pub current_balance: f64,
    /// The loaded table with the running balance appended as a column.
    pub table:           Table,
}

impl CashFlowReport {
    /// `table` must already be in date order (see `column_spec`).
    pub fn from_table(table: &Table, cfg: &CashFlowConfig) -> Self {
        let (Some(date_idx), Some(amount_idx)) = (
            table.column_index(&cfg.date_column),
            table.column_index(&cfg.amount_column),
        ) else {
            return Self::default();
        };

        let mut balance = 0.0;
        let mut entries = Vec::with_capacity(table.len());
        let mut with_balance = table.clone();
        with_balance.columns.push(BALANCE_COLUMN.to_string());

        for record in with_balance.records.iter_mut() {
            let amount = record.values.get(amount_idx).map(CellValue::as_number).unwrap_or(0.0);
            balance += amount;
            record.values.push(CellValue::Number(balance));
            if let Some(timestamp) = record.values.get(date_idx).and_then(CellValue::as_date) {
                entries.push(CashFlowEntry {
                    position: record.position,
                    timestamp,
                    amount,
                    balance,
                });
            }
        }

        Self { entries, current_balance: balance, table: with_balance }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
