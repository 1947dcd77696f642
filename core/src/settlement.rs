//! Settlement (quitação): find a person's rows, show what is due, and mark
//! the unsettled rows as paid in one batch write.
//!
//! State machine, held per session in `SettlementSession`:
//!
//!   Idle ──search──▶ Searched ──settle ok──▶ Confirmed ──acknowledge──▶ Idle
//!                      │  ▲                     (success notice, input
//!                      └──┘ search / failed     cleared, cache invalidated)
//!                           settle
//!
//! Design:
//!   - A search with no matches still lands in Searched (empty result), so
//!     "never searched" and "searched, found nothing" stay distinguishable.
//!   - `project` is pure: settled rows count as 0, the rest are summed.
//!   - `commit` addresses rows only through their load position
//!     (`Record::sheet_row`) and looks the flag column up in the live header.
//!   - Rows already settled, in the held result or in the live sheet, never
//!     enter the batch.

use crate::{
    config::PersonSheetConfig,
    connector::StoreHandle,
    error::{FailureClass, RanchoError, RanchoResult},
    notice::Notices,
    store::CellUpdate,
    table::{CellValue, Record, Table},
    types::{RowPosition, SheetCol, SheetRow},
};
use serde::{Deserialize, Serialize};

// ── Search ───────────────────────────────────────────────────────────

/// Rows of the loaded table whose key equals the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query:   String,
    pub matches: Table,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Exact text match of `query` against `key_column`. No trimming, no
/// partial matches.
pub fn search(table: &Table, key_column: &str, query: &str) -> RanchoResult<SearchResult> {
    let idx = table.column_index(key_column).ok_or_else(|| RanchoError::ColumnNotFound {
        column: key_column.to_string(),
        sheet:  "loaded table".to_string(),
    })?;
    let matches = table.filter(|r| {
        r.values.get(idx).map(CellValue::as_text).as_deref() == Some(query)
    });
    log::debug!("search '{query}' on '{key_column}': {} match(es)", matches.len());
    Ok(SearchResult { query: query.to_string(), matches })
}

// ── Projection ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub position:         RowPosition,
    pub sheet_row:        SheetRow,
    /// Values of the projection's display columns, amount already zeroed
    /// for settled rows.
    pub cells:            Vec<CellValue>,
    pub stored_amount:    f64,
    pub effective_amount: f64,
    pub settled:          bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub columns:       Vec<String>,
    pub rows:          Vec<DisplayRow>,
    pub aggregate_due: f64,
}

fn is_settled(table: &Table, record: &Record, cfg: &PersonSheetConfig) -> bool {
    table
        .value(record, &cfg.flag_column)
        .is_some_and(|v| v.as_text() == cfg.settled_value)
}

fn stored_amount(table: &Table, record: &Record, cfg: &PersonSheetConfig) -> f64 {
    table.value(record, &cfg.amount_column).map(CellValue::as_number).unwrap_or(0.0)
}

pub fn project(result: &SearchResult, cfg: &PersonSheetConfig) -> Projection {
    let table = &result.matches;
    let columns: Vec<String> = cfg
        .display_columns
        .iter()
        .filter(|c| table.has_column(c))
        .cloned()
        .collect();

    let rows: Vec<DisplayRow> = table
        .records
        .iter()
        .map(|record| {
            let settled = is_settled(table, record, cfg);
            let stored = stored_amount(table, record, cfg);
            let effective = if settled { 0.0 } else { stored };
            let cells = columns
                .iter()
                .map(|c| {
                    if *c == cfg.amount_column {
                        CellValue::Number(effective)
                    } else {
                        table.value(record, c).cloned().unwrap_or(CellValue::Empty)
                    }
                })
                .collect();
            DisplayRow {
                position: record.position,
                sheet_row: record.sheet_row(),
                cells,
                stored_amount: stored,
                effective_amount: effective,
                settled,
            }
        })
        .collect();

    let aggregate_due = rows.iter().map(|r| r.effective_amount).sum();
    Projection { columns, rows, aggregate_due }
}

// ── Commit ───────────────────────────────────────────────────────────

/// Sheet rows to flag, with the value each one receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementBatch {
    pub entries: Vec<(SheetRow, String)>,
}

impl SettlementBatch {
    /// Every row of `result` not already flagged settled.
    pub fn from_result(result: &SearchResult, cfg: &PersonSheetConfig) -> Self {
        let table = &result.matches;
        let entries = table
            .records
            .iter()
            .filter(|r| !is_settled(table, r, cfg))
            .map(|r| (r.sheet_row(), cfg.settled_value.clone()))
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn cells(&self, col: SheetCol) -> Vec<CellUpdate> {
        self.entries
            .iter()
            .map(|(row, value)| CellUpdate { row: *row, col, value: value.clone() })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    Settled { rows: Vec<SheetRow> },
    /// Every candidate was already settled; no write was issued.
    NothingToSettle,
}

/// Flag every unsettled row of `result` as settled with a single batch write.
pub fn commit(
    result: &SearchResult,
    handle: Option<&StoreHandle>,
    spreadsheet: &str,
    cfg: &PersonSheetConfig,
) -> RanchoResult<CommitOutcome> {
    if project(result, cfg).aggregate_due <= 0.0 {
        return Err(RanchoError::NothingDue);
    }
    let store = handle.ok_or(RanchoError::NotConnected)?.store();
    let book = store.open(spreadsheet)?;
    let ws = store.worksheet(&book, &cfg.sheet)?;

    // The header is read on every commit; columns may have moved since load.
    let header = store.row_values(&ws, 1)?;
    let col = header
        .iter()
        .position(|h| *h == cfg.flag_column)
        .map(|i| i as SheetCol + 1)
        .ok_or_else(|| RanchoError::ColumnNotFound {
            column: cfg.flag_column.clone(),
            sheet:  cfg.sheet.clone(),
        })?;

    let mut batch = SettlementBatch::from_result(result, cfg);
    let mut live = Vec::with_capacity(batch.len());
    for (row, value) in batch.entries.drain(..) {
        if store.cell(&ws, row, col)? == cfg.settled_value {
            log::warn!("row {row} of '{}' was settled elsewhere; skipping", cfg.sheet);
            continue;
        }
        live.push((row, value));
    }
    batch.entries = live;

    if batch.is_empty() {
        log::warn!(
            "settlement for '{}' found nothing left to settle; no write issued",
            result.query
        );
        return Ok(CommitOutcome::NothingToSettle);
    }

    store.update_cells(&ws, &batch.cells(col))?;
    let rows: Vec<SheetRow> = batch.entries.iter().map(|(row, _)| *row).collect();
    log::info!("settled '{}': rows {rows:?} of '{}'", result.query, cfg.sheet);
    Ok(CommitOutcome::Settled { rows })
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementState {
    #[default]
    Idle,
    Searched { result: SearchResult },
    Confirmed { outcome: CommitOutcome },
}

/// Per-session settlement context, threaded through every interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementSession {
    pub state:       SettlementState,
    pub query_input: String,
}

/// What the held result looks like on screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementView {
    pub projection:     Option<Projection>,
    pub no_results:     bool,
    pub settle_offered: bool,
}

impl SettlementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held_result(&self) -> Option<&SearchResult> {
        match &self.state {
            SettlementState::Searched { result } => Some(result),
            _ => None,
        }
    }

    /// Blank queries are rejected without changing state.
    pub fn search(
        &mut self,
        table: &Table,
        cfg: &PersonSheetConfig,
        query: &str,
        notices: &mut Notices,
    ) {
        self.query_input = query.to_string();
        if query.trim().is_empty() {
            notices.warning(Some(FailureClass::Validation), "Enter an RE to search.");
            return;
        }
        match search(table, &cfg.key_column, query) {
            Ok(result) => self.state = SettlementState::Searched { result },
            Err(_) => {
                notices.error(
                    FailureClass::Schema,
                    format!("Column '{}' was not found in the spreadsheet.", cfg.key_column),
                );
                self.state = SettlementState::Idle;
            }
        }
    }

    /// Commit the held result. Returns true when the session moved to
    /// Confirmed; on failure the held result is left untouched.
    pub fn settle(
        &mut self,
        handle: Option<&StoreHandle>,
        spreadsheet: &str,
        cfg: &PersonSheetConfig,
        notices: &mut Notices,
    ) -> bool {
        let Some(result) = self.held_result() else {
            notices.warning(Some(FailureClass::Validation), "Search for an RE before settling.");
            return false;
        };
        match commit(result, handle, spreadsheet, cfg) {
            Ok(outcome) => {
                self.state = SettlementState::Confirmed { outcome };
                true
            }
            Err(RanchoError::NothingDue) => {
                notices.warning(Some(FailureClass::Validation), "There is nothing due to settle.");
                false
            }
            Err(err @ RanchoError::Api(_)) => {
                notices.failure(
                    "Store API error; check that the service account has editor access",
                    &err,
                );
                false
            }
            Err(err) => {
                notices.failure("Error while settling", &err);
                false
            }
        }
    }

    /// Consume a Confirmed state: announce it, clear the result and the
    /// search input, return to Idle. Returns true when the caller must
    /// invalidate its table cache.
    pub fn acknowledge(&mut self, notices: &mut Notices) -> bool {
        let SettlementState::Confirmed { outcome } = &self.state else {
            return false;
        };
        match outcome {
            CommitOutcome::Settled { .. } => {
                notices.success("Payment settled successfully. The page has been refreshed.")
            }
            CommitOutcome::NothingToSettle => notices.success(
                "Every matching entry was already settled; nothing was written.",
            ),
        }
        self.state = SettlementState::Idle;
        self.query_input.clear();
        true
    }

    pub fn view(&self, cfg: &PersonSheetConfig, notices: &mut Notices) -> SettlementView {
        let Some(result) = self.held_result() else {
            return SettlementView::default();
        };
        if result.is_empty() {
            notices.info("No results found for the given RE.");
            return SettlementView { projection: None, no_results: true, settle_offered: false };
        }
        let projection = project(result, cfg);
        let settle_offered = projection.aggregate_due > 0.0;
        SettlementView { projection: Some(projection), no_results: false, settle_offered }
    }
}
