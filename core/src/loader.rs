//! Data access layer: whole-sheet reads turned into typed tables.
//!
//! RULE: nothing raises past `load_table`. Every failure becomes a classified
//! notice and an empty table, so pages always have something to render.

use crate::{
    connector::StoreHandle,
    error::{FailureClass, RanchoError, RanchoResult},
    notice::Notices,
    store::RawSheet,
    table::{coerce_date, coerce_numeric, infer_cell, CellValue, ColumnKind, ColumnSpec, Record, Table},
};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use uuid::Uuid;

/// Read `sheet` from `spreadsheet` and coerce it according to `spec`.
pub fn load_table(
    handle: Option<&StoreHandle>,
    spreadsheet: &str,
    sheet: &str,
    spec: &ColumnSpec,
    notices: &mut Notices,
) -> Table {
    let Some(handle) = handle else {
        notices.error(
            FailureClass::Connectivity,
            format!("No connection to the spreadsheet store; '{sheet}' cannot be loaded."),
        );
        return Table::empty();
    };

    match fetch(handle, spreadsheet, sheet) {
        Ok(raw) => build_table(raw, sheet, spec, notices),
        Err(err) => {
            match &err {
                RanchoError::WorksheetNotFound { .. } => notices.error(
                    FailureClass::Schema,
                    format!("Sheet '{sheet}' was not found. Check the sheet name."),
                ),
                RanchoError::SpreadsheetNotFound { .. } => notices.error(
                    FailureClass::Schema,
                    format!(
                        "Spreadsheet '{spreadsheet}' was not found. Check the name and that it \
                         is shared with the service account."
                    ),
                ),
                _ => notices.failure(&format!("Error loading '{sheet}'"), &err),
            }
            Table::empty()
        }
    }
}

fn fetch(handle: &StoreHandle, spreadsheet: &str, sheet: &str) -> RanchoResult<RawSheet> {
    let store = handle.store();
    let book = store.open(spreadsheet)?;
    let ws = store.worksheet(&book, sheet)?;
    let raw = store.all_records(&ws)?;
    log::debug!("fetched '{sheet}': {} data rows", raw.rows.len());
    Ok(raw)
}

fn build_table(raw: RawSheet, sheet: &str, spec: &ColumnSpec, notices: &mut Notices) -> Table {
    if raw.rows.is_empty() {
        notices.info(format!("Sheet '{sheet}' is empty."));
        return Table::empty();
    }

    if let Some(missing) = spec
        .rules
        .iter()
        .find(|rule| rule.required && !raw.header.contains(&rule.name))
    {
        notices.warning(
            Some(FailureClass::Schema),
            format!("Column '{}' was not found in sheet '{sheet}'.", missing.name),
        );
        return Table::empty();
    }

    let kinds: Vec<Option<&ColumnKind>> = raw
        .header
        .iter()
        .map(|name| spec.rule(name).map(|rule| &rule.kind))
        .collect();

    let mut table = Table::new(raw.header.clone());
    let mut dropped = 0usize;

    'rows: for (position, row) in raw.rows.into_iter().enumerate() {
        let mut values = Vec::with_capacity(kinds.len());
        for (kind, cell) in kinds.iter().zip(row) {
            let value = match kind {
                Some(ColumnKind::Text) => CellValue::Text(cell),
                Some(ColumnKind::Numeric) => CellValue::Number(coerce_numeric(&cell)),
                Some(ColumnKind::Date { format }) => match coerce_date(&cell, format) {
                    Some(date) => CellValue::Date(date),
                    None => {
                        dropped += 1;
                        continue 'rows;
                    }
                },
                None => infer_cell(&cell),
            };
            values.push(value);
        }
        table.records.push(Record { position, values });
    }

    if dropped > 0 {
        notices.warning(
            None,
            format!("{dropped} row(s) in '{sheet}' had an unreadable date and were skipped."),
        );
    }

    if let Some(sort_col) = &spec.sort_by {
        if let Some(idx) = table.column_index(sort_col) {
            table
                .records
                .sort_by_key(|r| r.values.get(idx).and_then(CellValue::as_date));
        }
    }

    table
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub spreadsheet: String,
    pub sheet:       String,
    pub handle:      Uuid,
}

#[derive(Debug, Clone)]
struct CachedTable {
    loaded_at: NaiveDateTime,
    table:     Table,
    notices:   Notices,
}

/// Short-lived cache of loaded tables, keyed by sheet and handle identity.
///
/// Callers tolerate staleness up to `ttl` and call `invalidate` after any
/// successful write. Loads that ended in an error are never cached.
#[derive(Debug)]
pub struct TableCache {
    ttl:     Duration,
    entries: HashMap<CacheKey, CachedTable>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    pub fn load(
        &mut self,
        handle: Option<&StoreHandle>,
        spreadsheet: &str,
        sheet: &str,
        spec: &ColumnSpec,
        now: NaiveDateTime,
        notices: &mut Notices,
    ) -> Table {
        let Some(h) = handle else {
            return load_table(None, spreadsheet, sheet, spec, notices);
        };
        let key = CacheKey {
            spreadsheet: spreadsheet.to_string(),
            sheet: sheet.to_string(),
            handle: h.id,
        };

        if let Some(hit) = self.entries.get(&key) {
            if now - hit.loaded_at < self.ttl {
                log::debug!("cache hit for '{sheet}' (loaded {})", hit.loaded_at);
                notices.replay(&hit.notices);
                return hit.table.clone();
            }
        }

        let mut fresh = Notices::new();
        let table = load_table(Some(h), spreadsheet, sheet, spec, &mut fresh);
        if fresh.has_errors() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(
                key,
                CachedTable { loaded_at: now, table: table.clone(), notices: fresh.clone() },
            );
        }
        notices.replay(&fresh);
        table
    }

    /// Drop every cached table.
    pub fn invalidate(&mut self) {
        log::debug!("table cache cleared ({} entries)", self.entries.len());
        self.entries.clear();
    }

    pub fn invalidate_sheet(&mut self, sheet: &str) {
        self.entries.retain(|key, _| key.sheet != sheet);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
