use super::{CellUpdate, RawSheet, SheetStore, ValueInputMode, WorksheetRef};
use crate::{
    error::{RanchoError, RanchoResult},
    types::{SheetCol, SheetRow},
};
use rusqlite::{params, OptionalExtension};

impl SheetStore {
    // ── Reads ─────────────────────────────────────────────────────

    pub(super) fn read_all(&self, ws: &WorksheetRef) -> RanchoResult<RawSheet> {
        let mut stmt = self.conn.prepare(
            "SELECT row_num, col_num, value FROM cell
             WHERE worksheet_id = ?1 AND value <> ''
             ORDER BY row_num ASC, col_num ASC",
        )?;
        let cells = stmt
            .query_map(params![ws.worksheet_id], |row| {
                Ok((
                    row.get::<_, i64>(0)? as usize,
                    row.get::<_, i64>(1)? as usize,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let last_row = cells.iter().map(|(r, _, _)| *r).max().unwrap_or(0);
        let last_col = cells.iter().map(|(_, c, _)| *c).max().unwrap_or(0);
        if last_row == 0 {
            return Ok(RawSheet::default());
        }

        let mut grid = vec![vec![String::new(); last_col]; last_row];
        for (r, c, value) in cells {
            grid[r - 1][c - 1] = value;
        }

        let mut rows = grid.into_iter();
        let mut header = rows.next().unwrap_or_default();
        while header.last().is_some_and(|h| h.is_empty()) {
            header.pop();
        }
        let width = header.len();
        let rows = rows
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();

        Ok(RawSheet { header, rows })
    }

    pub(super) fn read_row(&self, ws: &WorksheetRef, row: SheetRow) -> RanchoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT col_num, value FROM cell
             WHERE worksheet_id = ?1 AND row_num = ?2 AND value <> ''
             ORDER BY col_num ASC",
        )?;
        let cells = stmt
            .query_map(params![ws.worksheet_id, row as i64], |r| {
                Ok((r.get::<_, i64>(0)? as usize, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let width = cells.last().map(|(c, _)| *c).unwrap_or(0);
        let mut values = vec![String::new(); width];
        for (c, value) in cells {
            values[c - 1] = value;
        }
        Ok(values)
    }

    pub(super) fn read_cell(
        &self,
        ws: &WorksheetRef,
        row: SheetRow,
        col: SheetCol,
    ) -> RanchoResult<String> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM cell
                 WHERE worksheet_id = ?1 AND row_num = ?2 AND col_num = ?3",
                params![ws.worksheet_id, row as i64, col as i64],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or_default())
    }

    /// Last row holding any value or formula; 0 for an empty sheet.
    fn last_used_row(&self, ws: &WorksheetRef) -> RanchoResult<SheetRow> {
        let last: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(row_num), 0) FROM cell
             WHERE worksheet_id = ?1 AND (value <> '' OR formula IS NOT NULL)",
            params![ws.worksheet_id],
            |r| r.get(0),
        )?;
        Ok(last as SheetRow)
    }

    // ── Writes ────────────────────────────────────────────────────

    pub(super) fn append(
        &self,
        ws: &WorksheetRef,
        values: &[String],
        mode: ValueInputMode,
    ) -> RanchoResult<()> {
        let (rows, cols) = self.grid_size(ws)?;
        let target = self.last_used_row(ws)? + 1;
        let needed_cols = cols.max(values.len() as SheetCol);
        if target > rows || needed_cols > cols {
            self.resize_grid(ws, rows.max(target), needed_cols)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        for (i, raw) in values.iter().enumerate() {
            let (value, formula) = match mode {
                ValueInputMode::Raw => (raw.clone(), None),
                ValueInputMode::UserEntered => user_entered(raw),
            };
            tx.execute(
                "INSERT INTO cell (worksheet_id, row_num, col_num, value, formula)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (worksheet_id, row_num, col_num)
                 DO UPDATE SET value = excluded.value, formula = excluded.formula",
                params![ws.worksheet_id, target as i64, (i + 1) as i64, value, formula],
            )?;
        }
        tx.commit()?;
        log::debug!("appended row {target} to '{}' ({} values)", ws.title, values.len());
        Ok(())
    }

    pub(super) fn write_cells(&self, ws: &WorksheetRef, cells: &[CellUpdate]) -> RanchoResult<()> {
        let (rows, cols) = self.grid_size(ws)?;
        // Reject the whole batch before touching anything.
        if let Some(bad) = cells
            .iter()
            .find(|c| c.row == 0 || c.col == 0 || c.row > rows || c.col > cols)
        {
            return Err(RanchoError::Api(format!(
                "range R{}C{} exceeds grid limits of '{}' ({rows}x{cols})",
                bad.row, bad.col, ws.title
            )));
        }

        let tx = self.conn.unchecked_transaction()?;
        for c in cells {
            tx.execute(
                "INSERT INTO cell (worksheet_id, row_num, col_num, value, formula)
                 VALUES (?1, ?2, ?3, ?4, NULL)
                 ON CONFLICT (worksheet_id, row_num, col_num)
                 DO UPDATE SET value = excluded.value, formula = NULL",
                params![ws.worksheet_id, c.row as i64, c.col as i64, c.value],
            )?;
        }
        tx.commit()?;
        log::debug!("updated {} cells in '{}'", cells.len(), ws.title);
        Ok(())
    }

    /// Formula text stored for a cell, if any.
    pub fn formula(
        &self,
        ws: &WorksheetRef,
        row: SheetRow,
        col: SheetCol,
    ) -> RanchoResult<Option<String>> {
        let formula: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT formula FROM cell
                 WHERE worksheet_id = ?1 AND row_num = ?2 AND col_num = ?3",
                params![ws.worksheet_id, row as i64, col as i64],
                |r| r.get(0),
            )
            .optional()?;
        Ok(formula.flatten())
    }
}

/// Interpret a value the way the sheet does for typed input.
fn user_entered(raw: &str) -> (String, Option<String>) {
    if raw.starts_with('=') {
        return (String::new(), Some(raw.to_string()));
    }
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => (n.to_string(), None),
        _ => (raw.to_string(), None),
    }
}
