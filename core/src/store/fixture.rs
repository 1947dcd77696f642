//! Bulk import of a whole spreadsheet from a JSON document.
//!
//! ```json
//! { "title": "Previsao_de_Rancho",
//!   "worksheets": [ { "title": "FLUXO DE CAIXA",
//!                     "rows": [["REGISTRO", "LANÇAMENTOS"],
//!                              ["01/03/2025 08:00:00", 150]] } ] }
//! ```
//!
//! Numbers and booleans are stored as their text form, `null` as an empty
//! cell. Importing a worksheet that already exists replaces its contents.

use super::{SheetStore, SpreadsheetRef, TabularStore, WorksheetRef};
use crate::error::RanchoResult;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// Minimum grid size given to imported sheets, matching a fresh sheet.
const MIN_ROWS: u32 = 1000;
const MIN_COLS: u32 = 26;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetFixture {
    pub title:      String,
    pub worksheets: Vec<WorksheetFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetFixture {
    pub title: String,
    pub rows:  Vec<Vec<serde_json::Value>>,
}

impl SheetStore {
    pub fn import_fixture_json(&self, json: &str) -> RanchoResult<SpreadsheetRef> {
        let fixture: SpreadsheetFixture = serde_json::from_str(json)?;
        self.import_fixture(&fixture)
    }

    pub fn import_fixture(&self, fixture: &SpreadsheetFixture) -> RanchoResult<SpreadsheetRef> {
        let spreadsheet = match self.find_spreadsheet(&fixture.title)? {
            Some(s) => s,
            None => self.create_spreadsheet(&fixture.title)?,
        };
        for sheet in &fixture.worksheets {
            let ws = self.replace_worksheet(&spreadsheet, sheet)?;
            log::info!(
                "imported '{}' / '{}': {} rows",
                spreadsheet.title,
                ws.title,
                sheet.rows.len()
            );
        }
        Ok(spreadsheet)
    }

    fn replace_worksheet(
        &self,
        spreadsheet: &SpreadsheetRef,
        sheet: &WorksheetFixture,
    ) -> RanchoResult<WorksheetRef> {
        let rows = (sheet.rows.len() as u32).max(MIN_ROWS);
        let cols = (sheet.rows.iter().map(Vec::len).max().unwrap_or(0) as u32).max(MIN_COLS);

        let ws = match self.find_worksheet(spreadsheet, &sheet.title)? {
            Some(ws) => {
                self.conn.execute(
                    "DELETE FROM cell WHERE worksheet_id = ?1",
                    params![ws.worksheet_id],
                )?;
                self.resize_grid(&ws, rows, cols)?;
                ws
            }
            None => self.add_worksheet(spreadsheet, &sheet.title, rows, cols)?,
        };

        let tx = self.conn.unchecked_transaction()?;
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let text = fixture_text(value);
                if text.is_empty() {
                    continue;
                }
                tx.execute(
                    "INSERT INTO cell (worksheet_id, row_num, col_num, value, formula)
                     VALUES (?1, ?2, ?3, ?4, NULL)",
                    params![ws.worksheet_id, (r + 1) as i64, (c + 1) as i64, text],
                )?;
            }
        }
        tx.commit()?;
        Ok(ws)
    }
}

fn fixture_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
