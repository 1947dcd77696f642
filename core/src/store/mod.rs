//! Remote tabular store: the spreadsheet that is the system of record.
//!
//! RULE: Only the store talks to the database.
//! Readers and the settlement engine go through `TabularStore`; they never
//! execute SQL directly.
//!
//! `SheetStore` emulates the spreadsheet service on SQLite: spreadsheets own
//! worksheets, worksheets own a sparse grid of text cells. Rows and columns
//! are 1-based and row 1 is the header.

use crate::{
    error::{RanchoError, RanchoResult},
    types::{SheetCol, SheetRow},
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

mod cells;
mod fixture;

pub use fixture::{SpreadsheetFixture, WorksheetFixture};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetRef {
    pub spreadsheet_id: String,
    pub title:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetRef {
    pub worksheet_id: i64,
    pub title:        String,
}

/// Whole-sheet read: the header row and every data row up to the last
/// non-empty one, each padded to the header width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSheet {
    pub header: Vec<String>,
    pub rows:   Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub row:   SheetRow,
    pub col:   SheetCol,
    pub value: String,
}

/// How appended values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueInputMode {
    /// Stored exactly as given.
    Raw,
    /// Parsed as if typed by a user: numbers are normalised and a leading
    /// `=` makes the value a formula.
    UserEntered,
}

/// The operations the dashboard consumes from the spreadsheet service.
pub trait TabularStore {
    fn open(&self, title: &str) -> RanchoResult<SpreadsheetRef>;

    /// Fails with `WorksheetNotFound` when no sheet has that title.
    fn worksheet(&self, spreadsheet: &SpreadsheetRef, title: &str) -> RanchoResult<WorksheetRef>;

    fn add_worksheet(
        &self,
        spreadsheet: &SpreadsheetRef,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> RanchoResult<WorksheetRef>;

    fn all_records(&self, ws: &WorksheetRef) -> RanchoResult<RawSheet>;

    /// Values of one row with trailing empty cells trimmed.
    fn row_values(&self, ws: &WorksheetRef, row: SheetRow) -> RanchoResult<Vec<String>>;

    fn cell(&self, ws: &WorksheetRef, row: SheetRow, col: SheetCol) -> RanchoResult<String>;

    fn append_row(
        &self,
        ws: &WorksheetRef,
        values: &[String],
        mode: ValueInputMode,
    ) -> RanchoResult<()>;

    /// Write every cell or none of them.
    fn update_cells(&self, ws: &WorksheetRef, cells: &[CellUpdate]) -> RanchoResult<()>;
}

pub struct SheetStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SheetStore {
    pub fn open(path: &str) -> RanchoResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: Some(path.to_string()) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RanchoResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RanchoResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_spreadsheets.sql"))?;
        Ok(())
    }

    // ── Spreadsheets ───────────────────────────────────────────

    pub fn create_spreadsheet(&self, title: &str) -> RanchoResult<SpreadsheetRef> {
        let spreadsheet_id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO spreadsheet (spreadsheet_id, title) VALUES (?1, ?2)",
            params![spreadsheet_id, title],
        )?;
        log::debug!("created spreadsheet '{title}' ({spreadsheet_id})");
        Ok(SpreadsheetRef { spreadsheet_id, title: title.to_string() })
    }

    fn find_spreadsheet(&self, title: &str) -> RanchoResult<Option<SpreadsheetRef>> {
        let found = self
            .conn
            .query_row(
                "SELECT spreadsheet_id, title FROM spreadsheet WHERE title = ?1",
                params![title],
                |row| {
                    Ok(SpreadsheetRef { spreadsheet_id: row.get(0)?, title: row.get(1)? })
                },
            )
            .optional()?;
        Ok(found)
    }

    fn find_worksheet(
        &self,
        spreadsheet: &SpreadsheetRef,
        title: &str,
    ) -> RanchoResult<Option<WorksheetRef>> {
        let found = self
            .conn
            .query_row(
                "SELECT worksheet_id, title FROM worksheet
                 WHERE spreadsheet_id = ?1 AND title = ?2",
                params![spreadsheet.spreadsheet_id, title],
                |row| Ok(WorksheetRef { worksheet_id: row.get(0)?, title: row.get(1)? }),
            )
            .optional()?;
        Ok(found)
    }

    /// Current grid size as (rows, cols).
    fn grid_size(&self, ws: &WorksheetRef) -> RanchoResult<(u32, u32)> {
        let size = self
            .conn
            .query_row(
                "SELECT row_count, col_count FROM worksheet WHERE worksheet_id = ?1",
                params![ws.worksheet_id],
                |row| Ok((row.get::<_, i64>(0)? as u32, row.get::<_, i64>(1)? as u32)),
            )
            .optional()?;
        size.ok_or_else(|| RanchoError::WorksheetNotFound { title: ws.title.clone() })
    }

    fn resize_grid(&self, ws: &WorksheetRef, rows: u32, cols: u32) -> RanchoResult<()> {
        self.conn.execute(
            "UPDATE worksheet SET row_count = ?1, col_count = ?2 WHERE worksheet_id = ?3",
            params![rows as i64, cols as i64, ws.worksheet_id],
        )?;
        Ok(())
    }
}

impl TabularStore for SheetStore {
    fn open(&self, title: &str) -> RanchoResult<SpreadsheetRef> {
        self.find_spreadsheet(title)?
            .ok_or_else(|| RanchoError::SpreadsheetNotFound { title: title.to_string() })
    }

    fn worksheet(&self, spreadsheet: &SpreadsheetRef, title: &str) -> RanchoResult<WorksheetRef> {
        self.find_worksheet(spreadsheet, title)?
            .ok_or_else(|| RanchoError::WorksheetNotFound { title: title.to_string() })
    }

    fn add_worksheet(
        &self,
        spreadsheet: &SpreadsheetRef,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> RanchoResult<WorksheetRef> {
        if self.find_worksheet(spreadsheet, title)?.is_some() {
            return Err(RanchoError::Api(format!(
                "a sheet with the name '{title}' already exists"
            )));
        }
        self.conn.execute(
            "INSERT INTO worksheet (spreadsheet_id, title, row_count, col_count)
             VALUES (?1, ?2, ?3, ?4)",
            params![spreadsheet.spreadsheet_id, title, rows as i64, cols as i64],
        )?;
        let worksheet_id = self.conn.last_insert_rowid();
        log::debug!("added worksheet '{title}' ({rows}x{cols}) to '{}'", spreadsheet.title);
        Ok(WorksheetRef { worksheet_id, title: title.to_string() })
    }

    fn all_records(&self, ws: &WorksheetRef) -> RanchoResult<RawSheet> {
        self.read_all(ws)
    }

    fn row_values(&self, ws: &WorksheetRef, row: SheetRow) -> RanchoResult<Vec<String>> {
        self.read_row(ws, row)
    }

    fn cell(&self, ws: &WorksheetRef, row: SheetRow, col: SheetCol) -> RanchoResult<String> {
        self.read_cell(ws, row, col)
    }

    fn append_row(
        &self,
        ws: &WorksheetRef,
        values: &[String],
        mode: ValueInputMode,
    ) -> RanchoResult<()> {
        self.append(ws, values, mode)
    }

    fn update_cells(&self, ws: &WorksheetRef, cells: &[CellUpdate]) -> RanchoResult<()> {
        self.write_cells(ws, cells)
    }
}
