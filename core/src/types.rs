//! Shared primitive types used across the dashboard.

/// 0-based position of a data row in the table as it was loaded.
pub type RowPosition = usize;

/// 1-based row number in the backing sheet (row 1 is the header).
pub type SheetRow = u32;

/// 1-based column number in the backing sheet.
pub type SheetCol = u32;
