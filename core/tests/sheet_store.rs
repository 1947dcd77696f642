//! Integration tests for the SQLite-backed spreadsheet store.

use rancho_core::{
    error::RanchoError,
    store::{CellUpdate, SheetStore, TabularStore, ValueInputMode, WorksheetRef},
};

fn store_with_sheet(rows: u32, cols: u32) -> (SheetStore, WorksheetRef) {
    let store = SheetStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let book = store.create_spreadsheet("Previsao_de_Rancho").unwrap();
    let ws = store.add_worksheet(&book, "Sheet", rows, cols).unwrap();
    (store, ws)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_titles_are_not_found() {
    let (store, _) = store_with_sheet(10, 5);
    assert!(matches!(
        store.open("Missing"),
        Err(RanchoError::SpreadsheetNotFound { .. })
    ));
    let book = store.open("Previsao_de_Rancho").unwrap();
    assert!(matches!(
        store.worksheet(&book, "Missing"),
        Err(RanchoError::WorksheetNotFound { .. })
    ));
}

#[test]
fn duplicate_worksheet_is_rejected() {
    let (store, _) = store_with_sheet(10, 5);
    let book = store.open("Previsao_de_Rancho").unwrap();
    assert!(matches!(store.add_worksheet(&book, "Sheet", 10, 5), Err(RanchoError::Api(_))));
}

#[test]
fn migrate_is_repeatable() {
    let (store, _) = store_with_sheet(10, 5);
    store.migrate().expect("second migration is a no-op");
    assert!(store.open("Previsao_de_Rancho").is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Reads and appends
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn appends_land_after_the_last_used_row() {
    let (store, ws) = store_with_sheet(10, 5);
    store.append_row(&ws, &strings(&["A", "B", "C"]), ValueInputMode::Raw).unwrap();
    store.append_row(&ws, &strings(&["1", "", "x"]), ValueInputMode::Raw).unwrap();
    store.append_row(&ws, &strings(&["2"]), ValueInputMode::Raw).unwrap();

    let raw = store.all_records(&ws).unwrap();
    assert_eq!(raw.header, strings(&["A", "B", "C"]));
    assert_eq!(raw.rows, vec![strings(&["1", "", "x"]), strings(&["2", "", ""])]);

    assert_eq!(store.row_values(&ws, 3).unwrap(), strings(&["2"]), "trailing empties trimmed");
    assert_eq!(store.cell(&ws, 2, 3).unwrap(), "x");
    assert_eq!(store.cell(&ws, 9, 5).unwrap(), "", "unset cells read empty");
}

#[test]
fn user_entered_values_are_interpreted() {
    let (store, ws) = store_with_sheet(10, 5);
    store
        .append_row(&ws, &strings(&["-42.50", "=SUM(A1:A2)", "Padaria"]), ValueInputMode::UserEntered)
        .unwrap();

    assert_eq!(store.cell(&ws, 1, 1).unwrap(), "-42.5");
    assert_eq!(store.cell(&ws, 1, 3).unwrap(), "Padaria");
    assert_eq!(store.formula(&ws, 1, 2).unwrap().as_deref(), Some("=SUM(A1:A2)"));
    assert_eq!(store.formula(&ws, 1, 1).unwrap(), None);
}

#[test]
fn appending_past_the_grid_grows_it() {
    let (store, ws) = store_with_sheet(1, 2);
    store.append_row(&ws, &strings(&["A", "B"]), ValueInputMode::Raw).unwrap();
    store.append_row(&ws, &strings(&["1", "2", "3"]), ValueInputMode::Raw).unwrap();

    // Row 2 col 3 now exists, so a batch write there succeeds.
    store
        .update_cells(&ws, &[CellUpdate { row: 2, col: 3, value: "z".into() }])
        .unwrap();
    assert_eq!(store.cell(&ws, 2, 3).unwrap(), "z");
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch updates
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn batch_update_writes_every_cell() {
    let (store, ws) = store_with_sheet(10, 5);
    store
        .update_cells(
            &ws,
            &[
                CellUpdate { row: 2, col: 5, value: "Sim".into() },
                CellUpdate { row: 4, col: 5, value: "Sim".into() },
            ],
        )
        .unwrap();
    assert_eq!(store.cell(&ws, 2, 5).unwrap(), "Sim");
    assert_eq!(store.cell(&ws, 3, 5).unwrap(), "");
    assert_eq!(store.cell(&ws, 4, 5).unwrap(), "Sim");
}

#[test]
fn batch_update_out_of_grid_writes_nothing() {
    let (store, ws) = store_with_sheet(10, 5);
    let err = store
        .update_cells(
            &ws,
            &[
                CellUpdate { row: 2, col: 5, value: "Sim".into() },
                CellUpdate { row: 11, col: 5, value: "Sim".into() },
            ],
        )
        .unwrap_err();

    assert!(matches!(err, RanchoError::Api(ref m) if m.contains("exceeds grid limits")));
    assert_eq!(store.cell(&ws, 2, 5).unwrap(), "", "valid cell in a rejected batch is not written");
}

#[test]
fn batch_update_clears_formulas() {
    let (store, ws) = store_with_sheet(10, 5);
    store.append_row(&ws, &strings(&["=1+1"]), ValueInputMode::UserEntered).unwrap();
    store
        .update_cells(&ws, &[CellUpdate { row: 1, col: 1, value: "2".into() }])
        .unwrap();
    assert_eq!(store.formula(&ws, 1, 1).unwrap(), None);
    assert_eq!(store.cell(&ws, 1, 1).unwrap(), "2");
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn fixture_import_replaces_existing_worksheets() {
    let store = SheetStore::in_memory().unwrap();
    store.migrate().unwrap();
    let first = r#"{ "title": "Book", "worksheets": [
        { "title": "S", "rows": [["H1", "H2"], ["a", 1], ["b", 2]] } ] }"#;
    let second = r#"{ "title": "Book", "worksheets": [
        { "title": "S", "rows": [["H1"], [null], ["c"]] } ] }"#;

    let book = store.import_fixture_json(first).unwrap();
    let again = store.import_fixture_json(second).unwrap();
    assert_eq!(book, again, "spreadsheet identity is reused");

    let ws = store.worksheet(&again, "S").unwrap();
    let raw = store.all_records(&ws).unwrap();
    assert_eq!(raw.header, strings(&["H1"]));
    assert_eq!(raw.rows, vec![strings(&[""]), strings(&["c"])]);
}

#[test]
fn malformed_fixture_is_a_serialization_error() {
    let store = SheetStore::in_memory().unwrap();
    store.migrate().unwrap();
    assert!(matches!(
        store.import_fixture_json("{ not json"),
        Err(RanchoError::Serialization(_))
    ));
}
