//! Integration tests for the cash-flow and daily-totals pages.

use chrono::{NaiveDate, NaiveDateTime};
use rancho_core::{
    cash_flow::BALANCE_COLUMN,
    config::RanchoConfig,
    connector::Connector,
    dashboard::Dashboard,
    error::FailureClass,
    notice::NoticeLevel,
    store::{SheetStore, SpreadsheetFixture, WorksheetFixture},
    table::CellValue,
};
use serde_json::{json, Value};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn dashboard_with(rows: Vec<Vec<Value>>) -> Dashboard {
    let store = SheetStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .import_fixture(&SpreadsheetFixture {
            title:      "Previsao_de_Rancho".into(),
            worksheets: vec![WorksheetFixture { title: "FLUXO DE CAIXA".into(), rows }],
        })
        .expect("import");
    Dashboard::new(RanchoConfig::default(), Connector::with_store(Box::new(store)))
}

fn movement(date: &str, amount: f64) -> Vec<Value> {
    vec![json!(date), json!("Depósito"), json!(amount)]
}

fn header() -> Vec<Value> {
    vec![json!("REGISTRO"), json!("DESCRIÇÃO"), json!("LANÇAMENTOS")]
}

// ─────────────────────────────────────────────────────────────────────────────
// Running balance
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn entries_are_sorted_by_date_with_running_balance() {
    let mut dashboard = dashboard_with(vec![
        header(),
        movement("02/03/2025 10:00:00", 100.0),
        movement("01/03/2025 09:00:00", 200.0),
        movement("03/03/2025 08:00:00", -50.0),
    ]);

    let view = dashboard.cash_flow_page(now());
    let amounts: Vec<f64> = view.report.entries.iter().map(|e| e.amount).collect();
    let balances: Vec<f64> = view.report.entries.iter().map(|e| e.balance).collect();

    assert_eq!(amounts, vec![200.0, 100.0, -50.0]);
    assert_eq!(balances, vec![200.0, 300.0, 250.0]);
    assert_eq!(view.report.current_balance, 250.0);
    assert!(view.notices.is_empty());

    let saldo = view.report.table.column_index(BALANCE_COLUMN).expect("balance column appended");
    assert_eq!(view.report.table.records[2].values[saldo], CellValue::Number(250.0));
}

#[test]
fn rows_with_unreadable_dates_are_skipped_with_a_warning() {
    let mut dashboard = dashboard_with(vec![
        header(),
        movement("01/03/2025 09:00:00", 200.0),
        movement("ontem", 999.0),
        movement("2025-03-02", 999.0),
        movement("02/03/2025 10:00:00", -20.0),
    ]);

    let view = dashboard.cash_flow_page(now());
    assert_eq!(view.report.entries.len(), 2);
    assert_eq!(view.report.current_balance, 180.0);
    assert!(view
        .notices
        .iter()
        .any(|n| n.level == NoticeLevel::Warning && n.message.contains("2 row(s)")));
    // Positions still name the original sheet rows.
    assert_eq!(view.report.entries[1].position, 3);
}

#[test]
fn missing_amount_column_reports_and_shows_nothing() {
    let mut dashboard = dashboard_with(vec![
        vec![json!("REGISTRO"), json!("VALOR")],
        vec![json!("01/03/2025 09:00:00"), json!(10)],
    ]);

    let view = dashboard.cash_flow_page(now());
    assert!(view.report.is_empty());
    assert_eq!(view.report.current_balance, 0.0);
    assert!(view.notices.iter().any(|n| n.class == Some(FailureClass::Schema)));
}

#[test]
fn empty_cash_flow_sheet_is_informational() {
    let mut dashboard = dashboard_with(vec![header()]);
    let view = dashboard.cash_flow_page(now());
    assert!(view.report.is_empty());
    assert!(view.notices.contains_level(NoticeLevel::Info));
    assert!(!view.notices.has_errors());
}

// ─────────────────────────────────────────────────────────────────────────────
// Daily totals
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn daily_totals_group_by_calendar_day() {
    let mut dashboard = dashboard_with(vec![
        header(),
        movement("01/03/2025 09:00:00", 200.0),
        movement("01/03/2025 18:30:00", -30.0),
        movement("03/03/2025 08:00:00", 50.0),
        movement("01/03/2025 12:00:00", 10.0),
    ]);

    let view = dashboard.daily_totals_page(now());
    assert_eq!(view.days.len(), 2);

    let first = &view.days[0];
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    assert_eq!(first.entries, 3);
    assert_eq!(first.inflow, 210.0);
    assert_eq!(first.outflow, 30.0);
    assert_eq!(first.net, 180.0);
    assert_eq!(first.closing_balance, 180.0);

    let second = &view.days[1];
    assert_eq!(second.entries, 1);
    assert_eq!(second.closing_balance, 230.0);
    assert_eq!(view.current_balance, 230.0);
}

#[test]
fn daily_totals_of_an_empty_sheet_are_empty() {
    let mut dashboard = dashboard_with(vec![header()]);
    let view = dashboard.daily_totals_page(now());
    assert!(view.days.is_empty());
    assert_eq!(view.current_balance, 0.0);
}
