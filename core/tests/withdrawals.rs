//! Integration tests for recording withdrawals.

use chrono::{NaiveDate, NaiveDateTime};
use rancho_core::{
    config::RanchoConfig,
    connector::{Connector, StoreHandle},
    dashboard::Dashboard,
    error::FailureClass,
    notice::{NoticeLevel, Notices},
    store::{SheetStore, SpreadsheetFixture, TabularStore, WorksheetFixture},
    withdrawals::{submit_withdrawal, WithdrawalForm},
};
use serde_json::{json, Value};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(14, 5, 9).unwrap()
}

fn store_with(worksheets: Vec<(&str, Vec<Vec<Value>>)>) -> SheetStore {
    let store = SheetStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .import_fixture(&SpreadsheetFixture {
            title:      "Previsao_de_Rancho".into(),
            worksheets: worksheets
                .into_iter()
                .map(|(title, rows)| WorksheetFixture { title: title.into(), rows })
                .collect(),
        })
        .expect("import");
    store
}

fn form() -> WithdrawalForm {
    WithdrawalForm {
        reason:  "Compra de pão".into(),
        place:   "Padaria".into(),
        product: "Pão francês".into(),
        amount:  42.5,
    }
}

fn withdrawal_rows(handle: &StoreHandle) -> (Vec<String>, Vec<Vec<String>>) {
    let store = handle.store();
    let book = store.open("Previsao_de_Rancho").unwrap();
    let ws = store.worksheet(&book, "RETIRADAS").unwrap();
    let raw = store.all_records(&ws).unwrap();
    (raw.header, raw.rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn required_fields_are_enforced() {
    assert!(form().validate().is_ok());
    assert!(WithdrawalForm { reason: "  ".into(), ..form() }.validate().is_err());
    assert!(WithdrawalForm { product: String::new(), ..form() }.validate().is_err());
    assert!(WithdrawalForm { amount: 0.0, ..form() }.validate().is_err());
    assert!(WithdrawalForm { amount: -3.0, ..form() }.validate().is_err());
    assert!(WithdrawalForm { amount: f64::NAN, ..form() }.validate().is_err());
    assert!(WithdrawalForm { place: String::new(), ..form() }.validate().is_ok(), "place is optional");
}

#[test]
fn invalid_form_never_touches_the_store() {
    let cfg = RanchoConfig::default();
    let handle = StoreHandle::new(Box::new(store_with(vec![("FLUXO DE CAIXA", vec![])])));
    let mut notices = Notices::new();

    let bad = WithdrawalForm { amount: 0.0, ..form() };
    assert!(!submit_withdrawal(Some(&handle), &cfg.spreadsheet, &cfg.withdrawals, &bad, now(), &mut notices));
    assert!(notices.iter().any(|n| n.class == Some(FailureClass::Validation)));

    let store = handle.store();
    let book = store.open("Previsao_de_Rancho").unwrap();
    assert!(store.worksheet(&book, "RETIRADAS").is_err(), "sheet not created");
}

// ─────────────────────────────────────────────────────────────────────────────
// Appending
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn first_withdrawal_creates_the_sheet_with_header() {
    let cfg = RanchoConfig::default();
    let handle = StoreHandle::new(Box::new(store_with(vec![("FLUXO DE CAIXA", vec![])])));
    let mut notices = Notices::new();

    assert!(submit_withdrawal(Some(&handle), &cfg.spreadsheet, &cfg.withdrawals, &form(), now(), &mut notices));
    assert!(notices.contains_level(NoticeLevel::Info), "creation is announced");
    assert!(notices.contains_level(NoticeLevel::Success));

    let (header, rows) = withdrawal_rows(&handle);
    assert_eq!(header, cfg.withdrawals.header);
    assert_eq!(
        rows,
        vec![vec![
            "10/03/2025 14:05:09".to_string(),
            "Compra de pão".into(),
            "Padaria".into(),
            "Pão francês".into(),
            "-42.5".into(),
        ]]
    );
}

#[test]
fn later_withdrawals_append_below_existing_rows() {
    let cfg = RanchoConfig::default();
    let header: Vec<Value> = cfg.withdrawals.header.iter().map(|h| json!(h)).collect();
    let handle = StoreHandle::new(Box::new(store_with(vec![(
        "RETIRADAS",
        vec![
            header,
            vec![json!("01/03/2025 08:00:00"), json!("Gás"), json!(""), json!("Botijão"), json!(-110)],
        ],
    )])));
    let mut notices = Notices::new();

    let small = WithdrawalForm { place: String::new(), amount: 7.0, ..form() };
    assert!(submit_withdrawal(Some(&handle), &cfg.spreadsheet, &cfg.withdrawals, &small, now(), &mut notices));
    assert!(!notices.contains_level(NoticeLevel::Info), "existing sheet is reused silently");

    let (_, rows) = withdrawal_rows(&handle);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2], "");
    assert_eq!(rows[1][4], "-7");
}

#[test]
fn missing_spreadsheet_is_reported() {
    let cfg = RanchoConfig::default();
    let handle = StoreHandle::new(Box::new(store_with(vec![])));
    let mut notices = Notices::new();

    assert!(!submit_withdrawal(Some(&handle), "Planilha Errada", &cfg.withdrawals, &form(), now(), &mut notices));
    assert!(notices.iter().any(|n| n.class == Some(FailureClass::Schema)
        && n.message.contains("Planilha Errada")));
}

#[test]
fn no_connection_is_reported() {
    let cfg = RanchoConfig::default();
    let mut notices = Notices::new();
    assert!(!submit_withdrawal(None, &cfg.spreadsheet, &cfg.withdrawals, &form(), now(), &mut notices));
    assert!(notices.iter().any(|n| n.class == Some(FailureClass::Connectivity)));
}

#[test]
fn recorded_withdrawal_invalidates_cached_sheets() {
    // Point the cash-flow page at the withdrawal sheet itself.
    let mut cfg = RanchoConfig::default();
    cfg.cash_flow.sheet = "RETIRADAS".into();
    cfg.cash_flow.date_column = "Data/Hora".into();
    cfg.cash_flow.amount_column = "Valor".into();

    let header: Vec<Value> = cfg.withdrawals.header.iter().map(|h| json!(h)).collect();
    let store = store_with(vec![(
        "RETIRADAS",
        vec![header, vec![json!("01/03/2025 08:00:00"), json!("Gás"), json!(""), json!("Botijão"), json!(-110)]],
    )]);
    let mut dashboard = Dashboard::new(cfg, Connector::with_store(Box::new(store)));

    assert_eq!(dashboard.cash_flow_page(now()).report.current_balance, -110.0);

    let view = dashboard.submit_withdrawal(&form(), now());
    assert!(view.recorded);

    assert_eq!(dashboard.cash_flow_page(now()).report.current_balance, -152.5);
}
