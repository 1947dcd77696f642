//! Page handlers. Each interaction is one synchronous call: the action comes
//! in, the page re-evaluates against the (possibly cached) sheet data, and a
//! view comes out for the front end to draw.
//!
//! Pages:
//!   - person:       search by RE and settle (see settlement.rs)
//!   - cash flow:    running balance history
//!   - daily totals: cash flow grouped per day
//!   - withdrawals:  form that appends a negative entry

use crate::{
    cash_flow::{self, CashFlowReport},
    config::{PersonSheetConfig, RanchoConfig},
    connector::Connector,
    daily_totals::{daily_totals, DailyTotal},
    loader::TableCache,
    notice::Notices,
    settlement::{SettlementSession, SettlementView},
    table::{ColumnSpec, Table},
    withdrawals::{submit_withdrawal, WithdrawalForm},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PersonAction {
    /// Plain re-render, e.g. on page load.
    Refresh,
    Search { query: String },
    Settle,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonPageView {
    pub notices:     Notices,
    pub query_input: String,
    #[serde(flatten)]
    pub settlement:  SettlementView,
    /// Every row of the sheet, for the "all data" panel.
    pub table:       Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowView {
    pub notices: Notices,
    pub report:  CashFlowReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTotalsView {
    pub notices:         Notices,
    pub days:            Vec<DailyTotal>,
    pub current_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalView {
    pub notices:  Notices,
    pub recorded: bool,
}

/// Type coercion for the form-responses sheet.
pub fn person_column_spec(cfg: &PersonSheetConfig) -> ColumnSpec {
    let mut spec = ColumnSpec::new();
    for column in &cfg.text_columns {
        spec = spec.text(column);
    }
    for column in [&cfg.key_column, &cfg.flag_column] {
        if spec.rule(column).is_none() {
            spec = spec.text(column);
        }
    }
    spec.numeric(&cfg.amount_column)
}

pub struct Dashboard {
    pub config: RanchoConfig,
    connector:  Connector,
    cache:      TableCache,
}

impl Dashboard {
    pub fn new(config: RanchoConfig, connector: Connector) -> Self {
        let cache = TableCache::new(config.cache_ttl());
        Self { config, connector, cache }
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    pub fn person_page(
        &mut self,
        session: &mut SettlementSession,
        action: PersonAction,
        now: NaiveDateTime,
    ) -> PersonPageView {
        let mut notices = Notices::new();
        let cfg = &self.config;
        let spec = person_column_spec(&cfg.person);
        let handle = self.connector.handle(&mut notices);
        let mut table =
            self.cache.load(handle, &cfg.spreadsheet, &cfg.person.sheet, &spec, now, &mut notices);

        if table.is_empty() {
            notices.warning(None, "Could not load the spreadsheet data to start the dashboard.");
            return PersonPageView {
                notices,
                query_input: session.query_input.clone(),
                settlement: SettlementView::default(),
                table,
            };
        }

        // A settlement confirmed on an earlier interaction is announced first.
        if session.acknowledge(&mut notices) {
            self.cache.invalidate();
            table = self.cache.load(
                handle,
                &cfg.spreadsheet,
                &cfg.person.sheet,
                &spec,
                now,
                &mut notices,
            );
        }

        match action {
            PersonAction::Refresh => {}
            PersonAction::Search { query } => {
                session.search(&table, &cfg.person, &query, &mut notices);
            }
            PersonAction::Settle => {
                if session.settle(handle, &cfg.spreadsheet, &cfg.person, &mut notices)
                    && session.acknowledge(&mut notices)
                {
                    self.cache.invalidate();
                    table = self.cache.load(
                        handle,
                        &cfg.spreadsheet,
                        &cfg.person.sheet,
                        &spec,
                        now,
                        &mut notices,
                    );
                }
            }
        }

        let settlement = session.view(&cfg.person, &mut notices);
        PersonPageView { notices, query_input: session.query_input.clone(), settlement, table }
    }

    pub fn cash_flow_page(&mut self, now: NaiveDateTime) -> CashFlowView {
        let mut notices = Notices::new();
        let report = self.load_cash_flow(now, &mut notices);
        CashFlowView { notices, report }
    }

    pub fn daily_totals_page(&mut self, now: NaiveDateTime) -> DailyTotalsView {
        let mut notices = Notices::new();
        let report = self.load_cash_flow(now, &mut notices);
        DailyTotalsView {
            days: daily_totals(&report),
            current_balance: report.current_balance,
            notices,
        }
    }

    pub fn submit_withdrawal(&mut self, form: &WithdrawalForm, now: NaiveDateTime) -> WithdrawalView {
        let mut notices = Notices::new();
        let cfg = &self.config;
        let handle = self.connector.handle(&mut notices);
        let recorded =
            submit_withdrawal(handle, &cfg.spreadsheet, &cfg.withdrawals, form, now, &mut notices);
        if recorded {
            self.cache.invalidate();
        }
        WithdrawalView { notices, recorded }
    }

    fn load_cash_flow(&mut self, now: NaiveDateTime, notices: &mut Notices) -> CashFlowReport {
        let cfg = &self.config;
        let spec = cash_flow::column_spec(&cfg.cash_flow);
        let handle = self.connector.handle(notices);
        let table =
            self.cache.load(handle, &cfg.spreadsheet, &cfg.cash_flow.sheet, &spec, now, notices);
        CashFlowReport::from_table(&table, &cfg.cash_flow)
    }
}
