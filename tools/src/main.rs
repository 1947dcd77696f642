//! rancho-runner: headless front end for the Rancho dashboard.
//!
//! Usage:
//!   rancho-runner --data-dir ./data --page cash-flow
//!   rancho-runner --db rancho.db --fixture demos/seed.json --page person --re 123 --settle
//!   rancho-runner --data-dir ./data --ipc-mode

use anyhow::Result;
use rancho_core::{
    config::RanchoConfig,
    connector::Connector,
    dashboard::{CashFlowView, Dashboard, DailyTotalsView, PersonAction, PersonPageView},
    notice::{NoticeLevel, Notices},
    settlement::SettlementSession,
    store::SheetStore,
    withdrawals::WithdrawalForm,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Refresh,
    Search { query: String },
    Settle,
    CashFlow,
    DailyTotals,
    Withdraw(WithdrawalForm),
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let db = string_arg(&args, "--db");
    let fixture = string_arg(&args, "--fixture");
    let page = string_arg(&args, "--page").unwrap_or("all");
    let re = string_arg(&args, "--re");
    let settle = args.iter().any(|a| a == "--settle");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let config = RanchoConfig::load_or_default(data_dir)?;

    let connector = match db {
        Some(path) => {
            let store = SheetStore::open(path)?;
            store.migrate()?;
            if let Some(fixture_path) = fixture {
                let json = std::fs::read_to_string(fixture_path)?;
                store.import_fixture_json(&json)?;
            }
            Connector::with_store(Box::new(store))
        }
        None => {
            if fixture.is_some() {
                log::warn!("--fixture needs --db; ignoring it");
            }
            Connector::new(data_dir)
        }
    };

    let mut dashboard = Dashboard::new(config, connector);
    let mut session = SettlementSession::new();

    if ipc_mode {
        return run_ipc_loop(&mut dashboard, &mut session);
    }

    println!("Rancho dashboard: rancho-runner");
    println!("  data_dir:  {data_dir}");
    println!("  store:     {}", db.unwrap_or("(credentials)"));
    println!();

    if page == "person" || page == "all" {
        let view = match re {
            Some(query) => {
                dashboard.person_page(&mut session, PersonAction::Search { query: query.into() }, now())
            }
            None => dashboard.person_page(&mut session, PersonAction::Refresh, now()),
        };
        print_person(&view);
        if settle && view.settlement.settle_offered {
            let view = dashboard.person_page(&mut session, PersonAction::Settle, now());
            print_person(&view);
        }
    }
    if page == "cash-flow" || page == "all" {
        print_cash_flow(&dashboard.cash_flow_page(now()));
    }
    if page == "daily" || page == "all" {
        print_daily(&dashboard.daily_totals_page(now()));
    }
    Ok(())
}

fn run_ipc_loop(dashboard: &mut Dashboard, session: &mut SettlementSession) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let out = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Refresh => {
                serde_json::to_string(&dashboard.person_page(session, PersonAction::Refresh, now()))?
            }
            IpcCommand::Search { query } => serde_json::to_string(&dashboard.person_page(
                session,
                PersonAction::Search { query },
                now(),
            ))?,
            IpcCommand::Settle => {
                serde_json::to_string(&dashboard.person_page(session, PersonAction::Settle, now()))?
            }
            IpcCommand::CashFlow => serde_json::to_string(&dashboard.cash_flow_page(now()))?,
            IpcCommand::DailyTotals => serde_json::to_string(&dashboard.daily_totals_page(now()))?,
            IpcCommand::Withdraw(form) => {
                serde_json::to_string(&dashboard.submit_withdrawal(&form, now()))?
            }
        };
        writeln!(stdout, "{out}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_notices(notices: &Notices) {
    for n in notices.iter() {
        let tag = match n.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "ERROR",
        };
        println!("  [{tag}] {}", n.message);
    }
}

fn print_person(view: &PersonPageView) {
    println!("=== VALUES PER PERSON ===");
    print_notices(&view.notices);
    println!("  rows loaded:    {}", view.table.len());
    if let Some(projection) = &view.settlement.projection {
        println!("  {}", projection.columns.join(" | "));
        for row in &projection.rows {
            let cells: Vec<String> = row.cells.iter().map(|c| c.as_text()).collect();
            println!("  {}  (sheet row {})", cells.join(" | "), row.sheet_row);
        }
        println!("  TOTAL DUE:      R$ {:.2}", projection.aggregate_due);
        if view.settlement.settle_offered {
            println!("  (settlement available: rerun with --settle)");
        }
    }
    println!();
}

fn print_cash_flow(view: &CashFlowView) {
    println!("=== CASH FLOW ===");
    print_notices(&view.notices);
    if !view.report.is_empty() {
        println!("  current balance: R$ {:.2}", view.report.current_balance);
        for e in &view.report.entries {
            println!(
                "  {} | {:>10.2} | balance {:>10.2}",
                e.timestamp.format("%d/%m/%Y %H:%M"),
                e.amount,
                e.balance
            );
        }
    }
    println!();
}

fn print_daily(view: &DailyTotalsView) {
    println!("=== DAILY TOTALS ===");
    print_notices(&view.notices);
    for d in &view.days {
        println!(
            "  {} | in {:>9.2} | out {:>9.2} | net {:>9.2} | close {:>10.2}",
            d.date.format("%d/%m/%Y"),
            d.inflow,
            d.outflow,
            d.net,
            d.closing_balance
        );
    }
    println!();
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
