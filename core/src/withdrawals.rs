//! Manual cash withdrawals (retiradas) appended to their own sheet.
//!
//! Amounts are entered as positive numbers and stored negated, so the sheet
//! can be summed straight into the cash flow.

use crate::{
    config::WithdrawalConfig,
    connector::StoreHandle,
    error::{FailureClass, RanchoError, RanchoResult},
    notice::Notices,
    store::{SpreadsheetRef, TabularStore, ValueInputMode, WorksheetRef},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WithdrawalForm {
    /// Required. What the money was for.
    pub reason:  String,
    pub place:   String,
    /// Required. What was bought.
    pub product: String,
    /// Required, positive.
    pub amount:  f64,
}

impl WithdrawalForm {
    pub fn validate(&self) -> RanchoResult<()> {
        if self.reason.trim().is_empty()
            || self.product.trim().is_empty()
            || !self.amount.is_finite()
            || self.amount <= 0.0
        {
            return Err(RanchoError::Validation(
                "fill in every required field (*) with valid values".into(),
            ));
        }
        Ok(())
    }

    /// The row as written: timestamp, reason, place, product, negated amount.
    pub fn to_row(&self, now: NaiveDateTime, cfg: &WithdrawalConfig) -> Vec<String> {
        vec![
            now.format(&cfg.timestamp_format).to_string(),
            self.reason.clone(),
            self.place.clone(),
            self.product.clone(),
            (-self.amount).to_string(),
        ]
    }
}

/// Validate and append `form`. Returns true when the row was written.
pub fn submit_withdrawal(
    handle: Option<&StoreHandle>,
    spreadsheet: &str,
    cfg: &WithdrawalConfig,
    form: &WithdrawalForm,
    now: NaiveDateTime,
    notices: &mut Notices,
) -> bool {
    if form.validate().is_err() {
        notices.warning(
            Some(FailureClass::Validation),
            "Please fill in every required field (*) with valid values.",
        );
        return false;
    }
    let Some(handle) = handle else {
        notices.error(
            FailureClass::Connectivity,
            "No connection to the spreadsheet store; the withdrawal was not recorded.",
        );
        return false;
    };

    match append_withdrawal(handle.store(), spreadsheet, cfg, form, now, notices) {
        Ok(()) => {
            notices.success("Withdrawal recorded in the spreadsheet.");
            true
        }
        Err(RanchoError::SpreadsheetNotFound { .. }) => {
            notices.error(
                FailureClass::Schema,
                format!(
                    "Spreadsheet '{spreadsheet}' was not found. Check the name and the \
                     service account permissions."
                ),
            );
            false
        }
        Err(err) => {
            notices.failure("Error while sending the withdrawal", &err);
            false
        }
    }
}

fn append_withdrawal(
    store: &dyn TabularStore,
    spreadsheet: &str,
    cfg: &WithdrawalConfig,
    form: &WithdrawalForm,
    now: NaiveDateTime,
    notices: &mut Notices,
) -> RanchoResult<()> {
    let book = store.open(spreadsheet)?;
    let ws = withdrawal_sheet(store, &book, cfg, notices)?;
    store.append_row(&ws, &form.to_row(now, cfg), ValueInputMode::UserEntered)?;
    log::info!("withdrawal of {:.2} recorded in '{}'", form.amount, cfg.sheet);
    Ok(())
}

/// The withdrawals sheet, created with its header row when missing.
fn withdrawal_sheet(
    store: &dyn TabularStore,
    book: &SpreadsheetRef,
    cfg: &WithdrawalConfig,
    notices: &mut Notices,
) -> RanchoResult<WorksheetRef> {
    match store.worksheet(book, &cfg.sheet) {
        Ok(ws) => Ok(ws),
        Err(RanchoError::WorksheetNotFound { .. }) => {
            notices.info(format!("Sheet '{}' not found. Creating a new one...", cfg.sheet));
            let ws =
                store.add_worksheet(book, &cfg.sheet, cfg.new_sheet_rows, cfg.new_sheet_cols)?;
            store.append_row(&ws, &cfg.header, ValueInputMode::UserEntered)?;
            Ok(ws)
        }
        Err(err) => Err(err),
    }
}
