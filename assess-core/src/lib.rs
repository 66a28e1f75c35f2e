pub mod ledger;
pub mod models;

pub use ledger::{AssessmentLedger, LedgerError, PAYMENT_PERIOD_SECONDS, TAX_RATE_PERCENT};
pub use models::*;
