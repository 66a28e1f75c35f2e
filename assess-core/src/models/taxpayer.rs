use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One registered entity's tax obligation.
///
/// Records are created only by registration and never deleted. `last_paid`
/// starts at 0 and moves forward only through a successful payment, so it is
/// monotonically non-decreasing for the life of the record. `tax_rate` is
/// fixed at registration time and no operation mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxpayer {
    /// Declared income. Mutable only via an explicit income update.
    pub income: Decimal,

    /// Timestamp of the last accepted payment, in seconds (epoch or logical
    /// time — the ledger never consults a clock itself).
    pub last_paid: i64,

    /// Tax rate as a percentage (e.g. 5 means 5%).
    pub tax_rate: Decimal,
}

/// Read-only projection of a taxpayer record, as returned by
/// [`AssessmentLedger::get_tax_details`](crate::AssessmentLedger::get_tax_details).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDetails {
    pub income: Decimal,
    pub last_paid: i64,
    pub tax_rate: Decimal,
}

impl From<&Taxpayer> for TaxDetails {
    fn from(taxpayer: &Taxpayer) -> Self {
        TaxDetails {
            income: taxpayer.income,
            last_paid: taxpayer.last_paid,
            tax_rate: taxpayer.tax_rate,
        }
    }
}
