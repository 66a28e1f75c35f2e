//! The taxpayer assessment ledger and its five operations.
//!
//! A ledger holds a single administrator identity and a map of registered
//! taxpayers. All operations are synchronous, single-threaded mutations of
//! that in-memory state: each call is one check-then-mutate step, and a
//! failed check leaves the ledger exactly as it was.
//!
//! The sender's identity is passed as a plain argument with every call.
//! There is no ambient session and no authentication layer; callers are
//! trusted to identify themselves honestly.
//!
//! # Operations
//!
//! | Operation | Authorization | Failure modes |
//! |-----------|---------------|---------------|
//! | `register_taxpayer` | admin only | `NotAuthorized`, `AlreadyRegistered` |
//! | `pay_tax` | registered sender | `NotRegistered`, `TooEarly` |
//! | `update_income` | registered sender | `NotRegistered` |
//! | `get_tax_details` | registered sender | `NotRegistered` |
//! | `transfer_admin` | admin only | `NotAuthorized` |
//!
//! # Example
//!
//! ```
//! use assess_core::{AssessmentLedger, PAYMENT_PERIOD_SECONDS};
//! use rust_decimal_macros::dec;
//!
//! let mut ledger = AssessmentLedger::new("admin");
//! ledger.register_taxpayer("admin", "alice", dec!(100000)).unwrap();
//!
//! let amount = ledger.pay_tax("alice", PAYMENT_PERIOD_SECONDS + 1).unwrap();
//! assert_eq!(amount, dec!(5000));
//! ```

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{TaxDetails, Taxpayer};

/// Interval that must elapse between successive payments: one year in seconds.
pub const PAYMENT_PERIOD_SECONDS: i64 = 31_556_926;

/// Tax rate assigned to every taxpayer at registration, as a percentage.
pub const TAX_RATE_PERCENT: u32 = 5;

/// Errors surfaced by ledger operations.
///
/// Every error is terminal for the call: no retry, no partial state change.
/// The numeric wire codes returned by [`LedgerError::code`] match the
/// original assessment contract's error constants.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The sender is not the current admin (admin-only operations).
    #[error("sender is not the current admin")]
    NotAuthorized,

    /// The entity already has a taxpayer record.
    #[error("entity is already registered")]
    AlreadyRegistered,

    /// The sender has no taxpayer record.
    #[error("sender is not a registered taxpayer")]
    NotRegistered,

    /// Payment attempted before the due period elapsed.
    #[error("payment attempted before the due period elapsed")]
    TooEarly,
}

impl LedgerError {
    /// The numeric error code used when presenting results as tagged
    /// `{value}` / `{error}` outcomes.
    pub fn code(&self) -> u32 {
        match self {
            Self::NotAuthorized => 100,
            Self::AlreadyRegistered => 101,
            Self::NotRegistered => 102,
            Self::TooEarly => 103,
        }
    }
}

/// In-memory assessment ledger: one admin, one record per registered payer.
///
/// The ledger is an explicit state object, not a singleton — callers own it
/// and may hold as many independent ledgers as they like (tests do).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentLedger {
    admin: String,
    taxpayers: HashMap<String, Taxpayer>,
}

impl AssessmentLedger {
    /// Creates an empty ledger with the designated admin.
    pub fn new(admin: impl Into<String>) -> Self {
        AssessmentLedger {
            admin: admin.into(),
            taxpayers: HashMap::new(),
        }
    }

    /// The current admin identity.
    pub fn admin(&self) -> &str {
        &self.admin
    }

    fn is_admin(&self, sender: &str) -> bool {
        sender == self.admin
    }

    /// Returns the stored record for `entity`, if any. Read-only; mainly
    /// useful to test harnesses asserting on raw state.
    pub fn taxpayer(&self, entity: &str) -> Option<&Taxpayer> {
        self.taxpayers.get(entity)
    }

    /// Registers `entity` as a taxpayer with the given income.
    ///
    /// Admin only. The new record starts with `last_paid = 0` and the fixed
    /// rate [`TAX_RATE_PERCENT`]. An entity can be registered at most once
    /// for the ledger's lifetime; a second attempt fails with
    /// [`LedgerError::AlreadyRegistered`] and leaves the first record intact.
    pub fn register_taxpayer(
        &mut self,
        sender: &str,
        entity: &str,
        income: Decimal,
    ) -> Result<(), LedgerError> {
        if !self.is_admin(sender) {
            return Err(LedgerError::NotAuthorized);
        }
        if self.taxpayers.contains_key(entity) {
            return Err(LedgerError::AlreadyRegistered);
        }

        self.taxpayers.insert(
            entity.to_string(),
            Taxpayer {
                income,
                last_paid: 0,
                tax_rate: Decimal::from(TAX_RATE_PERCENT),
            },
        );
        Ok(())
    }

    /// Accepts a periodic payment from `sender` at the given timestamp.
    ///
    /// Fails with [`LedgerError::TooEarly`] while
    /// `timestamp < last_paid + PAYMENT_PERIOD_SECONDS`. On success the
    /// amount due is `income * tax_rate / 100`, computed with the income at
    /// the time of payment, and `last_paid` becomes exactly `timestamp`.
    /// `last_paid` is updated on no other path.
    pub fn pay_tax(&mut self, sender: &str, timestamp: i64) -> Result<Decimal, LedgerError> {
        let taxpayer = self
            .taxpayers
            .get_mut(sender)
            .ok_or(LedgerError::NotRegistered)?;

        let due_time = taxpayer.last_paid + PAYMENT_PERIOD_SECONDS;
        if timestamp < due_time {
            return Err(LedgerError::TooEarly);
        }

        let amount_due = taxpayer.income * taxpayer.tax_rate / Decimal::ONE_HUNDRED;
        taxpayer.last_paid = timestamp;
        Ok(amount_due)
    }

    /// Overwrites the sender's declared income.
    ///
    /// No bounds validation is performed: any value, including a negative
    /// one, is stored as-is. A negative value is logged and accepted.
    pub fn update_income(&mut self, sender: &str, new_income: Decimal) -> Result<(), LedgerError> {
        let taxpayer = self
            .taxpayers
            .get_mut(sender)
            .ok_or(LedgerError::NotRegistered)?;

        if new_income < Decimal::ZERO {
            warn!(%sender, %new_income, "storing negative income");
        }
        taxpayer.income = new_income;
        Ok(())
    }

    /// Returns the sender's record as a read-only projection.
    ///
    /// Pure read, no side effect. An unregistered sender gets
    /// [`LedgerError::NotRegistered`], never a default record.
    pub fn get_tax_details(&self, sender: &str) -> Result<TaxDetails, LedgerError> {
        self.taxpayers
            .get(sender)
            .map(TaxDetails::from)
            .ok_or(LedgerError::NotRegistered)
    }

    /// Transfers the admin role to `new_admin`.
    ///
    /// Admin only. The identifier is overwritten unconditionally — no
    /// well-formedness or distinctness check on `new_admin`.
    pub fn transfer_admin(&mut self, sender: &str, new_admin: &str) -> Result<(), LedgerError> {
        if !self.is_admin(sender) {
            return Err(LedgerError::NotAuthorized);
        }

        debug!(from = %self.admin, to = %new_admin, "admin transferred");
        self.admin = new_admin.to_string();
        Ok(())
    }
}
