//! CSV session files: parse a list of ledger operations and replay them.
//!
//! A session file drives a fresh [`AssessmentLedger`] the way the original
//! test harness did, one call per row. Each row produces a tagged outcome,
//! either a `value` or a numeric `error` code.
//!
//! # Session file format
//!
//! | Column | Meaning |
//! |--------|---------|
//! | `op` | `register`, `pay`, `update-income`, `details`, `transfer-admin` |
//! | `sender` | identity making the call |
//! | `arg` | entity to register, or the new admin (other ops: empty) |
//! | `amount` | income for `register` / `update-income` (other ops: empty) |
//! | `timestamp` | payment time for `pay`; empty means the wall clock |
//!
//! Every row carries all five columns; fields an op does not use are left
//! empty.

use std::fmt;
use std::io::Read;

use assess_core::{AssessmentLedger, TaxDetails};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading or replaying a session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("row {row}: `{op}` requires the `{column}` column")]
    MissingField {
        row: usize,
        op: &'static str,
        column: &'static str,
    },
}

impl From<csv::Error> for SessionError {
    fn from(err: csv::Error) -> Self {
        SessionError::CsvParse(err.to_string())
    }
}

/// The ledger operation named by a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionOp {
    Register,
    Pay,
    UpdateIncome,
    Details,
    TransferAdmin,
}

impl SessionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Pay => "pay",
            Self::UpdateIncome => "update-income",
            Self::Details => "details",
            Self::TransferAdmin => "transfer-admin",
        }
    }
}

/// A single row from a session CSV file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub op: SessionOp,
    pub sender: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub arg: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub timestamp: Option<i64>,
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Ok(Some(s.trim().to_string())),
        None => Ok(None),
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// The tagged result of one replayed row, in the contract's `{value}` /
/// `{error}` shape. Serializes to `{"value": ...}` or `{"error": code}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    #[serde(rename = "value")]
    Value(OutcomeValue),
    #[serde(rename = "error")]
    Error(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutcomeValue {
    /// Acknowledgement for `register`, `update-income`, `transfer-admin`.
    Ack(bool),
    /// Amount due returned by `pay`.
    Amount(Decimal),
    /// Record projection returned by `details`.
    Details(TaxDetails),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(OutcomeValue::Ack(ok)) => write!(f, "value: {ok}"),
            Outcome::Value(OutcomeValue::Amount(amount)) => write!(f, "value: {amount}"),
            Outcome::Value(OutcomeValue::Details(details)) => write!(
                f,
                "value: income={} last_paid={} tax_rate={}",
                details.income, details.last_paid, details.tax_rate
            ),
            Outcome::Error(code) => write!(f, "error: {code}"),
        }
    }
}

/// Loader and replayer for session CSV files.
pub struct SessionLoader;

impl SessionLoader {
    /// Parse session records from a CSV reader.
    ///
    /// The reader can be any type that implements `Read`, such as a file or
    /// a string slice.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<SessionRecord>, SessionError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: SessionRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Replay records against a ledger, in order, collecting one outcome per
    /// row.
    ///
    /// Ledger errors become [`Outcome::Error`] rows and the replay keeps
    /// going, matching how the original harness treated a rejected call. A
    /// structurally broken row (an op missing a column it needs) aborts the
    /// replay with [`SessionError::MissingField`]; row numbers count data
    /// rows from 1.
    ///
    /// A `pay` row with an empty timestamp uses the wall clock.
    pub fn replay(
        ledger: &mut AssessmentLedger,
        records: &[SessionRecord],
    ) -> Result<Vec<Outcome>, SessionError> {
        let mut outcomes = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            debug!(row, op = record.op.as_str(), sender = %record.sender, "replaying");

            let outcome = match record.op {
                SessionOp::Register => {
                    let entity = require(record.arg.as_deref(), row, record.op, "arg")?;
                    let income = require(record.amount, row, record.op, "amount")?;
                    tag_ack(ledger.register_taxpayer(&record.sender, entity, income))
                }
                SessionOp::Pay => {
                    let timestamp = record
                        .timestamp
                        .unwrap_or_else(|| Utc::now().timestamp());
                    match ledger.pay_tax(&record.sender, timestamp) {
                        Ok(amount) => Outcome::Value(OutcomeValue::Amount(amount)),
                        Err(err) => Outcome::Error(err.code()),
                    }
                }
                SessionOp::UpdateIncome => {
                    let income = require(record.amount, row, record.op, "amount")?;
                    tag_ack(ledger.update_income(&record.sender, income))
                }
                SessionOp::Details => match ledger.get_tax_details(&record.sender) {
                    Ok(details) => Outcome::Value(OutcomeValue::Details(details)),
                    Err(err) => Outcome::Error(err.code()),
                },
                SessionOp::TransferAdmin => {
                    let new_admin = require(record.arg.as_deref(), row, record.op, "arg")?;
                    tag_ack(ledger.transfer_admin(&record.sender, new_admin))
                }
            };

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

fn require<T>(
    field: Option<T>,
    row: usize,
    op: SessionOp,
    column: &'static str,
) -> Result<T, SessionError> {
    field.ok_or(SessionError::MissingField {
        row,
        op: op.as_str(),
        column,
    })
}

fn tag_ack(result: Result<(), assess_core::LedgerError>) -> Outcome {
    match result {
        Ok(()) => Outcome::Value(OutcomeValue::Ack(true)),
        Err(err) => Outcome::Error(err.code()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const SESSION_CSV: &str = "\
op,sender,arg,amount,timestamp
register,admin,alice,100000,
pay,alice,,,31556927
pay,alice,,,31556928
details,alice,,,
";

    // =========================================================================
    // parse tests
    // =========================================================================

    #[test]
    fn parse_reads_all_rows() {
        let records = SessionLoader::parse(SESSION_CSV.as_bytes()).expect("CSV should parse");

        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0],
            SessionRecord {
                op: SessionOp::Register,
                sender: "admin".to_string(),
                arg: Some("alice".to_string()),
                amount: Some(dec!(100000)),
                timestamp: None,
            }
        );
        assert_eq!(records[1].op, SessionOp::Pay);
        assert_eq!(records[1].timestamp, Some(31_556_927));
    }

    #[test]
    fn parse_treats_empty_fields_as_none() {
        let records = SessionLoader::parse(SESSION_CSV.as_bytes()).expect("CSV should parse");

        assert_eq!(records[3].arg, None);
        assert_eq!(records[3].amount, None);
        assert_eq!(records[3].timestamp, None);
    }

    #[test]
    fn parse_rejects_unknown_op() {
        let csv = "op,sender,arg,amount,timestamp\naudit,admin,,,\n";

        let result = SessionLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(SessionError::CsvParse(_))));
    }

    #[test]
    fn parse_rejects_malformed_amount() {
        let csv = "op,sender,arg,amount,timestamp\nregister,admin,alice,lots,\n";

        let result = SessionLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(SessionError::CsvParse(_))));
    }

    // =========================================================================
    // replay tests
    // =========================================================================

    #[test]
    fn replay_produces_tagged_outcomes_in_order() {
        let records = SessionLoader::parse(SESSION_CSV.as_bytes()).expect("CSV should parse");
        let mut ledger = AssessmentLedger::new("admin");

        let outcomes = SessionLoader::replay(&mut ledger, &records).expect("replay should run");

        assert_eq!(
            outcomes,
            vec![
                Outcome::Value(OutcomeValue::Ack(true)),
                Outcome::Value(OutcomeValue::Amount(dec!(5000))),
                Outcome::Error(103),
                Outcome::Value(OutcomeValue::Details(assess_core::TaxDetails {
                    income: dec!(100000),
                    last_paid: 31_556_927,
                    tax_rate: dec!(5),
                })),
            ]
        );
    }

    #[test]
    fn replay_continues_past_ledger_errors() {
        let csv = "\
op,sender,arg,amount,timestamp
register,mallory,mallory,1,
register,admin,alice,50000,
";
        let records = SessionLoader::parse(csv.as_bytes()).expect("CSV should parse");
        let mut ledger = AssessmentLedger::new("admin");

        let outcomes = SessionLoader::replay(&mut ledger, &records).expect("replay should run");

        assert_eq!(
            outcomes,
            vec![Outcome::Error(100), Outcome::Value(OutcomeValue::Ack(true))]
        );
        assert!(ledger.taxpayer("alice").is_some());
    }

    #[test]
    fn replay_rejects_register_without_entity() {
        let csv = "op,sender,arg,amount,timestamp\nregister,admin,,50000,\n";
        let records = SessionLoader::parse(csv.as_bytes()).expect("CSV should parse");
        let mut ledger = AssessmentLedger::new("admin");

        let result = SessionLoader::replay(&mut ledger, &records);

        assert!(matches!(
            result,
            Err(SessionError::MissingField {
                row: 1,
                op: "register",
                column: "arg",
            })
        ));
    }

    #[test]
    fn replay_rejects_update_income_without_amount() {
        let csv = "op,sender,arg,amount,timestamp\nupdate-income,alice,,,\n";
        let records = SessionLoader::parse(csv.as_bytes()).expect("CSV should parse");
        let mut ledger = AssessmentLedger::new("admin");

        let result = SessionLoader::replay(&mut ledger, &records);

        assert!(matches!(
            result,
            Err(SessionError::MissingField {
                column: "amount",
                ..
            })
        ));
    }

    // =========================================================================
    // outcome formatting tests
    // =========================================================================

    #[test]
    fn outcome_serializes_in_contract_shape() {
        let value = serde_json::to_string(&Outcome::Value(OutcomeValue::Amount(dec!(5000))))
            .expect("outcome should serialize");
        let error = serde_json::to_string(&Outcome::Error(103)).expect("outcome should serialize");

        assert_eq!(value, r#"{"value":"5000"}"#);
        assert_eq!(error, r#"{"error":103}"#);
    }

    #[test]
    fn outcome_displays_plain_text() {
        let outcome = Outcome::Value(OutcomeValue::Amount(dec!(5000)));

        assert_eq!(outcome.to_string(), "value: 5000");
        assert_eq!(Outcome::Error(103).to_string(), "error: 103");
    }
}
