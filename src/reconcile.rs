//! Import reconciliation
//!
//! Turns a parsed batch into persistence outcomes. A record is a duplicate
//! when the sink already holds one with the same date, description and
//! amount; currency and account are not part of the key. Every record gets
//! its own outcome, so one failure never blocks the rest of the batch.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info, warn};

use crate::db::models::{Record, RecordBatch};
use crate::error::{CleanerError, Result};
use crate::importers::Provider;

/// Persistence capabilities the reconciler needs
pub trait RecordSink {
    /// Whether a record with this (date, description, amount) is stored
    fn exists(&self, date: NaiveDate, description: &str, amount: Decimal) -> Result<bool>;

    /// Store a record; a taken (date, description, amount) triple must fail
    /// with [`CleanerError::Duplicate`]
    fn insert(&mut self, record: &Record) -> Result<()>;
}

/// Outcome counts of one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total_records: usize,
    pub imported_records: usize,
    pub duplicate_records: usize,
    pub failed_records: usize,
    /// One message per failed record, in batch order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn has_failures(&self) -> bool {
        self.failed_records > 0
    }
}

/// Apply the duplicate-check/insert protocol to every record of a batch
pub fn reconcile<S: RecordSink>(batch: &RecordBatch, sink: &mut S) -> ImportResult {
    let mut result = ImportResult {
        total_records: batch.records.len(),
        ..ImportResult::default()
    };

    for (idx, record) in batch.records.iter().enumerate() {
        let label = record_label(idx, record);

        match sink.exists(record.date, &record.description, record.amount) {
            Err(e) => {
                warn!("Duplicate check failed for {}: {}", label, e);
                result.failed_records += 1;
                result
                    .errors
                    .push(format!("{}: failed to check duplicate: {}", label, e));
                continue;
            }
            Ok(true) => {
                debug!("Skipping duplicate {}", label);
                result.duplicate_records += 1;
                continue;
            }
            Ok(false) => {}
        }

        match sink.insert(record) {
            Ok(()) => result.imported_records += 1,
            Err(e) => {
                warn!("Insert failed for {}: {}", label, e);
                result.failed_records += 1;
                result
                    .errors
                    .push(format!("{}: failed to create record: {}", label, e));
            }
        }
    }

    info!(
        "Reconciled {} records from {}: {} imported, {} duplicates, {} failed",
        result.total_records,
        batch.provider,
        result.imported_records,
        result.duplicate_records,
        result.failed_records
    );

    result
}

/// Parse a provider export and reconcile it into the sink
///
/// A parse failure returns before the sink is touched.
pub fn import_statement<R: Read, S: RecordSink>(
    reader: R,
    provider: Provider,
    account_id: &str,
    sink: &mut S,
) -> Result<ImportResult> {
    let batch = provider.parse(reader, account_id)?;
    Ok(reconcile(&batch, sink))
}

/// Store a manually entered record with duplicate prevention
pub fn create_record<S: RecordSink>(sink: &mut S, record: &Record) -> Result<()> {
    record.validate()?;

    if sink.exists(record.date, &record.description, record.amount)? {
        return Err(CleanerError::Duplicate {
            date: record.date,
            description: record.description.clone(),
            amount: record.amount,
        });
    }

    sink.insert(record)
}

fn record_label(idx: usize, record: &Record) -> String {
    format!(
        "record {} ({} '{}' {} {})",
        idx + 1,
        record.date.format("%d/%m/%Y"),
        record.description,
        record.amount,
        record.currency
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{amount_key, Currency};
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    /// In-memory sink with scripted failures keyed by description
    #[derive(Default)]
    struct FakeSink {
        stored: Vec<Record>,
        fail_exists: HashSet<String>,
        fail_insert: HashSet<String>,
        /// Answer every existence check with `false`, as a concurrent
        /// writer would make it look
        stale_exists: bool,
    }

    impl FakeSink {
        fn key(date: NaiveDate, description: &str, amount: Decimal) -> (NaiveDate, String, String) {
            (date, description.to_string(), amount_key(amount))
        }
    }

    impl RecordSink for FakeSink {
        fn exists(&self, date: NaiveDate, description: &str, amount: Decimal) -> Result<bool> {
            if self.fail_exists.contains(description) {
                return Err(CleanerError::Sink("connection lost".to_string()));
            }
            if self.stale_exists {
                return Ok(false);
            }
            let wanted = Self::key(date, description, amount);
            Ok(self
                .stored
                .iter()
                .any(|r| Self::key(r.date, &r.description, r.amount) == wanted))
        }

        fn insert(&mut self, record: &Record) -> Result<()> {
            if self.fail_insert.contains(&record.description) {
                return Err(CleanerError::Sink("disk full".to_string()));
            }
            let wanted = Self::key(record.date, &record.description, record.amount);
            if self
                .stored
                .iter()
                .any(|r| Self::key(r.date, &r.description, r.amount) == wanted)
            {
                return Err(CleanerError::Duplicate {
                    date: record.date,
                    description: record.description.clone(),
                    amount: record.amount,
                });
            }
            self.stored.push(record.clone());
            Ok(())
        }
    }

    fn record(description: &str, amount: Decimal) -> Record {
        Record::new(
            NaiveDate::from_ymd_opt(2025, 7, 23).unwrap(),
            description,
            amount,
            Currency::Ars,
            "mp",
        )
    }

    fn batch(records: Vec<Record>) -> RecordBatch {
        RecordBatch {
            records,
            provider: "mercadopago".to_string(),
            currency: Currency::Ars,
        }
    }

    #[test]
    fn test_all_new_records_are_imported() {
        let mut sink = FakeSink::default();
        let result = reconcile(
            &batch(vec![record("a", dec!(-1)), record("b", dec!(2))]),
            &mut sink,
        );

        assert_eq!(result.total_records, 2);
        assert_eq!(result.imported_records, 2);
        assert!(result.errors.is_empty());
        assert_eq!(sink.stored.len(), 2);
    }

    #[test]
    fn test_partial_failures_keep_going() {
        let mut sink = FakeSink::default();
        sink.stored.push(record("existing", dec!(-10)));
        sink.fail_insert.insert("broken".to_string());
        sink.fail_exists.insert("unreachable".to_string());

        let input = batch(vec![
            record("first", dec!(-1)),
            record("existing", dec!(-10.00)),
            record("broken", dec!(-2)),
            record("unreachable", dec!(-3)),
            record("last", dec!(4)),
        ]);
        let result = reconcile(&input, &mut sink);

        assert_eq!(result.total_records, 5);
        assert_eq!(result.imported_records, 2);
        assert_eq!(result.duplicate_records, 1);
        assert_eq!(result.failed_records, 2);
        assert_eq!(
            result.imported_records + result.duplicate_records + result.failed_records,
            result.total_records
        );
        assert!(result.has_failures());

        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("record 3"));
        assert!(result.errors[0].contains("failed to create record"));
        assert!(result.errors[1].contains("record 4"));
        assert!(result.errors[1].contains("failed to check duplicate"));

        let stored: Vec<&str> = sink.stored.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(stored, vec!["existing", "first", "last"]);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let mut sink = FakeSink::default();
        let result = reconcile(
            &batch(vec![record("same", dec!(-5)), record("same", dec!(-5))]),
            &mut sink,
        );
        assert_eq!(result.imported_records, 1);
        assert_eq!(result.duplicate_records, 1);
    }

    #[test]
    fn test_duplicate_on_insert_counts_as_failure() {
        let mut sink = FakeSink {
            stale_exists: true,
            ..FakeSink::default()
        };
        sink.stored.push(record("Netflix", dec!(-10)));

        let result = reconcile(
            &batch(vec![record("Netflix", dec!(-10.00)), record("Spotify", dec!(-5))]),
            &mut sink,
        );

        assert_eq!(result.total_records, 2);
        assert_eq!(result.imported_records, 1);
        assert_eq!(result.duplicate_records, 0);
        assert_eq!(result.failed_records, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("record 1 (23/07/2025 'Netflix'"));
        assert!(result.errors[0].contains("failed to create record: duplicate record"));
    }

    #[test]
    fn test_currency_is_not_part_of_the_key() {
        let mut sink = FakeSink::default();
        let mut usd = record("Netflix", dec!(-10));
        usd.currency = Currency::Usd;
        let result = reconcile(&batch(vec![record("Netflix", dec!(-10)), usd]), &mut sink);
        assert_eq!(result.duplicate_records, 1);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ImportResult {
            total_records: 3,
            imported_records: 2,
            duplicate_records: 1,
            failed_records: 0,
            errors: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalRecords"], 3);
        assert_eq!(json["importedRecords"], 2);
        assert_eq!(json["duplicateRecords"], 1);
        assert_eq!(json["failedRecords"], 0);
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_create_record_rejects_duplicates_and_invalid() {
        let mut sink = FakeSink::default();
        create_record(&mut sink, &record("Alquiler", dec!(-100000))).unwrap();

        let err = create_record(&mut sink, &record("Alquiler", dec!(-100000))).unwrap_err();
        assert!(matches!(err, CleanerError::Duplicate { .. }));

        let err = create_record(&mut sink, &record("Nada", dec!(0))).unwrap_err();
        assert!(matches!(err, CleanerError::Validation(_)));
        assert_eq!(sink.stored.len(), 1);
    }

    #[test]
    fn test_import_statement_parse_failure_touches_nothing() {
        let mut sink = FakeSink::default();
        let err = import_statement(&b"too;short\n"[..], Provider::MercadoPago, "mp", &mut sink)
            .unwrap_err();
        assert!(err.is_structural());
        assert!(sink.stored.is_empty());
    }
}
