// Database module - SQLite connection, record storage and the import sink

pub mod models;

use chrono::{NaiveDate, Utc};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{CleanerError, Result};
use crate::reconcile::RecordSink;
pub use models::{amount_key, Currency, Record, RecordBatch, RecordFilter, SortBy};

const RECORD_COLUMNS: &str =
    "id, date, description, amount, currency, account_id, category, created_at";

/// Get the default database path (~/.cleaner/records.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| CleanerError::Config("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home).join(".cleaner").join("records.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    debug!("Opening database at {:?}", path);
    Ok(Connection::open(&path)?)
}

/// Initialize the database with schema
///
/// Creates the parent directory and the database file when missing. Safe to
/// call on an existing database.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);
    ensure_parent_dir(&path)?;

    let conn = open_db(Some(path))?;
    conn.execute_batch(include_str!("schema.sql"))?;

    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Insert a record, returning its id
///
/// A taken (date, description, amount) triple fails with
/// [`CleanerError::Duplicate`].
pub fn insert_record(conn: &Connection, record: &Record) -> Result<i64> {
    let created_at = record.created_at.unwrap_or_else(Utc::now);

    let outcome = conn.execute(
        "INSERT INTO records (date, description, amount, currency, account_id, category, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.date,
            record.description,
            record.amount_key(),
            record.currency.as_str(),
            record.account_id,
            record.category,
            created_at,
        ],
    );

    match outcome {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(CleanerError::Duplicate {
            date: record.date,
            description: record.description.clone(),
            amount: record.amount,
        }),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Whether a record with the same date, description and amount is stored
pub fn record_exists(
    conn: &Connection,
    date: NaiveDate,
    description: &str,
    amount: Decimal,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE date = ?1 AND description = ?2 AND amount = ?3",
        params![date, description, amount_key(amount)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Get a record by id
pub fn get_record(conn: &Connection, id: i64) -> Result<Option<Record>> {
    let sql = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);
    let record = conn.query_row(&sql, [id], record_from_row).optional()?;
    Ok(record)
}

/// List records matching a filter
pub fn list_records(conn: &Connection, filter: &RecordFilter) -> Result<Vec<Record>> {
    let mut sql = format!("SELECT {} FROM records WHERE 1=1", RECORD_COLUMNS);
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(account) = &filter.account_id {
        sql.push_str(" AND account_id = ?");
        params.push(Box::new(account.clone()));
    }
    if let Some(currency) = filter.currency {
        sql.push_str(" AND currency = ?");
        params.push(Box::new(currency.as_str()));
    }
    if let Some(from) = filter.start_date {
        sql.push_str(" AND date >= ?");
        params.push(Box::new(from));
    }
    if let Some(to) = filter.end_date {
        sql.push_str(" AND date <= ?");
        params.push(Box::new(to));
    }

    let order = if filter.ascending { "ASC" } else { "DESC" };
    let column = match filter.sort_by {
        SortBy::Date => "date",
        SortBy::Description => "description",
    };
    sql.push_str(&format!(" ORDER BY {} {}, id {}", column, order, order));

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let records = stmt
        .query_map(param_refs.as_slice(), record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Delete a record by id
pub fn delete_record(conn: &Connection, id: i64) -> Result<()> {
    let affected = conn.execute("DELETE FROM records WHERE id = ?1", [id])?;
    if affected == 0 {
        return Err(CleanerError::NotFound(id));
    }
    Ok(())
}

fn record_from_row(row: &rusqlite::Row) -> std::result::Result<Record, rusqlite::Error> {
    let currency: String = row.get(4)?;
    Ok(Record {
        id: Some(row.get(0)?),
        date: row.get(1)?,
        description: row.get(2)?,
        amount: get_decimal_value(row, 3)?,
        currency: currency
            .parse::<Currency>()
            .map_err(|e| conversion_error(4, Type::Text, e))?,
        account_id: row.get(5)?,
        category: row.get(6)?,
        created_at: Some(row.get(7)?),
    })
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Helper to read a Decimal stored as text (or a legacy number)
pub fn get_decimal_value(
    row: &rusqlite::Row,
    idx: usize,
) -> std::result::Result<Decimal, rusqlite::Error> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).map_err(|e| conversion_error(idx, Type::Text, e))?;
            Decimal::from_str(s).map_err(|e| conversion_error(idx, Type::Text, e))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::try_from(f).map_err(|e| conversion_error(idx, Type::Real, e)),
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            Type::Null,
        )),
    }
}

/// [`RecordSink`] backed by the SQLite records table
pub struct SqliteSink<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSink<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl RecordSink for SqliteSink<'_> {
    fn exists(&self, date: NaiveDate, description: &str, amount: Decimal) -> Result<bool> {
        record_exists(self.conn, date, description, amount)
            .map_err(|e| CleanerError::Sink(e.to_string()))
    }

    fn insert(&mut self, record: &Record) -> Result<()> {
        match insert_record(self.conn, record) {
            Ok(_) => Ok(()),
            Err(e @ CleanerError::Duplicate { .. }) => Err(e),
            Err(e) => Err(CleanerError::Sink(e.to_string())),
        }
    }
}
