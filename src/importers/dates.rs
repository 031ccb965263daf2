//! Provider date parsing
//!
//! Both feeds report dates one day early, so every parsed date is shifted
//! forward by exactly one calendar day.

use chrono::{Days, NaiveDate, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;

use super::Provider;
use crate::error::{CleanerError, Result};

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("valid date regex"));

/// Serial of 9999-12-31, the last date spreadsheets can represent
const MAX_SERIAL: f64 = 2_958_465.0;

/// Parse a provider date and apply the one-day shift
pub fn parse_date(raw: &str, provider: Provider) -> Result<NaiveDate> {
    let text = raw.trim();
    let date = match provider {
        Provider::MercadoPago => NaiveDate::parse_from_str(text, "%d-%m-%Y")
            .map_err(|e| CleanerError::Parse(format!("invalid date '{}': {}", text, e)))?,
        Provider::Santander => parse_spreadsheet_date(text)?,
    };

    date.checked_add_days(Days::new(1))
        .ok_or_else(|| CleanerError::Parse(format!("date out of range: '{}'", text)))
}

/// `DD/MM/YYYY` text or a serial day count since 1899-12-30
fn parse_spreadsheet_date(text: &str) -> Result<NaiveDate> {
    if text.contains('/') {
        if let Ok(date) = NaiveDate::parse_from_str(text, "%d/%m/%Y") {
            return Ok(date);
        }
    }

    if let Some(serial) = parse_serial(text) {
        let excel_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
            .ok_or_else(|| CleanerError::Parse("invalid spreadsheet epoch".to_string()))?;
        return Some(serial.trunc())
            .filter(|days| (-MAX_SERIAL..=MAX_SERIAL).contains(days))
            .and_then(|days| TimeDelta::try_days(days as i64))
            .and_then(|delta| excel_epoch.checked_add_signed(delta))
            .ok_or_else(|| CleanerError::Parse(format!("date serial out of range: {}", text)));
    }

    Err(CleanerError::Parse(format!("invalid date '{}'", text)))
}

fn parse_serial(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a cell looks like a date (text date or serial number)
pub fn looks_like_date(cell: &str) -> bool {
    let text = cell.trim();
    SLASH_DATE.is_match(text) || parse_serial(text).is_some()
}
