//! Locale-aware amount parsing
//!
//! Both providers export Argentine-formatted numbers: `.` groups thousands
//! and `,` separates decimals. They differ in what happens to the decimals:
//! MercadoPago amounts are truncated to whole units, Santander amounts keep
//! their cents and may carry currency markers such as `$`, `U$D` or `US$`.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::Provider;
use crate::error::{CleanerError, Result};

/// Parse a provider-formatted amount string into a signed decimal
///
/// A zero result is returned as-is; callers decide to skip it.
pub fn parse_amount(raw: &str, provider: Provider) -> Result<Decimal> {
    let mut cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if provider == Provider::Santander {
        cleaned.retain(|c| !matches!(c, '$' | 'U' | 'S' | 'D'));
    }

    if cleaned.is_empty() {
        return Err(CleanerError::Parse(format!("empty amount: '{}'", raw)));
    }

    let (is_negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest.replace('.', "")),
        None => (false, cleaned.replace('.', "")),
    };

    let number = match provider {
        // Decimals are discarded for MercadoPago
        Provider::MercadoPago => match unsigned.find(',') {
            Some(idx) => unsigned[..idx].to_string(),
            None => unsigned,
        },
        Provider::Santander => unsigned.replace(',', "."),
    };

    if !is_numeric(&number) {
        return Err(CleanerError::Parse(format!("invalid amount: '{}'", raw)));
    }

    let value = Decimal::from_str(&number)
        .map_err(|e| CleanerError::Parse(format!("invalid amount '{}': {}", raw, e)))?;

    Ok(if is_negative { -value } else { value })
}

/// Digits with at most one decimal point, at least one digit
fn is_numeric(s: &str) -> bool {
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in s.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}
