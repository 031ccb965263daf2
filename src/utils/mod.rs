//! Formatting helpers for terminal output
//!
//! Amounts are shown the way Argentine statements print them: `.` groups
//! thousands and `,` separates the two decimals.

use rust_decimal::Decimal;

use crate::db::models::Currency;

/// Core formatting function with full control over output.
///
/// # Examples
/// ```
/// use cleaner::db::Currency;
/// use cleaner::utils::format_amount_with_width;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_amount_with_width(dec!(1234.56), 0, Some(Currency::Ars)),
///     "$ 1.234,56"
/// );
/// assert_eq!(
///     format_amount_with_width(dec!(-4.82), 12, Some(Currency::Usd)),
///     "   US$ -4,82"
/// );
/// ```
pub fn format_amount_with_width(
    value: Decimal,
    width: usize,
    currency: Option<Currency>,
) -> String {
    let is_negative = value < Decimal::ZERO;
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match currency {
        Some(Currency::Ars) => "$ ",
        Some(Currency::Usd) => "US$ ",
        None => "",
    };

    let result = format!("{}{}{},{}", prefix, sign, with_separators, decimal_part);

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format with the currency symbol: "$ 1.234,56" or "US$ 1.234,56"
pub fn format_currency(value: Decimal, currency: Currency) -> String {
    format_amount_with_width(value, 0, Some(currency))
}

/// Format number only (no symbol): "1.234,56"
pub fn format_decimal_ar(value: Decimal) -> String {
    format_amount_with_width(value, 0, None)
}
