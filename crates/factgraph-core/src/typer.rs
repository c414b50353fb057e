//! Value typing: turn a raw property value into a [`TypedValue`].
//!
//! Dates are tried against a fixed list of formats in precedence order.
//! Day-first formats come before anything else, so `05/03/2021` is the
//! 5th of March.

use chrono::{Datelike, NaiveDate};

use crate::error::ValueError;
use crate::types::{TypedValue, ValueKind};

/// A supported date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    /// chrono format string.
    pub pattern: &'static str,
    separator: char,
    /// Position of the year field (0 or 2) and its exact digit count.
    year_field: usize,
    year_digits: usize,
}

/// Date formats, in the order they are tried.
pub const DATE_FORMATS: &[DateFormat] = &[
    DateFormat {
        pattern: "%d/%m/%Y",
        separator: '/',
        year_field: 2,
        year_digits: 4,
    },
    DateFormat {
        pattern: "%Y-%m-%d",
        separator: '-',
        year_field: 0,
        year_digits: 4,
    },
    DateFormat {
        pattern: "%d-%m-%Y",
        separator: '-',
        year_field: 2,
        year_digits: 4,
    },
    DateFormat {
        pattern: "%d/%m/%y",
        separator: '/',
        year_field: 2,
        year_digits: 2,
    },
];

impl DateFormat {
    /// chrono accepts any width for `%Y`, so the field widths are checked
    /// first: day and month take 1-2 digits, the year exactly `year_digits`.
    fn matches_shape(&self, raw: &str) -> bool {
        let fields: Vec<&str> = raw.split(self.separator).collect();
        if fields.len() != 3 {
            return false;
        }
        fields.iter().enumerate().all(|(i, field)| {
            let width_ok = if i == self.year_field {
                field.len() == self.year_digits
            } else {
                (1..=2).contains(&field.len())
            };
            width_ok && field.bytes().all(|b| b.is_ascii_digit())
        })
    }

    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        if !self.matches_shape(raw) {
            return None;
        }
        let date = NaiveDate::parse_from_str(raw, self.pattern).ok()?;
        if self.year_digits == 2 {
            return pivot_two_digit_year(date);
        }
        Some(date)
    }
}

/// Two-digit years from here up are 19xx, below it 20xx. chrono on its own
/// reads `69` as 2069.
const TWO_DIGIT_PIVOT: i32 = 69;

fn pivot_two_digit_year(date: NaiveDate) -> Option<NaiveDate> {
    let yy = date.year() % 100;
    let century = if yy >= TWO_DIGIT_PIVOT { 1900 } else { 2000 };
    date.with_year(century + yy)
}

/// Parse a date using the first matching format.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS.iter().find_map(|fmt| fmt.parse(raw))
}

/// Resolve a raw value for `verb` according to `kind`.
pub fn resolve(raw: &str, kind: ValueKind, verb: &str) -> Result<TypedValue, ValueError> {
    let trimmed = raw.trim();
    match kind {
        ValueKind::Node => {
            if trimmed.is_empty() {
                return Err(ValueError::EmptyValue {
                    verb: verb.to_string(),
                });
            }
            Ok(TypedValue::Node(trimmed.to_string()))
        }
        ValueKind::Date => parse_date(trimmed)
            .map(TypedValue::Date)
            .ok_or_else(|| ValueError::DateParse {
                raw: raw.to_string(),
                verb: verb.to_string(),
            }),
    }
}
