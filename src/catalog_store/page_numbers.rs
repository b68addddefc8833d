//! Dual page numbering of songs.
//!
//! A song may be printed on a front page (`page_number`, stored >= 0) and on
//! a flipped page counted from the back (`negative_page_number`, stored
//! <= 0). The two fields are independent: each one is coerced to its own
//! sign and neither is ever derived from the other. Zero is a real page and
//! counts as present.
//!
//! Raw input goes through [`parse_page_value`] first. Under
//! [`PageNumberPolicy::Lenient`] a value that is not an integer is dropped
//! and the field is treated as absent. This keeps bulk imports of messy
//! song lists going, but it silently discards input, so every drop is
//! logged. [`PageNumberPolicy::Strict`] rejects the same input instead.

use super::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNumbers {
    pub page_number: Option<i64>,
    pub negative_page_number: Option<i64>,
}

impl PageNumbers {
    pub fn normalized(page_number: Option<i64>, negative_page_number: Option<i64>) -> Self {
        PageNumbers {
            page_number: page_number.map(front_page),
            negative_page_number: negative_page_number.map(flipped_page),
        }
    }
}

pub fn front_page(value: i64) -> i64 {
    value.saturating_abs()
}

pub fn flipped_page(value: i64) -> i64 {
    -value.saturating_abs()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageNumberPolicy {
    /// Non-integer values are dropped with a warning.
    Lenient,
    /// Non-integer values are a validation error.
    #[default]
    Strict,
}

impl std::fmt::Display for PageNumberPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageNumberPolicy::Lenient => write!(f, "lenient"),
            PageNumberPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Interprets a raw JSON value as a page number.
///
/// Accepted: integers, finite floats (truncated toward zero) and strings
/// holding a base-10 integer, surrounding whitespace allowed. `null` is
/// absent. Anything else is handled according to `policy`.
pub fn parse_page_value(
    field: &str,
    value: &Value,
    policy: PageNumberPolicy,
) -> CatalogResult<Option<i64>> {
    if value.is_null() {
        return Ok(None);
    }
    if let Some(parsed) = interpret_integer(value) {
        return Ok(Some(parsed));
    }
    match policy {
        PageNumberPolicy::Lenient => {
            warn!("Dropping non-integer {} value {}", field, value);
            Ok(None)
        }
        PageNumberPolicy::Strict => Err(CatalogError::Validation(format!(
            "{} must be an integer, got {}",
            field, value
        ))),
    }
}

fn interpret_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
