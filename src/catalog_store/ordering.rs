//! Sibling order assignment.
//!
//! Categories are ordered within their songbook and songs within their
//! category. A new sibling without an explicit order goes after the current
//! maximum, leaving a gap of [`ORDER_STEP`] so entries can later be moved
//! between two neighbours without renumbering everything. Explicit orders
//! are kept verbatim, duplicates included; readers break ties by id.

use super::error::{CatalogError, CatalogResult};
use std::collections::HashSet;

pub const ORDER_STEP: i64 = 10;

/// Order for a new sibling appended after `siblings`.
///
/// Siblings without an order are ignored; with no ordered sibling the
/// result is `ORDER_STEP`.
pub fn next_sibling_order<I>(siblings: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    siblings
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
        .saturating_add(ORDER_STEP)
}

pub fn resolve_order<I>(explicit: Option<i64>, siblings: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    match explicit {
        Some(order) => order,
        None => next_sibling_order(siblings),
    }
}

/// Caller supplied orders must be non-negative.
pub fn validate_explicit_order(order: Option<i64>) -> CatalogResult<()> {
    match order {
        Some(order) if order < 0 => Err(CatalogError::Validation(format!(
            "order must be a non-negative integer, got {}",
            order
        ))),
        _ => Ok(()),
    }
}

/// Fresh orders for `count` siblings: 10, 20, 30, ...
pub fn renumbered(count: usize) -> impl Iterator<Item = i64> {
    (1..=count as i64).map(|position| position.saturating_mul(ORDER_STEP))
}

/// Checks that `requested` is a permutation of `current`.
pub fn check_reorder(current: &[i64], requested: &[i64]) -> CatalogResult<()> {
    let mut seen = HashSet::with_capacity(requested.len());
    if let Some(dup) = requested.iter().find(|id| !seen.insert(**id)) {
        return Err(CatalogError::Validation(format!(
            "id {} appears more than once",
            dup
        )));
    }

    let current: HashSet<i64> = current.iter().copied().collect();
    if let Some(unknown) = requested.iter().find(|id| !current.contains(*id)) {
        return Err(CatalogError::Validation(format!(
            "id {} does not belong to this parent",
            unknown
        )));
    }
    if seen.len() != current.len() {
        let mut missing: Vec<i64> = current.difference(&seen).copied().collect();
        missing.sort_unstable();
        return Err(CatalogError::Validation(format!(
            "reorder must list every sibling, missing {:?}",
            missing
        )));
    }
    Ok(())
}
