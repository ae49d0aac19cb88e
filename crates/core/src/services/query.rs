//! Shared parsing for list query parameters.

use sea_orm::Order;

/// Parse a comma-separated `ordering` parameter such as `-created_at,title`.
///
/// Each name is looked up in `allowed`. A leading `-` sorts descending.
/// Unknown names are skipped.
#[must_use]
pub fn parse_ordering<F: Copy>(raw: Option<&str>, allowed: &[(&str, F)]) -> Vec<(F, Order)> {
    let Some(raw) = raw else {
        return vec![];
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (name, order) = match part.strip_prefix('-') {
                Some(name) => (name, Order::Desc),
                None => (part, Order::Asc),
            };
            allowed
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, field)| (*field, order))
        })
        .collect()
}
