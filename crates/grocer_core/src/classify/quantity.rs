//! Inline quantity extraction from free-text item names.
//!
//! # Invariants
//! - Parsing never fails; unparseable suffixes leave the input untouched.
//! - A parsed quantity is always >= 1.
//! - The separator is a literal lowercase `x`.

use once_cell::sync::Lazy;
use regex::Regex;

static QUANTITY_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.*?)\s+x ?(?P<quantity>\d+)\s*$")
        .expect("valid quantity suffix regex")
});

/// Splits `"Apples x 5"` into `("Apples", 5)`.
///
/// Returns `(raw, fallback_quantity)` unchanged when the input carries no
/// quantity suffix, or when the suffix does not fit a positive `i32`.
pub fn parse_name_quantity(raw: &str, fallback_quantity: i32) -> (String, i32) {
    let Some(caps) = QUANTITY_SUFFIX_RE.captures(raw) else {
        return (raw.to_string(), fallback_quantity);
    };

    let name = caps.name("name").map_or("", |m| m.as_str()).trim();
    let parsed = caps
        .name("quantity")
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|quantity| *quantity >= 1);

    match parsed {
        Some(quantity) if !name.is_empty() => (name.to_string(), quantity),
        _ => (raw.to_string(), fallback_quantity),
    }
}
