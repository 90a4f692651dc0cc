//! # Invoice Numbering
//!
//! Derives the next sequential invoice number from existing numbers.
//!
//! ```text
//! existing: ["1", "3", "abc", "5"]
//!              │    │     ✗     │     non-numeric formats are ignored
//!              ▼    ▼           ▼
//!            max = 5  ──►  next = "6"
//! ```
//!
//! This is the pure half of allocation. On its own it is read-then-compute
//! and races under concurrent checkouts; `mizan-engine` runs it inside the
//! checkout transaction under a lock, and the database enforces uniqueness.

use crate::types::Invoice;

/// Returns `max(parseable numbers) + 1` as a string, or `"1"`.
///
/// Numbers are trimmed and parsed as unsigned integers, so `"007"` counts
/// as 7 and `"INV-7"` is ignored.
///
/// ```rust
/// use mizan_core::numbering::next_invoice_number;
///
/// assert_eq!(next_invoice_number(["1", "3", "abc", "5"]), "6");
/// assert_eq!(next_invoice_number(Vec::<&str>::new()), "1");
/// ```
pub fn next_invoice_number<'a, I>(numbers: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    numbers
        .into_iter()
        .filter_map(parse_invoice_number)
        .max()
        .map_or(1, |max| max.saturating_add(1))
        .to_string()
}

/// [`next_invoice_number`] over invoice records.
pub fn next_invoice_number_for(invoices: &[Invoice]) -> String {
    next_invoice_number(invoices.iter().map(|invoice| invoice.number.as_str()))
}

/// Parses a sequential invoice number; `None` for other formats.
pub fn parse_invoice_number(number: &str) -> Option<u64> {
    let trimmed = number.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
