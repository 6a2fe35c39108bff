//! Numeric value extraction from raw vendor cells.
//!
//! Vendor files mix currency symbols, embedded unit suffixes, thousand
//! separators, and multi-line cells (`"$1,234.56"`, `"280.0000 @ TON"`,
//! `"4 779.40"`). Every numeric field in the pipeline goes through this
//! one function so they all resolve identically.

/// Extract the first numeric value from a raw cell, or `None` if the cell
/// holds no parseable number.
///
/// Strips line breaks, non-breaking spaces, currency noise (`$`, `,`,
/// `USD`) and all remaining whitespace (spaces double as thousand
/// separators in some sources), then scans for the first maximal
/// `digits[.digits]` run.
pub fn extract_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replace("USD", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '$' && *c != ',')
        .collect();

    let bytes = cleaned.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;

    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    // Fractional part only if a digit follows the dot.
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    cleaned[start..end].parse::<f64>().ok()
}

/// Extractor for an optional cell: absent or empty cells are "no value".
pub fn extract_optional(raw: Option<&str>) -> Option<f64> {
    match raw {
        Some(s) if !s.trim().is_empty() => extract_numeric(s),
        _ => None,
    }
}
