//! Well-formedness checks for relay registration fields
//!
//! These are pure functions with no side effects. The store calls them during
//! admission, so every record it holds has already passed both checks.

/// Check that `address` is an IPv4 dotted quad.
///
/// Accepts exactly four `.`-separated segments, each consisting only of
/// decimal digits and parsing to an integer in `[0, 255]`. Empty segments,
/// non-numeric segments, and leading zeros are rejected.
pub fn valid_address(address: &str) -> bool {
    let segments: Vec<&str> = address.split('.').collect();
    if segments.len() != 4 {
        return false;
    }

    segments.iter().all(|segment| {
        !segment.is_empty()
            && segment.chars().all(|c| c.is_ascii_digit())
            && (segment.len() == 1 || !segment.starts_with('0'))
            && segment.parse::<u32>().is_ok_and(|n| n <= 255)
    })
}

/// Check that `port` is in `[1, 65535]`.
///
/// Callers own the coercion from their wire representation to an integer;
/// anything non-integral must be rejected before reaching this check.
pub fn valid_port(port: i64) -> bool {
    (1..=65_535).contains(&port)
}
