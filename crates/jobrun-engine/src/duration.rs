//! Compact duration strings.

use std::time::Duration;

/// Parse a compact duration string: an integer followed by `s`, `m` or `h`
/// (e.g. `"30s"`, `"15m"`, `"2h"`). Returns `None` for anything else.
pub(crate) fn parse_duration(value: &str) -> Option<Duration> {
    if value.len() < 2 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let seconds = match unit {
        "s" => amount,
        "m" => amount.checked_mul(60)?,
        "h" => amount.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}
