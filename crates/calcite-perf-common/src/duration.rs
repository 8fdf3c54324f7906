//! Duration flags such as `--run-time 5m` or `--batch-delay 200ms`.

use std::time::Duration;

/// Milliseconds per unit, keyed by every accepted spelling.
const UNITS: [(&[&str], u64); 4] = [
    (&["ms", "millis", "millisecond", "milliseconds"], 1),
    (&["s", "sec", "secs", "second", "seconds"], 1_000),
    (&["m", "min", "mins", "minute", "minutes"], 60_000),
    (&["h", "hr", "hrs", "hour", "hours"], 3_600_000),
];

/// Parse `60s`, `5m`, `1h` or `500ms`.
///
/// A bare number is seconds; an empty string is zero.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }

    let split = s.find(|c: char| c.is_alphabetic()).unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let amount: u64 = number
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration '{s}': {e}"))?;

    let unit = unit.to_ascii_lowercase();
    let millis_per_unit = if unit.is_empty() {
        1_000
    } else {
        UNITS
            .iter()
            .find(|(names, _)| names.contains(&unit.as_str()))
            .map(|(_, millis)| *millis)
            .ok_or_else(|| format!("unknown duration unit '{unit}' in '{s}'"))?
    };

    amount
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(parse_duration("200ms"), Ok(Duration::from_millis(200)));
        assert_eq!(parse_duration("20 ms"), Ok(Duration::from_millis(20)));
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("2min"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("3H"), Ok(Duration::from_secs(3 * 3600)));
    }

    #[test]
    fn test_bare_number_and_empty() {
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("  "), Ok(Duration::ZERO));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_duration("10 fortnights").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("18446744073709551615h").is_err());
    }
}
