//! Parsing for unit-suffixed integers used throughout the configuration
//! surface: byte sizes (`K|M|G|T|P`, base 1024), bit rates (`K`, base 1000),
//! and durations (`s|m|h|day[s]|week[s]`).

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid numeric value in {0:?}")]
    InvalidNumber(String),
    #[error("unknown unit suffix in {0:?}")]
    UnknownSuffix(String),
}

/// Parses a byte-size value such as `4M`, `512K`, `10G`, or a bare integer.
pub fn parse_byte_size(value: &str) -> Result<u64, Error> {
    let value = value.trim();
    let (digits, suffix) = split_numeric_suffix(value);
    let n: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidNumber(value.to_string()))?;
    let multiplier: u64 = match suffix.to_ascii_uppercase().as_str() {
        "" => 1,
        "K" => 1024,
        "M" => 1024 * 1024,
        "G" => 1024 * 1024 * 1024,
        "T" => 1024u64.pow(4),
        "P" => 1024u64.pow(5),
        _ => return Err(Error::UnknownSuffix(value.to_string())),
    };
    Ok(n * multiplier)
}

/// Parses a duration value such as `30s`, `5m`, `2h`, `1day`, `2weeks`, or a
/// bare integer (seconds).
pub fn parse_duration_seconds(value: &str) -> Result<u64, Error> {
    let value = value.trim();
    let (digits, suffix) = split_numeric_suffix(value);
    let n: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidNumber(value.to_string()))?;
    let suffix = suffix.to_ascii_lowercase();
    let multiplier: u64 = match suffix.as_str() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "day" | "days" => 86_400,
        "week" | "weeks" => 7 * 86_400,
        _ => return Err(Error::UnknownSuffix(value.to_string())),
    };
    Ok(n * multiplier)
}

fn split_numeric_suffix(value: &str) -> (&str, &str) {
    let split_at = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value.split_at(split_at)
}
