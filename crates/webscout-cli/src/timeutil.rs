use std::time::Duration;
use webscout_core::{Error, Result};

/// Parse a short duration like `30s`, `15m`, `24h`, `7d`, `2w`.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    let split = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let (amount, unit) = trimmed.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| {
        Error::InvalidUsage(format!(
            "invalid duration: {value:?} (expected e.g. 30s, 15m, 24h, 7d)"
        ))
    })?;
    let secs = match unit.trim().to_ascii_lowercase().as_str() {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 3600,
        "d" => amount * 86_400,
        "w" => amount * 7 * 86_400,
        other => {
            return Err(Error::InvalidUsage(format!(
                "invalid duration unit: {other:?} (expected s, m, h, d or w)"
            )))
        }
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(604_800));
        assert_eq!(parse_duration(" 2w ").unwrap(), Duration::from_secs(1_209_600));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "7", "d7", "7 days", "-3h", "3.5h"] {
            assert!(parse_duration(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
