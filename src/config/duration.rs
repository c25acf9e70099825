// src/config/duration.rs

use std::time::Duration;

/// Parse a duration such as `"100ms"`, `"0.5s"`, `"5m"` or `"1h"`.
///
/// The number may be fractional; the unit is required.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| format!("duration '{s}' missing unit suffix (ms, s, m, h)"))?;
    let (number, unit) = s.split_at(split);

    let amount: f64 = number
        .parse()
        .map_err(|_| format!("invalid number '{number}' in duration '{s}'"))?;

    let nanos_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        other => {
            return Err(format!(
                "unsupported duration unit '{other}'; expected ms, s, m or h"
            ));
        }
    };

    let nanos = (amount * nanos_per_unit).round();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(format!("duration '{s}' out of range"));
    }
    Ok(Duration::from_nanos(nanos as u64))
}
