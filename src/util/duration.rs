use chrono::TimeDelta;

/// Parse a Go-style duration such as `-2s`, `1h30m`, `7d` or `250ms`.
///
/// Units: `ms`, `s`, `m`, `h`, `d`, `w`. Each number needs a unit, except a
/// bare `0`. A leading `-` negates the whole value.
pub fn parse_duration(s: &str) -> Result<TimeDelta, String> {
    let invalid = || format!("invalid duration '{}' (e.g. 36h, 7d, 1h30m, -2s)", s);

    let trimmed = s.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if body.is_empty() {
        return Err(invalid());
    }
    if body == "0" {
        return Ok(TimeDelta::zero());
    }

    let mut total = TimeDelta::zero();
    let mut rest = body;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let amount: i64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => TimeDelta::try_milliseconds(amount),
            "s" => TimeDelta::try_seconds(amount),
            "m" => TimeDelta::try_minutes(amount),
            "h" => TimeDelta::try_hours(amount),
            "d" => TimeDelta::try_days(amount),
            "w" => TimeDelta::try_weeks(amount),
            _ => None,
        }
        .ok_or_else(invalid)?;
        total = total.checked_add(&part).ok_or_else(invalid)?;
    }

    Ok(if negative { -total } else { total })
}

/// Compact human form: `3d 4h`, `2h 5m`, `45s`. Sub-second spans read `0s`.
pub fn format_duration(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { "-" } else { "" };
    let secs = delta.num_seconds().unsigned_abs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        secs % 86_400 / 3_600,
        secs % 3_600 / 60,
        secs % 60,
    );
    let body = if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    };
    format!("{}{}", sign, body)
}
