use crate::core::TrimError;

/// Format seconds as `HH:MM:SS`. Fractional seconds are truncated and
/// negative or non-finite input is shown as zero.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Strict `HH:MM:SS` parser.
///
/// Exactly three colon-separated components, each a non-empty run of ASCII
/// digits. Minutes and seconds must be below 60; hours are unbounded.
/// Whitespace around the whole string is ignored.
pub fn parse_time_text(text: &str) -> Result<f64, TrimError> {
    let invalid = || TrimError::InvalidFormat(text.to_string());

    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }

    let mut values = [0u64; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        *value = part.parse::<u64>().map_err(|_| invalid())?;
    }

    let [hours, minutes, seconds] = values;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .map(|total| total as f64)
        .ok_or_else(invalid)
}

/// Human-readable length, e.g. "42.0 seconds" or "1.5 minutes".
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1} seconds", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1} minutes", seconds / 60.0)
    } else {
        format!("{:.1} hours", seconds / 3600.0)
    }
}
