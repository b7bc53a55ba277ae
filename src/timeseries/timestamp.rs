use crate::error::{Result, TimelineError};

/// Parse a 3-part elapsed-time string into seconds.
///
/// Accepts `H:MM:SS[.ffffff]` and the legacy dot form `H.MM.SS`. If the
/// string contains any colon it is split on colons only, so a decimal point
/// in the seconds part of a colon timestamp is never treated as a separator.
/// Hours and minutes are integers; seconds may carry a fraction.
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let malformed = || TimelineError::MalformedTimestamp(timestamp.to_string());

    let separator = if timestamp.contains(':') { ':' } else { '.' };
    let parts: Vec<&str> = timestamp.trim().split(separator).collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(malformed());
    };

    let hours: u64 = hours.trim().parse().map_err(|_| malformed())?;
    let minutes: u64 = minutes.trim().parse().map_err(|_| malformed())?;
    let seconds: f64 = seconds.trim().parse().map_err(|_| malformed())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(malformed());
    }

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_and_dot_forms_agree() {
        assert_eq!(parse_timestamp("1:02:03.5").unwrap(), 3723.5);
        assert_eq!(parse_timestamp("1.02.03").unwrap(), 3723.0);
        assert_eq!(parse_timestamp("1:02:03").unwrap(), 3723.0);
    }

    #[test]
    fn builder_output_parses() {
        assert_eq!(parse_timestamp("0:00:01.500000").unwrap(), 1.5);
        assert_eq!(parse_timestamp("25:00:00").unwrap(), 90000.0);
    }

    #[test]
    fn wrong_component_count_is_malformed() {
        for bad in ["1:02", "1:02:03:04", "1.02", "1.02.03.5", "", "12"] {
            let err = parse_timestamp(bad).unwrap_err();
            assert!(
                matches!(err, TimelineError::MalformedTimestamp(ref s) if s == bad),
                "{} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn non_numeric_components_are_malformed() {
        for bad in ["a:02:03", "1:xx:03", "1:02:zz", "1:02:-3", "1:02:NaN", "1:02:inf"] {
            assert!(parse_timestamp(bad).is_err(), "{} should be malformed", bad);
        }
    }
}
