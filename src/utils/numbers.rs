//! Lenient numeric parsing for host-supplied configuration values
//!
//! Data attributes arrive as strings such as `"640"`, `" 1.5 "` or `"320px"`.
//! Parsing follows the browser's `parseFloat`: leading whitespace is skipped
//! and the longest numeric prefix wins.

/// Keep a number only if it is finite and strictly positive
pub fn positive(value: f64) -> Option<f64> {
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Parse a positive number from a string, `None` when absent or not positive
pub fn parse_positive_number(raw: &str) -> Option<f64> {
    parse_float_prefix(raw).and_then(positive)
}

/// Parse the longest leading float literal of `raw`
pub fn parse_float_prefix(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    let candidate_len = trimmed
        .char_indices()
        .take_while(|&(i, c)| {
            c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || ((c == '-' || c == '+') && i == 0)
                || ((c == '-' || c == '+') && matches!(trimmed[..i].chars().last(), Some('e' | 'E')))
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);

    // Back off until a prefix parses ("1.5e" → "1.5").
    (1..=candidate_len)
        .rev()
        .filter(|&end| trimmed.is_char_boundary(end))
        .find_map(|end| trimmed[..end].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive_number() {
        assert_eq!(parse_positive_number("640"), Some(640.0));
        assert_eq!(parse_positive_number("  1.5 "), Some(1.5));
        assert_eq!(parse_positive_number("320px"), Some(320.0));
        assert_eq!(parse_positive_number("2e2"), Some(200.0));
        assert_eq!(parse_positive_number("1.5e"), Some(1.5));
        assert_eq!(parse_positive_number("0"), None);
        assert_eq!(parse_positive_number("-4"), None);
        assert_eq!(parse_positive_number(""), None);
        assert_eq!(parse_positive_number("wide"), None);
    }

    #[test]
    fn test_positive() {
        assert_eq!(positive(3.0), Some(3.0));
        assert_eq!(positive(0.0), None);
        assert_eq!(positive(f64::NAN), None);
        assert_eq!(positive(f64::INFINITY), None);
    }
}
