use std::str::FromStr;

use rust_decimal::Decimal;

/// Parses a free-form numeric string such as `"04"`, `" 12.5 "` or `"1e2"`.
///
/// Returns `None` for empty or unparsable input; callers decide what a missing
/// value means for their rule.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Decimal::from_str(trimmed).ok().or_else(|| Decimal::from_scientific(trimmed).ok())
}

/// Same as [`parse_decimal`] but only yields strictly positive values.
pub fn parse_positive(raw: &str) -> Option<Decimal> {
    parse_decimal(raw).filter(|value| *value > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{parse_decimal, parse_positive};

    #[test]
    fn parses_padded_and_zero_prefixed_values() {
        assert_eq!(parse_decimal("04"), Some(Decimal::from(4)));
        assert_eq!(parse_decimal(" 12.5 "), Some(Decimal::new(125, 1)));
        assert_eq!(parse_decimal("1e2"), Some(Decimal::from(100)));
    }

    #[test]
    fn rejects_blank_and_garbage() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn positive_filter_drops_zero_and_negative() {
        assert_eq!(parse_positive("0"), None);
        assert_eq!(parse_positive("-5"), None);
        assert_eq!(parse_positive("7"), Some(Decimal::from(7)));
    }
}
