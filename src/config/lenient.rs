//! Lenient decimal parsing with C `strtol` semantics.
//!
//! Leading whitespace is skipped, an optional sign is accepted, and digits
//! are consumed until the first non-digit. Input with no digits yields 0.
//! Values beyond the `i64` range saturate.

pub fn parse_leading_int(input: &str) -> i64 {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_digits() {
        assert_eq!(parse_leading_int("11222"), 11222);
        assert_eq!(parse_leading_int("  42"), 42);
        assert_eq!(parse_leading_int("+7"), 7);
        assert_eq!(parse_leading_int("-250"), -250);
    }

    #[test]
    fn stops_at_first_non_digit() {
        assert_eq!(parse_leading_int("12abc"), 12);
        assert_eq!(parse_leading_int("3.9"), 3);
    }

    #[test]
    fn no_digits_is_zero() {
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int("-"), 0);
        assert_eq!(parse_leading_int(" x12"), 0);
    }

    #[test]
    fn saturates_on_overflow() {
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
        assert_eq!(parse_leading_int("-99999999999999999999999"), i64::MIN);
    }
}
