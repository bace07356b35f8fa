//! Display formatting for view cells.
//!
//! Amounts use Indian digit grouping (`12,34,567.89`): the last three integer digits form one
//! group and the remaining digits are grouped in pairs.

const MAX_FRACTION_DIGITS: usize = 3;

fn round_to(v: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = v * factor;
    // Near f64::MAX the scaled value overflows; such values have no fraction to round anyway.
    if !scaled.is_finite() {
        return v;
    }
    let r = scaled.round() / factor;
    // Avoid rendering "-0.0".
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// `+12.3%` / `-4.0%`. Values that round to zero render as `+0.0%`.
pub fn signed_percent(v: f64) -> String {
    format!("{:+.1}%", round_to(v, 1))
}

/// `25.0%`, `-3.0%`.
pub fn percent(v: f64) -> String {
    format!("{:.1}%", round_to(v, 1))
}

/// Absolute value as a percentage, for arrow-style highlights: `12.3%`.
pub fn abs_percent(v: f64) -> String {
    percent(v.abs())
}

/// Splits `v.abs()` into integer digits and trimmed fraction digits.
fn decimal_parts(v: f64) -> (String, String) {
    let s = format!("{:.*}", MAX_FRACTION_DIGITS, v.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), ""));
    (int.to_string(), frac.trim_end_matches('0').to_string())
}

fn is_zero_parts(int: &str, frac: &str) -> bool {
    int.chars().all(|c| c == '0') && frac.is_empty()
}

fn group_indian(int: &str) -> String {
    if int.len() <= 3 {
        return int.to_string();
    }
    let (head, tail) = int.split_at(int.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (h, t) = rest.split_at(rest.len() - 2);
        groups.push(t);
        rest = h;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// Magnitude of `v` with Indian grouping and no sign.
pub fn grouped_magnitude(v: f64) -> String {
    let (int, frac) = decimal_parts(v);
    let grouped = group_indian(&int);
    if frac.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac}")
    }
}

/// `-1,23,456.5`.
pub fn grouped_amount(v: f64) -> String {
    let (int, frac) = decimal_parts(v);
    let magnitude = grouped_magnitude(v);
    if v < 0.0 && !is_zero_parts(&int, &frac) {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

/// `(45,000)`, the accounting style for losses.
pub fn parenthesized_amount(v: f64) -> String {
    format!("({})", grouped_magnitude(v))
}

/// Number without grouping, trailing zeros trimmed: `1200`, `2.5`.
pub fn plain_number(v: f64) -> String {
    let (int, frac) = decimal_parts(v);
    let sign = if v < 0.0 && !is_zero_parts(&int, &frac) {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{int}")
    } else {
        format!("{sign}{int}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_percent_has_explicit_sign() {
        assert_eq!(signed_percent(12.345), "+12.3%");
        assert_eq!(signed_percent(-38.33), "-38.3%");
        assert_eq!(signed_percent(0.0), "+0.0%");
        assert_eq!(signed_percent(-0.04), "+0.0%");
        assert_eq!(signed_percent(100.0), "+100.0%");
    }

    #[test]
    fn huge_values_stay_finite() {
        let s = signed_percent(1e308);
        assert!(s.starts_with("+1000"), "{s}");
        assert!(s.ends_with(".0%"), "{s}");
        assert!(!s.contains("inf"));

        let s = percent(-1.7e308);
        assert!(s.starts_with("-1"), "{s}");
        assert!(!s.contains("inf"));
    }

    #[test]
    fn percent_formats_one_decimal() {
        assert_eq!(percent(25.0), "25.0%");
        assert_eq!(percent(-3.0), "-3.0%");
        assert_eq!(percent(-29.24), "-29.2%");
        assert_eq!(abs_percent(-15.66), "15.7%");
    }

    #[test]
    fn amounts_use_indian_grouping() {
        assert_eq!(grouped_amount(12_345_678.0), "1,23,45,678");
        assert_eq!(grouped_amount(45_000.0), "45,000");
        assert_eq!(grouped_amount(1445.26), "1,445.26");
        assert_eq!(grouped_amount(295.16), "295.16");
        assert_eq!(grouped_amount(0.26), "0.26");
        assert_eq!(grouped_amount(0.0), "0");
        assert_eq!(grouped_amount(-1234.5), "-1,234.5");
        assert_eq!(grouped_amount(-0.0001), "0");
        assert_eq!(grouped_amount(999.9996), "1,000");
    }

    #[test]
    fn parenthesized_amount_drops_sign() {
        assert_eq!(parenthesized_amount(-45_000.0), "(45,000)");
        assert_eq!(parenthesized_amount(-86.27), "(86.27)");
    }

    #[test]
    fn plain_number_trims_trailing_zeros() {
        assert_eq!(plain_number(1200.0), "1200");
        assert_eq!(plain_number(2.50), "2.5");
        assert_eq!(plain_number(-7.125), "-7.125");
    }
}
