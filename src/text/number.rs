//! 数値解析

use regex::Regex;
use std::sync::LazyLock;

use super::normalize_text;

static PLAIN_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").expect("valid regex"));

/// 通貨記号・桁区切りを除去して数値として解釈
///
/// 除去後に符号付き10進数そのものでなければ数値とみなさない。
/// 会計表記の `△` / `▲` は負号として扱う。
pub fn parse_number(cell: &str) -> Option<f64> {
    let normalized = normalize_text(cell);

    let mut cleaned = String::with_capacity(normalized.len());
    for (i, c) in normalized.chars().enumerate() {
        match c {
            ',' | '¥' | '$' | '€' | '£' | '円' | ' ' => {}
            '△' | '▲' if i == 0 => cleaned.push('-'),
            _ => cleaned.push(c),
        }
    }

    if cleaned.is_empty() || !PLAIN_DECIMAL.is_match(&cleaned) {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 整数部の桁数 (0 は 1 桁)
pub fn integer_digits(value: f64) -> usize {
    let mut integer = value.abs().trunc();
    let mut digits = 1;
    while integer >= 10.0 {
        integer = (integer / 10.0).trunc();
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_formatted_numbers() {
        assert_eq!(parse_number("120"), Some(120.0));
        assert_eq!(parse_number("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_number("¥12,000"), Some(12_000.0));
        assert_eq!(parse_number("￥12,000"), Some(12_000.0));
        assert_eq!(parse_number("3,500円"), Some(3_500.0));
        assert_eq!(parse_number("-2.5"), Some(-2.5));
        assert_eq!(parse_number("１２０"), Some(120.0));
        assert_eq!(parse_number(".5"), Some(0.5));
    }

    #[test]
    fn treats_triangle_as_minus() {
        assert_eq!(parse_number("△1,000"), Some(-1000.0));
        assert_eq!(parse_number("▲50"), Some(-50.0));
    }

    #[test]
    fn rejects_mixed_text() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("W=1200"), None);
        assert_eq!(parse_number("12m"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("一式"), None);
        assert_eq!(parse_number("-"), None);
    }

    #[test]
    fn counts_integer_digits() {
        assert_eq!(integer_digits(0.0), 1);
        assert_eq!(integer_digits(0.75), 1);
        assert_eq!(integer_digits(9.0), 1);
        assert_eq!(integer_digits(10.0), 2);
        assert_eq!(integer_digits(-12_345.6), 5);
        assert_eq!(integer_digits(1_000_000.0), 7);
    }
}
