//! 数値のmm換算

use crate::config::Thresholds;

/// 数値リテラルと単位からmmに換算
///
/// - `m` 付き: ×1000
/// - `mm` 付き: そのまま
/// - 単位なしで小数点を含み、値が閾値以下: メートルとみなして ×1000
/// - それ以外の単位なし: mm とみなす
///
/// 上限以上 (誤読とみなす) や負の値は `None`。結果は四捨五入。
pub fn to_mm_smart(literal: &str, unit: Option<&str>, thresholds: &Thresholds) -> Option<u32> {
    let value: f64 = literal.replace(',', "").parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let unit = unit.map(str::to_lowercase);
    let mm = match unit.as_deref() {
        Some("m") => value * 1000.0,
        Some("mm") => value,
        Some(_) => return None,
        None if literal.contains('.') && value <= thresholds.meters_literal_max => value * 1000.0,
        None => value,
    };

    let rounded = mm.round();
    if rounded < 0.0 || rounded >= f64::from(thresholds.max_size_mm) {
        return None;
    }

    Some(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_by_unit() {
        let t = Thresholds::default();
        assert_eq!(to_mm_smart("1.2", Some("m"), &t), Some(1200));
        assert_eq!(to_mm_smart("3", Some("M"), &t), Some(3000));
        assert_eq!(to_mm_smart("450", Some("mm"), &t), Some(450));
        assert_eq!(to_mm_smart("12.6", Some("mm"), &t), Some(13));
    }

    #[test]
    fn unitless_decimals_are_meters_when_small() {
        let t = Thresholds::default();
        assert_eq!(to_mm_smart("1.2", None, &t), Some(1200));
        assert_eq!(to_mm_smart("19.5", None, &t), Some(19500));
        assert_eq!(to_mm_smart("20.0", None, &t), None);
        assert_eq!(to_mm_smart("25.5", None, &t), Some(26));
        assert_eq!(to_mm_smart("1200", None, &t), Some(1200));
    }

    #[test]
    fn rejects_out_of_bounds() {
        let t = Thresholds::default();
        assert_eq!(to_mm_smart("20000", None, &t), None);
        assert_eq!(to_mm_smart("19999", None, &t), Some(19999));
        assert_eq!(to_mm_smart("25", Some("m"), &t), None);
        assert_eq!(to_mm_smart("abc", None, &t), None);
        assert_eq!(to_mm_smart("10", Some("cm"), &t), None);
    }
}
