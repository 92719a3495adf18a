//! 行分類 - 明細行らしさの判定

use regex::Regex;
use std::sync::LazyLock;

use super::{normalize_text, parse_number};

/// 見積書で使われる短い単位表記 (正規化・小文字化済み)
const UNIT_TOKENS: &[&str] = &[
    // 長さ・面積・体積 (㎡/㎥ は NFKC で m2/m3 になる)
    "m", "m2", "m3", "mm", "cm", "km", "延m", "坪", "ha",
    // 重量・容量
    "kg", "g", "t", "ton", "l",
    // 数えるもの
    "本", "枚", "個", "台", "基", "組", "対", "丁", "面", "段", "室", "戸", "棟", "脚", "門",
    "点", "件", "缶", "袋", "箱", "巻", "ロール", "セット", "set", "pcs", "pc", "ea",
    // 箇所
    "箇所", "ヶ所", "ケ所", "か所", "カ所", "ヵ所",
    // 一括・労務
    "式", "一式", "人", "人工", "日", "回", "往復", "ユニット",
];

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:\d{2,4}\s*[×x*]\s*\d{2,4})",
        r"|(?:(?:^|[^a-z])[whl]\s*[-=:]?\s*\d{2,5})",
        r"|(?:(?:幅|巾|高さ|長さ|重ね)\s*[-=:]?\s*\d{2,5})",
    ))
    .expect("valid regex")
});

/// 単位表記かどうか
pub fn is_unit_token(cell: &str) -> bool {
    let normalized = normalize_text(cell).to_lowercase();
    !normalized.is_empty() && UNIT_TOKENS.contains(&normalized.as_str())
}

/// 寸法表記を含むかどうか
pub fn has_size_pattern(text: &str) -> bool {
    SIZE_PATTERN.is_match(&normalize_text(text))
}

/// 明細行らしい行か (表題・小計行ではない)
///
/// 数値セル、単位セル、寸法表記のいずれかを含めば明細行らしいとみなす。
pub fn is_likely_body_row<S: AsRef<str>>(cells: &[S]) -> bool {
    cells.iter().map(AsRef::as_ref).any(|cell| {
        !cell.trim().is_empty()
            && (parse_number(cell).is_some() || is_unit_token(cell) || has_size_pattern(cell))
    })
}

/// 明細行か (数量が0以外の数値で、単位が既知の単位表記)
///
/// 列番号は 0 始まり。範囲外の列は空セル扱い。
pub fn is_detail_row<S: AsRef<str>>(cells: &[S], qty_col: usize, unit_col: usize) -> bool {
    let qty = cells.get(qty_col).map(AsRef::as_ref).unwrap_or("");
    let unit = cells.get(unit_col).map(AsRef::as_ref).unwrap_or("");

    let nonzero_qty = parse_number(qty).is_some_and(|v| v != 0.0);
    nonzero_qty && is_unit_token(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_unit_tokens() {
        assert!(is_unit_token("㎡"));
        assert!(is_unit_token("m2"));
        assert!(is_unit_token(" m "));
        assert!(is_unit_token("ｍ"));
        assert!(is_unit_token("箇所"));
        assert!(is_unit_token("式"));
        assert!(is_unit_token("SET"));
        assert!(!is_unit_token(""));
        assert!(!is_unit_token("単位"));
        assert!(!is_unit_token("外壁塗装"));
    }

    #[test]
    fn detects_size_patterns() {
        assert!(has_size_pattern("300×300"));
        assert!(has_size_pattern("U字溝 W-1200"));
        assert!(has_size_pattern("高さ=450"));
        assert!(has_size_pattern("h:50"));
        assert!(!has_size_pattern("外壁塗装工事"));
        assert!(!has_size_pattern("SW100"));
    }

    #[test]
    fn separates_body_rows_from_titles() {
        assert!(is_likely_body_row(&["外壁塗装", "シリコン", "120", "㎡"]));
        assert!(is_likely_body_row(&["笠木", "W=300", "", ""]));
        assert!(!is_likely_body_row(&["御見積書", "", "", ""]));
        assert!(!is_likely_body_row(&["品名", "摘要", "数量", "単位"]));
        assert!(!is_likely_body_row::<&str>(&[]));
    }

    #[test]
    fn detail_row_needs_nonzero_quantity_and_unit() {
        assert!(is_detail_row(&["下地処理", "", "12", "㎡"], 2, 3));
        assert!(!is_detail_row(&["小計", "", "0", "㎡"], 2, 3));
        assert!(!is_detail_row(&["仮設工事", "", "1", "計"], 2, 3));
        assert!(!is_detail_row(&["仮設工事", "", "", "式"], 2, 3));
        assert!(!is_detail_row(&["短い行"], 2, 3));
    }
}
