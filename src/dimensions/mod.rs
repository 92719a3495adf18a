//! 寸法抽出モジュール
//!
//! 摘要などの自由記述から 高さ/幅/長さ/重ね (mm) を取り出す。
//! 各項目は独立しており、見つからない項目は 0 ではなく「なし」になる。

mod units;

pub use units::to_mm_smart;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::config::Thresholds;
use crate::text::normalize_text;

/// 抽出結果 (mm)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_mm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wide_mm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_mm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap_mm: Option<u32>,
}

impl SizeResult {
    /// どの項目も取れていない
    pub fn is_empty(&self) -> bool {
        self.height_mm.is_none()
            && self.wide_mm.is_none()
            && self.length_mm.is_none()
            && self.overlap_mm.is_none()
    }

    /// 空いている項目だけを `other` で埋める。埋めた項目数を返す
    pub fn fill_missing_from(&mut self, other: &SizeResult) -> usize {
        let mut filled = 0;
        for (slot, value) in [
            (&mut self.height_mm, other.height_mm),
            (&mut self.wide_mm, other.wide_mm),
            (&mut self.length_mm, other.length_mm),
            (&mut self.overlap_mm, other.overlap_mm),
        ] {
            if slot.is_none() && value.is_some() {
                *slot = value;
                filled += 1;
            }
        }
        filled
    }
}

/// 抽出する項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Wide,
    Height,
    Length,
    Overlap,
}

/// 項目ごとのトークンパターン
///
/// 英字トークンの直前は英字以外 (`x` は「W300xH50」のような並びがあるので許可)。
/// 数値は桁数を後で検証するので `\d+` で貪欲に取る。
struct TokenPattern {
    dimension: Dimension,
    pattern: &'static str,
    /// 整数表記で許す桁数
    digits: (usize, usize),
}

const TOKEN_PATTERNS: &[TokenPattern] = &[
    TokenPattern {
        dimension: Dimension::Wide,
        pattern: r"(?:(?:^|[^a-wyz])w|幅|巾|横|ヨコ)",
        digits: (2, 4),
    },
    TokenPattern {
        dimension: Dimension::Height,
        pattern: r"(?:(?:^|[^a-wyz])h|高さ|立ち上がり|立上がり|立上り|縦|タテ)",
        digits: (2, 4),
    },
    TokenPattern {
        dimension: Dimension::Length,
        pattern: r"(?:(?:^|[^a-wyz])l|長さ|延長)",
        digits: (2, 5),
    },
    TokenPattern {
        dimension: Dimension::Overlap,
        pattern: r"(?:重ね|ラップ|overlap)(?:代|幅|しろ)?",
        digits: (2, 4),
    },
];

/// トークンの後ろ: 区切り (- = : または空白) → 数値 (桁区切り可) → 任意の単位
///
/// 単位の直後が英数字なら単位とみなさない (「600 max」の m を拾わない)。
const VALUE_SUFFIX: &str =
    r"\s*[-=:]?\s*(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*(?:(mm|m)(?:[^a-z0-9]|$))?";

static PAIRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.])(\d{2,4})\s*[×xX*]\s*(\d{2,4})(?:[^\d.]|$)").expect("valid regex")
});

static TOKEN_REGEXES: LazyLock<Vec<(Dimension, (usize, usize), Regex)>> = LazyLock::new(|| {
    TOKEN_PATTERNS
        .iter()
        .map(|p| {
            let re = Regex::new(&format!("(?i){}{}", p.pattern, VALUE_SUFFIX)).expect("valid regex");
            (p.dimension, p.digits, re)
        })
        .collect()
});

static DEFAULT_THRESHOLDS: LazyLock<Thresholds> = LazyLock::new(Thresholds::default);

/// 既定の閾値で寸法を抽出
pub fn extract_size(text: &str) -> SizeResult {
    extract_size_with(text, &DEFAULT_THRESHOLDS)
}

/// テキストから寸法を抽出
///
/// 1. 重ね (抽出した範囲は以降の検索から除外。「重ね幅」を幅と読まないため)
/// 2. 「300×300」形式 → 幅×高さ (見つかれば W/H の個別検索はしない)
/// 3. 幅・高さ・長さのトークン
/// 4. 高さが取れず、カテゴリ語を含めば標準高さ
pub fn extract_size_with(text: &str, thresholds: &Thresholds) -> SizeResult {
    let normalized = normalize_text(text);
    let mut result = SizeResult::default();

    let (overlap, masked) = extract_token(&normalized, Dimension::Overlap, thresholds);
    result.overlap_mm = overlap;
    let text = masked;

    let paired = extract_paired(&text, thresholds);
    if let Some((wide, height)) = paired {
        result.wide_mm = Some(wide);
        result.height_mm = Some(height);
    } else {
        result.wide_mm = extract_token(&text, Dimension::Wide, thresholds).0;
        result.height_mm = extract_token(&text, Dimension::Height, thresholds).0;
    }

    result.length_mm = extract_token(&text, Dimension::Length, thresholds).0;

    if result.height_mm.is_none() {
        result.height_mm = category_height(&text, thresholds);
    }

    result
}

/// 複数行をまとめて抽出 (行番号 → 結果)
pub fn extract_sizes<'a, I>(rows: I, thresholds: &Thresholds) -> BTreeMap<usize, SizeResult>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    rows.into_iter()
        .map(|(index, text)| (index, extract_size_with(text, thresholds)))
        .collect()
}

/// 「幅×高さ」の組
fn extract_paired(text: &str, thresholds: &Thresholds) -> Option<(u32, u32)> {
    for caps in PAIRED.captures_iter(text) {
        let wide = to_mm_smart(caps.get(1)?.as_str(), None, thresholds);
        let height = to_mm_smart(caps.get(2)?.as_str(), None, thresholds);
        if let (Some(w), Some(h)) = (wide, height) {
            return Some((w, h));
        }
    }
    None
}

/// トークン付きの値を探す。見つかった範囲を空白で潰したテキストも返す
fn extract_token(
    text: &str,
    dimension: Dimension,
    thresholds: &Thresholds,
) -> (Option<u32>, String) {
    let Some((_, digits, re)) = TOKEN_REGEXES.iter().find(|(d, _, _)| *d == dimension) else {
        return (None, text.to_string());
    };

    for caps in re.captures_iter(text) {
        if let Some(mm) = parse_token_value(&caps, *digits, thresholds) {
            let masked = caps
                .get(0)
                .map(|m| {
                    let mut masked = text.to_string();
                    masked.replace_range(m.range(), &" ".repeat(m.as_str().len()));
                    masked
                })
                .unwrap_or_else(|| text.to_string());
            return (Some(mm), masked);
        }
    }

    (None, text.to_string())
}

/// キャプチャから値を取り出して検証
fn parse_token_value(
    caps: &Captures,
    (min_digits, max_digits): (usize, usize),
    thresholds: &Thresholds,
) -> Option<u32> {
    let literal = caps.get(1)?.as_str();
    let unit = caps.get(2).map(|m| m.as_str());

    let integer_part = literal.split('.').next().unwrap_or(literal).replace(',', "");
    let is_decimal = literal.contains('.');
    // 単位付き (「L=3m」) は1桁でも採用
    let too_short = unit.is_none() && !is_decimal && integer_part.len() < min_digits;
    if integer_part.len() > max_digits || too_short {
        return None;
    }

    to_mm_smart(literal, unit, thresholds)
}

/// カテゴリ語に対応する標準高さ
fn category_height(text: &str, thresholds: &Thresholds) -> Option<u32> {
    thresholds
        .category_heights
        .iter()
        .find(|c| !c.keyword.is_empty() && text.contains(c.keyword.as_str()))
        .map(|c| c.height_mm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn size(height: Option<u32>, wide: Option<u32>, length: Option<u32>, overlap: Option<u32>) -> SizeResult {
        SizeResult {
            height_mm: height,
            wide_mm: wide,
            length_mm: length,
            overlap_mm: overlap,
        }
    }

    #[test]
    fn paired_notation_gives_width_and_height() {
        assert_eq!(extract_size("300×300"), size(Some(300), Some(300), None, None));
        assert_eq!(extract_size("桝 450x600"), size(Some(600), Some(450), None, None));
        assert_eq!(extract_size("３００＊２５０"), size(Some(250), Some(300), None, None));
    }

    #[test]
    fn paired_notation_skips_individual_width_and_height() {
        assert_eq!(extract_size("300×300 H=50"), size(Some(300), Some(300), None, None));
    }

    #[test]
    fn tokens_with_separators() {
        assert_eq!(
            extract_size("W-1200 H=50 重ね=100"),
            size(Some(50), Some(1200), None, Some(100))
        );
        assert_eq!(extract_size("幅：600 高さ 900"), size(Some(900), Some(600), None, None));
        assert_eq!(extract_size("W300xH50"), size(Some(50), Some(300), None, None));
    }

    #[test]
    fn length_in_meters_and_millimeters() {
        assert_eq!(extract_size("L=1.2m"), size(None, None, Some(1200), None));
        assert_eq!(extract_size("L-1200"), size(None, None, Some(1200), None));
        assert_eq!(extract_size("長さ 12000mm"), size(None, None, Some(12000), None));
        assert_eq!(extract_size("L=2.5"), size(None, None, Some(2500), None));
        assert_eq!(extract_size("L=3m"), size(None, None, Some(3000), None));
        assert_eq!(extract_size("長さ 4m以上"), size(None, None, Some(4000), None));
    }

    #[test]
    fn unit_needs_a_boundary() {
        assert_eq!(extract_size("W=600 max"), size(None, Some(600), None, None));
        assert_eq!(extract_size("H=50 mortar"), size(Some(50), None, None, None));
    }

    #[test]
    fn thousands_separator_in_value() {
        assert_eq!(extract_size("W=1,200 H=50"), size(Some(50), Some(1200), None, None));
        assert_eq!(extract_size("L=12,000mm"), size(None, None, Some(12000), None));
        assert_eq!(extract_size("W=12,000"), SizeResult::default());
    }

    #[test]
    fn overlap_width_is_not_read_as_width() {
        assert_eq!(extract_size("重ね幅100"), size(None, None, None, Some(100)));
        assert_eq!(extract_size("ラップ=150 W=1000"), size(None, Some(1000), None, Some(150)));
    }

    #[test]
    fn rejects_implausible_values() {
        // 5桁の幅、単桁の高さ、上限超えの長さ
        assert_eq!(extract_size("W=12345 H=5 L=25000"), SizeResult::default());
        assert_eq!(extract_size("SW100"), SizeResult::default());
    }

    #[test]
    fn groove_keyword_defaults_height_only() {
        assert_eq!(extract_size("U字溝 据付"), size(Some(300), None, None, None));
        assert_eq!(extract_size("ソフト巾木"), size(Some(100), None, None, None));
    }

    #[test]
    fn explicit_height_beats_category_default() {
        assert_eq!(extract_size("巾木 H=60"), size(Some(60), None, None, None));
        assert_eq!(extract_size("側溝 W=300 L=2000"), size(Some(300), Some(300), Some(2000), None));
    }

    #[test]
    fn plain_text_has_no_size() {
        assert!(extract_size("外壁塗装 シリコン系").is_empty());
        assert!(extract_size("").is_empty());
    }

    #[test]
    fn fill_missing_keeps_existing_values() {
        let mut rule = size(Some(50), None, None, None);
        let ai = size(Some(80), Some(900), None, None);
        assert_eq!(rule.fill_missing_from(&ai), 1);
        assert_eq!(rule, size(Some(50), Some(900), None, None));
    }

    #[test]
    fn batch_maps_row_indices() {
        let rows = [(3, "W=300"), (7, "塗装")];
        let sizes = extract_sizes(rows, &Thresholds::default());
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[&3].wide_mm, Some(300));
        assert!(sizes[&7].is_empty());
    }

    #[test]
    fn serializes_only_present_fields() {
        let json = serde_json::to_string(&size(Some(50), None, None, Some(100))).unwrap();
        assert_eq!(json, r#"{"heightMm":50,"overlapMm":100}"#);
    }
}
