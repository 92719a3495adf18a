//! 推論サービスのレスポンス検証
//!
//! 型が違う・範囲外の項目は捨てる (0 で補わない)。

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::config::Thresholds;
use crate::dimensions::SizeResult;
use crate::error::InferenceError;
use crate::text::parse_number;

const MAX_NOTES_CHARS: usize = 200;

/// 検証済みの推定寸法
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferredSize {
    pub size: SizeResult,
    /// 参考値。ルール結果の上書きには使わない
    pub confidence: Option<f64>,
    pub notes: Option<String>,
}

/// 寸法レスポンスの検証結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeValidation {
    pub accepted: BTreeMap<usize, InferredSize>,
    /// 捨てた項目・エントリの数
    pub dropped: usize,
}

/// 検証済みの列ヒント (1 始まり)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnHints {
    pub item: Option<usize>,
    pub desc: Option<usize>,
    pub qty: Option<usize>,
    pub unit: Option<usize>,
    pub amount: Option<usize>,
}

/// 寸法レスポンスを検証
///
/// 受け付ける形:
/// - `[{"index": 3, "heightMm": 50, ...}, ...]`
/// - `{"3": {"heightMm": 50, ...}, ...}`
/// - 上記を `results` に包んだもの
pub fn validate_size_response(
    value: &Value,
    requested: &BTreeSet<usize>,
    thresholds: &Thresholds,
) -> Result<SizeValidation, InferenceError> {
    let mut validation = SizeValidation::default();

    let entries: Vec<(Option<usize>, &Map<String, Value>)> = match unwrap_results(value) {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => (obj.get("index").and_then(as_index), Some(obj)),
                _ => (None, None),
            })
            .filter_map(|(index, obj)| match obj {
                Some(obj) => Some((index, obj)),
                None => {
                    validation.dropped += 1;
                    None
                }
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, item)| match item {
                Value::Object(obj) => Some((key.trim().parse::<usize>().ok(), obj)),
                _ => {
                    validation.dropped += 1;
                    None
                }
            })
            .collect(),
        _ => {
            return Err(InferenceError::MalformedBody(
                "寸法レスポンスが配列でもオブジェクトでもありません".to_string(),
            ));
        }
    };

    for (index, obj) in entries {
        let Some(index) = index.filter(|i| requested.contains(i)) else {
            validation.dropped += 1;
            continue;
        };

        let mut size = SizeResult::default();
        let fields = [
            (&mut size.height_mm, ["heightMm", "height_mm"]),
            (&mut size.wide_mm, ["wideMm", "wide_mm"]),
            (&mut size.length_mm, ["lengthMm", "length_mm"]),
            (&mut size.overlap_mm, ["overlapMm", "overlap_mm"]),
        ];
        for (slot, keys) in fields {
            let Some(raw) = keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null()) else {
                continue;
            };
            match as_millimeters(raw, thresholds) {
                Some(mm) => *slot = Some(mm),
                None => {
                    warn!(index, value = %raw, "推論サービスの寸法値を破棄");
                    validation.dropped += 1;
                }
            }
        }

        if size.is_empty() {
            continue;
        }

        let confidence = obj
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
        let notes = obj
            .get("notes")
            .and_then(Value::as_str)
            .map(|s| s.chars().take(MAX_NOTES_CHARS).collect());

        validation.accepted.insert(
            index,
            InferredSize {
                size,
                confidence,
                notes,
            },
        );
    }

    Ok(validation)
}

/// 列レスポンスを検証 (範囲外・非整数は捨てる)
pub fn validate_column_response(
    value: &Value,
    column_count: usize,
) -> Result<ColumnHints, InferenceError> {
    let Value::Object(obj) = unwrap_results(value) else {
        return Err(InferenceError::MalformedBody(
            "列レスポンスがオブジェクトではありません".to_string(),
        ));
    };

    let column = |keys: &[&str]| -> Option<usize> {
        let raw = keys.iter().find_map(|k| obj.get(*k))?;
        let col = as_index(raw)?;
        (1..=column_count).contains(&col).then_some(col)
    };

    Ok(ColumnHints {
        item: column(&["item"]),
        desc: column(&["desc", "description"]),
        qty: column(&["qty", "quantity"]),
        unit: column(&["unit"]),
        amount: column(&["amount"]),
    })
}

fn unwrap_results(value: &Value) -> &Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.contains_key("results") => &map["results"],
        _ => value,
    }
}

/// 非負の整数 (数値または数値文字列)
fn as_index(value: &Value) -> Option<usize> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_number(s)?,
        _ => return None,
    };
    (number >= 0.0 && number.fract() == 0.0 && number <= u32::MAX as f64).then_some(number as usize)
}

/// mm として妥当な値 (0 以上、上限未満) を四捨五入
fn as_millimeters(value: &Value, thresholds: &Thresholds) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_number(s)?,
        _ => return None,
    };
    let rounded = number.round();
    (number.is_finite() && rounded >= 0.0 && rounded < f64::from(thresholds.max_size_mm))
        .then_some(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requested(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn accepts_array_form() {
        let value = json!([
            {"index": 2, "heightMm": 50, "wideMm": "1,200", "confidence": 1.7, "notes": "推定"},
            {"index": 5, "lengthMm": 900.4}
        ]);
        let v = validate_size_response(&value, &requested(&[2, 5]), &Thresholds::default()).unwrap();

        let two = &v.accepted[&2];
        assert_eq!(two.size.height_mm, Some(50));
        assert_eq!(two.size.wide_mm, Some(1200));
        assert_eq!(two.confidence, Some(1.0));
        assert_eq!(two.notes.as_deref(), Some("推定"));
        assert_eq!(v.accepted[&5].size.length_mm, Some(900));
        assert_eq!(v.dropped, 0);
    }

    #[test]
    fn accepts_keyed_and_wrapped_forms() {
        let value = json!({"results": {"7": {"height_mm": 300}}});
        let v = validate_size_response(&value, &requested(&[7]), &Thresholds::default()).unwrap();
        assert_eq!(v.accepted[&7].size.height_mm, Some(300));
    }

    #[test]
    fn drops_bad_fields_without_zero_filling() {
        let value = json!([
            {"index": 1, "heightMm": -5, "wideMm": 25000, "lengthMm": "abc", "overlapMm": true},
            {"index": 2, "heightMm": 60, "wideMm": [1]}
        ]);
        let v = validate_size_response(&value, &requested(&[1, 2]), &Thresholds::default()).unwrap();

        assert!(!v.accepted.contains_key(&1));
        let two = &v.accepted[&2];
        assert_eq!(two.size.height_mm, Some(60));
        assert_eq!(two.size.wide_mm, None);
        assert_eq!(v.dropped, 5);
    }

    #[test]
    fn ignores_unrequested_indices() {
        let value = json!([{"index": 99, "heightMm": 50}, "junk"]);
        let v = validate_size_response(&value, &requested(&[1]), &Thresholds::default()).unwrap();
        assert!(v.accepted.is_empty());
        assert_eq!(v.dropped, 2);
    }

    #[test]
    fn rejects_scalar_body() {
        let err = validate_size_response(&json!("ok"), &requested(&[1]), &Thresholds::default());
        assert!(matches!(err, Err(InferenceError::MalformedBody(_))));
    }

    #[test]
    fn column_hints_are_range_checked() {
        let value = json!({"item": 1, "description": "2", "qty": 0, "unit": 9, "amount": 4.5});
        let hints = validate_column_response(&value, 5).unwrap();
        assert_eq!(
            hints,
            ColumnHints {
                item: Some(1),
                desc: Some(2),
                qty: None,
                unit: None,
                amount: None,
            }
        );
        assert!(validate_column_response(&json!([1, 2]), 5).is_err());
    }
}
