//! 役割スコアリング
//!
//! 各スコア関数は対象外の列に `None` を返す。選択は正のスコアの最大値
//! (同点は左の列)。正のスコアがなければ呼び出し側が既定位置に倒す。

use serde::Serialize;

use super::stats::ColumnStatistics;
use crate::config::Thresholds;

/// 列ごとのスコア (列番号は 1 始まり)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleScore {
    pub column: usize,
    pub score: f64,
}

/// 選択結果とスコア一覧
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// 選ばれた列 (0 始まり)
    pub column: Option<usize>,
    pub scores: Vec<RoleScore>,
}

pub type ScoreFn = fn(&ColumnStatistics, &Thresholds) -> Option<f64>;

fn eligible(stats: &ColumnStatistics, thresholds: &Thresholds) -> bool {
    stats.non_empty >= thresholds.min_non_empty
}

/// 単位列: 単位表記の多さと短い文字列
pub fn score_unit(stats: &ColumnStatistics, thresholds: &Thresholds) -> Option<f64> {
    if !eligible(stats, thresholds) {
        return None;
    }
    let short_text = if stats.avg_text_len > 0.0 && stats.avg_text_len <= 6.0 {
        2.0
    } else {
        0.0
    };
    Some(stats.unit_like_ratio() * 10.0 + short_text + stats.right_bias * 0.5)
}

/// 数量列: 数値中心で中央値が小さい
pub fn score_quantity(stats: &ColumnStatistics, thresholds: &Thresholds) -> Option<f64> {
    if !eligible(stats, thresholds) || stats.numeric_ratio() < thresholds.numeric_ratio_floor {
        return None;
    }
    Some(
        stats.numeric_ratio() * 5.0
            + smallness_bonus(stats.median_numeric)
            + stats.right_bias * 0.3,
    )
}

/// 金額列 (統計のみ): 数値中心で中央値が大きく右寄り
pub fn score_amount(stats: &ColumnStatistics, thresholds: &Thresholds) -> Option<f64> {
    if !eligible(stats, thresholds) || stats.numeric_ratio() < thresholds.numeric_ratio_floor {
        return None;
    }
    Some(
        stats.numeric_ratio() * 3.0
            + largeness_bonus(stats.median_numeric)
            + stats.right_bias * 1.5,
    )
}

/// 品名列: 短く、値のばらつきが大きいテキスト列
pub fn score_item(stats: &ColumnStatistics, thresholds: &Thresholds) -> Option<f64> {
    if !eligible(stats, thresholds) || stats.text_ratio() < thresholds.text_ratio_floor {
        return None;
    }

    let mut score = stats.text_ratio();
    if stats.avg_text_len > 0.0 && stats.avg_text_len <= thresholds.text_length_pivot {
        score += 2.0;
    }
    if stats.unique_text_count >= thresholds.item_unique_floor {
        score += 2.0;
    }
    // 品名は左に置かれる
    score += (1.0 - stats.right_bias) * 0.5;
    // 単位列の取り違え防止
    score -= stats.unit_like_ratio() * 5.0;

    Some(score)
}

/// 摘要列: 長いテキスト列
pub fn score_description(stats: &ColumnStatistics, thresholds: &Thresholds) -> Option<f64> {
    if !eligible(stats, thresholds) || stats.text_ratio() < thresholds.text_ratio_floor {
        return None;
    }

    let mut score = stats.text_ratio() * 0.5;
    if stats.avg_text_len >= thresholds.text_length_pivot {
        score += 3.0;
    }
    if stats.text_count > 0 {
        score += stats.unique_text_count as f64 / stats.text_count as f64 * 0.5;
    }
    score -= stats.unit_like_ratio() * 5.0;

    Some(score)
}

/// 数量らしい中央値に加点、金額らしい大きな中央値に減点
fn smallness_bonus(median: Option<f64>) -> f64 {
    match median {
        Some(m) if m > 0.0 && m <= 1_000.0 => 2.0,
        Some(m) if m > 0.0 && m <= 10_000.0 => 0.5,
        Some(m) if m > 100_000.0 => -3.0,
        Some(_) => -1.0,
        None => 0.0,
    }
}

fn largeness_bonus(median: Option<f64>) -> f64 {
    match median {
        Some(m) if m >= 10_000.0 => 3.0,
        Some(m) if m >= 1_000.0 => 2.0,
        Some(m) if m >= 100.0 => 0.5,
        _ => 0.0,
    }
}

/// 除外列を除いてスコア最大の列を選ぶ
pub fn select_column(
    stats: &[ColumnStatistics],
    exclude: &[usize],
    thresholds: &Thresholds,
    score: ScoreFn,
) -> Selection {
    let scores: Vec<RoleScore> = stats
        .iter()
        .filter(|s| !exclude.contains(&s.column))
        .filter_map(|s| {
            score(s, thresholds).map(|value| RoleScore {
                column: s.column + 1,
                score: value,
            })
        })
        .collect();

    let mut best: Option<&RoleScore> = None;
    for candidate in scores.iter().filter(|c| c.score > 0.0) {
        if best.is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }

    Selection {
        column: best.map(|b| b.column - 1),
        scores,
    }
}
