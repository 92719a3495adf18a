//! 金額列の判定
//!
//! 優先順位: ヘッダーの金額見出し > 単価列の右隣 > 明細行の数値ヒューリスティック。
//! どの経路の候補も、結合未展開の表で明細行に0以外の値があることを確認できた場合のみ採用する。
//! 誤った金額列は合計を壊すので、確認できなければ「不明」(None) にする。

use serde::Serialize;

use super::header::HeaderRoles;
use super::scorer::RoleScore;
use crate::config::Thresholds;
use crate::table::{Grid, RawTable};
use crate::text::{integer_digits, is_detail_row, parse_number};

/// 候補を得た経路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountStep {
    HeaderKeyword,
    UnitPriceAdjacent,
    NumericHeuristic,
    External,
}

/// 金額列の候補 (列番号は 0 始まり)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountCandidate {
    pub column: usize,
    pub step: AmountStep,
}

/// 検証で落ちた候補 (列番号は 1 始まり)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedAmount {
    pub column: usize,
    pub step: AmountStep,
    pub reason: String,
}

/// 金額列の判定結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmountResolution {
    /// 採用した列 (1 始まり)
    pub amount: Option<usize>,
    pub step: Option<AmountStep>,
    pub rejected: Vec<RejectedAmount>,
    /// 数値ヒューリスティックのスコア (使った場合のみ)
    pub heuristic_scores: Vec<RoleScore>,
}

/// 明細行上の列ごとの数値集計
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct NumericProfile {
    non_zero: usize,
    max_digits: usize,
    max_abs: f64,
}

/// 候補を1つ提案する (検証前)
///
/// `grid` は統計用の表 (通常は結合展開済み)。`qty_col` / `unit_col` は 0 始まり。
pub fn propose_amount_column(
    grid: &impl Grid,
    header: Option<&HeaderRoles>,
    qty_col: usize,
    unit_col: usize,
    thresholds: &Thresholds,
) -> (Option<AmountCandidate>, Vec<RoleScore>) {
    let width = grid.width();

    if let Some(roles) = header {
        // 明示的な見出しは位置に関係なく採用
        if let Some(column) = roles.amount {
            return (
                Some(AmountCandidate {
                    column,
                    step: AmountStep::HeaderKeyword,
                }),
                Vec::new(),
            );
        }

        if let Some(unit_price) = roles.unit_price {
            let column = unit_price + 1;
            let candidate = (column < width).then_some(AmountCandidate {
                column,
                step: AmountStep::UnitPriceAdjacent,
            });
            return (candidate, Vec::new());
        }
    }

    let scores = numeric_heuristic_scores(grid, qty_col, unit_col, thresholds);

    let mut best: Option<&RoleScore> = None;
    for candidate in &scores {
        // 同点は右の列 (金額は他の項目の後ろに来る)
        if best.is_none_or(|b| candidate.score >= b.score) {
            best = Some(candidate);
        }
    }

    let candidate = best.map(|b| AmountCandidate {
        column: b.column - 1,
        step: AmountStep::NumericHeuristic,
    });
    (candidate, scores)
}

/// 明細行に限定した数値ヒューリスティックのスコア
///
/// スコア = 整数部の最大桁数×10 + 右側ボーナス(2) + 数量/単位より右(3) + 0以外が2件以上(1)。
/// 明細行で値がすべて0の列は対象外。
fn numeric_heuristic_scores(
    grid: &impl Grid,
    qty_col: usize,
    unit_col: usize,
    thresholds: &Thresholds,
) -> Vec<RoleScore> {
    let width = grid.width();
    let mut profiles = vec![NumericProfile::default(); width];

    for row in grid.rows() {
        if !is_detail_row(row, qty_col, unit_col) {
            continue;
        }
        for (col, profile) in profiles.iter_mut().enumerate() {
            let Some(value) = parse_number(grid_cell(row, col)) else {
                continue;
            };
            if value != 0.0 {
                profile.non_zero += 1;
            }
            profile.max_digits = profile.max_digits.max(integer_digits(value));
            profile.max_abs = profile.max_abs.max(value.abs());
        }
    }

    let last = width.saturating_sub(1).max(1) as f64;
    let after_qty_unit = qty_col.max(unit_col);

    profiles
        .iter()
        .enumerate()
        .filter(|(col, profile)| *col != qty_col && *col != unit_col && profile.max_abs > 0.0)
        .map(|(col, profile)| {
            let mut score = profile.max_digits as f64 * 10.0;
            if col as f64 / last >= thresholds.right_half_position {
                score += 2.0;
            }
            if col > after_qty_unit {
                score += 3.0;
            }
            if profile.non_zero >= 2 {
                score += 1.0;
            }
            RoleScore {
                column: col + 1,
                score,
            }
        })
        .collect()
}

fn grid_cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// 結合未展開の表で、明細行に0以外の値が1つでもあるか
///
/// 結合セルの展開値は合計欄の値が明細行に紛れ込むので、ここでは必ず `RawTable` を使う。
pub fn verify_amount_column(raw: &RawTable, column: usize, qty_col: usize, unit_col: usize) -> bool {
    raw.rows().iter().any(|row| {
        is_detail_row(row, qty_col, unit_col)
            && parse_number(grid_cell(row, column)).is_some_and(|v| v != 0.0)
    })
}

/// 候補を検証して判定結果に反映する
pub fn accept_candidate(
    raw: &RawTable,
    candidate: AmountCandidate,
    qty_col: usize,
    unit_col: usize,
    resolution: &mut AmountResolution,
) -> bool {
    if candidate.column >= raw.width() {
        resolution.rejected.push(RejectedAmount {
            column: candidate.column + 1,
            step: candidate.step,
            reason: "列が表の範囲外".to_string(),
        });
        return false;
    }

    if verify_amount_column(raw, candidate.column, qty_col, unit_col) {
        resolution.amount = Some(candidate.column + 1);
        resolution.step = Some(candidate.step);
        true
    } else {
        resolution.rejected.push(RejectedAmount {
            column: candidate.column + 1,
            step: candidate.step,
            reason: "明細行に0以外の値がない".to_string(),
        });
        false
    }
}

/// 金額列を判定する
pub fn resolve_amount_column(
    raw: &RawTable,
    grid: &impl Grid,
    header: Option<&HeaderRoles>,
    qty_col: usize,
    unit_col: usize,
    thresholds: &Thresholds,
) -> AmountResolution {
    let (candidate, heuristic_scores) =
        propose_amount_column(grid, header, qty_col, unit_col, thresholds);

    let mut resolution = AmountResolution {
        heuristic_scores,
        ..AmountResolution::default()
    };

    if let Some(candidate) = candidate {
        accept_candidate(raw, candidate, qty_col, unit_col, &mut resolution);
    }

    resolution
}
