//! 列の役割推定モジュール
//!
//! ヘッダー行の見出し語を優先し、見出しで決まらない役割は列統計のスコアで選ぶ。
//! スコアが正の列がなければ既定位置に倒すので、金額以外の役割は必ず有効な列になる。

mod amount;
mod header;
mod scorer;
mod stats;

pub use amount::{
    AmountCandidate, AmountResolution, AmountStep, RejectedAmount, accept_candidate,
    propose_amount_column, resolve_amount_column, verify_amount_column,
};
pub use header::{HeaderLabel, HeaderRoles, HeaderRow, label_of, locate_header_row, map_header_roles};
pub use scorer::{
    RoleScore, ScoreFn, Selection, score_amount, score_description, score_item, score_quantity,
    score_unit, select_column,
};
pub use stats::{ColumnStatistics, build_column_statistics, sample_rows};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Thresholds;
use crate::table::{FilledTable, Grid, RawTable, SheetInput};
use crate::text::has_size_pattern;

// 既定位置 (0 始まり)
const DEFAULT_ITEM_COL: usize = 0;
const DEFAULT_DESC_COL: usize = 1;
const DEFAULT_QTY_COL: usize = 2;
const DEFAULT_UNIT_COL: usize = 3;

/// 推定された列 (1 始まり)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedColumnSet {
    pub item: usize,
    pub desc: usize,
    pub qty: usize,
    pub unit: usize,
    /// 検証済みの場合のみ。None は「不明」であって 0 ではない
    pub amount: Option<usize>,
    pub size: usize,
    /// ヘッダー行 (0 始まり)
    pub header_row_index: Option<usize>,
}

impl DetectedColumnSet {
    /// 列番号 (1 始まり) を 0 始まりに
    pub fn index(column: usize) -> usize {
        column.saturating_sub(1)
    }
}

/// 列の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Item,
    Description,
    Quantity,
    Unit,
    Amount,
    Size,
}

/// 役割ごとのスコア一覧
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleScoreTrace {
    pub unit: Vec<RoleScore>,
    pub quantity: Vec<RoleScore>,
    pub item: Vec<RoleScore>,
    pub description: Vec<RoleScore>,
    /// 統計のみの金額スコア (参考値)
    pub amount: Vec<RoleScore>,
}

/// 推定過程の記録
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionTrace {
    pub sample_size: usize,
    pub header_score: Option<i32>,
    /// ヘッダーの見出しで決まった役割
    pub header_roles: Vec<Role>,
    /// 既定位置に倒した役割
    pub fallbacks: Vec<Role>,
    /// 推論サービスのヒントで置き換えた役割
    pub external_roles: Vec<Role>,
    pub scores: RoleScoreTrace,
    pub amount_step: Option<AmountStep>,
    pub amount_heuristic: Vec<RoleScore>,
    pub rejected_amounts: Vec<RejectedAmount>,
}

/// 推定結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDetection {
    pub columns: DetectedColumnSet,
    pub trace: DetectionTrace,
}

/// シート入力から直接推定
pub fn detect_sheet(sheet: SheetInput, thresholds: &Thresholds) -> ColumnDetection {
    let (raw, filled) = sheet.into_tables();
    detect_columns(&raw, &filled, thresholds)
}

/// 列の役割を推定
///
/// ヘッダー探索は未展開の表、列統計は結合展開済みの表、金額の検証は未展開の表で行う。
pub fn detect_columns(
    raw: &RawTable,
    filled: &FilledTable,
    thresholds: &Thresholds,
) -> ColumnDetection {
    let width = filled.width();
    let mut trace = DetectionTrace::default();

    let header = locate_header_row(raw, thresholds);
    let header_roles = header.as_ref().map(|h| map_header_roles(&h.cells));
    trace.header_score = header.as_ref().map(|h| h.score);

    let rows = sample_rows(filled, header.as_ref().map(|h| h.index), thresholds.sample_limit);
    trace.sample_size = rows.len();
    let stats = build_column_statistics(filled, &rows);

    let from_header = header_roles.clone().unwrap_or_default();
    let mut picker = RolePicker {
        stats: &stats,
        thresholds,
        width,
        header_columns: from_header.assigned_columns(),
        taken: from_header.assigned_columns(),
        trace: &mut trace,
    };

    let unit = picker.pick(Role::Unit, from_header.unit, score_unit, DEFAULT_UNIT_COL);
    let qty = picker.pick(Role::Quantity, from_header.quantity, score_quantity, DEFAULT_QTY_COL);
    let item = picker.pick(Role::Item, from_header.item, score_item, DEFAULT_ITEM_COL);
    let desc = picker.pick(
        Role::Description,
        from_header.description,
        score_description,
        DEFAULT_DESC_COL,
    );

    trace.scores.amount = select_column(&stats, &[qty, unit], thresholds, score_amount).scores;

    let amount = resolve_amount_column(raw, filled, header_roles.as_ref(), qty, unit, thresholds);
    trace.amount_step = amount.step;
    trace.amount_heuristic = amount.heuristic_scores;
    trace.rejected_amounts = amount.rejected;

    let size = match from_header.size.filter(|c| *c < width) {
        Some(col) => {
            trace.header_roles.push(Role::Size);
            col
        }
        None => size_source_column(filled, &rows, &[item, qty, unit]).unwrap_or(desc),
    };

    let columns = DetectedColumnSet {
        item: item + 1,
        desc: desc + 1,
        qty: qty + 1,
        unit: unit + 1,
        amount: amount.amount,
        size: size + 1,
        header_row_index: header.as_ref().map(|h| h.index),
    };

    debug!(?trace, "列推定の過程");
    info!(
        item = columns.item,
        desc = columns.desc,
        qty = columns.qty,
        unit = columns.unit,
        amount = ?columns.amount,
        size = columns.size,
        header = ?columns.header_row_index,
        "列の役割を推定"
    );

    ColumnDetection { columns, trace }
}

/// 見出し > スコア > 既定位置 の順で役割ごとに列を決める
struct RolePicker<'a> {
    stats: &'a [ColumnStatistics],
    thresholds: &'a Thresholds,
    width: usize,
    /// 見出しで役割が決まった列 (既定位置でも使わない)
    header_columns: Vec<usize>,
    /// 既に役割が決まった列
    taken: Vec<usize>,
    trace: &'a mut DetectionTrace,
}

impl RolePicker<'_> {
    fn pick(
        &mut self,
        role: Role,
        header_col: Option<usize>,
        score: ScoreFn,
        default_col: usize,
    ) -> usize {
        if let Some(col) = header_col {
            self.trace.header_roles.push(role);
            return col;
        }

        let selection = select_column(self.stats, &self.taken, self.thresholds, score);
        let scores = &mut self.trace.scores;
        match role {
            Role::Unit => scores.unit = selection.scores,
            Role::Quantity => scores.quantity = selection.scores,
            Role::Item => scores.item = selection.scores,
            _ => scores.description = selection.scores,
        }

        let col = match selection.column {
            Some(col) => col,
            None => {
                self.trace.fallbacks.push(role);
                positional_default(default_col, self.width, &self.header_columns)
            }
        };
        self.taken.push(col);
        col
    }
}

/// 既定位置を表の幅に収める
///
/// 見出しで決まった列に当たる場合は右、なければ左の空いている列へずらす。
/// 空きがなければ既定位置のまま。
fn positional_default(default_col: usize, width: usize, header_columns: &[usize]) -> usize {
    let clipped = default_col.min(width.saturating_sub(1));
    if !header_columns.contains(&clipped) {
        return clipped;
    }

    (clipped + 1..width)
        .chain((0..clipped).rev())
        .find(|c| !header_columns.contains(c))
        .unwrap_or(clipped)
}

/// 寸法表記の多いテキスト列
fn size_source_column(grid: &impl Grid, rows: &[usize], exclude: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for col in (0..grid.width()).filter(|c| !exclude.contains(c)) {
        let hits = rows
            .iter()
            .filter(|&&row| has_size_pattern(grid.cell(row, col)))
            .count();
        if hits > 0 && best.is_none_or(|(_, best_hits)| hits > best_hits) {
            best = Some((col, hits));
        }
    }

    best.map(|(col, _)| col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(rows: Vec<Vec<String>>) -> SheetInput {
        SheetInput::from_strings(rows, Vec::new())
    }

    fn body_rows(count: usize) -> Vec<Vec<String>> {
        (0..count)
            .map(|i| {
                vec![
                    format!("品目{i}"),
                    format!("仕様書に基づく施工 {i} 番 詳細は別紙参照のこと"),
                    format!("{}", i % 50 + 1),
                    if i % 2 == 0 { "㎡" } else { "m" }.to_string(),
                    format!("{}", (i + 1) * 1500),
                ]
            })
            .collect()
    }

    #[test]
    fn empty_table_gets_smallest_defaults() {
        let detection = detect_sheet(SheetInput::default(), &Thresholds::default());
        assert_eq!(
            detection.columns,
            DetectedColumnSet {
                item: 1,
                desc: 1,
                qty: 1,
                unit: 1,
                amount: None,
                size: 1,
                header_row_index: None,
            }
        );
    }

    #[test]
    fn narrow_table_clips_defaults() {
        let rows = vec![vec!["a".to_string(), "b".to_string()]; 3];
        let detection = detect_sheet(sheet(rows), &Thresholds::default());
        assert_eq!(detection.columns.qty, 2);
        assert_eq!(detection.columns.unit, 2);
        assert!(detection.trace.fallbacks.contains(&Role::Quantity));
    }

    #[test]
    fn fallback_skips_header_columns() {
        let mut rows = vec![
            vec!["摘要", "数量", "単位", "x"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>(),
        ];
        rows.extend((0..3).map(|i| {
            vec![
                "シリコン系".to_string(),
                format!("{}", i + 1),
                "㎡".to_string(),
                format!("外壁{i}"),
            ]
        }));

        let detection = detect_sheet(sheet(rows), &Thresholds::default());
        let c = detection.columns;
        assert_eq!((c.desc, c.qty, c.unit), (1, 2, 3));
        assert_eq!(c.item, 4);
        assert!(detection.trace.fallbacks.contains(&Role::Item));
    }

    #[test]
    fn positional_default_shifts_off_header_columns() {
        assert_eq!(positional_default(0, 4, &[0, 1, 2]), 3);
        assert_eq!(positional_default(3, 4, &[3]), 2);
        assert_eq!(positional_default(2, 3, &[0, 1, 2]), 2);
        assert_eq!(positional_default(5, 0, &[]), 0);
    }

    #[test]
    fn heuristics_find_roles_without_header() {
        let detection = detect_sheet(sheet(body_rows(30)), &Thresholds::default());
        let c = detection.columns;
        assert_eq!(c.header_row_index, None);
        assert_eq!((c.item, c.desc, c.qty, c.unit), (1, 2, 3, 4));
        assert_eq!(c.amount, Some(5));
        assert_eq!(detection.trace.amount_step, Some(AmountStep::NumericHeuristic));
        assert_eq!(detection.trace.sample_size, 30);
    }

    #[test]
    fn header_mapping_overrides_heuristics() {
        // 見出しの並びを統計上の役割と逆にしても見出しが優先される
        let mut rows = vec![
            vec!["数量", "単位", "品名", "摘要", "金額"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>(),
        ];
        rows.extend(body_rows(20));
        let detection = detect_sheet(sheet(rows), &Thresholds::default());
        let c = detection.columns;
        assert_eq!(c.header_row_index, Some(0));
        assert_eq!((c.item, c.desc, c.qty, c.unit), (3, 4, 1, 2));
        assert_eq!(detection.trace.header_roles.len(), 4);
    }

    #[test]
    fn size_column_prefers_dimension_text() {
        let rows: Vec<Vec<String>> = (0..12)
            .map(|i| {
                vec![
                    format!("側溝{i}"),
                    "コンクリート製品 据付".to_string(),
                    format!("W-{}", 300 + i * 10),
                    "10".to_string(),
                    "m".to_string(),
                ]
            })
            .collect();
        let detection = detect_sheet(sheet(rows), &Thresholds::default());
        assert_eq!(detection.columns.size, 3);
    }

    #[test]
    fn size_falls_back_to_description() {
        let detection = detect_sheet(sheet(body_rows(12)), &Thresholds::default());
        assert_eq!(detection.columns.size, detection.columns.desc);
    }
}
