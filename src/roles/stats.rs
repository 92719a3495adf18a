//! 列統計

use serde::Serialize;
use std::collections::HashSet;

use crate::table::Grid;
use crate::text::{is_likely_body_row, is_unit_token, parse_number};

/// 1列分の統計
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStatistics {
    /// 列番号 (0 始まり)
    pub column: usize,
    pub non_empty: usize,
    pub numeric_count: usize,
    pub text_count: usize,
    pub unit_like_count: usize,
    pub avg_text_len: f64,
    pub unique_text_count: usize,
    pub median_numeric: Option<f64>,
    /// 0 = 最左、1 = 最右
    pub right_bias: f64,
}

impl ColumnStatistics {
    pub fn numeric_ratio(&self) -> f64 {
        ratio(self.numeric_count, self.non_empty)
    }

    pub fn text_ratio(&self) -> f64 {
        ratio(self.text_count, self.non_empty)
    }

    pub fn unit_like_ratio(&self) -> f64 {
        ratio(self.unit_like_count, self.non_empty)
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// 統計に使う行を選ぶ
///
/// ヘッダー行があればその次の行から、明細行らしい行を上限まで集める。
/// 明細行らしい行が1つもなければ空でない行で代用する。
pub fn sample_rows(grid: &impl Grid, header_index: Option<usize>, limit: usize) -> Vec<usize> {
    let start = header_index.map_or(0, |i| i + 1);
    let candidates = || {
        grid.rows()
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, row)| row.iter().any(|c| !c.is_empty()))
    };

    let body: Vec<usize> = candidates()
        .filter(|(_, row)| is_likely_body_row(row.as_slice()))
        .map(|(i, _)| i)
        .take(limit)
        .collect();

    if !body.is_empty() {
        return body;
    }

    candidates().map(|(i, _)| i).take(limit).collect()
}

/// 指定行について各列の統計を計算
pub fn build_column_statistics(grid: &impl Grid, rows: &[usize]) -> Vec<ColumnStatistics> {
    let width = grid.width();
    (0..width)
        .map(|col| column_statistics(grid, rows, col, width))
        .collect()
}

fn column_statistics(
    grid: &impl Grid,
    rows: &[usize],
    col: usize,
    width: usize,
) -> ColumnStatistics {
    let mut non_empty = 0;
    let mut unit_like_count = 0;
    let mut numbers = Vec::new();
    let mut text_len_total = 0;
    let mut texts: Vec<&str> = Vec::new();

    for &row in rows {
        let cell = grid.cell(row, col);
        if cell.is_empty() {
            continue;
        }
        non_empty += 1;

        if is_unit_token(cell) {
            unit_like_count += 1;
        }

        match parse_number(cell) {
            Some(value) => numbers.push(value),
            None => {
                text_len_total += cell.chars().count();
                texts.push(cell);
            }
        }
    }

    let text_count = texts.len();
    let unique_text_count = texts.iter().collect::<HashSet<_>>().len();
    let avg_text_len = if text_count == 0 {
        0.0
    } else {
        text_len_total as f64 / text_count as f64
    };

    let right_bias = if width > 1 {
        col as f64 / (width - 1) as f64
    } else {
        0.0
    };

    ColumnStatistics {
        column: col,
        non_empty,
        numeric_count: numbers.len(),
        text_count,
        unit_like_count,
        avg_text_len,
        unique_text_count,
        median_numeric: median(&mut numbers),
        right_bias,
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
