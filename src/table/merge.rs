//! 結合セルの展開

use super::{FilledTable, Grid, MergeRange, RawTable};

/// 結合範囲の空セルを左上セルの値で埋めた表を作成
///
/// 既に値があるセルは上書きしない。左上が空の範囲は何もしない。
/// 元の `RawTable` はそのまま残る。
pub fn fill_merged_cells(raw: &RawTable, merges: &[MergeRange]) -> FilledTable {
    let mut rows: Vec<Vec<String>> = raw.rows().to_vec();
    let width = raw.width();

    for range in merges {
        let top = range.top.min(range.bottom);
        let bottom = range.top.max(range.bottom);
        let left = range.left.min(range.right);
        let right = range.left.max(range.right);

        let value = raw.cell(top, left);
        if value.is_empty() || top >= rows.len() || left >= width {
            continue;
        }
        let value = value.to_string();

        let last_row = bottom.min(rows.len() - 1);
        let last_col = right.min(width - 1);

        for row in rows.iter_mut().take(last_row + 1).skip(top) {
            if row.len() <= last_col {
                row.resize(last_col + 1, String::new());
            }
            for cell in row.iter_mut().take(last_col + 1).skip(left) {
                if cell.is_empty() {
                    cell.clone_from(&value);
                }
            }
        }
    }

    FilledTable { rows, width }
}
