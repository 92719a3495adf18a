//! 表データモジュール
//!
//! 読み込んだシートは `RawTable` (結合セル未展開) と `FilledTable` (結合セル展開済み) の
//! 2種類で扱う。金額列の検証は `RawTable` だけを受け取るので、取り違えはコンパイル時に弾かれる。

mod merge;

pub use merge::fill_merged_cells;

use serde::{Deserialize, Serialize};

use crate::text::normalize_text;

/// 結合範囲 (0 始まり、両端を含む)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl MergeRange {
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }
}

/// JSON上のセル値
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl CellValue {
    fn into_text(self) -> String {
        match self {
            CellValue::Text(s) => s,
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => if b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

/// シート読み込み側から受け取る入力
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInput {
    #[serde(default)]
    pub rows: Vec<Vec<Option<CellValue>>>,
    #[serde(default)]
    pub merges: Vec<MergeRange>,
    /// サンプル範囲外も含めたシート全体の列数
    #[serde(default)]
    pub column_count: usize,
}

impl SheetInput {
    /// 文字列セルから作成
    pub fn from_strings<R, S>(rows: R, merges: Vec<MergeRange>) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| Some(CellValue::Text(cell.into())))
                    .collect()
            })
            .collect();

        Self {
            rows,
            merges,
            column_count: 0,
        }
    }

    /// 結合未展開の表と展開済みの表を作成
    pub fn into_tables(self) -> (RawTable, FilledTable) {
        let merges = self.merges;
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map(CellValue::into_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        let raw = RawTable::new(rows, self.column_count);
        let filled = fill_merged_cells(&raw, &merges);
        (raw, filled)
    }
}

/// 行列形式の読み取り専用ビュー
pub trait Grid {
    fn rows(&self) -> &[Vec<String>];

    /// 列数 (最長行とシート列数の大きい方)
    fn width(&self) -> usize;

    /// セル値 (範囲外は空文字)
    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows()
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn row_count(&self) -> usize {
        self.rows().len()
    }
}

/// 結合セル未展開の表 (数値検証の正)
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl RawTable {
    /// 各セルを正規化して作成
    pub fn new(rows: Vec<Vec<String>>, column_count: usize) -> Self {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.iter().map(|cell| normalize_text(cell)).collect())
            .collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(column_count);
        Self { rows, width }
    }
}

impl Grid for RawTable {
    fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn width(&self) -> usize {
        self.width
    }
}

/// 結合セル展開済みの表 (統計・表示・AIサンプル用)
#[derive(Debug, Clone, PartialEq)]
pub struct FilledTable {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl Grid for FilledTable {
    fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn width(&self) -> usize {
        self.width
    }
}
