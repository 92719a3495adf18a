//! ヘッダー行の探索と見出し語の対応付け

use crate::config::Thresholds;
use crate::table::Grid;

/// 見出しとして扱うセルの最大文字数 (長文セル中の偶然一致を除外)
const MAX_LABEL_CHARS: usize = 12;

/// 見出し語の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLabel {
    Item,
    Description,
    Quantity,
    Unit,
    UnitPrice,
    Amount,
    Size,
}

/// 判定順。先に一致したものを採用する
/// (「単価」を金額より先に、「品名・規格」を摘要より先に判定するため)。
const LABEL_VOCABULARY: &[(HeaderLabel, &[&str])] = &[
    (HeaderLabel::UnitPrice, &["単価", "unitprice", "単価(円)"]),
    (
        HeaderLabel::Amount,
        &["金額", "見積金額", "見積額", "合計", "価格", "計", "amount", "total", "price"],
    ),
    (HeaderLabel::Quantity, &["数量", "員数", "数", "qty", "quantity"]),
    (HeaderLabel::Unit, &["単位", "unit"]),
    (
        HeaderLabel::Item,
        &["品名", "名称", "品目", "項目", "工種", "工事名", "内訳", "種別", "item", "name"],
    ),
    (HeaderLabel::Size, &["寸法", "サイズ", "size"]),
    (
        HeaderLabel::Description,
        &["摘要", "仕様", "規格", "内容", "備考", "説明", "型番", "description", "spec", "remarks"],
    ),
];

/// 見つかったヘッダー行
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRow {
    /// 行番号 (0 始まり)
    pub index: usize,
    pub cells: Vec<String>,
    pub score: i32,
}

/// ヘッダー行から読み取った各役割の列 (0 始まり)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRoles {
    pub item: Option<usize>,
    pub description: Option<usize>,
    pub quantity: Option<usize>,
    pub unit: Option<usize>,
    pub unit_price: Option<usize>,
    pub amount: Option<usize>,
    pub size: Option<usize>,
}

impl HeaderRoles {
    /// 見出しで割り当て済みの列
    pub fn assigned_columns(&self) -> Vec<usize> {
        [
            self.item,
            self.description,
            self.quantity,
            self.unit,
            self.unit_price,
            self.amount,
            self.size,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// セルが表す見出し語を判定
pub fn label_of(cell: &str) -> Option<HeaderLabel> {
    let compact: String = cell
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    if compact.is_empty() || compact.chars().count() > MAX_LABEL_CHARS {
        return None;
    }

    for (label, keywords) in LABEL_VOCABULARY {
        for keyword in *keywords {
            let hit = if keyword.chars().count() == 1 {
                compact == *keyword
            } else {
                compact.contains(keyword)
            };
            if hit {
                return Some(*label);
            }
        }
    }

    None
}

/// 先頭行からヘッダー行を探す
///
/// スコア = 見出し語に一致したセル数 − (数字が多ければペナルティ)。
/// 最大スコアの最初の行を、スコアが閾値以上なら採用する。
pub fn locate_header_row(grid: &impl Grid, thresholds: &Thresholds) -> Option<HeaderRow> {
    let mut best: Option<(usize, i32)> = None;

    for (index, row) in grid.rows().iter().take(thresholds.header_scan_rows).enumerate() {
        let non_empty = row.iter().filter(|c| !c.is_empty()).count();
        if non_empty < thresholds.header_min_cells {
            continue;
        }

        let score = header_score(row, thresholds);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    let (index, score) = best?;
    if score < thresholds.header_min_score {
        return None;
    }

    Some(HeaderRow {
        index,
        cells: grid.rows()[index].clone(),
        score,
    })
}

fn header_score(row: &[String], thresholds: &Thresholds) -> i32 {
    let matched = row.iter().filter(|c| label_of(c).is_some()).count() as i32;
    let digits = row
        .iter()
        .flat_map(|c| c.chars())
        .filter(char::is_ascii_digit)
        .count();

    let penalty = if digits >= thresholds.header_digit_limit {
        thresholds.header_digit_penalty
    } else {
        0
    };

    matched - penalty
}

/// ヘッダー行の各セルを役割に割り当てる (同じ役割は最左の列を採用)
pub fn map_header_roles(cells: &[String]) -> HeaderRoles {
    let mut roles = HeaderRoles::default();

    for (col, cell) in cells.iter().enumerate() {
        let Some(label) = label_of(cell) else {
            continue;
        };
        let slot = match label {
            HeaderLabel::Item => &mut roles.item,
            HeaderLabel::Description => &mut roles.description,
            HeaderLabel::Quantity => &mut roles.quantity,
            HeaderLabel::Unit => &mut roles.unit,
            HeaderLabel::UnitPrice => &mut roles.unit_price,
            HeaderLabel::Amount => &mut roles.amount,
            HeaderLabel::Size => &mut roles.size,
        };
        slot.get_or_insert(col);
    }

    roles
}
