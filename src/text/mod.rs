//! テキスト処理モジュール - 正規化・数値解析・行分類

mod line;
mod normalize;
mod number;

pub use line::{has_size_pattern, is_detail_row, is_likely_body_row, is_unit_token};
pub use normalize::normalize_text;
pub use number::{integer_digits, parse_number};
