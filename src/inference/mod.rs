//! 外部推論サービスとの境界
//!
//! サービスは「テキストの束 → JSON」の関数として扱う。返ってきた JSON は信用せず、
//! `validate` で項目ごとに型と範囲を確認してから内部の型に変換する。

mod client;
mod validate;

pub use client::HttpInferenceClient;
pub use validate::{
    ColumnHints, InferredSize, SizeValidation, validate_column_response, validate_size_response,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// 寸法推論に渡す1セル分のテキスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCell {
    /// 行番号
    pub index: usize,
    pub text: String,
}

impl TextCell {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// 列推論に渡すシートの抜粋
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnQuery {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub column_count: usize,
}

/// 外部推論サービス
///
/// どちらのメソッドも1リクエストにつき1回だけ、まとめて呼ばれる。
/// 戻り値は未検証の JSON。
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// 各行の寸法を推定する
    async fn infer_sizes(&self, cells: &[TextCell]) -> Result<serde_json::Value, InferenceError>;

    /// 各役割の列番号 (1 始まり) を推定する
    async fn infer_columns(&self, query: &ColumnQuery)
    -> Result<serde_json::Value, InferenceError>;
}
