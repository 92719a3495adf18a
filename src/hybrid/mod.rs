//! ルール優先・推論サービス補完の統合
//!
//! ルールで決まった値は推論サービスの結果で上書きしない。サービスは1リクエストにつき
//! 1回だけまとめて呼び、失敗・タイムアウト・不正な応答はすべて「寄与なし」として扱う。

mod columns;
mod sizes;

pub use columns::{ColumnResolution, resolve_columns};
pub use sizes::{SizeResolution, resolve_sizes};

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::error::InferenceError;

/// 推論サービスの関与
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AiStatus {
    /// ルールだけで決まった
    NotNeeded,
    /// サービスが渡されていない
    Disabled,
    /// 呼び出して検証済みの値を反映した (`contributed` は埋めた件数)
    Applied { contributed: usize, dropped: usize },
    /// 呼び出しに失敗した (結果はルールのみ)
    Failed { reason: String },
}

impl AiStatus {
    /// 1件以上の値を埋めたか
    pub fn contributed(&self) -> bool {
        matches!(self, AiStatus::Applied { contributed, .. } if *contributed > 0)
    }
}

/// タイムアウト付きで呼び出す
async fn call_with_timeout<F>(call: F, limit: Duration) -> Result<Value, InferenceError>
where
    F: Future<Output = Result<Value, InferenceError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(InferenceError::Timeout))
}
