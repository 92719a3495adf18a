//! エラー定義

use thiserror::Error;

/// 推論サービス境界のエラー
///
/// ルールベースの処理はエラーを返さない。このエラーはハイブリッド統合の段階で
/// 「AI寄与なし」に格下げされ、呼び出し元へは伝播しない。
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("APIキーが設定されていません")]
    MissingApiKey,

    #[error("推論サービスへのリクエストに失敗: {0}")]
    Http(#[from] reqwest::Error),

    #[error("推論サービスがエラーを返しました ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("推論サービスのレスポンスが不正: {0}")]
    MalformedBody(String),

    #[error("推論サービスがタイムアウトしました")]
    Timeout,
}

impl From<serde_json::Error> for InferenceError {
    fn from(err: serde_json::Error) -> Self {
        InferenceError::MalformedBody(err.to_string())
    }
}
