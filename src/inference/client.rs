//! OpenAI 互換の chat completions API を使う推論クライアント

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ColumnQuery, InferenceService, TextCell};
use crate::config::InferenceConfig;
use crate::error::InferenceError;

const CHAT_PATH: &str = "/chat/completions";

const SIZE_INSTRUCTIONS: &str = "\
建設見積書の明細テキストから寸法を読み取ってください。
各行について heightMm, wideMm, lengthMm, overlapMm を mm 単位の数値で返します。
読み取れない項目は null にしてください。推測で値を作らないでください。
出力は JSON のみ: {\"results\": [{\"index\": 行番号, \"heightMm\": ..., \"wideMm\": ..., \"lengthMm\": ..., \"overlapMm\": ..., \"confidence\": 0..1, \"notes\": \"...\"}]}";

const COLUMN_INSTRUCTIONS: &str = "\
建設見積書の表の抜粋から、各役割の列番号 (1 始まり) を判定してください。
役割: item (品名), desc (摘要・仕様), qty (数量), unit (単位), amount (金額)。
判定できない役割は null にしてください。
出力は JSON のみ: {\"item\": n, \"desc\": n, \"qty\": n, \"unit\": n, \"amount\": n}";

/// 推論クライアント
pub struct HttpInferenceClient {
    config: InferenceConfig,
    http_client: reqwest::Client,
}

impl HttpInferenceClient {
    /// 新しいクライアントを作成
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("HTTPクライアントの作成に失敗")?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// 環境変数の設定で作成
    pub fn from_env() -> Result<Self> {
        Self::new(InferenceConfig::from_env()?)
    }

    async fn complete_json(&self, instructions: &str, payload: String) -> Result<Value, InferenceError> {
        if self.config.api_key.trim().is_empty() {
            return Err(InferenceError::MissingApiKey);
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: payload,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}{}", self.config.base_url, CHAT_PATH);
        debug!(%url, model = %self.config.model, "推論サービスへリクエスト");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await.map_err(map_transport_error)?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::MalformedBody("choices が空です".to_string()))?;

        parse_completion_content(&content)
    }
}

#[async_trait]
impl InferenceService for HttpInferenceClient {
    async fn infer_sizes(&self, cells: &[TextCell]) -> Result<Value, InferenceError> {
        self.complete_json(SIZE_INSTRUCTIONS, size_payload(cells)?).await
    }

    async fn infer_columns(&self, query: &ColumnQuery) -> Result<Value, InferenceError> {
        self.complete_json(COLUMN_INSTRUCTIONS, column_payload(query)?).await
    }
}

fn map_transport_error(err: reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Http(err)
    }
}

fn size_payload(cells: &[TextCell]) -> Result<String, InferenceError> {
    Ok(serde_json::to_string(&serde_json::json!({ "rows": cells }))?)
}

fn column_payload(query: &ColumnQuery) -> Result<String, InferenceError> {
    Ok(serde_json::to_string(query)?)
}

/// 応答本文を JSON として読む (```json フェンスは外す)
fn parse_completion_content(content: &str) -> Result<Value, InferenceError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(body.trim())?)
}

// chat completions リクエスト/レスポンス構造体

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn strips_code_fences() {
        let value = parse_completion_content("```json\n{\"item\": 1}\n```").unwrap();
        assert_eq!(value, json!({"item": 1}));
        assert_eq!(parse_completion_content(" [1, 2] ").unwrap(), json!([1, 2]));
    }

    #[test]
    fn non_json_content_is_malformed() {
        let err = parse_completion_content("申し訳ありません").unwrap_err();
        assert!(matches!(err, InferenceError::MalformedBody(_)));
    }

    #[test]
    fn size_payload_lists_rows() {
        let payload = size_payload(&[TextCell::new(4, "W=300")]).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value, json!({"rows": [{"index": 4, "text": "W=300"}]}));
    }

    #[test]
    fn request_uses_json_response_format() {
        let request = ChatRequest {
            model: "m",
            messages: Vec::new(),
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn empty_api_key_fails_before_request() {
        let client = HttpInferenceClient::new(InferenceConfig {
            api_key: String::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            model: "m".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client.infer_sizes(&[]).await.unwrap_err();
        assert!(matches!(err, InferenceError::MissingApiKey));
    }
}
