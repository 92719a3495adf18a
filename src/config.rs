//! 設定モジュール - 経験的に調整された閾値と推論サービス設定

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// 推定に使う閾値一式
///
/// いずれも実データで調整された値。既定値が現行の挙動になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
    /// ヘッダー行を探す先頭行数
    pub header_scan_rows: usize,
    /// ヘッダー候補に必要な非空セル数
    pub header_min_cells: usize,
    /// ヘッダーとして採用する最低スコア
    pub header_min_score: i32,
    /// 数字ペナルティが掛かる数字文字数
    pub header_digit_limit: usize,
    /// 数字ペナルティ
    pub header_digit_penalty: i32,
    /// 列統計のサンプル行数上限
    pub sample_limit: usize,
    /// 役割スコアの対象となる非空セル数の下限
    pub min_non_empty: usize,
    /// 数値列とみなす数値比率の下限
    pub numeric_ratio_floor: f64,
    /// テキスト列とみなすテキスト比率の下限
    pub text_ratio_floor: f64,
    /// 品名/摘要を分ける平均文字数
    pub text_length_pivot: f64,
    /// 品名列に期待するユニーク値数
    pub item_unique_floor: usize,
    /// 右側ボーナスを与える位置 (0..1)
    pub right_half_position: f64,
    /// 寸法の上限 (mm, これ以上は誤読とみなす)
    pub max_size_mm: u32,
    /// 単位なし小数をメートルとみなす上限
    pub meters_literal_max: f64,
    /// 高さの既定値を与えるカテゴリ (キーワード, 高さmm)
    pub category_heights: Vec<CategoryHeight>,
    /// 推論サービス呼び出しのタイムアウト秒
    pub ai_timeout_secs: u64,
    /// 列推論に送るサンプル行数
    pub ai_sample_rows: usize,
}

/// カテゴリ別の標準高さ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryHeight {
    pub keyword: String,
    pub height_mm: u32,
}

impl CategoryHeight {
    pub fn new(keyword: &str, height_mm: u32) -> Self {
        Self {
            keyword: keyword.to_string(),
            height_mm,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            header_scan_rows: 40,
            header_min_cells: 3,
            header_min_score: 2,
            header_digit_limit: 6,
            header_digit_penalty: 2,
            sample_limit: 300,
            min_non_empty: 10,
            numeric_ratio_floor: 0.6,
            text_ratio_floor: 0.5,
            text_length_pivot: 18.0,
            item_unique_floor: 10,
            right_half_position: 0.6,
            max_size_mm: 20_000,
            meters_literal_max: 20.0,
            category_heights: vec![
                // 側溝・U字溝などの溝
                CategoryHeight::new("溝", 300),
                // 巾木 (幅木)
                CategoryHeight::new("巾木", 100),
                CategoryHeight::new("幅木", 100),
                // 笠木
                CategoryHeight::new("笠木", 150),
            ],
            ai_timeout_secs: DEFAULT_TIMEOUT_SECS,
            ai_sample_rows: 20,
        }
    }
}

impl Thresholds {
    /// JSONから読み込む (未指定の項目は既定値)
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("閾値設定のパースに失敗")
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

/// 推論サービスの接続設定
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl InferenceConfig {
    /// 環境変数から読み込む
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ESTIMATE_AI_API_KEY")
            .context("ESTIMATE_AI_API_KEY が設定されていません")?;

        let base_url = std::env::var("ESTIMATE_AI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ESTIMATE_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = match std::env::var("ESTIMATE_AI_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("ESTIMATE_AI_TIMEOUT_SECS が不正: {v}"))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
