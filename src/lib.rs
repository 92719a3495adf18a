//! 見積書シート推定 - 建設見積書の表から列の役割と寸法を推定するライブラリ
//!
//! # 機能
//! - ヘッダー行の検出と見出し語による列の割り当て
//! - 列統計のスコアによる品名・摘要・数量・単位列の推定
//! - 結合セルの影響を受けない金額列の判定
//! - 摘要テキストからの寸法 (高さ/幅/長さ/重ね) 抽出
//! - ルールで決まらない部分だけを外部推論サービスで補完

pub mod config;
pub mod dimensions;
pub mod error;
pub mod hybrid;
pub mod inference;
pub mod roles;
pub mod table;
pub mod text;

pub use config::{InferenceConfig, Thresholds};
pub use dimensions::{SizeResult, extract_size, extract_sizes};
pub use error::InferenceError;
pub use hybrid::{AiStatus, ColumnResolution, SizeResolution, resolve_columns, resolve_sizes};
pub use inference::{HttpInferenceClient, InferenceService, TextCell};
pub use roles::{ColumnDetection, DetectedColumnSet, DetectionTrace, detect_columns, detect_sheet};
pub use table::{FilledTable, Grid, MergeRange, RawTable, SheetInput};
