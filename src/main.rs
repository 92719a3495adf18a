//! 見積書シート推定 - コマンドライン

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use estimate_sheet_inference::{
    HttpInferenceClient, InferenceService, SheetInput, TextCell, Thresholds, resolve_columns,
    resolve_sizes,
};

#[derive(Parser)]
#[command(name = "estimate-infer")]
#[command(about = "見積書シートの列の役割と寸法を推定する")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// シートJSONから列の役割を推定
    Columns {
        /// シートJSON (rows, merges, columnCount)
        input: PathBuf,

        /// 推論サービスで補完する
        #[arg(long)]
        ai: bool,

        /// 閾値の上書きJSON
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },
    /// 行テキストJSON ([{index, text}]) から寸法を抽出
    Sizes {
        input: PathBuf,

        #[arg(long)]
        ai: bool,

        #[arg(long)]
        thresholds: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 環境変数の読み込み
    dotenvy::dotenv().ok();

    // ロギング初期化 (標準出力はJSON結果用)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Command::Columns {
            input,
            ai,
            thresholds,
        } => {
            let thresholds = load_thresholds(thresholds.as_deref())?;
            let sheet: SheetInput = read_json(&input).await?;
            let (raw, filled) = sheet.into_tables();
            let client = build_client(ai);
            let service = client.as_ref().map(|c| c as &dyn InferenceService);
            let resolution = resolve_columns(&raw, &filled, service, &thresholds).await;
            serde_json::to_string_pretty(&resolution)?
        }
        Command::Sizes {
            input,
            ai,
            thresholds,
        } => {
            let thresholds = load_thresholds(thresholds.as_deref())?;
            let cells: Vec<TextCell> = read_json(&input).await?;
            let client = build_client(ai);
            let service = client.as_ref().map(|c| c as &dyn InferenceService);
            let resolution = resolve_sizes(&cells, service, &thresholds).await;
            serde_json::to_string_pretty(&resolution)?
        }
    };

    println!("{output}");
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("入力ファイルの読み込みに失敗: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("入力JSONのパースに失敗: {:?}", path))
}

fn load_thresholds(path: Option<&Path>) -> Result<Thresholds> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("閾値ファイルの読み込みに失敗: {:?}", path))?;
            Thresholds::from_json(&content)
        }
        None => Ok(Thresholds::default()),
    }
}

/// 推論サービスのクライアント (設定がなければルールのみで続行)
fn build_client(enabled: bool) -> Option<HttpInferenceClient> {
    if !enabled {
        return None;
    }
    match HttpInferenceClient::from_env() {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("推論サービスを使わずに続行: {e:#}");
            None
        }
    }
}
