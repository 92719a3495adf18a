//! 寸法のハイブリッド抽出

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use super::{AiStatus, call_with_timeout};
use crate::config::Thresholds;
use crate::dimensions::{SizeResult, extract_sizes};
use crate::inference::{InferenceService, TextCell, validate_size_response};

/// 寸法の抽出結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeResolution {
    /// 行番号 → 寸法
    pub sizes: BTreeMap<usize, SizeResult>,
    /// 推論サービスで1項目以上埋まった行
    pub ai_rows: Vec<usize>,
    pub ai: AiStatus,
}

/// ルールで抽出し、何も取れなかった行だけを推論サービスで補う
///
/// 空白だけの行は問い合わせない。サービスの値はルールが空けた項目にのみ入る。
pub async fn resolve_sizes(
    cells: &[TextCell],
    service: Option<&dyn InferenceService>,
    thresholds: &Thresholds,
) -> SizeResolution {
    let mut sizes = extract_sizes(cells.iter().map(|c| (c.index, c.text.as_str())), thresholds);

    let unresolved: Vec<TextCell> = cells
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .filter(|c| sizes.get(&c.index).is_none_or(SizeResult::is_empty))
        .cloned()
        .collect();

    let mut resolution = SizeResolution {
        sizes: BTreeMap::new(),
        ai_rows: Vec::new(),
        ai: AiStatus::NotNeeded,
    };

    if unresolved.is_empty() {
        resolution.sizes = sizes;
        return resolution;
    }

    let Some(service) = service else {
        resolution.sizes = sizes;
        resolution.ai = AiStatus::Disabled;
        return resolution;
    };

    info!(rows = unresolved.len(), "ルールで寸法が取れない行を推論サービスへ送信");
    let requested: BTreeSet<usize> = unresolved.iter().map(|c| c.index).collect();

    let validation = match call_with_timeout(service.infer_sizes(&unresolved), thresholds.ai_timeout())
        .await
        .and_then(|value| validate_size_response(&value, &requested, thresholds))
    {
        Ok(validation) => validation,
        Err(e) => {
            warn!(error = %e, "推論サービスの寸法結果を使わずに続行");
            resolution.sizes = sizes;
            resolution.ai = AiStatus::Failed {
                reason: e.to_string(),
            };
            return resolution;
        }
    };

    for (index, inferred) in &validation.accepted {
        if let Some(size) = sizes.get_mut(index)
            && size.fill_missing_from(&inferred.size) > 0
        {
            resolution.ai_rows.push(*index);
        }
    }

    info!(
        contributed = resolution.ai_rows.len(),
        dropped = validation.dropped,
        "推論サービスの寸法結果を反映"
    );
    resolution.ai = AiStatus::Applied {
        contributed: resolution.ai_rows.len(),
        dropped: validation.dropped,
    };
    resolution.sizes = sizes;
    resolution
}
