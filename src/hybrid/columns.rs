//! 列の役割のハイブリッド推定

use serde::Serialize;
use tracing::{info, warn};

use super::{AiStatus, call_with_timeout};
use crate::config::Thresholds;
use crate::inference::{ColumnHints, ColumnQuery, InferenceService, validate_column_response};
use crate::roles::{
    AmountCandidate, AmountResolution, AmountStep, ColumnDetection, DetectedColumnSet, Role,
    accept_candidate, detect_columns, locate_header_row, map_header_roles, resolve_amount_column,
};
use crate::table::{FilledTable, Grid, RawTable};

/// 列推定の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnResolution {
    #[serde(flatten)]
    pub detection: ColumnDetection,
    pub ai: AiStatus,
}

/// ルールで推定し、既定位置に倒した役割と不明な金額列だけを推論サービスで補う
///
/// 推論サービスが示した金額列もルールの候補と同じく未展開の表で検証する。
pub async fn resolve_columns(
    raw: &RawTable,
    filled: &FilledTable,
    service: Option<&dyn InferenceService>,
    thresholds: &Thresholds,
) -> ColumnResolution {
    let mut detection = detect_columns(raw, filled, thresholds);

    if detection.columns.amount.is_some() && detection.trace.fallbacks.is_empty() {
        return ColumnResolution {
            detection,
            ai: AiStatus::NotNeeded,
        };
    }

    let Some(service) = service else {
        return ColumnResolution {
            detection,
            ai: AiStatus::Disabled,
        };
    };

    let query = column_query(filled, &detection, thresholds);
    info!(
        fallbacks = ?detection.trace.fallbacks,
        amount_missing = detection.columns.amount.is_none(),
        "推論サービスへ列の判定を依頼"
    );

    let hints = match call_with_timeout(service.infer_columns(&query), thresholds.ai_timeout())
        .await
        .and_then(|value| validate_column_response(&value, filled.width()))
    {
        Ok(hints) => hints,
        Err(e) => {
            warn!(error = %e, "推論サービスの列結果を使わずに続行");
            return ColumnResolution {
                detection,
                ai: AiStatus::Failed {
                    reason: e.to_string(),
                },
            };
        }
    };

    let contributed = apply_hints(raw, filled, &mut detection, hints, thresholds);
    info!(contributed, columns = ?detection.columns, "推論サービスの列結果を反映");

    ColumnResolution {
        detection,
        ai: AiStatus::Applied {
            contributed,
            dropped: 0,
        },
    }
}

/// ヘッダーと先頭の明細行 (結合展開済み)
fn column_query(filled: &FilledTable, detection: &ColumnDetection, thresholds: &Thresholds) -> ColumnQuery {
    let header_index = detection.columns.header_row_index;
    let start = header_index.map_or(0, |i| i + 1);

    let rows = filled.rows()[start.min(filled.row_count())..]
        .iter()
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .take(thresholds.ai_sample_rows)
        .cloned()
        .collect();

    ColumnQuery {
        header: header_index.and_then(|i| filled.rows().get(i).cloned()),
        rows,
        column_count: filled.width(),
    }
}

/// 既定位置に倒した役割をヒントで置き換え、金額列が不明なら再判定する
fn apply_hints(
    raw: &RawTable,
    filled: &FilledTable,
    detection: &mut ColumnDetection,
    hints: ColumnHints,
    thresholds: &Thresholds,
) -> usize {
    let columns = &mut detection.columns;
    let trace = &mut detection.trace;

    for role in trace.fallbacks.clone() {
        let (slot, hint) = match role {
            Role::Item => (&mut columns.item, hints.item),
            Role::Description => (&mut columns.desc, hints.desc),
            Role::Quantity => (&mut columns.qty, hints.qty),
            Role::Unit => (&mut columns.unit, hints.unit),
            _ => continue,
        };
        if let Some(col) = hint {
            *slot = col;
            trace.external_roles.push(role);
        }
    }
    trace.fallbacks.retain(|r| !trace.external_roles.contains(r));
    let mut contributed = trace.external_roles.len();

    if columns.amount.is_some() {
        return contributed;
    }

    let qty = DetectedColumnSet::index(columns.qty);
    let unit = DetectedColumnSet::index(columns.unit);

    // 数量・単位が変わった場合は明細行の判定も変わるのでルールから判定し直す
    let mut resolution = if trace
        .external_roles
        .iter()
        .any(|r| matches!(r, Role::Quantity | Role::Unit))
    {
        let header = locate_header_row(raw, thresholds).map(|h| map_header_roles(&h.cells));
        resolve_amount_column(raw, filled, header.as_ref(), qty, unit, thresholds)
    } else {
        AmountResolution::default()
    };

    if resolution.amount.is_none()
        && let Some(col) = hints.amount
    {
        let candidate = AmountCandidate {
            column: DetectedColumnSet::index(col),
            step: AmountStep::External,
        };
        if accept_candidate(raw, candidate, qty, unit, &mut resolution) {
            contributed += 1;
        }
    }

    if resolution.amount.is_some() {
        columns.amount = resolution.amount;
        trace.amount_step = resolution.step;
    }
    trace.rejected_amounts.extend(resolution.rejected);

    contributed
}
