//! Crash-dump scan endpoint

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crashdesk_analyzer::{Classifier, DumpFile, FileScanner, Verdict};
use crashdesk_core::{ApiResponse, DeskError};

use crate::error::ApiResult;
use crate::store::DumpAnalysis;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scan", post(scan))
        .route("/analyses", get(list_analyses))
}

#[derive(Deserialize)]
pub struct ScanInput {
    pub user_id: u64,
}

#[derive(Serialize)]
pub struct ScanOutcome {
    pub scanned: usize,
    pub new_analyses: usize,
    pub analyses: Vec<DumpAnalysis>,
}

/// Scan the configured dump locations and classify every new dump for
/// this user. A textual triage report next to the dump takes precedence
/// over signature matching; files already analyzed keep their stored
/// verdict.
pub async fn scan(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ScanInput>,
) -> ApiResult<Json<ApiResponse<ScanOutcome>>> {
    state.store.user(input.user_id)?;

    // Disk walking and header reads are blocking, keep them off the runtime.
    let worker = state.clone();
    let classified: Vec<(DumpFile, Verdict)> = tokio::task::spawn_blocking(move || {
        let scanner = FileScanner::new(worker.scan.clone());
        let dumps = scanner.scan()?;
        let mut out = Vec::with_capacity(dumps.len());
        for dump in dumps {
            let verdict = match crashdesk_analyzer::report::sibling_report(&dump.path) {
                Ok(Some(v)) => v,
                Ok(None) => match worker.classifier.classify(&dump) {
                    Ok(v) => v,
                    Err(err) => {
                        tracing::warn!(path = %dump.path.display(), %err, "classification failed");
                        Verdict::Unknown
                    }
                },
                Err(err) => {
                    tracing::warn!(path = %dump.path.display(), %err, "triage report unreadable");
                    worker.classifier.classify(&dump).unwrap_or(Verdict::Unknown)
                }
            };
            out.push((dump, verdict));
        }
        Ok::<_, crashdesk_analyzer::AnalyzerError>(out)
    })
    .await
    .map_err(|err| DeskError::Remote {
        url: "internal:scan".to_string(),
        reason: err.to_string(),
    })??;

    let now = Utc::now();
    let scanned = classified.len();
    let mut analyses = Vec::with_capacity(scanned);
    let mut new_analyses = 0;
    for (dump, verdict) in classified {
        let (analysis, fresh) = state.store.record_analysis(input.user_id, &dump, verdict, now);
        if fresh {
            new_analyses += 1;
        }
        analyses.push(analysis);
    }
    tracing::info!(user_id = input.user_id, scanned, new_analyses, "dump scan finished");

    Ok(Json(ApiResponse::success(ScanOutcome { scanned, new_analyses, analyses })))
}

#[derive(Deserialize)]
pub struct AnalysesParams {
    pub user_id: u64,
}

pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(params): axum::extract::Query<AnalysesParams>,
) -> ApiResult<Json<ApiResponse<Vec<DumpAnalysis>>>> {
    state.store.user(params.user_id)?;
    Ok(Json(ApiResponse::success(state.store.analyses_for_user(params.user_id))))
}
