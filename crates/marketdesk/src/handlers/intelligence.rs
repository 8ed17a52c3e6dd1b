use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{extract_cron_secret, require_role, verify_cron_secret};
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::*;

const DEFAULT_REPORT_LIMIT: i64 = 20;
const MAX_REPORT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub force: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CronQuery {
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub limit: Option<i64>,
}

/// `1` and `true` (any case) force a refresh; everything else does not.
pub fn parse_force(raw: Option<&str>) -> bool {
    raw.map(str::trim)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn summary_response(report: &IntelligenceReport, cached: bool) -> SummaryResponse {
    SummaryResponse {
        cached,
        summary: report.summary.clone(),
        generated_at: report.created_at.clone(),
        report: report.meta(),
        insights: report.insights_json.clone(),
    }
}

/// Serves the latest report, or generates a manual one when forced. A cache
/// miss without `force` is a 404, never a generation.
pub async fn get_summary(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, DeskError> {
    let profile = require_role(state.storage.as_ref(), &identity, Role::Cmo)?;

    if !parse_force(query.force.as_deref()) {
        return match state.desk.cached_report()? {
            Some(report) => Ok(Json(summary_response(&report, true))),
            None => Err(DeskError::NotFound("No cached summary yet".into())),
        };
    }

    tracing::info!(user_id = %profile.id, "forced intelligence summary refresh");
    let report = state
        .desk
        .generate_report(ReportType::Manual, Utc::now().date_naive())
        .await?;
    Ok(Json(summary_response(&report, false)))
}

/// Scheduled generation. The shared secret is checked before anything else
/// is touched.
pub async fn run_cron(
    State(state): State<AppState>,
    Query(query): Query<CronQuery>,
    headers: HeaderMap,
) -> Result<Json<CronResponse>, DeskError> {
    let provided = extract_cron_secret(query.secret.as_deref(), &headers);
    if !verify_cron_secret(state.config.cron_secret.as_deref(), provided.as_deref()) {
        tracing::warn!(secret_present = provided.is_some(), "cron call rejected");
        return Err(DeskError::Unauthorized);
    }

    let report = state
        .desk
        .generate_report(ReportType::Scheduled, Utc::now().date_naive())
        .await?;

    if let Err(e) = state.storage.mark_synced(&report.created_at) {
        tracing::warn!(error = %e, "failed to record last sync time");
    }

    Ok(Json(CronResponse {
        ok: true,
        generated_at: report.created_at,
    }))
}

pub async fn list_reports(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<Vec<ReportMeta>>, DeskError> {
    require_role(state.storage.as_ref(), &identity, Role::Cmo)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_REPORT_LIMIT)
        .clamp(1, MAX_REPORT_LIMIT);
    let reports = state.storage.list_reports(limit)?;
    Ok(Json(reports.iter().map(IntelligenceReport::meta).collect()))
}

pub async fn get_report(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<IntelligenceReport>, DeskError> {
    require_role(state.storage.as_ref(), &identity, Role::Cmo)?;
    state
        .storage
        .get_report(&id)?
        .map(Json)
        .ok_or_else(|| DeskError::NotFound("Report not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_accepts_one_and_true_only() {
        for raw in ["1", "true", "TRUE", "True", " true "] {
            assert!(parse_force(Some(raw)), "{raw:?} should force");
        }
        for raw in ["0", "false", "", "yes", "2", "on"] {
            assert!(!parse_force(Some(raw)), "{raw:?} should not force");
        }
        assert!(!parse_force(None));
    }
}
