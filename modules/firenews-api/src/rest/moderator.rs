use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use firenews_common::{ArticleView, FireError, ModeratorNoteView, OverrideRequest};
use firenews_core::ScoreOverride;

use super::{error_response, LimitQuery};
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportRequest {
    reason: Option<String>,
}

/// The body is optional; without one the report carries no reason.
pub async fn api_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ReportRequest>>,
) -> impl IntoResponse {
    let reason = body.and_then(|Json(body)| body.reason);
    match state.deps.moderation.report(&id, reason.as_deref()).await {
        Ok(_) => Json(serde_json::json!({ "status": "reported" })).into_response(),
        Err(e) => error_response(e, "Failed to report article"),
    }
}

pub async fn api_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.deps.moderation.notes(&id).await {
        Ok(notes) => {
            let views: Vec<ModeratorNoteView> = notes.iter().map(ModeratorNoteView::from).collect();
            Json(views).into_response()
        }
        Err(e) => error_response(e, "Failed to load moderator notes"),
    }
}

pub async fn api_queue(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> impl IntoResponse {
    match state.deps.moderation.list_queue(params.clamped()).await {
        Ok(articles) => {
            let views: Vec<ArticleView> = articles.iter().map(ArticleView::from).collect();
            Json(views).into_response()
        }
        Err(e) => error_response(e, "Failed to load moderation queue"),
    }
}

pub async fn api_override(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OverrideRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match body {
        Ok(Json(request)) => ScoreOverride::try_from(request),
        Err(e) => Err(FireError::Validation(format!(
            "Invalid request body: {}",
            e.body_text()
        ))),
    };

    let result = match request {
        Ok(request) => state.deps.moderation.override_score(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e, "Failed to override score"),
    }
}
