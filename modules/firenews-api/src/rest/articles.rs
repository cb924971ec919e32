use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::info;

use firenews_common::{ArticleView, CreateArticleRequest, FireError};

use super::{error_response, LimitQuery};
use crate::AppState;

pub async fn api_submit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            return error_response(
                FireError::Validation(format!("Invalid request body: {}", e.body_text())),
                "Rejected submission",
            )
        }
    };

    match state.deps.submissions.submit(request).await {
        Ok(receipt) => {
            info!(article_id = %receipt.article_id, "Partner submission accepted");
            (StatusCode::CREATED, Json(receipt)).into_response()
        }
        Err(e) => error_response(e, "Failed to submit article"),
    }
}

pub async fn api_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> impl IntoResponse {
    match state.deps.list_articles(params.clamped()).await {
        Ok(articles) => {
            let views: Vec<ArticleView> = articles.iter().map(ArticleView::from).collect();
            Json(views).into_response()
        }
        Err(e) => error_response(e, "Failed to list articles"),
    }
}

pub async fn api_article_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.deps.get_article(&id).await {
        Ok(article) => Json(ArticleView::from(&article)).into_response(),
        Err(e) => error_response(e, "Failed to load article"),
    }
}
