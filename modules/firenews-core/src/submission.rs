use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use firenews_common::{
    Article, CreateArticleRequest, FireError, FireScore, FireScoreView, Result, SubmissionReceipt,
};

use crate::articles::ArticleRepository;
use crate::predictor::Predictor;

/// Accepts partner submissions: validate, score, persist.
pub struct SubmissionOrchestrator {
    predictor: Arc<dyn Predictor>,
    articles: Arc<ArticleRepository>,
    model_version: String,
}

impl SubmissionOrchestrator {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        articles: Arc<ArticleRepository>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            predictor,
            articles,
            model_version: model_version.into(),
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Validate, score and persist a submission. Nothing is scored or written
    /// when validation fails, and nothing is written when scoring fails.
    pub async fn submit(&self, request: CreateArticleRequest) -> Result<SubmissionReceipt> {
        let published_at = validate(&request)?;

        let prediction = self.predictor.predict(&request.content).await.inspect_err(|e| {
            warn!(source = %request.source, error = %e, "Predictor failed; submission not saved")
        })?;

        let article = Article {
            id: None,
            title: request.title,
            content: request.content,
            url: request.url.filter(|u| !u.trim().is_empty()),
            source: request.source,
            author: request.author.filter(|a| !a.trim().is_empty()),
            published_at,
            submitted_at: None,
            model_version: self.model_version.clone(),
            fire_score: Some(FireScore {
                overall_score: prediction.overall_score,
                confidence: prediction.confidence,
                timestamp: Utc::now(),
            }),
            needs_moderation: false,
        };

        let article_id = self.articles.create(&article).await?;
        info!(
            article_id = %article_id,
            score = prediction.overall_score,
            confidence = prediction.confidence,
            model_version = %self.model_version,
            "Article submitted"
        );

        Ok(SubmissionReceipt {
            article_id,
            fire_score: FireScoreView::with_confidence(
                prediction.overall_score,
                prediction.confidence,
            ),
        })
    }
}

/// Check required fields and parse the publication date. Every missing field
/// is named in one error.
fn validate(request: &CreateArticleRequest) -> Result<DateTime<Utc>> {
    let missing: Vec<&str> = [
        ("title", &request.title),
        ("content", &request.content),
        ("source", &request.source),
        ("publishedAt", &request.published_at),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if !missing.is_empty() {
        return Err(FireError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    parse_published_at(&request.published_at)
}

/// RFC3339 with offset, or a bare `YYYY-MM-DD` read as midnight UTC.
pub fn parse_published_at(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            FireError::Validation(format!(
                "invalid publishedAt {raw:?}: expected RFC3339 or YYYY-MM-DD"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> CreateArticleRequest {
        CreateArticleRequest {
            title: "Dam opens".into(),
            content: "The dam opened on schedule.".into(),
            url: None,
            source: "Wire".into(),
            author: None,
            published_at: "2024-01-15".into(),
        }
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        assert_eq!(
            parse_published_at("2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rfc3339_is_exact() {
        assert_eq!(
            parse_published_at("2024-01-15T10:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_published_at("2024-01-15T12:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn other_formats_are_rejected() {
        for raw in ["15/01/2024", "2024-01-15 10:00:00", "yesterday", "2024-13-01"] {
            assert!(
                matches!(parse_published_at(raw), Err(FireError::Validation(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn validation_lists_every_missing_field() {
        let req = CreateArticleRequest {
            title: "  ".into(),
            source: String::new(),
            ..request()
        };
        let Err(FireError::Validation(msg)) = validate(&req) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("title"));
        assert!(msg.contains("source"));
        assert!(!msg.contains("content"));
    }

    #[test]
    fn missing_published_at_is_validation_error() {
        let req = CreateArticleRequest {
            published_at: String::new(),
            ..request()
        };
        assert!(matches!(validate(&req), Err(FireError::Validation(m)) if m.contains("publishedAt")));
    }
}
