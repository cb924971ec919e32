//! Human moderation loop: report → queue → override.
//!
//! Override writes the note before the score. If the process dies between
//! the two writes the article stays flagged with an orphan note; re-running
//! the override is safe. The pair is at-least-once, not atomic.

use std::sync::Arc;

use tracing::{info, warn};

use firenews_common::{
    compose_score, derive_category, derive_label, Article, FireError, Label, ModerationState,
    ModeratorNote, OverrideOutcome, OverrideRequest, Result,
};

use crate::articles::ArticleRepository;
use crate::mapper::fields;
use crate::store::{Scalar, SortDirection, StoreQuery};

/// Confidence used when a moderator does not give one.
pub const DEFAULT_OVERRIDE_CONFIDENCE: f64 = 0.8;

/// A moderator's decision on one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOverride {
    pub article_id: String,
    pub new_label: Label,
    pub confidence: Option<f64>,
    pub notes: Option<String>,
}

impl TryFrom<OverrideRequest> for ScoreOverride {
    type Error = FireError;

    fn try_from(req: OverrideRequest) -> Result<Self> {
        if req.article_id.trim().is_empty() {
            return Err(FireError::Validation("article_id is required".into()));
        }
        Ok(Self {
            article_id: req.article_id,
            new_label: req.new_label.parse()?,
            confidence: req.confidence,
            notes: req.notes,
        })
    }
}

/// Range-check the moderator's confidence; absent or zero means the default.
pub fn resolve_confidence(confidence: Option<f64>) -> Result<f64> {
    match confidence {
        None => Ok(DEFAULT_OVERRIDE_CONFIDENCE),
        Some(c) if !(0.0..=1.0).contains(&c) => Err(FireError::Validation(format!(
            "confidence must be between 0 and 1, got {c}"
        ))),
        Some(c) if c == 0.0 => Ok(DEFAULT_OVERRIDE_CONFIDENCE),
        Some(c) => Ok(c),
    }
}

/// Flagged articles only, worst score first, at most `limit`. The sort is
/// stable so equal scores keep storage order.
pub fn order_queue(candidates: Vec<Article>, limit: usize) -> Vec<Article> {
    let mut queue: Vec<Article> = candidates
        .into_iter()
        .filter(|a| a.needs_moderation)
        .collect();
    queue.sort_by_key(Article::score_or_zero);
    queue.truncate(limit);
    queue
}

pub struct ModerationQueue {
    articles: Arc<ArticleRepository>,
    scan_limit: usize,
}

impl ModerationQueue {
    /// `scan_limit` bounds the candidate set read when the store cannot
    /// filter and order in one query.
    pub fn new(articles: Arc<ArticleRepository>, scan_limit: usize) -> Self {
        Self {
            articles,
            scan_limit,
        }
    }

    /// Flag an article for review. Reporting an already flagged article
    /// writes nothing.
    pub async fn report(&self, article_id: &str, reason: Option<&str>) -> Result<ModerationState> {
        let article = self.articles.get(article_id).await?;
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        if ModerationState::of(&article) == ModerationState::Reported {
            info!(article_id, reason, "Article already awaiting moderation");
            return Ok(ModerationState::Reported);
        }

        self.articles.set_needs_moderation(article_id, true).await?;
        info!(article_id, reason, "Article marked for moderation");
        Ok(ModerationState::Reported)
    }

    pub async fn list_queue(&self, limit: usize) -> Result<Vec<Article>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = if self.articles.supports_compound_query() {
            let query = StoreQuery::new(limit)
                .filter_eq(fields::NEEDS_MODERATION, Scalar::Bool(true))
                .order_by(fields::FIRE_SCORE, SortDirection::Ascending);
            self.articles.query(&query).await?
        } else {
            self.articles.query(&StoreQuery::new(self.scan_limit)).await?
        };

        let queue = order_queue(candidates, limit);
        info!(count = queue.len(), "Retrieved articles needing moderation");
        Ok(queue)
    }

    /// Replace an article's score with a moderator's label and confidence,
    /// record the rationale, and clear the flag.
    pub async fn override_score(&self, request: ScoreOverride) -> Result<OverrideOutcome> {
        let confidence = resolve_confidence(request.confidence)?;
        let new_score = compose_score(request.new_label, confidence)?;
        let article_id = request.article_id.as_str();

        let article = self.articles.get(article_id).await?;

        if let Some(note) = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let note_id = self
                .articles
                .add_note(article_id, note, request.new_label)
                .await
                .inspect_err(|e| {
                    warn!(article_id, error = %e, "Failed to save moderator note; score left unchanged")
                })?;
            info!(article_id, note_id = %note_id, "Saved moderator note");
        }

        self.articles.apply_override(article_id, new_score).await?;
        info!(
            article_id,
            previous_score = article.fire_score.as_ref().map(|s| s.overall_score),
            new_score,
            label = %request.new_label,
            confidence,
            "Applied moderator override"
        );

        Ok(OverrideOutcome {
            article_id: article_id.to_string(),
            new_score,
            label: derive_label(new_score),
            category: derive_category(new_score),
        })
    }

    pub async fn notes(&self, article_id: &str) -> Result<Vec<ModeratorNote>> {
        self.articles.get(article_id).await?;
        self.articles.notes(article_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use firenews_common::FireScore;

    fn article(id: &str, score: i64, flagged: bool) -> Article {
        Article {
            id: Some(id.into()),
            title: id.into(),
            content: "c".into(),
            url: None,
            source: "s".into(),
            author: None,
            published_at: Utc::now(),
            submitted_at: None,
            model_version: "v1.0.0".into(),
            fire_score: Some(FireScore::from_stored(score, Utc::now())),
            needs_moderation: flagged,
        }
    }

    #[test]
    fn queue_keeps_flagged_worst_first() {
        let queue = order_queue(
            vec![article("a", 80, false), article("b", 20, true), article("c", 40, true)],
            10,
        );
        let scores: Vec<i64> = queue.iter().map(Article::score_or_zero).collect();
        assert_eq!(scores, vec![20, 40]);
    }

    #[test]
    fn queue_ties_keep_input_order_and_truncate() {
        let queue = order_queue(
            vec![article("x", 30, true), article("y", 30, true), article("z", 10, true)],
            2,
        );
        let ids: Vec<_> = queue.iter().map(|a| a.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["z", "x"]);
    }

    #[test]
    fn confidence_defaults_and_bounds() {
        assert_eq!(resolve_confidence(None).unwrap(), 0.8);
        assert_eq!(resolve_confidence(Some(0.0)).unwrap(), 0.8);
        assert_eq!(resolve_confidence(Some(0.5)).unwrap(), 0.5);
        assert_eq!(resolve_confidence(Some(1.0)).unwrap(), 1.0);
        assert!(matches!(resolve_confidence(Some(1.2)), Err(FireError::Validation(_))));
        assert!(matches!(resolve_confidence(Some(-0.2)), Err(FireError::Validation(_))));
        assert!(matches!(resolve_confidence(Some(f64::NAN)), Err(FireError::Validation(_))));
    }

    #[test]
    fn override_request_requires_known_label() {
        let req = OverrideRequest {
            article_id: "A1".into(),
            new_label: "unsure".into(),
            confidence: None,
            notes: None,
        };
        assert!(matches!(ScoreOverride::try_from(req), Err(FireError::Validation(_))));
    }
}
