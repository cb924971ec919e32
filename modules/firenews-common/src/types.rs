use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::score::{derive_category, derive_confidence, derive_label, Label, RiskCategory};

// --- Article record ---

/// Canonical in-memory article. Independent of how any store encodes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Assigned by storage on creation.
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub source: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Assigned when the article is persisted.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Tag of the predictor that produced the score.
    pub model_version: String,
    pub fire_score: Option<FireScore>,
    pub needs_moderation: bool,
}

impl Article {
    /// Score used for queue ordering. Unscored records sort first.
    pub fn score_or_zero(&self) -> i64 {
        self.fire_score.as_ref().map(|s| s.overall_score).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireScore {
    /// 0 (most unreliable) ..= 100 (most reliable).
    pub overall_score: i64,
    pub confidence: f64,
    /// When the score was produced or last overridden.
    pub timestamp: DateTime<Utc>,
}

impl FireScore {
    /// Rebuild a score read back from storage, where only the integer survives.
    pub fn from_stored(overall_score: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            overall_score,
            confidence: derive_confidence(overall_score),
            timestamp,
        }
    }

    pub fn view(&self) -> FireScoreView {
        FireScoreView::from_score(self.overall_score)
    }
}

/// Moderator rationale attached to an article. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeratorNote {
    /// Storage-assigned identity.
    pub id: String,
    pub article_id: String,
    pub note: String,
    pub new_label: Option<Label>,
    pub created_at: DateTime<Utc>,
    /// 1-based position in creation order.
    pub sequence: usize,
}

impl ModeratorNote {
    /// Human-readable label, e.g. `note_3`.
    pub fn display_label(&self) -> String {
        format!("note_{}", self.sequence)
    }
}

/// Moderation lifecycle derived from the flag. An article under review is
/// still `Reported`: listing the queue writes nothing, so the two cannot be
/// told apart in storage. Override returns it to `Clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Clean,
    Reported,
}

impl ModerationState {
    pub fn of(article: &Article) -> Self {
        if article.needs_moderation {
            ModerationState::Reported
        } else {
            ModerationState::Clean
        }
    }
}

// --- Requests ---

/// Raw submission as received from a partner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateArticleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "publishedAt", alias = "published_at")]
    pub published_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRequest {
    pub article_id: String,
    pub new_label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

// --- Views ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireScoreView {
    pub score: i64,
    pub confidence: f64,
    pub label: Label,
    pub category: RiskCategory,
}

impl FireScoreView {
    /// All three derived views computed from the score.
    pub fn from_score(score: i64) -> Self {
        Self {
            score,
            confidence: derive_confidence(score),
            label: derive_label(score),
            category: derive_category(score),
        }
    }

    /// Same as [`from_score`](Self::from_score) but keeps a confidence that is
    /// known first-hand (the predictor's own output at submission time).
    pub fn with_confidence(score: i64, confidence: f64) -> Self {
        Self {
            confidence,
            ..Self::from_score(score)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub source: String,
    pub author: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "submittedAt")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(rename = "modelVersion")]
    pub model_version: String,
    #[serde(rename = "needsModeration")]
    pub needs_moderation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_score: Option<FireScoreView>,
}

impl From<&Article> for ArticleView {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone().unwrap_or_default(),
            title: article.title.clone(),
            content: article.content.clone(),
            url: article.url.clone(),
            source: article.source.clone(),
            author: article.author.clone(),
            published_at: article.published_at,
            submitted_at: article.submitted_at,
            model_version: article.model_version.clone(),
            needs_moderation: article.needs_moderation,
            fire_score: article.fire_score.as_ref().map(FireScore::view),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeratorNoteView {
    pub id: String,
    pub label: String,
    pub note: String,
    pub new_label: Option<Label>,
    pub created_at: DateTime<Utc>,
}

impl From<&ModeratorNote> for ModeratorNoteView {
    fn from(note: &ModeratorNote) -> Self {
        Self {
            id: note.id.clone(),
            label: note.display_label(),
            note: note.note.clone(),
            new_label: note.new_label,
            created_at: note.created_at,
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub article_id: String,
    pub fire_score: FireScoreView,
}

/// Result of a successful moderator override.
#[derive(Debug, Clone, Serialize)]
pub struct OverrideOutcome {
    pub article_id: String,
    pub new_score: i64,
    pub label: Label,
    pub category: RiskCategory,
}
