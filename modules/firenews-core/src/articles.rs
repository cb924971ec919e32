use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use firenews_common::{Article, FireError, Label, ModeratorNote, Result};

use crate::mapper::{self, fields};
use crate::store::{DocumentStore, SortDirection, StoreQuery};

pub const ARTICLES: &str = "articles";
pub const MOD_NOTES: &str = "mod_notes";

/// Article persistence through a [`DocumentStore`]. Every read and write goes
/// through the mapper in the store's own encoding.
#[derive(Clone)]
pub struct ArticleRepository {
    store: Arc<dyn DocumentStore>,
}

impl ArticleRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn supports_compound_query(&self) -> bool {
        self.store.supports_compound_query()
    }

    /// Persist a new article. Returns the storage-assigned id.
    pub async fn create(&self, article: &Article) -> Result<String> {
        let fields = mapper::to_storage_fields(article, self.store.encoding(), Utc::now());
        let id = self.store.create(ARTICLES, fields).await?;
        info!(article_id = %id, backend = self.store.name(), "Article saved");
        Ok(id)
    }

    pub async fn find(&self, id: &str) -> Result<Option<Article>> {
        let doc = self.store.get(ARTICLES, id).await?;
        Ok(doc.map(|d| mapper::from_storage_fields(id, &d.fields)))
    }

    pub async fn get(&self, id: &str) -> Result<Article> {
        self.find(id)
            .await?
            .ok_or_else(|| FireError::NotFound(id.to_string()))
    }

    pub async fn query(&self, query: &StoreQuery) -> Result<Vec<Article>> {
        let docs = self.store.query(ARTICLES, query).await?;
        Ok(docs.iter().map(mapper::article_from_document).collect())
    }

    /// Most recently submitted first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Article>> {
        let query = StoreQuery::new(limit).order_by(fields::SUBMITTED_AT, SortDirection::Descending);
        let articles = self.query(&query).await?;
        debug!(count = articles.len(), "Listed recent articles");
        Ok(articles)
    }

    pub async fn set_needs_moderation(&self, id: &str, needs_moderation: bool) -> Result<()> {
        let fields = mapper::moderation_flag_fields(self.store.encoding(), needs_moderation);
        self.store.update(ARTICLES, id, fields).await
    }

    /// Replace the score and clear the moderation flag in one write.
    pub async fn apply_override(&self, id: &str, score: i64) -> Result<()> {
        let fields = mapper::override_fields(self.store.encoding(), score, Utc::now());
        self.store.update(ARTICLES, id, fields).await
    }

    pub async fn add_note(&self, article_id: &str, note: &str, new_label: Label) -> Result<String> {
        let fields = mapper::note_fields(self.store.encoding(), note, new_label, Utc::now());
        self.store
            .add_to_subcollection(ARTICLES, article_id, MOD_NOTES, fields)
            .await
    }

    /// Notes in creation order, numbered from 1.
    pub async fn notes(&self, article_id: &str) -> Result<Vec<ModeratorNote>> {
        let docs = self
            .store
            .list_subcollection(ARTICLES, article_id, MOD_NOTES)
            .await?;

        let mut notes: Vec<ModeratorNote> = docs
            .iter()
            .map(|d| mapper::note_from_document(article_id, d, 0))
            .collect();
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for (i, note) in notes.iter_mut().enumerate() {
            note.sequence = i + 1;
        }
        Ok(notes)
    }
}
