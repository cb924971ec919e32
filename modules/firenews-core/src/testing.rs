// Test doubles for the two trait boundaries:
// - MemoryStore (DocumentStore): in-memory collections, write log, injectable failures
// - MockPredictor (Predictor): fixed outcome, records every call
//
// Plus `article()` for building fixtures.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use firenews_common::{Article, FireError, FireScore, Result};

use crate::articles::ARTICLES;
use crate::mapper::{self, fields, FieldEncoding, FieldReader};
use crate::predictor::{Prediction, Predictor};
use crate::store::{
    subcollection_path, DocumentStore, FieldMap, SortDirection, StoreQuery, StoredDocument,
};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A recorded store mutation. Seeding through [`MemoryStore::insert_article`]
/// is not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Create { collection: String, id: String },
    Update { collection: String, id: String, fields: FieldMap },
    AddToSubcollection { path: String, id: String },
}

#[derive(Default)]
struct MemoryInner {
    /// Collection path → documents in insertion order.
    collections: HashMap<String, Vec<(String, FieldMap)>>,
    writes: Vec<StoreWrite>,
    next_id: u64,
    fail_subcollection_writes: bool,
    fail_updates: bool,
    fail_creates: bool,
}

impl MemoryInner {
    fn insert(&mut self, collection: &str, fields: FieldMap) -> String {
        self.next_id += 1;
        let id = format!("doc{:04}", self.next_id);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), fields));
        id
    }
}

/// Stateful in-memory [`DocumentStore`].
///
/// Typed-envelope stores hand back fully qualified Firestore resource names;
/// native stores hand back bare ids. Equality filters compare encoded values
/// exactly, and ordered queries skip documents missing the order field, as
/// Firestore does.
pub struct MemoryStore {
    encoding: FieldEncoding,
    compound_query: bool,
    inner: Mutex<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Native encoding, no compound queries.
    pub fn new() -> Self {
        Self {
            encoding: FieldEncoding::Native,
            compound_query: false,
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    pub fn with_encoding(mut self, encoding: FieldEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_compound_query(mut self, enabled: bool) -> Self {
        self.compound_query = enabled;
        self
    }

    /// Every later `add_to_subcollection` fails with a storage error.
    pub fn fail_subcollection_writes(&self) {
        self.inner.lock().unwrap().fail_subcollection_writes = true;
    }

    /// Every later `update` fails with a storage error.
    pub fn fail_updates(&self) {
        self.inner.lock().unwrap().fail_updates = true;
    }

    /// Every later `create` fails with a storage error. Seeding is unaffected.
    pub fn fail_creates(&self) {
        self.inner.lock().unwrap().fail_creates = true;
    }

    /// Seed an article, keeping its score and moderation flag. Returns its id.
    pub fn insert_article(&self, article: &Article) -> String {
        let mut doc = mapper::to_storage_fields(article, self.encoding, Utc::now());
        doc.extend(mapper::moderation_flag_fields(
            self.encoding,
            article.needs_moderation,
        ));
        if article.fire_score.is_none() {
            doc.remove(fields::FIRE_SCORE);
        }
        self.inner.lock().unwrap().insert(ARTICLES, doc)
    }

    /// Seed raw fields, e.g. legacy or malformed records.
    pub fn insert_raw(&self, collection: &str, fields: FieldMap) -> String {
        self.inner.lock().unwrap().insert(collection, fields)
    }

    /// Raw fields of a stored document.
    pub fn document(&self, collection: &str, id: &str) -> Option<FieldMap> {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .get(collection)?
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, fields)| fields.clone())
    }

    /// Number of documents in a collection path.
    pub fn count(&self, collection: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.collections.get(collection).map_or(0, Vec::len)
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.inner.lock().unwrap().writes.clone()
    }

    fn stored(&self, collection: &str, id: &str, fields: &FieldMap) -> StoredDocument {
        let name = match self.encoding {
            FieldEncoding::TypedEnvelope => format!(
                "projects/test/databases/(default)/documents/{collection}/{id}"
            ),
            FieldEncoding::Native => id.to_string(),
        };
        StoredDocument {
            name,
            fields: fields.clone(),
        }
    }
}

/// Sort key read through the mapper so both encodings order the same way.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

fn sort_key(fields: &FieldMap, field: &str) -> Option<SortKey> {
    fields.get(field)?;
    let r = FieldReader::new(fields);
    if let Some(ts) = r.opt_timestamp(field) {
        return Some(SortKey::Timestamp(ts));
    }
    if let Some(text) = r.opt_string(field) {
        return Some(SortKey::Text(text));
    }
    r.opt_integer(field).map(SortKey::Integer)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn encoding(&self) -> FieldEncoding {
        self.encoding
    }

    fn supports_compound_query(&self) -> bool {
        self.compound_query
    }

    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, collection: &str, fields: FieldMap) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_creates {
            return Err(FireError::Storage {
                status: Some(503),
                body: "injected create failure".into(),
            });
        }
        let id = inner.insert(collection, fields);
        inner.writes.push(StoreWrite::Create {
            collection: collection.to_string(),
            id: id.clone(),
        });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        Ok(self
            .document(collection, id)
            .map(|fields| self.stored(collection, id, &fields)))
    }

    async fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<StoredDocument>> {
        let docs: Vec<(String, FieldMap)> = {
            let inner = self.inner.lock().unwrap();
            inner.collections.get(collection).cloned().unwrap_or_default()
        };

        let mut matched: Vec<(String, FieldMap)> = match &query.filter {
            Some(filter) => {
                let expected = mapper::encode_scalar(self.encoding, &filter.equals);
                docs.into_iter()
                    .filter(|(_, f)| f.get(&filter.field) == Some(&expected))
                    .collect()
            }
            None => docs,
        };

        if let Some(order) = &query.order_by {
            let mut keyed: Vec<(SortKey, (String, FieldMap))> = matched
                .into_iter()
                .filter_map(|doc| sort_key(&doc.1, &order.field).map(|k| (k, doc)))
                .collect();
            keyed.sort_by(|a, b| {
                let ord: Ordering = a.0.cmp(&b.0);
                match order.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
            matched = keyed.into_iter().map(|(_, doc)| doc).collect();
        }

        Ok(matched
            .into_iter()
            .take(query.limit)
            .map(|(id, fields)| self.stored(collection, &id, &fields))
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_updates {
            return Err(FireError::Storage {
                status: Some(503),
                body: "injected update failure".into(),
            });
        }
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| doc_id == id))
            .ok_or_else(|| FireError::Storage {
                status: Some(404),
                body: format!("no document {collection}/{id}"),
            })?;
        doc.1.extend(fields.clone());
        inner.writes.push(StoreWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        Ok(())
    }

    async fn add_to_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
        fields: FieldMap,
    ) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_subcollection_writes {
            return Err(FireError::Storage {
                status: Some(503),
                body: "injected subcollection failure".into(),
            });
        }
        let path = subcollection_path(collection, parent_id, subcollection);
        let id = inner.insert(&path, fields);
        inner.writes.push(StoreWrite::AddToSubcollection {
            path,
            id: id.clone(),
        });
        Ok(id)
    }

    async fn list_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
    ) -> Result<Vec<StoredDocument>> {
        let path = subcollection_path(collection, parent_id, subcollection);
        let docs: Vec<(String, FieldMap)> = {
            let inner = self.inner.lock().unwrap();
            inner.collections.get(&path).cloned().unwrap_or_default()
        };
        Ok(docs
            .iter()
            .map(|(id, fields)| self.stored(&path, id, fields))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockPredictor
// ---------------------------------------------------------------------------

enum Outcome {
    Score(Prediction),
    Fail(String),
}

/// Predictor with a fixed outcome. Every call's text is recorded.
pub struct MockPredictor {
    outcome: Outcome,
    calls: Mutex<Vec<String>>,
}

impl MockPredictor {
    pub fn returning(overall_score: i64, confidence: f64) -> Self {
        Self {
            outcome: Outcome::Score(Prediction {
                overall_score,
                confidence,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Outcome::Fail(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, text: &str) -> Result<Prediction> {
        self.calls.lock().unwrap().push(text.to_string());
        match &self.outcome {
            Outcome::Score(prediction) => Ok(*prediction),
            Outcome::Fail(message) => Err(FireError::Prediction(message.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An article with a score (or none) and a moderation flag.
pub fn article(title: &str, score: Option<i64>, needs_moderation: bool) -> Article {
    let published_at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
    Article {
        id: None,
        title: title.to_string(),
        content: format!("{title} body"),
        url: Some(format!("https://news.example/{}", title.to_lowercase())),
        source: "Example Wire".to_string(),
        author: None,
        published_at,
        submitted_at: None,
        model_version: "v1.0.0".to_string(),
        fire_score: score.map(|s| FireScore::from_stored(s, published_at)),
        needs_moderation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Scalar;

    #[tokio::test]
    async fn ordered_query_skips_documents_without_the_field() {
        let store = MemoryStore::new().with_encoding(FieldEncoding::TypedEnvelope);
        store.insert_article(&article("scored", Some(40), true));
        store.insert_article(&article("unscored", None, true));

        let query = StoreQuery::new(10)
            .filter_eq(fields::NEEDS_MODERATION, Scalar::Bool(true))
            .order_by(fields::FIRE_SCORE, SortDirection::Ascending);
        let docs = store.query(ARTICLES, &query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].name.starts_with("projects/test/"));
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(ARTICLES, "nope", FieldMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FireError::Storage { status: Some(404), .. }));
        assert!(store.writes().is_empty());
    }
}
