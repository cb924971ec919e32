// Document store capability set.
//
// Two backends implement the same trait and are picked at startup:
// - FirestoreStore: Firestore REST, typed-envelope fields
// - PostgresStore: JSONB rows, native-value fields
//
// The mapper writes in whichever encoding the store advertises and reads
// either, so callers never branch on the backend.

pub mod firestore;
pub mod postgres;

pub use firestore::FirestoreStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use firenews_common::Result;

use crate::mapper::FieldEncoding;

pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// A document as handed back by a store. `name` may be a bare id or a fully
/// qualified resource path; the mapper only looks at the final segment.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub name: String,
    pub fields: FieldMap,
}

/// Scalar operand for equality filters, encoded per backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Scalar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub filter: Option<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: usize,
}

impl StoreQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            filter: None,
            order_by: None,
            limit,
        }
    }

    pub fn filter_eq(mut self, field: impl Into<String>, equals: Scalar) -> Self {
        self.filter = Some(FieldFilter {
            field: field.into(),
            equals,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn is_plain(&self) -> bool {
        self.filter.is_none() && self.order_by.is_none()
    }
}

/// Remote document store. All operations fail with `FireError::Storage` on
/// any transport-level problem.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Field encoding this store reads and writes.
    fn encoding(&self) -> FieldEncoding;

    /// Whether an equality filter plus an order-by on a different field can
    /// be pushed down in one query.
    fn supports_compound_query(&self) -> bool {
        false
    }

    /// Backend name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }

    /// Create a document with a storage-assigned id. Returns the id.
    async fn create(&self, collection: &str, fields: FieldMap) -> Result<String>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>>;

    async fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<StoredDocument>>;

    /// Overwrite only the given fields of an existing document.
    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()>;

    /// Create a document under `{collection}/{parent_id}/{subcollection}`.
    async fn add_to_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
        fields: FieldMap,
    ) -> Result<String>;

    async fn list_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
    ) -> Result<Vec<StoredDocument>>;
}

/// `{collection}/{parent_id}/{subcollection}`
pub fn subcollection_path(collection: &str, parent_id: &str, subcollection: &str) -> String {
    format!("{collection}/{parent_id}/{subcollection}")
}
