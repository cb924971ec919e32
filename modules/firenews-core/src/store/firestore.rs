//! Firestore REST backend (typed-envelope documents).

use async_trait::async_trait;
use firestore_client::{Direction, Document, FirestoreClient, FirestoreError, StructuredQuery};
use tracing::debug;

use firenews_common::{FireError, Result};

use super::{subcollection_path, DocumentStore, FieldMap, SortDirection, StoreQuery, StoredDocument};
use crate::mapper::{document_id, encode_scalar, FieldEncoding};

/// Page size when listing a note subcollection; every page is read.
const SUBCOLLECTION_PAGE_SIZE: usize = 300;

pub struct FirestoreStore {
    client: FirestoreClient,
    composite_index: bool,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self {
            client,
            composite_index: false,
        }
    }

    /// Declare that a composite index on (needs_moderation, fire_score)
    /// exists, so filtered + ordered queries can run server-side.
    pub fn with_composite_index(mut self, enabled: bool) -> Self {
        self.composite_index = enabled;
        self
    }

    fn structured_query(&self, collection: &str, query: &StoreQuery) -> StructuredQuery {
        let mut structured = StructuredQuery::collection(collection).limit(query.limit);
        if let Some(filter) = &query.filter {
            structured = structured.where_equal(
                filter.field.clone(),
                encode_scalar(FieldEncoding::TypedEnvelope, &filter.equals),
            );
        }
        if let Some(order) = &query.order_by {
            let direction = match order.direction {
                SortDirection::Ascending => Direction::Ascending,
                SortDirection::Descending => Direction::Descending,
            };
            structured = structured.order_by(order.field.clone(), direction);
        }
        structured
    }
}

fn storage_error(err: FirestoreError) -> FireError {
    let status = err.status();
    let body = match err {
        FirestoreError::Api { message, .. } => message,
        other => other.to_string(),
    };
    FireError::Storage { status, body }
}

fn into_stored(doc: Document) -> StoredDocument {
    StoredDocument {
        name: doc.name,
        fields: doc.fields,
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn encoding(&self) -> FieldEncoding {
        FieldEncoding::TypedEnvelope
    }

    fn supports_compound_query(&self) -> bool {
        self.composite_index
    }

    fn name(&self) -> &str {
        "firestore"
    }

    async fn create(&self, collection: &str, fields: FieldMap) -> Result<String> {
        let doc = self
            .client
            .create_document(collection, &fields)
            .await
            .map_err(storage_error)?;
        Ok(document_id(&doc.name).to_string())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let doc = self
            .client
            .get_document(&format!("{collection}/{id}"))
            .await
            .map_err(storage_error)?;
        Ok(doc.map(into_stored))
    }

    async fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<StoredDocument>> {
        let docs = if query.is_plain() {
            self.client
                .list_documents(collection, query.limit)
                .await
                .map_err(storage_error)?
        } else {
            let structured = self.structured_query(collection, query);
            debug!(collection, ?query, "Running Firestore structured query");
            self.client
                .run_query("", &structured)
                .await
                .map_err(storage_error)?
        };
        Ok(docs.into_iter().map(into_stored).collect())
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        self.client
            .patch_document(&format!("{collection}/{id}"), &fields)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn add_to_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
        fields: FieldMap,
    ) -> Result<String> {
        let path = subcollection_path(collection, parent_id, subcollection);
        let doc = self
            .client
            .create_document(&path, &fields)
            .await
            .map_err(storage_error)?;
        Ok(document_id(&doc.name).to_string())
    }

    async fn list_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
    ) -> Result<Vec<StoredDocument>> {
        let path = subcollection_path(collection, parent_id, subcollection);
        let docs = self
            .client
            .list_all_documents(&path, SUBCOLLECTION_PAGE_SIZE)
            .await
            .map_err(storage_error)?;
        Ok(docs.into_iter().map(into_stored).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Scalar;
    use serde_json::json;

    fn store() -> FirestoreStore {
        FirestoreStore::new(FirestoreClient::new(
            firestore_client::DEFAULT_BASE_URL,
            "demo",
            None,
        ))
    }

    #[test]
    fn queue_query_uses_typed_filter_value() {
        let query = StoreQuery::new(20)
            .filter_eq("needs_moderation", Scalar::Bool(true))
            .order_by("fire_score", SortDirection::Ascending);
        let structured = serde_json::to_value(store().structured_query("articles", &query)).unwrap();

        assert_eq!(
            structured["where"]["fieldFilter"]["value"],
            json!({"booleanValue": true})
        );
        assert_eq!(structured["orderBy"][0]["direction"], "ASCENDING");
        assert_eq!(structured["limit"], 20);
    }

    #[test]
    fn api_errors_keep_status_and_raw_body() {
        let err = storage_error(FirestoreError::Api {
            status: 403,
            message: "{\"error\":{\"status\":\"PERMISSION_DENIED\"}}".into(),
        });
        match err {
            FireError::Storage { status, body } => {
                assert_eq!(status, Some(403));
                assert!(body.contains("PERMISSION_DENIED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn composite_index_is_opt_in() {
        assert!(!store().supports_compound_query());
        assert!(store().with_composite_index(true).supports_compound_query());
    }
}
