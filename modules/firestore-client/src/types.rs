use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Firestore document as returned by the REST API. `fields` stays in the
/// typed-value envelope encoding (`{"stringValue": ...}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Fully qualified resource name,
    /// `projects/{p}/databases/(default)/documents/{collection}/{id}`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// Request body for create and patch.
#[derive(Debug, Serialize)]
pub(crate) struct DocumentBody<'a> {
    pub fields: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One element of a `runQuery` response stream. Elements without a document
/// carry only progress metadata (`readTime`, `skippedResults`).
#[derive(Debug, Deserialize)]
pub(crate) struct RunQueryItem {
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunQueryRequest<'a> {
    #[serde(rename = "structuredQuery")]
    pub structured_query: &'a StructuredQuery,
}

// --- Structured query ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<QueryOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl StructuredQuery {
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.into(),
            }],
            filter: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Equality filter. `value` must already be in the typed envelope.
    pub fn where_equal(mut self, field_path: impl Into<String>, value: Value) -> Self {
        self.filter = Some(QueryFilter {
            field_filter: FieldFilter {
                field: FieldReference {
                    field_path: field_path.into(),
                },
                op: "EQUAL".to_string(),
                value,
            },
        });
        self
    }

    pub fn order_by(mut self, field_path: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(QueryOrder {
            field: FieldReference {
                field_path: field_path.into(),
            },
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.min(i32::MAX as usize) as i32);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub field_filter: FieldFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOrder {
    pub field: FieldReference,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Ascending,
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_query_serializes_in_rest_shape() {
        let query = StructuredQuery::collection("articles")
            .where_equal("needs_moderation", json!({"booleanValue": true}))
            .order_by("fire_score", Direction::Ascending)
            .limit(10);

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "from": [{"collectionId": "articles"}],
                "where": {"fieldFilter": {
                    "field": {"fieldPath": "needs_moderation"},
                    "op": "EQUAL",
                    "value": {"booleanValue": true}
                }},
                "orderBy": [{"field": {"fieldPath": "fire_score"}, "direction": "ASCENDING"}],
                "limit": 10
            })
        );
    }

    #[test]
    fn bare_query_omits_optional_parts() {
        let value = serde_json::to_value(StructuredQuery::collection("articles")).unwrap();
        assert_eq!(value, json!({"from": [{"collectionId": "articles"}]}));
    }

    #[test]
    fn run_query_items_without_document_are_tolerated() {
        let items: Vec<RunQueryItem> = serde_json::from_value(json!([
            {"readTime": "2024-01-15T10:00:00Z"},
            {"document": {"name": "projects/p/databases/(default)/documents/articles/abc",
                          "fields": {"title": {"stringValue": "t"}}}}
        ]))
        .unwrap();
        let docs: Vec<_> = items.into_iter().filter_map(|i| i.document).collect();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].name.ends_with("/abc"));
    }

    #[test]
    fn empty_list_response_has_no_documents() {
        let resp: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.documents.is_empty());
    }
}
