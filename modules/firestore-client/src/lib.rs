pub mod error;
pub mod types;

pub use error::{FirestoreError, Result};
pub use types::{Direction, Document, StructuredQuery};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use types::{DocumentBody, ListDocumentsResponse, RunQueryItem, RunQueryRequest};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firestore REST client. Documents travel in the typed-value envelope;
/// this client never interprets field contents.
pub struct FirestoreClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
}

impl FirestoreClient {
    pub fn new(base_url: &str, project_id: &str, api_key: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            api_key: api_key.map(String::from),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// `{base}/projects/{project}/databases/(default)/documents`
    pub fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn key_param(&self) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|key| ("key", key.clone()))
            .collect()
    }

    /// Create a document with a server-assigned id under `collection_path`
    /// (e.g. `articles` or `articles/{id}/mod_notes`).
    pub async fn create_document(
        &self,
        collection_path: &str,
        fields: &Map<String, Value>,
    ) -> Result<Document> {
        let url = format!("{}/{}", self.documents_root(), collection_path);
        let resp = self
            .client
            .post(&url)
            .query(&self.key_param())
            .json(&DocumentBody { fields })
            .send()
            .await?;

        let doc: Document = read_json(resp).await?;
        tracing::debug!(name = %doc.name, "Created Firestore document");
        Ok(doc)
    }

    /// Fetch one document. A 404 is `Ok(None)`.
    pub async fn get_document(&self, document_path: &str) -> Result<Option<Document>> {
        let url = format!("{}/{}", self.documents_root(), document_path);
        let resp = self
            .client
            .get(&url)
            .query(&self.key_param())
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(read_json(resp).await?))
    }

    /// List up to `page_size` documents in a collection, storage order.
    pub async fn list_documents(
        &self,
        collection_path: &str,
        page_size: usize,
    ) -> Result<Vec<Document>> {
        let url = format!("{}/{}", self.documents_root(), collection_path);
        let mut params = self.key_param();
        params.push(("pageSize", page_size.to_string()));

        let resp = self.client.get(&url).query(&params).send().await?;
        let list: ListDocumentsResponse = read_json(resp).await?;
        Ok(list.documents)
    }

    /// List every document in a collection, following `nextPageToken`
    /// until the last page.
    pub async fn list_all_documents(
        &self,
        collection_path: &str,
        page_size: usize,
    ) -> Result<Vec<Document>> {
        let url = format!("{}/{}", self.documents_root(), collection_path);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = self.key_param();
            params.push(("pageSize", page_size.to_string()));
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let resp = self.client.get(&url).query(&params).send().await?;
            let list: ListDocumentsResponse = read_json(resp).await?;
            documents.extend(list.documents);

            match list.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(collection_path, count = documents.len(), "Listed Firestore documents");
        Ok(documents)
    }

    /// Run a structured query against the collection named in `query.from`,
    /// under `parent_path` (empty for top-level collections).
    pub async fn run_query(
        &self,
        parent_path: &str,
        query: &StructuredQuery,
    ) -> Result<Vec<Document>> {
        let parent = if parent_path.is_empty() {
            self.documents_root()
        } else {
            format!("{}/{}", self.documents_root(), parent_path)
        };
        let url = format!("{parent}:runQuery");
        let resp = self
            .client
            .post(&url)
            .query(&self.key_param())
            .json(&RunQueryRequest {
                structured_query: query,
            })
            .send()
            .await?;

        let items: Vec<RunQueryItem> = read_json(resp).await?;
        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    /// Patch only the named fields of a document.
    ///
    /// Firestore creates the document if it does not exist; callers that care
    /// must check existence first.
    pub async fn patch_document(
        &self,
        document_path: &str,
        fields: &Map<String, Value>,
    ) -> Result<Document> {
        let url = format!("{}/{}", self.documents_root(), document_path);
        let mut params = self.key_param();
        params.extend(
            fields
                .keys()
                .map(|field| ("updateMask.fieldPaths", field.clone())),
        );

        let resp = self
            .client
            .patch(&url)
            .query(&params)
            .json(&DocumentBody { fields })
            .send()
            .await?;

        read_json(resp).await
    }
}

/// Fail with the raw body on non-success, otherwise decode JSON.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(FirestoreError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    serde_json::from_str(&body)
        .map_err(|e| FirestoreError::Parse(format!("{e}; body: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_root_trims_trailing_slash() {
        let client = FirestoreClient::new("https://firestore.googleapis.com/v1/", "demo", None);
        assert_eq!(
            client.documents_root(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents"
        );
    }

    #[test]
    fn key_param_only_when_configured() {
        let without = FirestoreClient::new(DEFAULT_BASE_URL, "demo", None);
        assert!(without.key_param().is_empty());

        let with = FirestoreClient::new(DEFAULT_BASE_URL, "demo", Some("secret"));
        assert_eq!(with.key_param(), vec![("key", "secret".to_string())]);
    }
}
