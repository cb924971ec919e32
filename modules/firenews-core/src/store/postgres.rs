//! Postgres backend: one JSONB row per document, native-value fields.
//!
//! Subcollections live in the same table under the composite collection
//! path `{collection}/{parent_id}/{subcollection}`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use firenews_common::{FireError, Result};

use super::{subcollection_path, DocumentStore, FieldMap, SortDirection, StoreQuery, StoredDocument};
use crate::mapper::{encode_scalar, FieldEncoding};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_error(err: sqlx::Error) -> FireError {
    FireError::storage(err.to_string())
}

fn into_stored((id, fields): (String, serde_json::Value)) -> Result<StoredDocument> {
    match fields {
        serde_json::Value::Object(fields) => Ok(StoredDocument { name: id, fields }),
        other => Err(FireError::storage(format!(
            "document {id} has non-object fields: {other}"
        ))),
    }
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, fields: FieldMap) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(serde_json::Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(id)
    }
}

/// SQL for a store query. Parameters: `$1` collection, then filter field and
/// value when filtering, then order field when ordering, then limit.
fn query_sql(query: &StoreQuery) -> String {
    let mut sql = String::from("SELECT id, fields FROM documents WHERE collection = $1");
    let mut param = 1;

    if query.filter.is_some() {
        sql.push_str(&format!(
            " AND fields -> ${} = ${}",
            param + 1,
            param + 2
        ));
        param += 2;
    }

    sql.push_str(" ORDER BY ");
    if let Some(order) = &query.order_by {
        param += 1;
        let direction = match order.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        sql.push_str(&format!("fields -> ${param} {direction}, "));
    }
    sql.push_str("created_at ASC, id ASC");

    sql.push_str(&format!(" LIMIT ${}", param + 1));
    sql
}

#[async_trait]
impl DocumentStore for PostgresStore {
    fn encoding(&self) -> FieldEncoding {
        FieldEncoding::Native
    }

    fn supports_compound_query(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "postgres"
    }

    async fn create(&self, collection: &str, fields: FieldMap) -> Result<String> {
        self.insert(collection, fields).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let row = sqlx::query_as::<_, (String, serde_json::Value)>(
            r#"
            SELECT id, fields
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(into_stored).transpose()
    }

    async fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<StoredDocument>> {
        let sql = query_sql(query);
        let mut q = sqlx::query_as::<_, (String, serde_json::Value)>(&sql).bind(collection);
        if let Some(filter) = &query.filter {
            q = q
                .bind(filter.field.clone())
                .bind(encode_scalar(FieldEncoding::Native, &filter.equals));
        }
        if let Some(order) = &query.order_by {
            q = q.bind(order.field.clone());
        }
        let rows = q
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(into_stored).collect()
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET fields = fields || $3
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(serde_json::Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(FireError::storage(format!("no document {collection}/{id}")));
        }
        Ok(())
    }

    async fn add_to_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
        fields: FieldMap,
    ) -> Result<String> {
        self.insert(&subcollection_path(collection, parent_id, subcollection), fields)
            .await
    }

    async fn list_subcollection(
        &self,
        collection: &str,
        parent_id: &str,
        subcollection: &str,
    ) -> Result<Vec<StoredDocument>> {
        let rows = sqlx::query_as::<_, (String, serde_json::Value)>(
            r#"
            SELECT id, fields
            FROM documents
            WHERE collection = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(subcollection_path(collection, parent_id, subcollection))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(into_stored).collect()
    }
}
