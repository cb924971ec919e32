use std::sync::Arc;

use anyhow::{Context, Result};
use firestore_client::FirestoreClient;
use tracing::info;

use firenews_common::{Article, Config, StorageBackend};

use crate::articles::ArticleRepository;
use crate::moderation::ModerationQueue;
use crate::predictor::{Predictor, ProcessPredictor};
use crate::store::{DocumentStore, FirestoreStore, PostgresStore};
use crate::submission::SubmissionOrchestrator;

/// Central dependency container shared by every request handler.
#[derive(Clone)]
pub struct FireNews {
    pub articles: Arc<ArticleRepository>,
    pub submissions: Arc<SubmissionOrchestrator>,
    pub moderation: Arc<ModerationQueue>,
}

impl FireNews {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        predictor: Arc<dyn Predictor>,
        model_version: impl Into<String>,
        queue_scan_limit: usize,
    ) -> Self {
        let articles = Arc::new(ArticleRepository::new(store));
        Self {
            submissions: Arc::new(SubmissionOrchestrator::new(
                predictor,
                articles.clone(),
                model_version,
            )),
            moderation: Arc::new(ModerationQueue::new(articles.clone(), queue_scan_limit)),
            articles,
        }
    }

    /// Wire the configured store backend and the process predictor.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.storage_backend {
            StorageBackend::Firestore => {
                let client = FirestoreClient::new(
                    &config.firestore_base_url,
                    &config.firebase_project_id,
                    config.firestore_api_key.as_deref(),
                );
                Arc::new(
                    FirestoreStore::new(client)
                        .with_composite_index(config.firestore_composite_index),
                )
            }
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres backend")?;
                let store = PostgresStore::connect(url)
                    .await
                    .context("Failed to connect to Postgres")?;
                store.migrate().await.context("Failed to run migrations")?;
                Arc::new(store)
            }
        };

        info!(
            backend = store.name(),
            compound_query = store.supports_compound_query(),
            "Document store ready"
        );

        let predictor = Arc::new(ProcessPredictor::new(
            config.python_path.clone(),
            config.predictor_script.clone(),
        ));

        Ok(Self::new(
            store,
            predictor,
            config.model_version.clone(),
            config.queue_scan_limit,
        ))
    }

    /// Most recently submitted first.
    pub async fn list_articles(&self, limit: usize) -> firenews_common::Result<Vec<Article>> {
        self.articles.list_recent(limit).await
    }

    pub async fn get_article(&self, id: &str) -> firenews_common::Result<Article> {
        self.articles.get(id).await
    }
}
