use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::corpus::BookRecord;
use crate::embed::Embedder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub summary: String,
    pub distance: f32,
}

#[derive(Debug, Clone)]
struct Document {
    id: String,
    title: String,
    summary: String,
    embedding: Vec<f32>,
}

/// In-memory similarity index over book summaries.
///
/// Readers share the document set; `reload` builds the replacement set
/// outside the lock and swaps it in one write.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    max_distance: Option<f32>,
    documents: RwLock<Arc<Vec<Document>>>,
    reload_lock: Mutex<()>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            max_distance: None,
            documents: RwLock::new(Arc::new(Vec::new())),
            reload_lock: Mutex::new(()),
        }
    }

    /// Drops hits whose distance is above `max_distance`.
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Replaces every stored document with `records`.
    ///
    /// On embedding failure the previous set is left untouched.
    pub async fn reload(&self, records: &[BookRecord]) -> anyhow::Result<usize> {
        let _guard = self.reload_lock.lock().await;

        let summaries = records
            .iter()
            .map(|record| record.summary.clone())
            .collect::<Vec<_>>();
        let embeddings = self
            .embedder
            .embed(&summaries)
            .await
            .context("embed corpus summaries")?;
        if embeddings.len() != records.len() {
            anyhow::bail!(
                "embedder returned {} vectors for {} records",
                embeddings.len(),
                records.len()
            );
        }

        let documents = records
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (record, embedding))| Document {
                id: format!("book_{i}"),
                title: record.title.clone(),
                summary: record.summary.clone(),
                embedding,
            })
            .collect::<Vec<_>>();
        let count = documents.len();

        let previous = {
            let mut current = self.documents.write().await;
            std::mem::replace(&mut *current, Arc::new(documents))
        };
        tracing::info!(
            removed = previous.len(),
            inserted = count,
            "reloaded vector index"
        );
        Ok(count)
    }

    /// Returns up to `k` hits, most similar first.
    pub async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let documents = self.snapshot().await;
        if documents.is_empty() {
            tracing::debug!("search on empty index");
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_owned()])
            .await
            .context("embed search query")?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;
        if query_embedding.iter().all(|v| *v == 0.0) {
            tracing::debug!("query embedding carries no signal");
            return Ok(Vec::new());
        }

        let mut scored = documents
            .iter()
            .filter_map(|doc| {
                let distance = squared_l2(&query_embedding, &doc.embedding)?;
                Some((distance, doc))
            })
            .filter(|(distance, _)| self.max_distance.is_none_or(|max| *distance <= max))
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .map(|(distance, doc)| {
                tracing::trace!(id = %doc.id, title = %doc.title, distance, "search hit");
                SearchHit {
                    title: doc.title.clone(),
                    summary: doc.summary.clone(),
                    distance,
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(k, hits = hits.len(), "searched vector index");
        Ok(hits)
    }

    pub async fn list_titles(&self) -> Vec<String> {
        self.snapshot()
            .await
            .iter()
            .map(|doc| doc.title.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn snapshot(&self) -> Arc<Vec<Document>> {
        Arc::clone(&*self.documents.read().await)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>();
    distance.is_finite().then_some(distance)
}
