//! In-memory embedding index backed by an `ares-vector` HNSW collection.
//!
//! An index is built once per processed batch and never updated; processing a
//! new batch replaces it wholesale. Vectors are keyed by their position in the
//! chunk list.

use ares_vector::config::HnswConfig;
use ares_vector::Collection;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, Chunk, Result};
use crate::utils::retry::{with_retry, RetryError, RetryPolicy};

/// Similarity used to rank chunks against a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    /// Inner product; embeddings must be unit length
    DotProduct,
}

impl From<DistanceMetric> for ares_vector::DistanceMetric {
    fn from(metric: DistanceMetric) -> Self {
        match metric {
            DistanceMetric::Cosine => ares_vector::DistanceMetric::Cosine,
            DistanceMetric::DotProduct => ares_vector::DistanceMetric::DotProduct,
        }
    }
}

const UNIT_NORM_TOLERANCE: f32 = 1e-3;

impl DistanceMetric {
    /// Reject vectors the HNSW distance cannot score
    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if *self == DistanceMetric::DotProduct {
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(AppError::EmbeddingProvider(format!(
                    "dotproduct metric needs unit-length embeddings, got norm {:.4}",
                    norm
                )));
            }
        }
        Ok(())
    }

    /// Map an `ares-vector` score back to the similarity itself.
    ///
    /// The dot-product index reports `dot - 1`.
    fn similarity_from_score(&self, score: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => score,
            DistanceMetric::DotProduct => score + 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub batch_size: usize,
    pub metric: DistanceMetric,
    pub retry: RetryPolicy,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            metric: DistanceMetric::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

pub struct EmbeddingIndex {
    chunks: Vec<Chunk>,
    /// `None` only for an index over zero chunks
    collection: Option<Collection>,
    dimensions: usize,
    metric: DistanceMetric,
    retry: RetryPolicy,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("chunks", &self.chunks.len())
            .field("dimensions", &self.dimensions)
            .field("metric", &self.metric)
            .finish()
    }
}

async fn embed_with_retry(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
    retry: &RetryPolicy,
) -> Result<Vec<Vec<f32>>> {
    with_retry(retry, "embed", || provider.embed_batch(texts))
        .await
        .map_err(|e| match e {
            RetryError::Failed(AppError::EmbeddingProvider(msg)) => AppError::EmbeddingProvider(msg),
            RetryError::Failed(other) => AppError::EmbeddingProvider(other.to_string()),
            RetryError::TimedOut(t) => AppError::EmbeddingProvider(format!(
                "{} timed out after {}s",
                provider.model_name(),
                t.as_secs()
            )),
        })
}

impl EmbeddingIndex {
    /// Embed every chunk and build the index.
    ///
    /// All-or-nothing: any provider failure, a vector count that does not match
    /// the batch, or inconsistent dimensionality aborts the build.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        chunks: Vec<Chunk>,
        options: &IndexOptions,
    ) -> Result<Self> {
        let batch_size = options.batch_size.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        let mut dimensions = provider.dimensions();

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let batch_vectors = embed_with_retry(provider, &texts, &options.retry).await?;

            if batch_vectors.len() != batch.len() {
                error!(expected = batch.len(), got = batch_vectors.len(), "Embedding count mismatch");
                return Err(AppError::EmbeddingProvider(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    batch_vectors.len()
                )));
            }

            for vector in batch_vectors {
                let expected = *dimensions.get_or_insert(vector.len());
                if vector.len() != expected || vector.is_empty() {
                    return Err(AppError::EmbeddingProvider(format!(
                        "inconsistent embedding dimensions: expected {}, got {}",
                        expected,
                        vector.len()
                    )));
                }
                options.metric.check_vector(&vector)?;
                vectors.push(vector);
            }
        }

        let dimensions = dimensions.unwrap_or(0);
        let collection = if vectors.is_empty() {
            None
        } else {
            Some(Self::create_collection(dimensions, options.metric, &vectors)?)
        };

        debug!(chunks = chunks.len(), dimensions, "Index built");

        Ok(Self {
            chunks,
            collection,
            dimensions,
            metric: options.metric,
            retry: options.retry,
        })
    }

    fn create_collection(
        dimensions: usize,
        metric: DistanceMetric,
        vectors: &[Vec<f32>],
    ) -> Result<Collection> {
        let collection = Collection::new(
            "chunks".to_string(),
            dimensions,
            metric.into(),
            HnswConfig::default(),
        )
        .map_err(|e| AppError::Internal(format!("Failed to create vector index: {}", e)))?;

        let ids: Vec<String> = (0..vectors.len()).map(|i| i.to_string()).collect();
        collection
            .insert_batch(
                ids.iter()
                    .zip(vectors)
                    .map(|(id, v)| (id.as_str(), v.as_slice(), None)),
            )
            .map_err(|e| AppError::EmbeddingProvider(format!("invalid embedding: {}", e)))?;

        Ok(collection)
    }

    /// Top `k` chunks by descending similarity to `question`.
    ///
    /// Ties keep original chunk order. Returns fewer than `k` only when the
    /// index holds fewer than `k` chunks.
    pub async fn query(
        &self,
        provider: &dyn EmbeddingProvider,
        question: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let collection = match &self.collection {
            Some(collection) if k > 0 => collection,
            _ => return Ok(Vec::new()),
        };

        let query_vector = embed_with_retry(provider, &[question], &self.retry)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingProvider("empty query embedding".to_string()))?;

        if query_vector.len() != self.dimensions {
            return Err(AppError::EmbeddingProvider(format!(
                "query embedding has {} dimensions, index has {}",
                query_vector.len(),
                self.dimensions
            )));
        }
        self.metric.check_vector(&query_vector)?;

        let hits = collection
            .search(&query_vector, k.min(self.chunks.len()))
            .map_err(|e| AppError::Internal(format!("Vector search failed: {}", e)))?;

        let mut ranked: Vec<(usize, f32)> = hits
            .into_iter()
            .filter_map(|hit| {
                let position: usize = hit.id.parse().ok()?;
                (position < self.chunks.len()).then(|| {
                    let score = self.metric.similarity_from_score(hit.score);
                    (position, if score.is_nan() { f32::MIN } else { score })
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }
}

/// Query `index`, failing with [`AppError::IndexNotBuilt`] when there is none.
pub async fn retrieve(
    index: Option<&EmbeddingIndex>,
    provider: &dyn EmbeddingProvider,
    question: &str,
    k: usize,
) -> Result<Vec<ScoredChunk>> {
    let index = index.ok_or(AppError::IndexNotBuilt)?;
    index.query(provider, question, k).await
}
