use crate::{
    error::{ApiError, Result},
    ml::SentenceEmbedder,
    models::RankedResult,
    services::catalog::Catalog,
};
use ndarray::ArrayView1;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 5;

/// Cosine similarity from a dot product and the two vector norms; 0 when either norm is 0.
fn cosine_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    let denominator = norm_a * norm_b;
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

/// Cosine similarity of two vectors; 0 when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    cosine_from_parts(a.dot(&b), a.dot(&a).sqrt(), b.dot(&b).sqrt())
}

/// Rank the catalog against an already computed query vector.
///
/// Returns at most `k` results ordered by descending similarity; equal scores keep
/// catalog order.
pub fn rank_by_embedding<'a>(
    query: &[f32],
    catalog: &'a Catalog,
    k: usize,
) -> Result<Vec<RankedResult<'a>>> {
    if catalog.is_empty() {
        return Ok(Vec::new());
    }
    if query.len() != catalog.dimension() {
        return Err(ApiError::DimensionMismatch {
            expected: catalog.dimension(),
            got: query.len(),
        });
    }

    let query = ArrayView1::from(query);
    let query_norm = query.dot(&query).sqrt();
    let dots = catalog.embeddings().dot(&query);

    let mut scored: Vec<(usize, f32)> = dots
        .iter()
        .zip(catalog.norms().iter())
        .map(|(&dot, &norm)| cosine_from_parts(dot, norm, query_norm))
        .enumerate()
        .collect();

    // sort_by is stable, so ties stay in catalog order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    let items = catalog.items();
    Ok(scored
        .into_iter()
        .map(|(index, similarity)| RankedResult {
            item: &items[index],
            similarity,
        })
        .collect())
}

/// Ranks catalog books by embedding similarity to a free-form text.
#[derive(Clone)]
pub struct SimilarityRanker {
    embedder: Arc<dyn SentenceEmbedder>,
}

impl SimilarityRanker {
    pub fn new(embedder: Arc<dyn SentenceEmbedder>) -> Self {
        Self { embedder }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Embed `query_text` and return the `k` most similar catalog books.
    pub async fn rank<'a>(
        &self,
        query_text: &str,
        catalog: &'a Catalog,
        k: usize,
    ) -> Result<Vec<RankedResult<'a>>> {
        if query_text.trim().is_empty() {
            return Err(ApiError::InvalidInput("Query text cannot be empty".to_string()));
        }
        if k == 0 {
            return Err(ApiError::InvalidInput("k must be at least 1".to_string()));
        }

        let embedding = self.embedder.embed(query_text).await?;
        let results = rank_by_embedding(&embedding, catalog, k)?;

        for (position, result) in results.iter().enumerate() {
            debug!(
                "#{} {:?} by {:?} (similarity {:.4})",
                position + 1,
                result.item.title,
                result.item.author,
                result.similarity
            );
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MockSentenceEmbedder;
    use crate::models::{format_embedding, CatalogRow};

    fn catalog(embeddings: &[(&str, Vec<f32>)]) -> Catalog {
        let rows = embeddings
            .iter()
            .map(|(title, embedding)| CatalogRow {
                title: title.to_string(),
                author: "Author".to_string(),
                description: String::new(),
                genre: None,
                embedding: format_embedding(embedding),
                download_link_1: None,
                download_link_2: None,
            })
            .collect();
        Catalog::from_rows(rows).unwrap()
    }

    fn embedder_returning(vector: Vec<f32>) -> Arc<dyn SentenceEmbedder> {
        let dimension = vector.len();
        let mut mock = MockSentenceEmbedder::new();
        mock.expect_embed().returning(move |_| Ok(vector.clone()));
        mock.expect_dimension().return_const(dimension);
        Arc::new(mock)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);

        let catalog = catalog(&[("zero", vec![0.0, 0.0]), ("unit", vec![1.0, 0.0])]);
        let results = rank_by_embedding(&[1.0, 0.0], &catalog, 5).unwrap();
        assert_eq!(results[0].item.title, "unit");
        assert_eq!(results[1].similarity, 0.0);

        let results = rank_by_embedding(&[0.0, 0.0], &catalog, 5).unwrap();
        assert!(results.iter().all(|r| r.similarity == 0.0));
    }

    #[test]
    fn test_ranked_scores_match_cosine_similarity() {
        let vectors = [("a", vec![0.3, -1.2]), ("b", vec![2.0, 0.5]), ("z", vec![0.0, 0.0])];
        let catalog = catalog(&vectors);
        let query = [0.7, 0.4];

        for result in rank_by_embedding(&query, &catalog, 3).unwrap() {
            let (_, vector) = vectors
                .iter()
                .find(|(title, _)| *title == result.item.title)
                .unwrap();
            assert!((result.similarity - cosine_similarity(&query, vector)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_two_book_scenario() {
        let catalog = catalog(&[("A", vec![1.0, 0.0]), ("B", vec![0.0, 1.0])]);
        let results = rank_by_embedding(&[1.0, 0.0], &catalog, 1).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.title, "A");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_results_sorted_and_bounded() {
        let catalog = catalog(&[
            ("far", vec![-1.0, 0.2]),
            ("close", vec![0.9, 0.1]),
            ("mid", vec![0.5, 0.5]),
            ("exact", vec![2.0, 0.0]),
            ("orthogonal", vec![0.0, 3.0]),
            ("near", vec![1.0, 0.3]),
        ]);

        let results = rank_by_embedding(&[1.0, 0.0], &catalog, 5).unwrap();
        assert_eq!(results.len(), 5);
        assert!(results
            .windows(2)
            .all(|pair| pair[0].similarity >= pair[1].similarity));
        assert_eq!(results[0].item.title, "exact");
        assert!(results.iter().all(|r| r.item.title != "far"));
    }

    #[test]
    fn test_small_catalog_returns_everything() {
        let catalog = catalog(&[("A", vec![1.0, 0.0]), ("B", vec![0.0, 1.0])]);
        assert_eq!(rank_by_embedding(&[1.0, 1.0], &catalog, 5).unwrap().len(), 2);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let catalog = catalog(&[
            ("first", vec![1.0, 1.0]),
            ("other", vec![0.0, 1.0]),
            ("second", vec![1.0, 1.0]),
            ("third", vec![1.0, 1.0]),
            ("fourth", vec![1.0, 1.0]),
        ]);

        let titles: Vec<_> = rank_by_embedding(&[1.0, 1.0], &catalog, 3)
            .unwrap()
            .into_iter()
            .map(|r| r.item.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_catalog_yields_nothing() {
        let catalog = Catalog::from_rows(Vec::new()).unwrap();
        assert!(rank_by_embedding(&[1.0], &catalog, 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let catalog = catalog(&[("A", vec![1.0, 0.0])]);
        assert!(matches!(
            rank_by_embedding(&[1.0, 0.0, 0.0], &catalog, 5),
            Err(ApiError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_rank_embeds_query_text() {
        let catalog = catalog(&[("A", vec![0.6, 0.8]), ("B", vec![0.0, 1.0])]);
        let ranker = SimilarityRanker::new(embedder_returning(vec![0.6, 0.8]));

        let results = ranker.rank("a summary", &catalog, DEFAULT_TOP_K).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item.title, "A");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_rank_validates_input() {
        let catalog = catalog(&[("A", vec![1.0, 0.0])]);
        let mut mock = MockSentenceEmbedder::new();
        mock.expect_embed().never();
        let ranker = SimilarityRanker::new(Arc::new(mock));

        assert!(matches!(
            ranker.rank("   ", &catalog, 5).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            ranker.rank("text", &catalog, 0).await,
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_rank_propagates_model_unavailable() {
        let catalog = catalog(&[("A", vec![1.0, 0.0])]);
        let mut mock = MockSentenceEmbedder::new();
        mock.expect_embed()
            .returning(|_| Err(ApiError::ModelUnavailable("offline".to_string())));
        let ranker = SimilarityRanker::new(Arc::new(mock));

        assert!(matches!(
            ranker.rank("text", &catalog, 5).await,
            Err(ApiError::ModelUnavailable(_))
        ));
    }
}
