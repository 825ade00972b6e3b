use crate::{
    config::{Config, ResultView},
    error::{ApiError, Result},
    ml::{SummaryLength, Summarizer},
    models::SimilarBooksResponse,
    services::{catalog::Catalog, google_books::GoogleBooksClient, ranker::SimilarityRanker},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Tunables of the recommendation pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub summary_length: SummaryLength,
    pub default_top_k: usize,
    pub view: ResultView,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            summary_length: SummaryLength::from(config),
            default_top_k: config.top_k,
            view: config.result_view,
        }
    }
}

/// Runs fetch → summarize → rank for one user request.
#[derive(Clone)]
pub struct RecommendationService {
    books: GoogleBooksClient,
    summarizer: Arc<dyn Summarizer>,
    ranker: SimilarityRanker,
    catalog: Arc<Catalog>,
    settings: PipelineSettings,
}

impl RecommendationService {
    pub fn new(
        books: GoogleBooksClient,
        summarizer: Arc<dyn Summarizer>,
        ranker: SimilarityRanker,
        catalog: Arc<Catalog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            books,
            summarizer,
            ranker,
            catalog,
            settings,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Find catalog books similar to the book identified by `title` and `author`.
    pub async fn find_similar(
        &self,
        title: &str,
        author: &str,
        top_k: Option<usize>,
    ) -> Result<SimilarBooksResponse> {
        let (title, author) = (title.trim(), author.trim());
        if title.is_empty() || author.is_empty() {
            return Err(ApiError::InvalidInput(
                "Please provide both the book title and author".to_string(),
            ));
        }
        let top_k = top_k.unwrap_or(self.settings.default_top_k);

        let book = self
            .books
            .fetch_description(title, author)
            .await?
            .ok_or(ApiError::NoDescription)?;
        debug!("Found description ({} chars)", book.description.len());

        let mut summary = self
            .summarizer
            .summarize(&book.description, self.settings.summary_length)
            .await?;
        if let Some(tag) = book.author_genre_tag() {
            summary.push(' ');
            summary.push_str(&tag);
        }
        info!("Summarized description: {}", summary);

        let ranked = self.ranker.rank(&summary, &self.catalog, top_k).await?;
        info!(
            "Returning {} similar books for {:?} by {:?}",
            ranked.len(),
            title,
            author
        );

        Ok(SimilarBooksResponse {
            results: self.settings.view.render_all(&ranked),
            summary,
        })
    }
}
