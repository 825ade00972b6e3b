use serde::{Deserialize, Serialize};

pub use book::{format_embedding, BookDescription, CatalogItem, CatalogRow, RankedResult};
pub use view::{DownloadLinksRow, ResultRow, SimilarityRow};

mod book;
mod view;

/// Request body for finding books similar to a known one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarBooksRequest {
    /// Title of a book the user enjoyed
    #[serde(default)]
    pub title: String,
    /// Author of that book
    #[serde(default)]
    pub author: String,
    /// Number of matches to return; falls back to the configured default
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Response for a similar-books lookup
#[derive(Debug, Clone, Serialize)]
pub struct SimilarBooksResponse {
    /// The summarized description the catalog was ranked against
    pub summary: String,
    pub results: Vec<ResultRow>,
}

/// Query string accepted by the catalog endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub query: Option<String>,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
    pub catalog_size: usize,
}
