pub mod catalog;
pub mod google_books;
pub mod ranker;
pub mod recommendation;

// Re-export public types
pub use catalog::{Catalog, CatalogSource};
pub use google_books::GoogleBooksClient;
pub use ranker::{cosine_similarity, rank_by_embedding, SimilarityRanker, DEFAULT_TOP_K};
pub use recommendation::{PipelineSettings, RecommendationService};
