use crate::error::{ApiError, Result};
use serde::Deserialize;

/// Which implementation backs the embedding and summarization models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// rust-bert models running in-process
    Local,
    /// HuggingFace Inference API
    HuggingFace,
}

/// Column layout of the result table returned to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultView {
    Similarity,
    DownloadLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub catalog_port: u16,
    pub catalog_source: String,
    pub google_books_api_key: Option<String>,
    pub google_books_base_url: String,
    pub google_books_country: Option<String>,
    pub model_backend: ModelBackend,
    pub huggingface_api_key: Option<String>,
    pub huggingface_base_url: String,
    pub embedding_model: String,
    pub summarization_model: String,
    pub summary_max_length: usize,
    pub summary_min_length: usize,
    pub top_k: usize,
    pub result_view: ResultView,
}

impl Config {
    /// Load configuration from defaults overlaid with `APP_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("APP").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Config = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("catalog_port", 5000)?
            .set_default("catalog_source", "book_embeddings.csv")?
            .set_default("google_books_base_url", "https://www.googleapis.com/books/v1")?
            .set_default("model_backend", "local")?
            .set_default("huggingface_base_url", "https://api-inference.huggingface.co")?
            .set_default("embedding_model", "sentence-transformers/all-MiniLM-L6-v2")?
            .set_default("summarization_model", "t5-small")?
            .set_default("summary_max_length", 100)?
            .set_default("summary_min_length", 50)?
            .set_default("top_k", 5)?
            .set_default("result_view", "similarity")?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ApiError::ConfigError("top_k must be at least 1".to_string()));
        }
        if self.summary_min_length > self.summary_max_length {
            return Err(ApiError::ConfigError(format!(
                "summary_min_length ({}) exceeds summary_max_length ({})",
                self.summary_min_length, self.summary_max_length
            )));
        }
        Ok(())
    }

    pub fn google_books_api_key(&self) -> Result<&str> {
        self.google_books_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::ConfigError("APP_GOOGLE_BOOKS_API_KEY must be set".to_string()))
    }

    pub fn huggingface_api_key(&self) -> Result<&str> {
        self.huggingface_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ApiError::ConfigError(
                    "APP_HUGGINGFACE_API_KEY must be set for the huggingface backend".to_string(),
                )
            })
    }
}
