//! Sentence embedding and summarization models.
//!
//! Both capabilities sit behind traits so the pipeline can run against the in-process
//! rust-bert models, the HuggingFace Inference API, or test doubles.

use crate::config::{Config, ModelBackend};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod huggingface_embedder;
pub mod local_models;

pub use huggingface_embedder::{HuggingFaceEmbedder, HuggingFaceSummarizer};
pub use local_models::LocalModels;

/// Target length of a generated summary, in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SummaryLength {
    pub max_length: usize,
    pub min_length: usize,
}

impl Default for SummaryLength {
    fn default() -> Self {
        Self {
            max_length: 100,
            min_length: 50,
        }
    }
}

impl From<&Config> for SummaryLength {
    fn from(config: &Config) -> Self {
        Self {
            max_length: config.summary_max_length,
            min_length: config.summary_min_length,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentenceEmbedder: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector returned by `embed`.
    fn dimension(&self) -> usize;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce an abstractive summary of `text`. Sampling is disabled, so the output is
    /// deterministic for a given model.
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String>;
}

/// Loads the embedding model only, for tools that never summarize.
pub async fn load_embedder(config: &Config) -> Result<Arc<dyn SentenceEmbedder>> {
    match config.model_backend {
        ModelBackend::Local => Ok(Arc::new(LocalModels::load(None).await?)),
        ModelBackend::HuggingFace => Ok(Arc::new(
            HuggingFaceEmbedder::new(
                config.huggingface_api_key()?,
                &config.huggingface_base_url,
                &config.embedding_model,
            )
            .await?,
        )),
    }
}

/// Loads both models for the configured backend.
pub async fn load_models(
    config: &Config,
) -> Result<(Arc<dyn SentenceEmbedder>, Arc<dyn Summarizer>)> {
    match config.model_backend {
        ModelBackend::Local => {
            let models = Arc::new(LocalModels::load(Some(SummaryLength::from(config))).await?);
            Ok((models.clone(), models))
        }
        ModelBackend::HuggingFace => {
            let api_key = config.huggingface_api_key()?;
            let embedder = HuggingFaceEmbedder::new(
                api_key,
                &config.huggingface_base_url,
                &config.embedding_model,
            )
            .await?;
            let summarizer = HuggingFaceSummarizer::new(
                api_key,
                &config.huggingface_base_url,
                &config.summarization_model,
            )?;
            Ok((Arc::new(embedder), Arc::new(summarizer)))
        }
    }
}
