//! In-process rust-bert models.
//!
//! The libtorch-backed models are loaded and driven on a single dedicated thread. Async
//! callers talk to it over a channel and await a oneshot reply, so request handlers never
//! block the runtime and the model objects never leave their thread.

use super::{SentenceEmbedder, SummaryLength, Summarizer};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use log::{debug, error, info};
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use rust_bert::pipelines::summarization::{SummarizationConfig, SummarizationModel};
use rust_bert::resources::RemoteResource;
use rust_bert::t5::{T5ConfigResources, T5ModelResources, T5VocabResources};
use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use tch::Device;
use tokio::sync::oneshot;

const PROBE_TEXT: &str = "This is a test sentence for probing the embeddings model.";

enum ModelRequest {
    Embed {
        text: String,
        reply: oneshot::Sender<Result<Vec<f32>>>,
    },
    Summarize {
        text: String,
        length: SummaryLength,
        reply: oneshot::Sender<Result<String>>,
    },
}

/// Handle to the all-MiniLM-L6-v2 embedder and T5-small summarizer running on the
/// model thread. Cheap to share behind an `Arc`.
pub struct LocalModels {
    sender: mpsc::Sender<ModelRequest>,
    dimension: usize,
}

impl LocalModels {
    /// Spawn the model thread and wait until the models are ready.
    ///
    /// With `Some(length)` the summarizer for that length is built up front; other lengths
    /// are built the first time they are requested. Weights are downloaded to the rust-bert
    /// cache on first use.
    pub async fn load(summary_length: Option<SummaryLength>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        thread::Builder::new()
            .name("model-runner".to_string())
            .spawn(move || match ModelRunner::load(summary_length) {
                Ok(runner) => {
                    if ready_tx.send(Ok(runner.dimension)).is_ok() {
                        runner.run(receiver);
                    }
                }
                Err(e) => {
                    error!("Failed to load local models: {}", e);
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let dimension = ready_rx.await.map_err(|_| {
            ApiError::ModelUnavailable("model thread exited during startup".to_string())
        })??;

        info!("Local models ready (embedding dimension: {})", dimension);
        Ok(Self { sender, dimension })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> ModelRequest,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .map_err(|_| ApiError::ModelUnavailable("model thread has stopped".to_string()))?;

        response.await.map_err(|_| {
            ApiError::ModelUnavailable("model thread dropped the request".to_string())
        })?
    }
}

#[async_trait]
impl SentenceEmbedder for LocalModels {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_string();
        self.request(|reply| ModelRequest::Embed { text, reply }).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl Summarizer for LocalModels {
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String> {
        let text = text.to_string();
        self.request(|reply| ModelRequest::Summarize {
            text,
            length,
            reply,
        })
        .await
    }
}

struct ModelRunner {
    embedder: SentenceEmbeddingsModel,
    summarizers: HashMap<SummaryLength, SummarizationModel>,
    dimension: usize,
    device: Device,
}

impl ModelRunner {
    fn load(summary_length: Option<SummaryLength>) -> Result<Self> {
        let device = Device::cuda_if_available();
        info!("Loading all-MiniLM-L6-v2 sentence embeddings model on {:?}...", device);
        let embedder = SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL6V2)
            .with_device(device)
            .create_model()
            .map_err(|e| ApiError::ModelUnavailable(format!("sentence embeddings: {}", e)))?;

        let dimension = embedder
            .encode(&[PROBE_TEXT])?
            .first()
            .map(Vec::len)
            .ok_or_else(|| {
                ApiError::ModelUnavailable("embeddings model returned no vector".to_string())
            })?;

        let mut runner = Self {
            embedder,
            summarizers: HashMap::new(),
            dimension,
            device,
        };

        if let Some(length) = summary_length {
            runner.summarizer(length)?;
        }

        Ok(runner)
    }

    fn run(mut self, receiver: mpsc::Receiver<ModelRequest>) {
        // Ends once every LocalModels handle is dropped.
        while let Ok(request) = receiver.recv() {
            match request {
                ModelRequest::Embed { text, reply } => {
                    let _ = reply.send(self.embed(&text));
                }
                ModelRequest::Summarize {
                    text,
                    length,
                    reply,
                } => {
                    let _ = reply.send(self.summarize(&text, length));
                }
            }
        }
        debug!("Model thread shutting down");
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .encode(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ModelInferenceError("no embedding produced".to_string()))
    }

    fn summarize(&mut self, text: &str, length: SummaryLength) -> Result<String> {
        self.summarizer(length)?
            .summarize(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ModelInferenceError("no summary produced".to_string()))
    }

    fn summarizer(&mut self, length: SummaryLength) -> Result<&SummarizationModel> {
        if !self.summarizers.contains_key(&length) {
            info!(
                "Loading t5-small summarization model (max_length: {}, min_length: {})...",
                length.max_length, length.min_length
            );
            let model = build_summarizer(length, self.device)?;
            self.summarizers.insert(length, model);
        }

        self.summarizers.get(&length).ok_or_else(|| {
            ApiError::ModelUnavailable("summarization model missing after load".to_string())
        })
    }
}

fn build_summarizer(length: SummaryLength, device: Device) -> Result<SummarizationModel> {
    let config_resource = RemoteResource::from_pretrained(T5ConfigResources::T5_SMALL);
    let vocab_resource = RemoteResource::from_pretrained(T5VocabResources::T5_SMALL);
    let weights_resource = RemoteResource::from_pretrained(T5ModelResources::T5_SMALL);

    let mut config = SummarizationConfig::new(
        ModelType::T5,
        ModelResource::Torch(Box::new(weights_resource)),
        config_resource,
        vocab_resource,
        None,
    );
    config.max_length = Some(length.max_length as i64);
    config.min_length = length.min_length as i64;
    config.do_sample = false;
    config.device = device;

    SummarizationModel::new(config)
        .map_err(|e| ApiError::ModelUnavailable(format!("summarization: {}", e)))
}
