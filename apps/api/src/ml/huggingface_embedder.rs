use super::{SentenceEmbedder, SummaryLength, Summarizer};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

const PROBE_TEXT: &str = "This is a test sentence for probing the embeddings model.";

// Text processing limits
const MAX_TEXT_PREVIEW_LENGTH: usize = 100;

/// Sentence embeddings from the HuggingFace Inference API feature-extraction pipeline.
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    client: Client,
    api_key: String,
    model_url: String,
    model_name: String,
    dimension: usize,
}

impl HuggingFaceEmbedder {
    /// Creates the embedder and probes the model once to learn its output dimension.
    pub async fn new(api_key: &str, base_url: &str, model_name: &str) -> Result<Self> {
        let model_url = format!("{}/models/{}", base_url.trim_end_matches('/'), model_name);
        info!("Using HuggingFace embedding model: {}", model_name);
        debug!("Model URL: {}", model_url);

        let mut embedder = Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model_url,
            model_name: model_name.to_string(),
            dimension: 0,
        };

        let probe = embedder.request_embedding(PROBE_TEXT).await?;
        embedder.dimension = probe.len();
        info!(
            "HuggingFace embedder ready (dimension: {})",
            embedder.dimension
        );

        Ok(embedder)
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct Request<'a> {
            inputs: &'a str,
            options: Options,
        }

        debug!(
            "Encoding text (length: {}): {}",
            text.len(),
            text.chars().take(MAX_TEXT_PREVIEW_LENGTH).collect::<String>()
        );

        let response = self
            .client
            .post(&self.model_url)
            .bearer_auth(&self.api_key)
            .json(&Request {
                inputs: text,
                options: Options::default(),
            })
            .send()
            .await
            .map_err(|e| {
                ApiError::ModelUnavailable(format!("Failed to send request to model API: {}", e))
            })?;

        let body: serde_json::Value = check_status(response, &self.model_name)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::ModelInferenceError(format!("Invalid model response: {}", e)))?;

        parse_embedding_response(&body)
    }
}

#[async_trait]
impl SentenceEmbedder for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embedding(text).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Abstractive summaries from the HuggingFace Inference API summarization pipeline.
#[derive(Clone)]
pub struct HuggingFaceSummarizer {
    client: Client,
    api_key: String,
    model_url: String,
    model_name: String,
}

impl HuggingFaceSummarizer {
    pub fn new(api_key: &str, base_url: &str, model_name: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ApiError::ConfigError(
                "HuggingFace API key is empty".to_string(),
            ));
        }

        info!("Using HuggingFace summarization model: {}", model_name);
        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model_url: format!("{}/models/{}", base_url.trim_end_matches('/'), model_name),
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String> {
        #[derive(Serialize)]
        struct Request<'a> {
            inputs: &'a str,
            parameters: Parameters,
            options: Options,
        }

        #[derive(Serialize)]
        struct Parameters {
            max_length: usize,
            min_length: usize,
            do_sample: bool,
        }

        #[derive(Deserialize)]
        struct Summary {
            summary_text: String,
        }

        let response = self
            .client
            .post(&self.model_url)
            .bearer_auth(&self.api_key)
            .json(&Request {
                inputs: text,
                parameters: Parameters {
                    max_length: length.max_length,
                    min_length: length.min_length,
                    do_sample: false,
                },
                options: Options::default(),
            })
            .send()
            .await
            .map_err(|e| {
                ApiError::ModelUnavailable(format!("Failed to send request to model API: {}", e))
            })?;

        let summaries: Vec<Summary> = check_status(response, &self.model_name)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::ModelInferenceError(format!("Invalid model response: {}", e)))?;

        summaries
            .into_iter()
            .next()
            .map(|s| s.summary_text)
            .ok_or_else(|| ApiError::ModelInferenceError("Model returned no summary".to_string()))
    }
}

#[derive(Serialize)]
struct Options {
    wait_for_model: bool,
    use_cache: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            wait_for_model: true,
            use_cache: true,
        }
    }
}

async fn check_status(response: Response, model_name: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ApiError::ModelUnavailable(format!(
            "Model not found: {}. Please check the model name in your configuration.",
            model_name
        )),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::ModelUnavailable(
            "Authentication failed. Please check your HuggingFace API key.".to_string(),
        ),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            ApiError::ModelUnavailable(format!("HuggingFace API returned {}: {}", status, text))
        }
        _ => ApiError::ModelInferenceError(format!(
            "HuggingFace API returned non-success status: {} - {}",
            status, text
        )),
    })
}

/// Accepts `[f, ...]`, `[[f, ...]]`, `{"embedding": [...]}` and `{"embeddings": [[...]]}`.
fn parse_embedding_response(body: &serde_json::Value) -> Result<Vec<f32>> {
    #[derive(Debug, Deserialize, Default)]
    struct EmbeddingResponse {
        #[serde(default)]
        embeddings: Vec<Vec<f32>>,

        #[serde(default)]
        embedding: Vec<f32>,
    }

    let embedding: Vec<f32> = match body {
        serde_json::Value::Array(values) => match values.first() {
            Some(serde_json::Value::Array(_)) => {
                let rows: Vec<Vec<f32>> = serde_json::from_value(body.clone())?;
                rows.into_iter().next().unwrap_or_default()
            }
            _ => serde_json::from_value(body.clone())?,
        },
        serde_json::Value::Object(_) => {
            let parsed: EmbeddingResponse = serde_json::from_value(body.clone())?;
            if !parsed.embedding.is_empty() {
                parsed.embedding
            } else {
                parsed.embeddings.into_iter().next().unwrap_or_default()
            }
        }
        _ => Vec::new(),
    };

    if embedding.is_empty() {
        return Err(ApiError::ModelInferenceError(
            "Failed to extract embedding from response".to_string(),
        ));
    }

    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

    #[test]
    fn test_parse_embedding_shapes() {
        let flat = parse_embedding_response(&json!([0.1, 0.2])).unwrap();
        let nested = parse_embedding_response(&json!([[0.1, 0.2], [0.3, 0.4]])).unwrap();
        let object = parse_embedding_response(&json!({"embedding": [0.1, 0.2]})).unwrap();

        assert_eq!(flat, vec![0.1, 0.2]);
        assert_eq!(nested, vec![0.1, 0.2]);
        assert_eq!(object, vec![0.1, 0.2]);
        assert!(parse_embedding_response(&json!([])).is_err());
    }

    #[tokio::test]
    async fn test_embedder_probes_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.0, 0.6, 0.8])))
            .mount(&server)
            .await;

        let embedder = HuggingFaceEmbedder::new("test-key", &server.uri(), MODEL)
            .await
            .unwrap();

        assert_eq!(embedder.dimension(), 3);
        assert_eq!(embedder.embed("anything").await.unwrap(), vec![0.0, 0.6, 0.8]);
    }

    #[tokio::test]
    async fn test_embedder_reports_missing_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = HuggingFaceEmbedder::new("test-key", &server.uri(), MODEL).await;
        assert!(matches!(result, Err(ApiError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_summarizer_sends_length_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/t5-small"))
            .and(body_partial_json(json!({
                "parameters": {"max_length": 100, "min_length": 50, "do_sample": false}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"summary_text": "A short summary."}])),
            )
            .mount(&server)
            .await;

        let summarizer = HuggingFaceSummarizer::new("test-key", &server.uri(), "t5-small").unwrap();
        let summary = summarizer
            .summarize("A long description.", SummaryLength::default())
            .await
            .unwrap();

        assert_eq!(summary, "A short summary.");
    }
}
