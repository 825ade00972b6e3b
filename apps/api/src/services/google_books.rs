use crate::{
    error::{ApiError, Result},
    models::BookDescription,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
}

/// First volume that has a description and is in English.
fn first_english_description(response: VolumesResponse) -> Option<BookDescription> {
    response.items.into_iter().find_map(|volume| {
        let info = volume.volume_info;
        match (info.description, info.language.as_deref()) {
            (Some(description), Some("en")) => Some(BookDescription {
                description,
                authors: info.authors,
                categories: info.categories,
            }),
            _ => None,
        }
    })
}

/// Client for the Google Books `volumes` search endpoint.
#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    client: Client,
    base_url: String,
    api_key: String,
    country: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(base_url: &str, api_key: &str, country: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            country: country.map(str::to_string),
        }
    }

    /// Look up a book by title and author and return its English description.
    ///
    /// `Ok(None)` means the API answered but no English description exists. A non-200
    /// answer is a `BookLookupFailed` error; nothing is retried.
    pub async fn fetch_description(
        &self,
        title: &str,
        author: &str,
    ) -> Result<Option<BookDescription>> {
        let mut query = vec![
            ("q", format!("intitle:{} inauthor:{}", title, author)),
            ("langRestrict", "en".to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(country) = &self.country {
            query.push(("country", country.clone()));
        }

        debug!("Searching Google Books for {:?} by {:?}", title, author);
        let response = self
            .client
            .get(format!("{}/volumes", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::BookLookupFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("Google Books returned {}: {}", status, body);
            return Err(ApiError::BookLookupFailed(format!(
                "Google Books returned status {}",
                status
            )));
        }

        let volumes: VolumesResponse = response.json().await.map_err(|e| {
            ApiError::BookLookupFailed(format!("unreadable Google Books response: {}", e))
        })?;
        debug!("Google Books returned {} volumes", volumes.items.len());

        Ok(first_english_description(volumes))
    }
}
