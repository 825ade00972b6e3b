//! Catalog loading and lookup.
//!
//! The catalog is read once at startup, either from a CSV file or from a catalog service
//! over HTTP, and shared read-only for the rest of the process.

use crate::{
    error::{ApiError, Result},
    models::{CatalogItem, CatalogRow},
};
use csv::ReaderBuilder;
use log::{info, warn};
use ndarray::{Array1, Array2, ArrayView1};
use reqwest::Client;
use std::{fs::File, path::Path};

/// Where the catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(String),
    Http(String),
}

impl CatalogSource {
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            CatalogSource::Http(source.to_string())
        } else {
            CatalogSource::File(source.to_string())
        }
    }
}

/// Parse a textual embedding such as `"[0.12, -0.5, 3e-2]"`.
///
/// Surrounding brackets are optional. Every element must be a finite float.
pub fn parse_embedding(text: &str) -> std::result::Result<Vec<f32>, String> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed)
        .trim();

    if inner.is_empty() {
        return Err("embedding is empty".to_string());
    }

    inner
        .split(',')
        .enumerate()
        .map(|(position, element)| {
            let element = element.trim();
            let value: f32 = element
                .parse()
                .map_err(|_| format!("element {} ({:?}) is not a number", position, element))?;
            if !value.is_finite() {
                return Err(format!("element {} is not finite", position));
            }
            Ok(value)
        })
        .collect()
}

/// The loaded, immutable catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    embeddings: Array2<f32>,
    norms: Array1<f32>,
}

impl Catalog {
    /// Load the catalog from the configured source.
    pub async fn load(source: &str) -> Result<Self> {
        let catalog = match CatalogSource::parse(source) {
            CatalogSource::File(path) => {
                info!("Loading catalog from file {}", path);
                Self::from_csv_path(Path::new(&path))?
            }
            CatalogSource::Http(url) => {
                info!("Loading catalog from {}", url);
                Self::from_http(&Client::new(), &url).await?
            }
        };

        info!(
            "Catalog loaded: {} books, embedding dimension {}",
            catalog.len(),
            catalog.dimension()
        );
        Ok(catalog)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            ApiError::CatalogError(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let rows = rdr
            .deserialize()
            .enumerate()
            .map(|(index, record)| {
                record.map_err(|e| ApiError::CatalogError(format!("row {}: {}", index + 1, e)))
            })
            .collect::<Result<Vec<CatalogRow>>>()?;

        Self::from_rows(rows)
    }

    /// Fetch the rows from a catalog service (`GET /books`).
    pub async fn from_http(client: &Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .query(&[("query", "")])
            .send()
            .await
            .map_err(|e| ApiError::CatalogError(format!("cannot reach {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ApiError::CatalogError(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let rows: Vec<CatalogRow> = response
            .json()
            .await
            .map_err(|e| ApiError::CatalogError(format!("invalid catalog JSON: {}", e)))?;

        Self::from_rows(rows)
    }

    /// Build the catalog, parsing every embedding and enforcing a single dimension.
    pub fn from_rows(rows: Vec<CatalogRow>) -> Result<Self> {
        let mut items = Vec::with_capacity(rows.len());
        let mut dimension = None;

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let embedding = parse_embedding(&row.embedding).map_err(|e| {
                ApiError::CatalogError(format!("row {} ({:?}): {}", row_number, row.title, e))
            })?;

            match dimension {
                None => dimension = Some(embedding.len()),
                Some(expected) if expected != embedding.len() => {
                    return Err(ApiError::CatalogError(format!(
                        "row {} ({:?}): embedding has {} values, expected {}",
                        row_number,
                        row.title,
                        embedding.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }

            let download_links = [row.download_link_1, row.download_link_2]
                .map(|link| link.filter(|link| !link.trim().is_empty()));

            items.push(CatalogItem {
                title: row.title,
                author: row.author,
                description: row.description,
                genre: row.genre.filter(|g| !g.trim().is_empty()),
                embedding,
                download_links,
            });
        }

        Self::from_items(items, dimension.unwrap_or(0))
    }

    fn from_items(items: Vec<CatalogItem>, dimension: usize) -> Result<Self> {
        if items.is_empty() {
            warn!("Catalog is empty; every ranking will return no results");
        }

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.embedding.iter().copied())
            .collect();
        let embeddings = Array2::from_shape_vec((items.len(), dimension), flat)
            .map_err(|e| ApiError::CatalogError(e.to_string()))?;
        let norms = embeddings.map_axis(ndarray::Axis(1), |row| row.dot(&row).sqrt());

        Ok(Self {
            items,
            embeddings,
            norms,
        })
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Embedding dimension shared by every item; 0 for an empty catalog.
    pub fn dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Embeddings as an `items × dimension` matrix, row `i` belonging to item `i`.
    pub fn embeddings(&self) -> &Array2<f32> {
        &self.embeddings
    }

    /// L2 norm of every row of `embeddings()`.
    pub fn norms(&self) -> ArrayView1<'_, f32> {
        self.norms.view()
    }

    /// Fail fast when the model and the catalog disagree on the vector length.
    pub fn ensure_dimension(&self, model_dimension: usize) -> Result<()> {
        if !self.is_empty() && self.dimension() != model_dimension {
            return Err(ApiError::DimensionMismatch {
                expected: model_dimension,
                got: self.dimension(),
            });
        }
        Ok(())
    }

    /// Case-insensitive substring match on title or author, in catalog order.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a CatalogItem> + 'a {
        let needle = query.to_lowercase();
        self.items.iter().filter(move |item| {
            item.title.to_lowercase().contains(&needle)
                || item.author.to_lowercase().contains(&needle)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
title,author,description,genre,embedding,download_link_1,download_link_2
The Hobbit,J.R.R. Tolkien,There and back again.,Fantasy,\"[1.0, 0.0, 0.0]\",https://lib.example/hobbit,
Dune,Frank Herbert,Spice must flow.,Science Fiction,\"[0.0, 3.0, 4.0]\",,
";

    #[test]
    fn test_parse_embedding() {
        assert_eq!(parse_embedding("[0.5, -1, 2e-1]").unwrap(), vec![0.5, -1.0, 0.2]);
        assert_eq!(parse_embedding(" 1,2 ").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_parse_embedding_rejects_malformed() {
        assert!(parse_embedding("[]").is_err());
        assert!(parse_embedding("").is_err());
        assert!(parse_embedding("[0.1, abc]").is_err());
        assert!(parse_embedding("[0.1,, 0.2]").is_err());
        assert!(parse_embedding("[NaN, 0.1]").is_err());
        assert!(parse_embedding("[inf]").is_err());
    }

    #[test]
    fn test_load_csv() {
        let catalog = Catalog::from_csv_reader(CSV.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.dimension(), 3);
        assert_eq!(catalog.norms().to_vec(), vec![1.0, 5.0]);

        let hobbit = &catalog.items()[0];
        assert_eq!(hobbit.genre.as_deref(), Some("Fantasy"));
        assert_eq!(
            hobbit.download_links,
            [Some("https://lib.example/hobbit".to_string()), None]
        );
        assert_eq!(catalog.items()[1].download_links, [None, None]);
    }

    #[test]
    fn test_load_csv_file_with_legacy_column_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "book_title,author,description,embedding,Libgen_Link_1\n\
             Emma,Jane Austen,Matchmaking.,\"[0.1, 0.2]\",http://lib.example/emma\n"
        )
        .unwrap();

        let catalog = Catalog::from_csv_path(file.path()).unwrap();
        assert_eq!(catalog.items()[0].title, "Emma");
        assert_eq!(
            catalog.items()[0].download_links,
            [Some("http://lib.example/emma".to_string()), None]
        );
    }

    #[test]
    fn test_second_link_keeps_its_column() {
        let csv = "title,author,description,embedding,download_link_1,download_link_2\n\
                   A,X,d,\"[1, 0]\",,https://lib.example/only-second\n";
        let catalog = Catalog::from_csv_reader(csv.as_bytes()).unwrap();

        let item = &catalog.items()[0];
        assert_eq!(
            item.download_links,
            [None, Some("https://lib.example/only-second".to_string())]
        );

        let row = item.to_row();
        assert_eq!(row.download_link_1, None);
        assert_eq!(row.download_link_2.as_deref(), Some("https://lib.example/only-second"));
    }

    #[test]
    fn test_missing_file_is_catalog_error() {
        let result = Catalog::from_csv_path(Path::new("/nonexistent/book_embeddings.csv"));
        assert!(matches!(result, Err(ApiError::CatalogError(_))));
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let csv = "title,author,description,embedding\nA,X,d,\"[1, 0]\"\nB,Y,d,\"[1, 0, 0]\"\n";
        let error = Catalog::from_csv_reader(csv.as_bytes()).unwrap_err();

        assert!(matches!(error, ApiError::CatalogError(_)));
        assert!(error.to_string().contains("row 2"));
    }

    #[test]
    fn test_rejects_nan_row() {
        let csv = "title,author,description,embedding\nA,X,d,\"[nan, 0]\"\n";
        assert!(matches!(
            Catalog::from_csv_reader(csv.as_bytes()),
            Err(ApiError::CatalogError(_))
        ));
    }

    #[test]
    fn test_empty_catalog_is_allowed() {
        let catalog = Catalog::from_rows(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.ensure_dimension(384).is_ok());
    }

    #[test]
    fn test_ensure_dimension() {
        let catalog = Catalog::from_csv_reader(CSV.as_bytes()).unwrap();
        assert!(catalog.ensure_dimension(3).is_ok());
        assert!(matches!(
            catalog.ensure_dimension(384),
            Err(ApiError::DimensionMismatch {
                expected: 384,
                got: 3
            })
        ));
    }

    #[test]
    fn test_search_matches_title_or_author() {
        let catalog = Catalog::from_csv_reader(CSV.as_bytes()).unwrap();

        let by_author: Vec<_> = catalog.search("tolkien").map(|i| &i.title).collect();
        let by_title: Vec<_> = catalog.search("DUNE").map(|i| &i.title).collect();

        assert_eq!(by_author, vec!["The Hobbit"]);
        assert_eq!(by_title, vec!["Dune"]);
        assert_eq!(catalog.search("austen").count(), 0);
    }

    #[tokio::test]
    async fn test_load_from_catalog_service() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books"))
            .and(query_param("query", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"title": "Emma", "author": "Jane Austen", "description": "Matchmaking.",
                 "embedding": "[0.6, 0.8]"}
            ])))
            .mount(&server)
            .await;

        let catalog = Catalog::load(&format!("{}/books", server.uri())).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.items()[0].embedding, vec![0.6, 0.8]);

        let failing = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&failing)
            .await;
        let err = Catalog::load(&format!("{}/books", failing.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::CatalogError(_)));
    }

    #[test]
    fn test_source_detection() {
        assert_eq!(
            CatalogSource::parse("http://backend:5000/books"),
            CatalogSource::Http("http://backend:5000/books".to_string())
        );
        assert_eq!(
            CatalogSource::parse("book_embeddings.csv"),
            CatalogSource::File("book_embeddings.csv".to_string())
        );
    }
}
