use serde::{Deserialize, Serialize};

/// One row of the persisted catalog, as stored in the CSV file or served as JSON
/// by the catalog service. The embedding stays in its textual form here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(alias = "book_title", alias = "Title")]
    pub title: String,
    #[serde(alias = "Author")]
    pub author: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub embedding: String,
    #[serde(default, alias = "Libgen_Link_1")]
    pub download_link_1: Option<String>,
    #[serde(default, alias = "Libgen_Link_2")]
    pub download_link_2: Option<String>,
}

/// A catalog book with its parsed embedding. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: Option<String>,
    pub embedding: Vec<f32>,
    /// `download_link_1` and `download_link_2`, each kept in its own column.
    pub download_links: [Option<String>; 2],
}

impl CatalogItem {
    /// Convert back to the persisted row form.
    pub fn to_row(&self) -> CatalogRow {
        let [link_1, link_2] = self.download_links.clone();
        CatalogRow {
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            genre: self.genre.clone(),
            embedding: format_embedding(&self.embedding),
            download_link_1: link_1,
            download_link_2: link_2,
        }
    }
}

/// Render an embedding in the `[a, b, c]` textual form used by the catalog file.
pub fn format_embedding(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(", "))
}

/// A catalog item paired with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedResult<'a> {
    pub item: &'a CatalogItem,
    pub similarity: f32,
}

/// What the metadata API knows about a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDescription {
    pub description: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
}

impl BookDescription {
    /// The `"<author>-<genre>"` suffix appended to the summary, when both are known.
    pub fn author_genre_tag(&self) -> Option<String> {
        match (self.authors.first(), self.categories.first()) {
            (Some(author), Some(genre)) => Some(format!("{}-{}", author, genre)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_row_keeps_link_columns() {
        let item = CatalogItem {
            title: "The Hobbit".to_string(),
            author: "J.R.R. Tolkien".to_string(),
            description: "There and back again.".to_string(),
            genre: Some("Fantasy".to_string()),
            embedding: vec![0.5, -1.0],
            download_links: [None, Some("https://a.example/2".to_string())],
        };

        let row = item.to_row();
        assert_eq!(row.embedding, "[0.5, -1]");
        assert_eq!(row.download_link_1, None);
        assert_eq!(row.download_link_2.as_deref(), Some("https://a.example/2"));
    }

    #[test]
    fn test_author_genre_tag() {
        let mut description = BookDescription {
            description: "text".to_string(),
            authors: vec!["Ursula K. Le Guin".to_string(), "Other".to_string()],
            categories: vec!["Fiction".to_string()],
        };
        assert_eq!(
            description.author_genre_tag().as_deref(),
            Some("Ursula K. Le Guin-Fiction")
        );

        description.categories.clear();
        assert_eq!(description.author_genre_tag(), None);
    }
}
