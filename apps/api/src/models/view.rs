use crate::config::ResultView;
use crate::models::RankedResult;
use serde::Serialize;

const MISSING_LINK: &str = "N/A";

/// Result table row showing the similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityRow {
    #[serde(rename = "Book Name")]
    pub book_name: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Similarity")]
    pub similarity: String,
}

/// Result table row showing download links instead of the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadLinksRow {
    #[serde(rename = "Book Name")]
    pub book_name: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Download link 1")]
    pub download_link_1: String,
    #[serde(rename = "Download link 2")]
    pub download_link_2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultRow {
    Similarity(SimilarityRow),
    DownloadLinks(DownloadLinksRow),
}

fn link_or_missing(link: Option<&str>) -> String {
    match link {
        Some(link) if link.starts_with("http") => link.to_string(),
        _ => MISSING_LINK.to_string(),
    }
}

impl ResultView {
    pub fn render(&self, result: &RankedResult<'_>) -> ResultRow {
        let item = result.item;
        match self {
            ResultView::Similarity => ResultRow::Similarity(SimilarityRow {
                book_name: item.title.clone(),
                author: item.author.clone(),
                description: item.description.clone(),
                similarity: format!("{:.4}", result.similarity),
            }),
            ResultView::DownloadLinks => ResultRow::DownloadLinks(DownloadLinksRow {
                book_name: item.title.clone(),
                author: item.author.clone(),
                description: item.description.clone(),
                download_link_1: link_or_missing(item.download_links[0].as_deref()),
                download_link_2: link_or_missing(item.download_links[1].as_deref()),
            }),
        }
    }

    pub fn render_all(&self, results: &[RankedResult<'_>]) -> Vec<ResultRow> {
        results.iter().map(|result| self.render(result)).collect()
    }
}
