//! Endpoints of the catalog service, which serves the catalog CSV as JSON.

use crate::{
    models::{CatalogQuery, CatalogRow},
    services::Catalog,
};
use actix_web::{get, web, HttpResponse};
use serde_json::json;

const RECOMMEND_LIMIT: usize = 5;

fn non_empty(query: &CatalogQuery) -> Option<&str> {
    query.query.as_deref().filter(|q| !q.is_empty())
}

/// All catalog rows, or the rows matching `query` when one is given.
#[get("/books")]
pub async fn list_books(
    params: web::Query<CatalogQuery>,
    catalog: web::Data<Catalog>,
) -> HttpResponse {
    let rows: Vec<CatalogRow> = match non_empty(&params) {
        Some(query) => catalog.search(query).map(|item| item.to_row()).collect(),
        None => catalog.items().iter().map(|item| item.to_row()).collect(),
    };

    HttpResponse::Ok().json(rows)
}

/// Up to five rows whose title or author contains `query`.
#[get("/recommend")]
pub async fn recommend_from_catalog(
    params: web::Query<CatalogQuery>,
    catalog: web::Data<Catalog>,
) -> HttpResponse {
    let Some(query) = non_empty(&params) else {
        return HttpResponse::BadRequest().json(json!({
            "error": "Missing 'query' parameter"
        }));
    };

    let rows: Vec<CatalogRow> = catalog
        .search(query)
        .take(RECOMMEND_LIMIT)
        .map(|item| item.to_row())
        .collect();

    if rows.is_empty() {
        return HttpResponse::NotFound().json(json!({
            "message": "No matching books found."
        }));
    }

    HttpResponse::Ok().json(rows)
}
