use actix_web::{web, Scope};

use crate::handlers::{health_check, list_books, recommend_from_catalog, recommendations_config};

/// Configure all routes for the recommendation API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health_check)
        .configure(recommendations_config)
}

/// Configure the catalog service routes, served from the root path
pub fn catalog_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(list_books)
        .service(recommend_from_catalog);
}
