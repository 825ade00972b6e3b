use crate::{models::HealthResponse, services::Catalog};
use actix_web::{get, web, HttpResponse};

#[get("/health")]
pub async fn health_check(catalog: web::Data<Catalog>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        catalog_size: catalog.len(),
    })
}
