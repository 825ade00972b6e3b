use crate::{
    error::ApiError,
    models::SimilarBooksRequest,
    services::RecommendationService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/similar-books").route(web::post().to(find_similar_books)));
}

/// Find catalog books similar to the book named in the request.
///
/// Looks the book up on Google Books, summarizes its description and ranks the catalog
/// by embedding similarity to that summary.
pub async fn find_similar_books(
    request: Json<SimilarBooksRequest>,
    recommendation_service: web::Data<RecommendationService>,
) -> Result<HttpResponse, ApiError> {
    let response = recommendation_service
        .find_similar(&request.title, &request.author, request.top_k)
        .await?;

    Ok(HttpResponse::Ok().json(response))
}
