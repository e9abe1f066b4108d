use crate::{
    error::ApiError,
    identity::CurrentUser,
    models::RecommendationResponse,
    services::{CatalogService, RecommendationService},
};
use actix_web::{web, HttpResponse};

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recommendations").route(web::get().to(get_recommendations)));
}

/// Genre-bucketed recommendations built from the caller's search history and
/// genre preferences.
pub async fn get_recommendations(
    user: CurrentUser,
    recommendation_service: web::Data<RecommendationService>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    let books_by_genre = recommendation_service.recommend_for(user.id()).await?;

    Ok(HttpResponse::Ok().json(RecommendationResponse {
        books_by_genre,
        genres: catalog.list_genres().await?,
    }))
}
