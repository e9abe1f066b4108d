use crate::{
    error::ApiError,
    identity::CurrentUser,
    models::GenreSelection,
    services::{GenrePreferences, InterestRecorder},
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub fn preferences_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/interests").route(web::get().to(interest_history)))
        .service(
            web::resource("/preferences/genres")
                .route(web::get().to(genre_preferences))
                .route(web::put().to(select_genres)),
        );
}

/// Everything the caller has searched for, oldest first.
pub async fn interest_history(
    user: CurrentUser,
    recorder: web::Data<InterestRecorder>,
) -> Result<HttpResponse, ApiError> {
    let interests = recorder.history(user.id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "interests": interests })))
}

pub async fn genre_preferences(
    user: CurrentUser,
    preferences: web::Data<GenrePreferences>,
) -> Result<HttpResponse, ApiError> {
    let genres = preferences.preferences(user.id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "genres": genres })))
}

/// Replace the caller's genre preferences with the submitted selection.
pub async fn select_genres(
    user: CurrentUser,
    selection: Json<GenreSelection>,
    preferences: web::Data<GenrePreferences>,
) -> Result<HttpResponse, ApiError> {
    let genres = preferences
        .select_genres(user.id(), &selection.genres)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "genres": genres })))
}
