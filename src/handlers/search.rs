use crate::{
    error::ApiError,
    identity::CurrentUser,
    models::{GenreParam, SearchParams, SearchResponse},
    services::{CatalogSearch, CatalogService},
};
use actix_web::{get, web, HttpResponse};

/// Full-text search narrowed by genre. The query is recorded as an interest
/// of the caller.
#[get("/search")]
pub async fn search_books(
    params: web::Query<SearchParams>,
    user: CurrentUser,
    search: web::Data<CatalogSearch>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    let params = params.into_inner();
    let books = search
        .search(user.id(), &params.q, GenreParam::parse(params.genre.as_deref()))
        .await?;

    Ok(HttpResponse::Ok().json(SearchResponse {
        books,
        genres: catalog.list_genres().await?,
        selected_genre: params.genre,
        search_query: params.q,
    }))
}
