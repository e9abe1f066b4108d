use crate::{
    error::ApiError,
    identity::CurrentUser,
    models::{BookId, GenreFilterParams, GenreParam},
    services::LibraryService,
};
use actix_web::{web, HttpResponse};

pub fn library_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/books/{id}/save")
            .route(web::post().to(save_book))
            .route(web::delete().to(unsave_book)),
    )
    .service(web::resource("/library").route(web::get().to(library)))
    .service(web::resource("/library/read").route(web::get().to(read_books)))
    .service(web::resource("/library/summaries").route(web::get().to(summaries)));
}

pub async fn save_book(
    path: web::Path<BookId>,
    user: CurrentUser,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let book_id = path.into_inner();
    library.save(user.id(), book_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "book_id": book_id, "saved": true })))
}

pub async fn unsave_book(
    path: web::Path<BookId>,
    user: CurrentUser,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let book_id = path.into_inner();
    library.unsave(user.id(), book_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "book_id": book_id, "saved": false })))
}

pub async fn library(
    user: CurrentUser,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(library.library(user.id()).await?))
}

pub async fn read_books(
    params: web::Query<GenreFilterParams>,
    user: CurrentUser,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let read = library
        .read_books(user.id(), GenreParam::parse(params.genre.as_deref()))
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "read_books": read,
        "selected_genre": params.genre,
    })))
}

pub async fn summaries(
    params: web::Query<GenreFilterParams>,
    _user: CurrentUser,
    library: web::Data<LibraryService>,
) -> Result<HttpResponse, ApiError> {
    let books = library
        .summaries(GenreParam::parse(params.genre.as_deref()))
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "books": books,
        "selected_genre": params.genre,
    })))
}
