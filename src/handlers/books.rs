use crate::{
    error::ApiError,
    identity::CurrentUser,
    models::{
        AudioRequest, BookForm, BookId, BookListResponse, BookPatch, BrowseParams, DetailParams,
        GenreParam,
    },
    services::{CatalogFilter, CatalogService, SpeechService},
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use log::info;

pub fn books_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/genres").route(web::get().to(list_genres)))
        .service(
            web::resource("/books")
                .route(web::get().to(browse_books))
                .route(web::post().to(create_book)),
        )
        .service(
            web::resource("/books/{id}")
                .route(web::get().to(book_detail))
                .route(web::put().to(update_book))
                .route(web::patch().to(patch_book))
                .route(web::delete().to(delete_book)),
        )
        .service(web::resource("/books/{id}/audio").route(web::post().to(generate_audio)));
}

pub async fn list_genres(catalog: web::Data<CatalogService>) -> Result<HttpResponse, ApiError> {
    let genres = catalog.list_genres().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "genres": genres })))
}

/// Browse the catalog by genre, optionally only books that have an audiobook.
pub async fn browse_books(
    params: web::Query<BrowseParams>,
    catalog: web::Data<CatalogService>,
    filter: web::Data<CatalogFilter>,
) -> Result<HttpResponse, ApiError> {
    let has_audiobook = params.audiobook_only();
    let books = filter
        .list(GenreParam::parse(params.genre.as_deref()), has_audiobook)
        .await?;

    Ok(HttpResponse::Ok().json(BookListResponse {
        books,
        genres: catalog.list_genres().await?,
        selected_genre: params.genre.clone(),
        has_audiobook,
    }))
}

pub async fn book_detail(
    path: web::Path<BookId>,
    params: web::Query<DetailParams>,
    user: Option<CurrentUser>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    let detail = catalog
        .book_detail(
            path.into_inner(),
            user.map(|u| u.id()),
            params.narrator.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn create_book(
    form: Json<BookForm>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    let book = catalog.create_book(form.into_inner()).await?;
    Ok(HttpResponse::Created().json(book))
}

pub async fn update_book(
    path: web::Path<BookId>,
    form: Json<BookForm>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    let book = catalog
        .update_book(path.into_inner(), form.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(book))
}

pub async fn patch_book(
    path: web::Path<BookId>,
    patch: Json<BookPatch>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    let book = catalog
        .patch_book(path.into_inner(), patch.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(book))
}

pub async fn delete_book(
    path: web::Path<BookId>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse, ApiError> {
    catalog.delete_book(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Render the summary with the requested voice. The body is optional.
pub async fn generate_audio(
    path: web::Path<BookId>,
    request: Option<Json<AudioRequest>>,
    catalog: web::Data<CatalogService>,
    speech: web::Data<SpeechService>,
) -> Result<HttpResponse, ApiError> {
    let book = catalog.get_book(path.into_inner()).await?;
    let voice = request.and_then(|r| r.into_inner().voice);

    let audio = speech.generate_audio(&book, voice.as_deref()).await?;
    info!("Generated audio for book {} with voice {}", book.id, audio.voice);
    Ok(HttpResponse::Ok().json(audio))
}
