use actix_web::{web, Scope};

use crate::handlers::{
    books_config, health_check, library_config, preferences_config, recommendations_config,
    search_books,
};

/// Configure all routes for the API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health_check)
        .service(search_books)
        .configure(books_config)
        .configure(library_config)
        .configure(preferences_config)
        .configure(recommendations_config)
}
