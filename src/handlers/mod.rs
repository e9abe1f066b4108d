pub mod books;
pub mod health;
pub mod library;
pub mod preferences;
pub mod recommendations;
pub mod search;

pub use books::books_config;
pub use health::health_check;
pub use library::library_config;
pub use preferences::preferences_config;
pub use recommendations::recommendations_config;
pub use search::search_books;
