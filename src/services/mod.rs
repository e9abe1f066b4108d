pub mod catalog;
pub mod catalog_filter;
pub mod catalog_search;
pub mod interest_recorder;
pub mod library;
pub mod preferences;
pub mod recommendation;
pub mod recommender;
pub mod search;
pub mod speech;

// Re-export public types
pub use catalog::CatalogService;
pub use catalog_filter::CatalogFilter;
pub use catalog_search::{CatalogSearch, IndexFailurePolicy};
pub use interest_recorder::InterestRecorder;
pub use library::LibraryService;
pub use preferences::GenrePreferences;
pub use recommendation::{BooksByGenre, RecommendationService};
pub use recommender::{OpenAiRecommender, RecommendationSource};
pub use search::{ElasticIndex, FullTextSearch, MemoryIndex, SearchIndex};
pub use speech::{GoogleSpeech, SpeechService, SpeechSynthesizer};
