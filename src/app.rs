use crate::{
    config::{Config, SearchBackend},
    db::{CatalogStore, InterestStore, LibraryStore, PgStore},
    error::Result,
    routes::api_routes,
    scripts::rebuild_index,
    services::{
        speech::AUDIO_SUBDIR, CatalogFilter, CatalogSearch, CatalogService, ElasticIndex,
        FullTextSearch, GenrePreferences, GoogleSpeech, IndexFailurePolicy, InterestRecorder,
        LibraryService, MemoryIndex, OpenAiRecommender, RecommendationService,
        RecommendationSource, SearchIndex, SpeechService, SpeechSynthesizer,
    },
};
use actix_cors::Cors;
use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use std::{net::TcpListener, sync::Arc};

/// The full-text index backend selected by `search_backend`.
pub async fn search_index(config: &Config) -> Result<Arc<dyn SearchIndex>> {
    match config.search_backend {
        SearchBackend::Elasticsearch => {
            let elastic = ElasticIndex::new(
                &config.search_url,
                &config.search_index,
                config.search_api_key.as_deref(),
                config.external_timeout(),
            )?;
            if let Err(e) = elastic.ensure_index().await {
                warn!("Search index not ready, searches may fail: {}", e);
            }
            Ok(Arc::new(elastic))
        }
        SearchBackend::Memory => Ok(Arc::new(MemoryIndex::new())),
    }
}

/// Every service the HTTP layer needs, wired once and shared by all workers.
#[derive(Clone)]
pub struct Services {
    pub catalog: web::Data<CatalogService>,
    pub filter: web::Data<CatalogFilter>,
    pub search: web::Data<CatalogSearch>,
    pub recorder: web::Data<InterestRecorder>,
    pub preferences: web::Data<GenrePreferences>,
    pub library: web::Data<LibraryService>,
    pub recommendations: web::Data<RecommendationService>,
    pub speech: web::Data<SpeechService>,
    pub full_text: FullTextSearch,
}

impl Services {
    /// Wire the services over one store implementing every persistence seam.
    pub fn new<S>(
        store: Arc<S>,
        index: Arc<dyn SearchIndex>,
        source: Arc<dyn RecommendationSource>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: &Config,
    ) -> Self
    where
        S: CatalogStore + InterestStore + LibraryStore + 'static,
    {
        let catalog_store: Arc<dyn CatalogStore> = store.clone();
        let interest_store: Arc<dyn InterestStore> = store.clone();
        let library_store: Arc<dyn LibraryStore> = store;

        let full_text = FullTextSearch::new(index);
        let filter = CatalogFilter::new(catalog_store.clone());
        let recorder = InterestRecorder::new(interest_store.clone());
        let speech = SpeechService::new(
            synthesizer,
            config.media_root.join(AUDIO_SUBDIR),
            &config.media_url,
            &config.default_voice,
        );

        let on_index_failure = if config.degrade_on_index_failure {
            IndexFailurePolicy::SkipSearchFilter
        } else {
            IndexFailurePolicy::Fail
        };

        Self {
            catalog: web::Data::new(CatalogService::new(
                catalog_store.clone(),
                library_store.clone(),
                full_text.clone(),
                speech.clone(),
            )),
            search: web::Data::new(CatalogSearch::new(
                recorder.clone(),
                full_text.clone(),
                filter.clone(),
                on_index_failure,
            )),
            preferences: web::Data::new(GenrePreferences::new(
                catalog_store.clone(),
                interest_store.clone(),
            )),
            library: web::Data::new(LibraryService::new(
                catalog_store.clone(),
                library_store,
                filter.clone(),
            )),
            recommendations: web::Data::new(RecommendationService::new(
                source,
                catalog_store,
                interest_store,
            )),
            filter: web::Data::new(filter),
            recorder: web::Data::new(recorder),
            speech: web::Data::new(speech),
            full_text,
        }
    }

    /// Connect the production collaborators named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.external_timeout();

        let store = Arc::new(
            PgStore::connect(&config.database_url)
                .await
                .context("Failed to connect to the database")?,
        );

        let index = search_index(config).await?;

        let source = Arc::new(OpenAiRecommender::new(
            &config.recommender_url,
            &config.recommender_api_key,
            &config.recommender_model,
            timeout,
        )?);
        let synthesizer = Arc::new(GoogleSpeech::new(
            &config.tts_url,
            &config.tts_api_key,
            &config.media_root.join(AUDIO_SUBDIR),
            timeout,
        )?);

        let services = Self::new(store.clone(), index, source, synthesizer, config);

        // The in-process index starts empty on every boot.
        if config.search_backend == SearchBackend::Memory {
            rebuild_index(store.as_ref(), &services.full_text).await?;
        }

        Ok(services)
    }

    /// Register every service as application data.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.catalog.clone())
            .app_data(self.filter.clone())
            .app_data(self.search.clone())
            .app_data(self.recorder.clone())
            .app_data(self.preferences.clone())
            .app_data(self.library.clone())
            .app_data(self.recommendations.clone())
            .app_data(self.speech.clone());
    }
}

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Connect the production services and serve them on an already bound
    /// listener.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let services = Services::from_config(&self.config).await?;
        serve(services, listener)?.await?;
        Ok(())
    }
}

/// HTTP server for `services` on `listener`. The returned server does nothing
/// until awaited or spawned.
pub fn serve(services: Services, listener: TcpListener) -> Result<Server> {
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .configure(|cfg| services.configure(cfg))
            .service(api_routes())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
