use crate::error::Result;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Which full-text index backend the search adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Elasticsearch,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,

    pub search_backend: SearchBackend,
    pub search_url: String,
    pub search_index: String,
    pub search_api_key: Option<String>,
    /// Skip the search filter instead of failing when the index is down.
    pub degrade_on_index_failure: bool,

    pub recommender_url: String,
    pub recommender_api_key: String,
    pub recommender_model: String,

    pub tts_url: String,
    pub tts_api_key: String,
    pub default_voice: String,
    pub media_root: PathBuf,
    pub media_url: String,

    pub external_timeout_secs: u64,
}

impl Config {
    /// Load configuration from defaults, an optional `config.toml` and the environment.
    ///
    /// Environment variables use the key names directly (`DATABASE_URL`, `SEARCH_URL`, ...).
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000)?
            .set_default("database_url", "postgres://localhost/serenity")?
            .set_default("search_backend", "elasticsearch")?
            .set_default("search_url", "http://localhost:9200")?
            .set_default("search_index", "books")?
            .set_default("degrade_on_index_failure", false)?
            .set_default("recommender_url", "https://api.openai.com/v1")?
            .set_default("recommender_api_key", "")?
            .set_default("recommender_model", "gpt-4o-mini")?
            .set_default("tts_url", "https://texttospeech.googleapis.com/v1")?
            .set_default("tts_api_key", "")?
            .set_default("default_voice", "en-US-Wavenet-D")?
            .set_default("media_root", "media")?
            .set_default("media_url", "/media/")?
            .set_default("external_timeout_secs", 10)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }
}
