use std::sync::Arc;

use reqwest::ClientBuilder;

pub mod config;
pub mod errors;
pub mod filters;
pub mod holders;
pub mod middleware;
pub mod models;
pub mod query;
pub mod routers;
pub mod services;

pub use config::{load_config, AppConfig};
pub use errors::{NewsSentimentError, Result};
pub use filters::{FeedFilters, FeedPredicate, WordMatch, FEEDS_SCHEMA};
pub use holders::{FeedStore, JobStore, MemoryFeedStore, MemoryJobStore, StopWords};
pub use middleware::BearerAuth;
pub use models::{Feed, FeedDataset, FeedRow, FeedSentiment, SentimentLabel, Source};
pub use query::{Pagination, QueryArgs};
pub use services::aggregator::{sentiment_series, SentimentSeries};
pub use services::{
    EarthquakeService, MovieService, PowerOfWordsService, SentimentAnalyzer, SentimentWorkerPool,
};

#[derive(Clone)]
pub struct AppState {
    pub power_of_words: PowerOfWordsService,
    pub sentiment: SentimentWorkerPool,
    pub earthquakes: EarthquakeService,
    pub movies: MovieService,
    pub auth: Arc<BearerAuth>,
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    /// Собирает сервисы; хранилища передаются снаружи
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn FeedStore>,
        stopwords: Arc<StopWords>,
        jobs: Arc<dyn JobStore>,
    ) -> Result<Self> {
        let client = ClientBuilder::new().timeout(config.request_timeout()).build()?;

        Ok(AppState {
            power_of_words: PowerOfWordsService::new(store, stopwords, config.sentiment_model_id),
            sentiment: SentimentWorkerPool::new(config.workers(), jobs),
            earthquakes: EarthquakeService::new(client.clone(), config.usgs_api_host.clone()),
            movies: MovieService::new(
                client,
                config.imdb_api_url.clone(),
                config.imdb_api_key.clone(),
                config.max_concurrent(),
            ),
            auth: Arc::new(BearerAuth::new(
                &config.auth_secret_key,
                config.auth_allowed_domains.clone(),
                config.auth_allowed_users.clone(),
            )),
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        })
    }
}
