use anyhow::Result;
use config::Config;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;
pub const DEFAULT_SENTIMENT_WORKERS: usize = 4;
pub const DEFAULT_JOB_TTL_SECS: u64 = 3600;
pub const MAX_JOB_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Clone, serde::Deserialize)]
pub struct AppConfig {
    pub bind_address: String,
    pub data_path: String,
    pub stopwords_language: String,
    pub stopwords_path: Option<String>,
    pub sentiment_model_id: i64,
    #[serde(default)]
    pub auth_secret_key: String,
    #[serde(default)]
    pub auth_allowed_domains: Vec<String>,
    #[serde(default)]
    pub auth_allowed_users: Vec<String>,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    pub usgs_api_host: String,
    pub imdb_api_url: String,
    pub imdb_api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_concurrent_requests: Option<usize>,
    pub sentiment_workers: Option<usize>,
    pub job_ttl_secs: Option<u64>,
    pub log_level: String,
    pub log_format: String,
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Валидация конфигурации
    pub fn validate(&self) -> Result<()> {
        if self.auth_secret_key.trim().is_empty() {
            return Err(anyhow::anyhow!("auth_secret_key cannot be empty"));
        }

        if self.bind_address.parse::<SocketAddr>().is_err() {
            return Err(anyhow::anyhow!(
                "bind_address '{}' is not a valid socket address",
                self.bind_address
            ));
        }

        if let Some(workers) = self.sentiment_workers {
            if workers == 0 || workers > 32 {
                return Err(anyhow::anyhow!("sentiment_workers must be between 1 and 32"));
            }
        }

        if let Some(max_concurrent) = self.max_concurrent_requests {
            if max_concurrent == 0 || max_concurrent > 50 {
                return Err(anyhow::anyhow!("max_concurrent_requests must be between 1 and 50"));
            }
        }

        if let Some(ttl) = self.job_ttl_secs {
            if ttl == 0 || ttl > MAX_JOB_TTL_SECS {
                return Err(anyhow::anyhow!(
                    "job_ttl_secs must be between 1 and {}",
                    MAX_JOB_TTL_SECS
                ));
            }
        }

        if self.request_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }

        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            return Err(anyhow::anyhow!("log_format must be 'pretty' or 'json'"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent_requests.unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    pub fn workers(&self) -> usize {
        self.sentiment_workers.unwrap_or(DEFAULT_SENTIMENT_WORKERS)
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs.unwrap_or(DEFAULT_JOB_TTL_SECS))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn load_config() -> Result<AppConfig> {
    // Загружаем .env файл
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .set_default("bind_address", "0.0.0.0:3000")?
        .set_default("data_path", "data/feeds.json")?
        .set_default("stopwords_language", "english")?
        .set_default("sentiment_model_id", 1_i64)?
        .set_default(
            "usgs_api_host",
            "https://earthquake.usgs.gov/fdsnws/event/1/query?format=geojson",
        )?
        .set_default("imdb_api_url", "https://api.themoviedb.org/3")?
        .set_default("log_level", "info")?
        .set_default("log_format", "pretty")?
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("NEWS_SENTIMENT").try_parsing(true))
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    config.auth_secret_key = env::var("AUTH_SECRET_KEY")
        .map_err(|_| anyhow::anyhow!("AUTH_SECRET_KEY environment variable is required"))?;

    if let Ok(key) = env::var("IMDB_API_KEY") {
        config.imdb_api_key = Some(key);
    }
    if let Ok(domains) = env::var("AUTH_ALLOWED_DOMAINS") {
        config.auth_allowed_domains = split_list(&domains);
    }
    if let Ok(users) = env::var("AUTH_ALLOWED_USERS") {
        config.auth_allowed_users = split_list(&users);
    }
    if let Ok(origins) = env::var("CORS_ALLOWED_ORIGINS") {
        config.cors_allowed_origins = split_list(&origins);
    }

    config.validate()?;

    Ok(config)
}
