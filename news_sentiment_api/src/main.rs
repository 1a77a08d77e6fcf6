use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use news_sentiment_api::holders::spawn_job_sweeper;
use news_sentiment_api::routers::create_routes;
use news_sentiment_api::{
    load_config, AppConfig, AppState, FeedStore, JobStore, MemoryFeedStore, MemoryJobStore,
    StopWords,
};

const JOB_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// Настройка структурированного логирования
fn init_tracing(config: &AppConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "news_sentiment_api={},tower_http=info,warn",
            config.log_level
        ))
    });

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "news_sentiment_api.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let layer = match (config.log_format.as_str(), writer) {
        ("json", Some(writer)) => layer.json().with_writer(writer).boxed(),
        ("json", None) => layer.json().boxed(),
        (_, Some(writer)) => layer.with_ansi(false).with_writer(writer).boxed(),
        (_, None) => layer.boxed(),
    };

    tracing_subscriber::registry().with(env_filter).with(layer).init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let _guard = init_tracing(&config);

    let feeds = MemoryFeedStore::from_file(&config.data_path).await?;
    let store: Arc<dyn FeedStore> = Arc::new(feeds);
    let stopwords = Arc::new(StopWords::load(
        &config.stopwords_language,
        config.stopwords_path.as_deref(),
    )?);
    let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());

    spawn_job_sweeper(jobs.clone(), config.job_ttl(), JOB_SWEEP_INTERVAL);

    let state = AppState::new(&config, store, stopwords, jobs)?;
    let app = create_routes(state);

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Сервер запущен на http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
