use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::errors::{default_message, NewsSentimentError, Result, PAGE_NOT_FOUND};
use crate::filters::{FeedFilters, FEEDS_SCHEMA};
use crate::middleware::{flatten_query, require_bearer};
use crate::models::{
    AuthenticatedUser, BiasEntry, CoOccurrenceGraph, ExtremeSentiments, FeedPage, FeedRow,
    SentimentCounts, SentimentJob, SentimentScore, Source, WordCount,
};
use crate::query::{Pagination, QueryArgs};
use crate::services::earthquakes::EarthquakeQuery;
use crate::services::movies::{intersect_movie_lists, CommonMovie, PersonMovies, PersonSummary};
use crate::services::power_of_words::{GroupBy, SentimentGrouped};
use crate::services::SentimentAnalyzer;
use crate::AppState;

const DEFAULT_EXTREME_N: usize = 5;
const DEFAULT_COMMON_WORDS_N: usize = 20;
const DEFAULT_CO_OCCURRENCE_N: usize = 20;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub feeds: usize,
    pub sources: usize,
    pub sentiment_model_id: i64,
    pub available_endpoints: Vec<String>,
}

#[derive(Deserialize)]
pub struct AnalyzeTextRequest {
    pub lang: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct SentimentJobRequest {
    pub lang: String,
    #[serde(default)]
    pub texts: Vec<String>,
}

#[derive(Serialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: crate::models::JobStatus,
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| NewsSentimentError::Validation(e.body_text()))
}

fn path_param<T>(param: std::result::Result<Path<T>, PathRejection>) -> Result<T> {
    param
        .map(|Path(value)| value)
        .map_err(|e| NewsSentimentError::Validation(e.body_text()))
}

// Фильтр по умолчанию охватывает сегодняшний день
fn request_filters(args: &QueryArgs) -> Result<FeedFilters> {
    let mut filters = FeedFilters::for_day(Local::now().date_naive()).bind(&FEEDS_SCHEMA);
    filters.process_args(args)?;
    Ok(filters)
}

// Проверка здоровья сервиса
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "News Sentiment API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    let feeds = state.power_of_words.feed_count().await?;
    let sources = state.power_of_words.sources().await?.len();

    Ok(Json(StatusResponse {
        status: "ready".to_string(),
        feeds,
        sources,
        sentiment_model_id: state.power_of_words.model_id(),
        available_endpoints: [
            "/",
            "/status",
            "/earthquakes",
            "/power_of_words/sources",
            "/power_of_words/feeds",
            "/power_of_words/feeds/:feed_id",
            "/power_of_words/get_sentiment_grouped",
            "/power_of_words/most_common_words",
            "/power_of_words/count_sentiments",
            "/power_of_words/extreme_sentiments",
            "/power_of_words/bias_detection",
            "/power_of_words/word_co_occurences",
            "/sentiment_analyzer/analyze_text",
            "/sentiment_analyzer/jobs",
            "/sentiment_analyzer/jobs/:job_id",
            "/movie_connections/persons/search",
            "/movie_connections/person/:person_id/movies",
            "/movie_connections/common_movies",
            "/movie_connections/persons/common_movies",
        ]
        .iter()
        .map(|e| e.to_string())
        .collect(),
    }))
}

pub async fn page_not_found() -> impl IntoResponse {
    NewsSentimentError::NotFound(PAGE_NOT_FOUND.to_string())
}

// ---- /power_of_words ----

pub async fn sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>> {
    Ok(Json(state.power_of_words.sources().await?))
}

pub async fn feeds(State(state): State<AppState>, args: QueryArgs) -> Result<Json<FeedPage>> {
    let filters = request_filters(&args)?;
    let pagination = Pagination::from_args(&args)?;
    Ok(Json(state.power_of_words.feeds(&filters, pagination).await?))
}

pub async fn feed_by_id(
    State(state): State<AppState>,
    feed_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<FeedRow>> {
    let feed_id = path_param(feed_id)?;
    Ok(Json(state.power_of_words.feed(feed_id).await?))
}

pub async fn sentiment_grouped(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<SentimentGrouped>> {
    let filters = request_filters(&args)?;
    let group_by: GroupBy = args.get("group_by").unwrap_or("source").parse()?;
    Ok(Json(state.power_of_words.sentiment_grouped(&filters, group_by).await?))
}

pub async fn most_common_words(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<Vec<WordCount>>> {
    let filters = request_filters(&args)?;
    let n = args.top_n(DEFAULT_COMMON_WORDS_N)?;
    Ok(Json(state.power_of_words.most_common_words(&filters, n).await?))
}

pub async fn count_sentiments(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<SentimentCounts>> {
    let filters = request_filters(&args)?;
    Ok(Json(state.power_of_words.count_sentiments(&filters).await?))
}

pub async fn extreme_sentiments(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<ExtremeSentiments>> {
    let filters = request_filters(&args)?;
    let n = args.top_n(DEFAULT_EXTREME_N)?;
    Ok(Json(state.power_of_words.extreme_sentiments(&filters, n).await?))
}

pub async fn bias_detection(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<Vec<BiasEntry>>> {
    let filters = request_filters(&args)?;
    Ok(Json(state.power_of_words.bias_detection(&filters).await?))
}

pub async fn word_co_occurrences(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<CoOccurrenceGraph>> {
    let filters = request_filters(&args)?;
    let n = args.top_n(DEFAULT_CO_OCCURRENCE_N)?;
    Ok(Json(state.power_of_words.word_co_occurrences(&filters, n).await?))
}

// ---- /sentiment_analyzer ----

pub async fn analyze_text(
    payload: std::result::Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> Result<Json<SentimentScore>> {
    let req = json_body(payload)?;
    let analyzer = SentimentAnalyzer::for_language(&req.lang)?;
    Ok(Json(analyzer.analyze_text(&req.text)))
}

pub async fn submit_job(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: std::result::Result<Json<SentimentJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobAccepted>)> {
    let req = json_body(payload)?;
    let job = state.sentiment.submit(&req.lang, req.texts).await?;
    tracing::info!("Задача {} создана пользователем {}", job.job_id, user.email);

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: job.job_id,
            status: job.status,
        }),
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    job_id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SentimentJob>> {
    let job_id = path_param(job_id)?;
    state
        .sentiment
        .jobs()
        .get(&job_id)
        .await?
        .map(Json)
        .ok_or_else(NewsSentimentError::not_found)
}

pub async fn delete_job(
    State(state): State<AppState>,
    job_id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SentimentJob>> {
    let job_id = path_param(job_id)?;
    let job = state
        .sentiment
        .jobs()
        .evict(&job_id)
        .await?
        .ok_or_else(NewsSentimentError::not_found)?;

    tracing::info!("Задача {} удалена", job_id);
    Ok(Json(job))
}

// ---- /earthquakes ----

pub async fn earthquakes(State(state): State<AppState>, args: QueryArgs) -> Result<Json<Value>> {
    let query = EarthquakeQuery::from_args(&args)?;
    Ok(Json(state.earthquakes.fetch(&query).await?))
}

// ---- /movie_connections ----

pub async fn search_persons(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<Vec<PersonSummary>>> {
    let name = args.get("name").unwrap_or_default();
    Ok(Json(state.movies.search_persons(name).await?))
}

pub async fn person_movies(
    State(state): State<AppState>,
    person_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<PersonMovies>> {
    let person_id = path_param(person_id)?;
    Ok(Json(state.movies.person_movies(person_id).await?))
}

pub async fn common_movies(
    payload: std::result::Result<Json<Vec<Vec<i64>>>, JsonRejection>,
) -> Result<Json<Vec<i64>>> {
    let lists = json_body(payload)?;
    if lists.is_empty() {
        return Err(NewsSentimentError::Validation(
            default_message(StatusCode::BAD_REQUEST).to_string(),
        ));
    }
    Ok(Json(intersect_movie_lists(&lists)))
}

pub async fn common_movies_of_persons(
    State(state): State<AppState>,
    args: QueryArgs,
) -> Result<Json<Vec<CommonMovie>>> {
    let person_ids = args
        .list("person_ids")
        .iter()
        .map(|id| id.parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| {
            NewsSentimentError::Validation(
                "Invalid person_ids format. Expected comma-separated integers.".to_string(),
            )
        })?;

    Ok(Json(state.movies.common_movies_of_persons(&person_ids).await?))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Пропущен некорректный CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

// Создание маршрутов
pub fn create_routes(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), require_bearer);

    let power_of_words = Router::new()
        .route("/sources", get(sources))
        .route("/feeds", get(feeds))
        .route("/feeds/:feed_id", get(feed_by_id))
        .route("/get_sentiment_grouped", get(sentiment_grouped))
        .route("/most_common_words", get(most_common_words))
        .route("/count_sentiments", get(count_sentiments))
        .route("/extreme_sentiments", get(extreme_sentiments))
        .route("/bias_detection", get(bias_detection))
        .route("/word_co_occurences", get(word_co_occurrences))
        .route_layer(auth.clone());

    let sentiment_analyzer = Router::new()
        .route("/analyze_text", post(analyze_text))
        .route("/jobs", post(submit_job))
        .route("/jobs/:job_id", get(get_job).delete(delete_job))
        .route_layer(auth.clone());

    let movie_connections = Router::new()
        .route("/persons/search", get(search_persons))
        .route("/person/:person_id/movies", get(person_movies))
        .route("/common_movies", put(common_movies))
        .route("/persons/common_movies", get(common_movies_of_persons))
        .route_layer(auth);

    let cors = cors_layer(&state.cors_allowed_origins);

    Router::new()
        .route("/", get(health_check))
        .route("/status", get(get_status))
        .route("/earthquakes", get(earthquakes))
        .nest("/power_of_words", power_of_words)
        .nest("/sentiment_analyzer", sentiment_analyzer)
        .nest("/movie_connections", movie_connections)
        .fallback(page_not_found)
        .layer(middleware::from_fn(flatten_query))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
