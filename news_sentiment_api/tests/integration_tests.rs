use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use news_sentiment_api::holders::spawn_job_sweeper;
use news_sentiment_api::middleware::flatten_query_string;
use news_sentiment_api::models::{JobStatus, SentimentJob};
use news_sentiment_api::services::aggregator::{most_common_words, word_co_occurrences};
use news_sentiment_api::services::power_of_words::GroupBy;
use news_sentiment_api::*;
use uuid::Uuid;

fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn feed(id: i64, published: &str, source_id: i64, words: &[&str]) -> Feed {
    Feed {
        id,
        title: format!("Feed number {}", id),
        published: at(published),
        source_id,
        words: words.iter().map(|w| w.to_string()).collect(),
        url: None,
        body: None,
    }
}

fn sentiment(feed_id: i64, label: SentimentLabel, compound: f64) -> FeedSentiment {
    FeedSentiment {
        feed_id,
        model_id: 1,
        label,
        value: compound * 4.0,
        compound,
    }
}

fn sample_dataset() -> FeedDataset {
    FeedDataset {
        sources: vec![
            Source { id: 1, name: "Telex".to_string() },
            Source { id: 2, name: "Index".to_string() },
        ],
        feeds: vec![
            feed(1, "2024-05-01 08:00:00", 1, &["Economy", "inflation"]),
            feed(2, "2024-05-01 12:00:00", 2, &["economy", "election"]),
            feed(3, "2024-05-02 09:00:00", 1, &["flood", "river"]),
            feed(4, "2024-05-02 10:00:00", 2, &["economy", "inflation", "bank"]),
        ],
        sentiments: vec![
            sentiment(1, SentimentLabel::Positive, 0.4),
            sentiment(2, SentimentLabel::Negative, -0.3),
            sentiment(3, SentimentLabel::Negative, -0.6),
            sentiment(4, SentimentLabel::Positive, 0.2),
            FeedSentiment {
                feed_id: 4,
                model_id: 2,
                label: SentimentLabel::Neutral,
                value: 0.0,
                compound: 0.0,
            },
        ],
    }
}

fn service() -> PowerOfWordsService {
    let store: Arc<dyn FeedStore> = Arc::new(MemoryFeedStore::new(sample_dataset()));
    let stopwords = Arc::new(StopWords::builtin("english").unwrap());
    PowerOfWordsService::new(store, stopwords, 1)
}

fn day(year: i32, month: u32, date: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, date).unwrap()
}

fn matched_ids(predicate: &FeedPredicate) -> Vec<i64> {
    sample_dataset()
        .feeds
        .iter()
        .filter(|f| predicate.matches(f))
        .map(|f| f.id)
        .collect()
}

fn bound() -> FeedFilters {
    FeedFilters::default().bind(&FEEDS_SCHEMA)
}

fn config() -> AppConfig {
    AppConfig {
        bind_address: "127.0.0.1:3000".to_string(),
        data_path: "data/feeds.json".to_string(),
        stopwords_language: "english".to_string(),
        stopwords_path: None,
        sentiment_model_id: 1,
        auth_secret_key: "secret".to_string(),
        auth_allowed_domains: vec![],
        auth_allowed_users: vec![],
        cors_allowed_origins: vec![],
        usgs_api_host: "https://earthquake.example.com/query?format=geojson".to_string(),
        imdb_api_url: "https://movies.example.com/3".to_string(),
        imdb_api_key: None,
        request_timeout_secs: Some(5),
        max_concurrent_requests: Some(4),
        sentiment_workers: Some(2),
        job_ttl_secs: Some(60),
        log_level: "info".to_string(),
        log_format: "pretty".to_string(),
        log_dir: None,
    }
}

// ---- хранилища ----

#[tokio::test]
async fn test_memory_feed_store() {
    let store = MemoryFeedStore::new(sample_dataset());
    assert_eq!(store.len().await.unwrap(), 4);

    // Источники отсортированы по имени
    let sources = store.sources().await.unwrap();
    assert_eq!(sources[0].name, "Index");
    assert_eq!(sources[1].name, "Telex");

    // Оценка берется только для нужной модели
    let row = store.feed(4, 2).await.unwrap().unwrap();
    assert_eq!(row.label(), Some(SentimentLabel::Neutral));
    assert!(store.feed(1, 2).await.unwrap().unwrap().sentiment.is_none());
    assert!(store.feed(42, 1).await.unwrap().is_none());

    // Выборка идет от свежих к старым
    let rows = store
        .select(&FeedPredicate::identity(&FEEDS_SCHEMA), 1)
        .await
        .unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.feed.id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);

    store
        .add_feed(feed(5, "2024-05-03 10:00:00", 1, &["bank"]))
        .await
        .unwrap();
    assert_eq!(store.len().await.unwrap(), 5);

    store.clear().await.unwrap();
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_memory_job_store() {
    let store = MemoryJobStore::new();
    let job = SentimentJob::pending(Uuid::new_v4(), "en", 2);
    let job_id = job.job_id;

    store.put(job).await.unwrap();
    assert_eq!(store.len().await.unwrap(), 1);
    assert_eq!(store.get(&job_id).await.unwrap().unwrap().status, JobStatus::Pending);

    let evicted = store.evict(&job_id).await.unwrap();
    assert!(evicted.is_some());
    assert!(store.get(&job_id).await.unwrap().is_none());
    assert!(store.evict(&job_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_job_store_update_keeps_evicted_job_gone() {
    let store = MemoryJobStore::new();
    let mut job = SentimentJob::pending(Uuid::new_v4(), "en", 1);
    let job_id = job.job_id;

    store.put(job.clone()).await.unwrap();
    job.status = JobStatus::Running;
    assert!(store.update(job.clone()).await.unwrap());
    assert_eq!(store.get(&job_id).await.unwrap().unwrap().status, JobStatus::Running);

    store.evict(&job_id).await.unwrap();
    job.status = JobStatus::Completed;
    assert!(!store.update(job).await.unwrap());
    assert!(store.get(&job_id).await.unwrap().is_none());
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_job_store_evicts_by_age() {
    let store = MemoryJobStore::new();

    let mut old = SentimentJob::pending(Uuid::new_v4(), "en", 1);
    old.created_at = Utc::now() - chrono::Duration::hours(2);
    let fresh = SentimentJob::pending(Uuid::new_v4(), "en", 1);
    let fresh_id = fresh.job_id;

    store.put(old).await.unwrap();
    store.put(fresh).await.unwrap();

    let evicted = store
        .evict_older_than(Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(evicted, 1);
    assert!(store.get(&fresh_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_job_sweeper_removes_expired_jobs() {
    let store = MemoryJobStore::new();
    let mut old = SentimentJob::pending(Uuid::new_v4(), "en", 1);
    old.created_at = Utc::now() - chrono::Duration::hours(2);
    store.put(old).await.unwrap();

    let handle = spawn_job_sweeper(
        Arc::new(store.clone()),
        Duration::from_secs(60),
        Duration::from_millis(10),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();

    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_job_sweeper_survives_out_of_range_ttl() {
    let store = MemoryJobStore::new();
    store.put(SentimentJob::pending(Uuid::new_v4(), "en", 1)).await.unwrap();

    // Срок больше диапазона дат chrono
    let handle = spawn_job_sweeper(
        Arc::new(store.clone()),
        Duration::from_secs(10_000_000_000_000),
        Duration::from_millis(10),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!handle.is_finished());
    handle.abort();
    let err = handle.await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(store.len().await.unwrap(), 1);
}

#[test]
fn test_stopwords() {
    let english = StopWords::builtin("english").unwrap();
    assert!(english.contains("the"));
    assert!(english.contains(" The "));
    assert!(!english.contains("economy"));

    let hungarian = StopWords::builtin("hu").unwrap();
    assert!(hungarian.contains("és"));

    assert!(StopWords::builtin("klingon").is_err());

    let custom = StopWords::new("custom", ["b", "", "C"]);
    assert_eq!(custom.len(), 2);
    assert!(custom.contains("c"));
}

// ---- конфигурация ----

#[test]
fn test_config_validation() {
    assert!(config().validate().is_ok());

    let mut c = config();
    c.auth_secret_key = "  ".to_string();
    assert!(c.validate().is_err());

    let mut c = config();
    c.bind_address = "not an address".to_string();
    assert!(c.validate().is_err());

    let mut c = config();
    c.sentiment_workers = Some(0);
    assert!(c.validate().is_err());

    let mut c = config();
    c.max_concurrent_requests = Some(51);
    assert!(c.validate().is_err());

    let mut c = config();
    c.job_ttl_secs = Some(0);
    assert!(c.validate().is_err());

    let mut c = config();
    c.job_ttl_secs = Some(10_000_000_000_000);
    assert!(c.validate().is_err());

    let mut c = config();
    c.job_ttl_secs = Some(30 * 24 * 3600);
    assert!(c.validate().is_ok());

    let mut c = config();
    c.log_format = "xml".to_string();
    assert!(c.validate().is_err());
}

#[test]
fn test_config_defaults() {
    let mut c = config();
    c.request_timeout_secs = None;
    c.sentiment_workers = None;
    c.job_ttl_secs = None;
    assert_eq!(c.request_timeout(), Duration::from_secs(10));
    assert_eq!(c.workers(), 4);
    assert_eq!(c.job_ttl(), Duration::from_secs(3600));
}

// ---- фильтры ----

#[test]
fn test_empty_filter_is_identity() {
    let predicate = bound().generate_conditions().unwrap();
    assert!(predicate.is_identity());
    assert_eq!(predicate.to_string(), "TRUE");

    for f in sample_dataset().feeds {
        assert!(predicate.matches(&f));
    }
}

#[test]
fn test_unbound_filter_fails() {
    let err = FeedFilters::default().generate_conditions().unwrap_err();
    assert!(matches!(err, NewsSentimentError::Configuration(_)));
    assert!(err.to_string().contains("schema not bound"));
}

#[test]
fn test_words_filter_excludes_disjoint_feeds() {
    let mut filters = bound();
    filters.words = vec![" ECONOMY ".to_string()];
    let predicate = filters.generate_conditions().unwrap();

    let matched: Vec<i64> = sample_dataset()
        .feeds
        .iter()
        .filter(|f| predicate.matches(f))
        .map(|f| f.id)
        .collect();
    assert_eq!(matched, vec![1, 2, 4]);
}

#[test]
fn test_words_filter_contains_all_by_default() {
    let mut filters = bound();
    filters.words = vec!["economy".to_string(), "inflation".to_string()];

    let all = filters.generate_conditions().unwrap();
    let any = filters
        .clone()
        .with_word_match(WordMatch::Any)
        .generate_conditions()
        .unwrap();

    let feeds = sample_dataset().feeds;
    assert_eq!(feeds.iter().filter(|f| all.matches(f)).count(), 2);
    assert_eq!(feeds.iter().filter(|f| any.matches(f)).count(), 3);
}

#[test]
fn test_process_args() {
    let args = QueryArgs::parse(
        "start_date=2024-05-01&end_date=2024-05-01&sources=1,2\
         &words=economy&words=bank&free_text=Feed",
    );
    let mut filters = FeedFilters::for_day(day(2024, 1, 1)).bind(&FEEDS_SCHEMA);
    filters.process_args(&args).unwrap();

    assert_eq!(filters.sources, vec![1, 2]);
    assert_eq!(filters.words, vec!["economy", "bank"]);
    assert_eq!(filters.selected_words, vec!["economy", "bank", "Feed"]);

    let predicate = filters.generate_conditions().unwrap();
    let rendered = predicate.to_string();
    assert!(rendered.contains("feeds.published >= '2024-05-01 00:00:00'"));
    assert!(rendered.contains("feeds.published <= '2024-05-01 23:59:59'"));
    assert!(rendered.contains("feeds.source_id IN (1, 2)"));
    assert!(rendered.contains(" AND "));

    let map = filters.conditions_map();
    assert_eq!(map["sources"], serde_json::json!([1, 2]));
}

#[test]
fn test_free_text_matches_title_ignoring_case() {
    let args = QueryArgs::parse("free_text=FEED%20NUMBER%202");
    let mut filters = bound();
    filters.process_args(&args).unwrap();
    assert_eq!(filters.free_text, "FEED NUMBER 2");

    let predicate = filters.generate_conditions().unwrap();
    assert_eq!(predicate.to_string(), "feeds.title ILIKE '%feed number 2%'");
    assert_eq!(matched_ids(&predicate), vec![2]);
}

#[test]
fn test_empty_free_text_adds_no_condition() {
    let args = QueryArgs::parse("free_text=&sources=");
    let mut filters = bound();
    filters.process_args(&args).unwrap();
    assert!(filters.free_text.is_empty());
    assert!(filters.selected_words.is_empty());

    let predicate = filters.generate_conditions().unwrap();
    assert!(predicate.is_identity());
    assert_eq!(matched_ids(&predicate), vec![1, 2, 3, 4]);
}

#[test]
fn test_process_args_rejects_bad_sources() {
    let args = QueryArgs::parse("sources=1,abc");
    let err = bound().process_args(&args).unwrap_err();
    assert!(matches!(err, NewsSentimentError::Validation(_)));
}

#[test]
fn test_date_bounds() {
    let mut filters = FeedFilters::for_day(day(2024, 5, 2)).bind(&FEEDS_SCHEMA);
    let predicate = filters.generate_conditions().unwrap();
    let matched: Vec<i64> = sample_dataset()
        .feeds
        .iter()
        .filter(|f| predicate.matches(f))
        .map(|f| f.id)
        .collect();
    assert_eq!(matched, vec![3, 4]);

    filters.start_date = "2024-05-01T12:00:00".to_string();
    assert!(filters.generate_conditions().is_ok());

    filters.start_date = "yesterday".to_string();
    let err = filters.generate_conditions().unwrap_err();
    assert!(matches!(err, NewsSentimentError::Validation(_)));
}

// ---- агрегатор ----

#[test]
fn test_sentiment_series_fills_missing_with_zero() {
    let rows = vec![
        ("A".to_string(), 3, SentimentLabel::Positive),
        ("B".to_string(), 1, SentimentLabel::Negative),
    ];
    let result = sentiment_series(&rows);

    assert_eq!(result.keys, vec!["A", "B"]);
    assert_eq!(result.series.negative, vec![0, 1]);
    assert_eq!(result.series.neutral, vec![0, 0]);
    assert_eq!(result.series.positive, vec![3, 0]);
}

#[test]
fn test_sentiment_series_properties() {
    let rows = vec![
        (3, 2, SentimentLabel::Neutral),
        (1, 5, SentimentLabel::Positive),
        (2, 4, SentimentLabel::Negative),
        (1, 1, SentimentLabel::Negative),
    ];
    let first = sentiment_series(&rows);
    let second = sentiment_series(&rows);

    // Серии одной длины, число ключей без повторов
    assert_eq!(first.keys, vec![1, 2, 3]);
    assert_eq!(first.series.negative.len(), 3);
    assert_eq!(first.series.neutral.len(), 3);
    assert_eq!(first.series.positive.len(), 3);

    // Повторный вызов дает тот же результат
    assert_eq!(first, second);

    let empty: Vec<(i64, u64, SentimentLabel)> = Vec::new();
    let result = sentiment_series(&empty);
    assert!(result.keys.is_empty());
    assert_eq!(result.series, SentimentSeries::default());
}

#[test]
fn test_sentiment_series_duplicate_pair_last_wins() {
    let rows = vec![
        ("A", 3, SentimentLabel::Positive),
        ("A", 7, SentimentLabel::Positive),
    ];
    let result = sentiment_series(&rows);
    assert_eq!(result.series.positive, vec![7]);
}

#[test]
fn test_most_common_words_excludes_stopwords() {
    let stopwords = StopWords::new("test", ["b"]);
    let words = vec!["a".to_string(), "b".to_string(), "a".to_string()];
    let result = most_common_words([words.as_slice()], &stopwords, 10);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].word, "a");
    assert_eq!(result[0].count, 2);
}

#[test]
fn test_most_common_words_ties_keep_first_seen() {
    let stopwords = StopWords::new("test", Vec::<String>::new());
    let first = vec!["zeta".to_string(), "alpha".to_string()];
    let second = vec!["Alpha".to_string(), "beta".to_string(), "zeta".to_string()];
    let result = most_common_words([first.as_slice(), second.as_slice()], &stopwords, 2);

    let words: Vec<&str> = result.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(words, vec!["zeta", "alpha"]);
}

#[test]
fn test_word_co_occurrences() {
    let stopwords = StopWords::new("test", ["the"]);
    let lists = vec![
        vec!["economy".to_string(), "inflation".to_string(), "the".to_string()],
        vec!["inflation".to_string(), "economy".to_string()],
        vec!["bank".to_string(), "economy".to_string()],
    ];
    let graph = word_co_occurrences(lists.iter().map(|l| l.as_slice()), &stopwords, 10);

    assert_eq!(graph.links[0].source, "economy");
    assert_eq!(graph.links[0].target, "inflation");
    assert_eq!(graph.links[0].value, 2);
    assert_eq!(graph.links.len(), 2);
    assert!(graph.nodes.iter().all(|n| n.id != "the"));
    assert_eq!(graph.nodes[0].id, "economy");
    assert_eq!(graph.nodes[0].count, 3);
}

// ---- сервис аналитики ----

#[tokio::test]
async fn test_grouped_series_by_source_and_date() {
    let service = service();

    let grouped = service.sentiment_grouped(&bound(), GroupBy::Source).await.unwrap();
    assert_eq!(grouped.labels, vec!["Telex", "Index"]);
    assert_eq!(grouped.series.positive, vec![1, 1]);
    assert_eq!(grouped.series.negative, vec![1, 1]);
    assert_eq!(grouped.series.neutral, vec![0, 0]);

    let by_date = service.sentiment_grouped(&bound(), GroupBy::Date).await.unwrap();
    assert_eq!(by_date.labels, vec!["2024-05-01", "2024-05-02"]);

    assert!("weekday".parse::<GroupBy>().is_err());
}

#[tokio::test]
async fn test_feeds_page_and_counts() {
    let service = service();

    let page = service
        .feeds(&bound(), Pagination { page: 2, items_per_page: 3 })
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].feed.id, 1);

    let counts = service.count_sentiments(&bound()).await.unwrap();
    assert_eq!(counts.positive, 2);
    assert_eq!(counts.negative, 2);
    assert_eq!(counts.neutral, 0);
    assert_eq!(counts.total, 4);

    let extremes = service.extreme_sentiments(&bound(), 1).await.unwrap();
    assert_eq!(extremes.most_positive[0].feed.id, 1);
    assert_eq!(extremes.most_negative[0].feed.id, 3);

    assert!(matches!(
        service.feed(99).await.unwrap_err(),
        NewsSentimentError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_bias_detection_uses_prefix_match() {
    let service = service();

    let mut filters = bound();
    filters.words = vec!["infl".to_string()];
    let entries = service.bias_detection(&filters).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].source_name, "Index");
    assert_eq!(entries[0].feeds, 1);
    assert_eq!(entries[1].source_name, "Telex");
    assert!((entries[1].average_compound - 0.4).abs() < 1e-9);

    let err = service.bias_detection(&bound()).await.unwrap_err();
    assert!(matches!(err, NewsSentimentError::Validation(_)));
}

// ---- запросы ----

#[test]
fn test_pagination_clamping() {
    let p = Pagination::from_args(&QueryArgs::parse("page=0&items_per_page=500")).unwrap();
    assert_eq!(p, Pagination { page: 1, items_per_page: 100 });

    let p = Pagination::from_args(&QueryArgs::parse("page=-3&items_per_page=0")).unwrap();
    assert_eq!(p, Pagination { page: 1, items_per_page: 1 });

    let p = Pagination::from_args(&QueryArgs::default()).unwrap();
    assert_eq!(p, Pagination::default());
    assert_eq!(Pagination { page: 3, items_per_page: 10 }.offset(), 20);

    assert!(Pagination::from_args(&QueryArgs::parse("page=two")).is_err());
}

#[test]
fn test_flatten_query_string() {
    assert_eq!(flatten_query_string("a=1,2&a=3"), "a=1&a=2&a=3");
    assert_eq!(flatten_query_string("words=economy,,bank&n=5"), "words=economy&words=bank&n=5");
    assert_eq!(flatten_query_string(""), "");
}

#[test]
fn test_empty_job_is_rejected() {
    // Пул задач работает и вне #[tokio::test]
    let result = tokio_test::block_on(async {
        let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let pool = SentimentWorkerPool::new(1, jobs);
        pool.submit("en", Vec::new()).await
    });
    assert!(matches!(result, Err(NewsSentimentError::Validation(_))));
}

#[tokio::test]
async fn test_sentiment_job_completes() {
    let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let pool = SentimentWorkerPool::new(2, jobs.clone());

    let job = pool
        .submit("en", vec!["great news".to_string(), "terrible loss".to_string()])
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let mut finished = None;
    for _ in 0..50 {
        let current = jobs.get(&job.job_id).await.unwrap().unwrap();
        if current.status == JobStatus::Completed {
            finished = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let finished = finished.expect("job did not complete");
    assert_eq!(finished.results.len(), 2);
    assert_eq!(finished.results[0].label, SentimentLabel::Positive);
    assert_eq!(finished.results[1].label, SentimentLabel::Negative);
    assert!(finished.finished_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_evicted_job_is_not_restored_by_worker() {
    let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let pool = SentimentWorkerPool::new(1, jobs.clone());

    let texts = vec!["great recovery but terrible losses for the bank".to_string(); 20_000];
    let job = pool.submit("en", texts).await.unwrap();

    // Ждем, пока воркер возьмет задачу, затем удаляем ее
    for _ in 0..100 {
        let current = jobs.get(&job.job_id).await.unwrap().unwrap();
        if current.status != JobStatus::Pending {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(jobs.evict(&job.job_id).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(jobs.get(&job.job_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_job_evicted_before_start_is_skipped() {
    let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let pool = SentimentWorkerPool::new(1, jobs.clone());

    let job = pool.submit("en", vec!["great news".to_string()]).await.unwrap();
    jobs.evict(&job.job_id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(jobs.get(&job.job_id).await.unwrap().is_none());
}
