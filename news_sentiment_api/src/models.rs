use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feed {
    pub id: i64,
    pub title: String,
    pub published: NaiveDateTime,
    pub source_id: i64,
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSentiment {
    pub feed_id: i64,
    pub model_id: i64,
    pub label: SentimentLabel,
    pub value: f64,
    pub compound: f64,
}

/// Новость вместе с оценкой выбранной модели (если она есть)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedRow {
    #[serde(flatten)]
    pub feed: Feed,
    pub sentiment: Option<FeedSentiment>,
}

impl FeedRow {
    pub fn label(&self) -> Option<SentimentLabel> {
        self.sentiment.as_ref().map(|s| s.label)
    }

    pub fn compound(&self) -> Option<f64> {
        self.sentiment.as_ref().map(|s| s.compound)
    }
}

/// Формат файла с исходными данными
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedDataset {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub feeds: Vec<Feed>,
    #[serde(default)]
    pub sentiments: Vec<FeedSentiment>,
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub total: usize,
    pub page: usize,
    pub items_per_page: usize,
    pub items: Vec<FeedRow>,
    pub filters: serde_json::Map<String, serde_json::Value>,
    pub selected_words: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SentimentCounts {
    #[serde(rename = "Positive")]
    pub positive: usize,
    #[serde(rename = "Negative")]
    pub negative: usize,
    #[serde(rename = "Neutral")]
    pub neutral: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ExtremeSentiments {
    pub most_positive: Vec<FeedRow>,
    pub most_negative: Vec<FeedRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BiasEntry {
    pub source_id: i64,
    pub source_name: String,
    pub word: String,
    pub feeds: usize,
    pub average_compound: f64,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub value: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct CoOccurrenceGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub value: f64,
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub lang: String,
    pub texts: usize,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<SentimentScore>,
    pub error: Option<String>,
}

impl SentimentJob {
    pub fn pending(job_id: Uuid, lang: &str, texts: usize) -> Self {
        SentimentJob {
            job_id,
            status: JobStatus::Pending,
            lang: lang.to_string(),
            texts,
            created_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
            error: None,
        }
    }
}

/// Пользователь из проверенного токена
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
    pub issuer: String,
}
