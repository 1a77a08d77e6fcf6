use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::filters::FeedPredicate;
use crate::models::{Feed, FeedDataset, FeedRow, Source};

/// Хранилище новостей, источников и оценок тональности
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Все источники, отсортированные по имени
    async fn sources(&self) -> Result<Vec<Source>>;

    /// Новость по id вместе с оценкой модели `model_id`
    async fn feed(&self, id: i64, model_id: i64) -> Result<Option<FeedRow>>;

    /// Новости под предикат, от свежих к старым
    async fn select(&self, predicate: &FeedPredicate, model_id: i64) -> Result<Vec<FeedRow>>;

    async fn len(&self) -> Result<usize>;
}

#[derive(Clone, Default)]
pub struct MemoryFeedStore {
    data: Arc<RwLock<FeedDataset>>,
}

impl MemoryFeedStore {
    pub fn new(dataset: FeedDataset) -> Self {
        MemoryFeedStore {
            data: Arc::new(RwLock::new(dataset)),
        }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let dataset: FeedDataset = serde_json::from_str(&content)?;

        tracing::info!(
            "Загружено {} новостей, {} источников и {} оценок из {}",
            dataset.feeds.len(),
            dataset.sources.len(),
            dataset.sentiments.len(),
            path.display()
        );

        Ok(Self::new(dataset))
    }

    pub async fn add_feed(&self, feed: Feed) -> Result<()> {
        let mut data = self.data.write().await;
        data.feeds.push(feed);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        let mut data = self.data.write().await;
        *data = FeedDataset::default();
        Ok(())
    }
}

fn join_sentiment(data: &FeedDataset, feed: &Feed, model_id: i64) -> FeedRow {
    let sentiment = data
        .sentiments
        .iter()
        .rev()
        .find(|s| s.feed_id == feed.id && s.model_id == model_id)
        .cloned();

    FeedRow {
        feed: feed.clone(),
        sentiment,
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn sources(&self) -> Result<Vec<Source>> {
        let data = self.data.read().await;
        let mut sources = data.sources.clone();
        sources.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(sources)
    }

    async fn feed(&self, id: i64, model_id: i64) -> Result<Option<FeedRow>> {
        let data = self.data.read().await;
        Ok(data
            .feeds
            .iter()
            .find(|f| f.id == id)
            .map(|feed| join_sentiment(&data, feed, model_id)))
    }

    async fn select(&self, predicate: &FeedPredicate, model_id: i64) -> Result<Vec<FeedRow>> {
        let data = self.data.read().await;

        let mut rows: Vec<FeedRow> = data
            .feeds
            .iter()
            .filter(|feed| predicate.matches(feed))
            .map(|feed| join_sentiment(&data, feed, model_id))
            .collect();

        rows.sort_by(|a, b| {
            b.feed
                .published
                .cmp(&a.feed.published)
                .then(a.feed.id.cmp(&b.feed.id))
        });

        tracing::debug!("Выборка по условию [{}]: {} строк", predicate, rows.len());
        Ok(rows)
    }

    async fn len(&self) -> Result<usize> {
        let data = self.data.read().await;
        Ok(data.feeds.len())
    }
}
