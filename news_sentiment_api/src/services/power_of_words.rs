use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::{NewsSentimentError, Result};
use crate::filters::FeedFilters;
use crate::holders::{FeedStore, StopWords};
use crate::models::{
    BiasEntry, CoOccurrenceGraph, ExtremeSentiments, FeedPage, FeedRow, SentimentCounts,
    SentimentLabel, Source, WordCount,
};
use crate::query::Pagination;
use crate::services::aggregator::{
    group_sentiment_counts, most_common_words, sentiment_series, word_co_occurrences,
    SentimentSeries,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Source,
    Date,
}

impl FromStr for GroupBy {
    type Err = NewsSentimentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "source" | "sources" => Ok(GroupBy::Source),
            "date" | "day" => Ok(GroupBy::Date),
            other => Err(NewsSentimentError::Validation(format!(
                "Invalid group_by '{}'. Expected 'source' or 'date'",
                other
            ))),
        }
    }
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Source => "source",
            GroupBy::Date => "date",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SentimentGrouped {
    pub group_by: &'static str,
    pub labels: Vec<String>,
    pub series: SentimentSeries,
}

#[derive(Default)]
struct BiasAccumulator {
    feeds: usize,
    compound_sum: f64,
    positive: usize,
    negative: usize,
    neutral: usize,
}

/// Аналитика по новостям и их тональности
#[derive(Clone)]
pub struct PowerOfWordsService {
    store: Arc<dyn FeedStore>,
    stopwords: Arc<StopWords>,
    model_id: i64,
}

impl PowerOfWordsService {
    pub fn new(store: Arc<dyn FeedStore>, stopwords: Arc<StopWords>, model_id: i64) -> Self {
        PowerOfWordsService {
            store,
            stopwords,
            model_id,
        }
    }

    pub fn model_id(&self) -> i64 {
        self.model_id
    }

    async fn select(&self, filters: &FeedFilters) -> Result<Vec<FeedRow>> {
        let predicate = filters.generate_conditions()?;
        tracing::debug!("Условие выборки: {}", predicate);
        self.store.select(&predicate, self.model_id).await
    }

    pub async fn feed_count(&self) -> Result<usize> {
        self.store.len().await
    }

    pub async fn sources(&self) -> Result<Vec<Source>> {
        self.store.sources().await
    }

    pub async fn feeds(&self, filters: &FeedFilters, pagination: Pagination) -> Result<FeedPage> {
        let rows = self.select(filters).await?;
        let total = rows.len();
        let items = pagination.apply(rows);

        tracing::info!(
            "Отдано {} из {} новостей (страница {})",
            items.len(),
            total,
            pagination.page
        );

        Ok(FeedPage {
            total,
            page: pagination.page,
            items_per_page: pagination.items_per_page,
            items,
            filters: filters.conditions_map(),
            selected_words: filters.selected_words.clone(),
        })
    }

    pub async fn feed(&self, feed_id: i64) -> Result<FeedRow> {
        self.store
            .feed(feed_id, self.model_id)
            .await?
            .ok_or_else(NewsSentimentError::not_found)
    }

    pub async fn sentiment_grouped(
        &self,
        filters: &FeedFilters,
        group_by: GroupBy,
    ) -> Result<SentimentGrouped> {
        let rows = self.select(filters).await?;

        let (labels, series) = match group_by {
            GroupBy::Source => {
                let grouped = group_sentiment_counts(&rows, |row| row.feed.source_id);
                let result = sentiment_series(&grouped);

                let names: HashMap<i64, String> = self
                    .store
                    .sources()
                    .await?
                    .into_iter()
                    .map(|s| (s.id, s.name))
                    .collect();
                let labels = result
                    .keys
                    .iter()
                    .map(|id| names.get(id).cloned().unwrap_or_else(|| id.to_string()))
                    .collect();
                (labels, result.series)
            }
            GroupBy::Date => {
                let grouped = group_sentiment_counts(&rows, |row| row.feed.published.date());
                let result = sentiment_series(&grouped);
                let labels = result.keys.iter().map(|day| day.to_string()).collect();
                (labels, result.series)
            }
        };

        tracing::info!(
            "Серии тональности по {}: {} групп",
            group_by.as_str(),
            series.positive.len()
        );

        Ok(SentimentGrouped {
            group_by: group_by.as_str(),
            labels,
            series,
        })
    }

    pub async fn most_common_words(
        &self,
        filters: &FeedFilters,
        n: usize,
    ) -> Result<Vec<WordCount>> {
        let rows = self.select(filters).await?;
        let words = most_common_words(
            rows.iter().map(|row| row.feed.words.as_slice()),
            &self.stopwords,
            n,
        );
        tracing::info!("Частотный словарь по {} новостям: {} слов", rows.len(), words.len());
        Ok(words)
    }

    pub async fn count_sentiments(&self, filters: &FeedFilters) -> Result<SentimentCounts> {
        let rows = self.select(filters).await?;

        let mut counts = SentimentCounts::default();
        for label in rows.iter().filter_map(FeedRow::label) {
            match label {
                SentimentLabel::Positive => counts.positive += 1,
                SentimentLabel::Negative => counts.negative += 1,
                SentimentLabel::Neutral => counts.neutral += 1,
            }
            counts.total += 1;
        }

        Ok(counts)
    }

    pub async fn extreme_sentiments(
        &self,
        filters: &FeedFilters,
        n: usize,
    ) -> Result<ExtremeSentiments> {
        let mut rows: Vec<FeedRow> = self
            .select(filters)
            .await?
            .into_iter()
            .filter(|row| row.sentiment.is_some())
            .collect();

        // Стабильная сортировка: при равных оценках сначала более свежие
        rows.sort_by(|a, b| {
            let a = a.compound().unwrap_or_default();
            let b = b.compound().unwrap_or_default();
            b.total_cmp(&a)
        });

        let most_positive: Vec<FeedRow> = rows.iter().take(n).cloned().collect();
        let most_negative: Vec<FeedRow> = rows.iter().rev().take(n).cloned().collect();

        Ok(ExtremeSentiments {
            most_positive,
            most_negative,
        })
    }

    /// Тональность по источникам для каждого слова. Слово совпадает, если с
    /// него начинается хотя бы одно ключевое слово новости (без учета регистра).
    pub async fn bias_detection(&self, filters: &FeedFilters) -> Result<Vec<BiasEntry>> {
        let words: Vec<String> = filters
            .words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(NewsSentimentError::Validation(
                "Parameter 'words' is required for bias detection".to_string(),
            ));
        }

        let rows = self.select(&filters.without_words()).await?;

        let mut acc: BTreeMap<(i64, String), BiasAccumulator> = BTreeMap::new();
        for row in &rows {
            let Some(sentiment) = &row.sentiment else {
                continue;
            };
            let keywords: Vec<String> = row.feed.words.iter().map(|w| w.to_lowercase()).collect();

            for word in &words {
                if !keywords.iter().any(|k| k.starts_with(word.as_str())) {
                    continue;
                }
                let entry = acc.entry((row.feed.source_id, word.clone())).or_default();
                entry.feeds += 1;
                entry.compound_sum += sentiment.compound;
                match sentiment.label {
                    SentimentLabel::Positive => entry.positive += 1,
                    SentimentLabel::Negative => entry.negative += 1,
                    SentimentLabel::Neutral => entry.neutral += 1,
                }
            }
        }

        let names: HashMap<i64, String> = self
            .store
            .sources()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let mut entries: Vec<BiasEntry> = acc
            .into_iter()
            .map(|((source_id, word), a)| BiasEntry {
                source_id,
                source_name: names
                    .get(&source_id)
                    .cloned()
                    .unwrap_or_else(|| source_id.to_string()),
                word,
                feeds: a.feeds,
                average_compound: a.compound_sum / a.feeds as f64,
                positive: a.positive,
                negative: a.negative,
                neutral: a.neutral,
            })
            .collect();
        entries.sort_by(|a, b| a.source_name.cmp(&b.source_name).then_with(|| a.word.cmp(&b.word)));

        tracing::info!("Анализ предвзятости: {} записей по {} словам", entries.len(), words.len());
        Ok(entries)
    }

    pub async fn word_co_occurrences(
        &self,
        filters: &FeedFilters,
        n: usize,
    ) -> Result<CoOccurrenceGraph> {
        let rows = self.select(filters).await?;
        Ok(word_co_occurrences(
            rows.iter().map(|row| row.feed.words.as_slice()),
            &self.stopwords,
            n,
        ))
    }
}
