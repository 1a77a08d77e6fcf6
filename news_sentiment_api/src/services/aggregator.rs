use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::holders::StopWords;
use crate::models::{CoOccurrenceGraph, FeedRow, GraphLink, GraphNode, SentimentLabel, WordCount};

/// Три выровненные серии: по одному значению на каждый ключ группировки
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentSeries {
    #[serde(rename = "Negative")]
    pub negative: Vec<u64>,
    #[serde(rename = "Neutral")]
    pub neutral: Vec<u64>,
    #[serde(rename = "Positive")]
    pub positive: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedSeries<K> {
    pub keys: Vec<K>,
    pub series: SentimentSeries,
}

/// Аналог `GROUP BY key, label` по строкам с оценкой.
/// Строки без оценки не учитываются.
pub fn group_sentiment_counts<K, F>(rows: &[FeedRow], key_of: F) -> Vec<(K, u64, SentimentLabel)>
where
    K: Ord + Clone,
    F: Fn(&FeedRow) -> K,
{
    let mut counts: BTreeMap<(K, SentimentLabel), u64> = BTreeMap::new();
    for row in rows {
        if let Some(label) = row.label() {
            *counts.entry((key_of(row), label)).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|((key, label), count)| (key, count, label))
        .collect()
}

/// Раскладывает сгруппированные строки `(ключ, количество, метка)` по трем
/// сериям. Отсутствующая комбинация дает 0, ключи идут по возрастанию.
/// Повтор пары (ключ, метка) перезаписывает предыдущее значение.
pub fn sentiment_series<K>(rows: &[(K, u64, SentimentLabel)]) -> GroupedSeries<K>
where
    K: Ord + Clone,
{
    let mut buckets: HashMap<SentimentLabel, BTreeMap<K, u64>> = HashMap::new();
    let mut keys: BTreeSet<K> = BTreeSet::new();

    for (key, count, label) in rows {
        buckets.entry(*label).or_default().insert(key.clone(), *count);
        keys.insert(key.clone());
    }

    let column = |label: SentimentLabel| -> Vec<u64> {
        let bucket = buckets.get(&label);
        keys.iter()
            .map(|key| bucket.and_then(|b| b.get(key)).copied().unwrap_or(0))
            .collect()
    };

    let series = SentimentSeries {
        negative: column(SentimentLabel::Negative),
        neutral: column(SentimentLabel::Neutral),
        positive: column(SentimentLabel::Positive),
    };

    GroupedSeries {
        keys: keys.into_iter().collect(),
        series,
    }
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Топ-`n` ключевых слов без стоп-слов. При равенстве частот раньше идет
/// слово, встреченное первым.
pub fn most_common_words<'a, I>(word_lists: I, stopwords: &StopWords, n: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut order: Vec<WordCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for words in word_lists {
        for word in words {
            let word = normalize(word);
            if word.is_empty() || stopwords.contains(&word) {
                continue;
            }
            match index.get(&word) {
                Some(&i) => order[i].count += 1,
                None => {
                    index.insert(word.clone(), order.len());
                    order.push(WordCount { word, count: 1 });
                }
            }
        }
    }

    // sort_by стабильная, порядок первого появления сохраняется
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(n);
    order
}

/// Граф совместной встречаемости ключевых слов: пары различных слов из
/// одной новости, топ-`n` связей по весу.
pub fn word_co_occurrences<'a, I>(
    word_lists: I,
    stopwords: &StopWords,
    n: usize,
) -> CoOccurrenceGraph
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut pairs: HashMap<(String, String), usize> = HashMap::new();
    let mut frequency: HashMap<String, usize> = HashMap::new();

    for words in word_lists {
        let unique: BTreeSet<String> = words
            .iter()
            .map(|w| normalize(w))
            .filter(|w| !w.is_empty() && !stopwords.contains(w))
            .collect();

        for word in &unique {
            *frequency.entry(word.clone()).or_insert(0) += 1;
        }

        let unique: Vec<&String> = unique.iter().collect();
        for (i, a) in unique.iter().enumerate() {
            for b in &unique[i + 1..] {
                *pairs.entry(((*a).clone(), (*b).clone())).or_insert(0) += 1;
            }
        }
    }

    let mut links: Vec<GraphLink> = pairs
        .into_iter()
        .map(|((source, target), value)| GraphLink { source, target, value })
        .collect();
    links.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });
    links.truncate(n);

    let linked: BTreeSet<&String> = links.iter().flat_map(|l| [&l.source, &l.target]).collect();
    let mut nodes: Vec<GraphNode> = linked
        .into_iter()
        .map(|word| GraphNode {
            id: word.clone(),
            count: frequency.get(word).copied().unwrap_or(0),
        })
        .collect();
    nodes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));

    CoOccurrenceGraph { nodes, links }
}
