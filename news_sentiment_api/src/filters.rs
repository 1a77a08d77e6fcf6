//! Построение фильтров по новостям из параметров запроса.
//!
//! `FeedFilters` хранит критерии в том виде, в каком их прислал клиент, и
//! превращает их в `FeedPredicate`: конъюнкцию только тех условий, которые
//! действительно заданы. Пустой фильтр пропускает все записи.

use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

use crate::errors::{NewsSentimentError, Result};
use crate::models::Feed;
use crate::query::QueryArgs;

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Описание таблицы новостей, к которой привязывается фильтр
#[derive(Debug, PartialEq, Eq)]
pub struct FeedSchema {
    pub table: &'static str,
    pub published: &'static str,
    pub words: &'static str,
    pub source_id: &'static str,
    pub title: &'static str,
}

pub static FEEDS_SCHEMA: FeedSchema = FeedSchema {
    table: "feeds",
    published: "published",
    words: "words",
    source_id: "source_id",
    title: "title",
};

/// Как список слов сопоставляется с ключевыми словами новости
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WordMatch {
    /// Новость содержит все слова
    #[default]
    All,
    /// Новость содержит хотя бы одно слово
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    PublishedFrom(NaiveDateTime),
    PublishedUntil(NaiveDateTime),
    Words { words: Vec<String>, mode: WordMatch },
    SourceIn(Vec<i64>),
    TitleContains(String),
}

impl Condition {
    pub fn matches(&self, feed: &Feed) -> bool {
        match self {
            Condition::PublishedFrom(start) => feed.published >= *start,
            Condition::PublishedUntil(end) => feed.published <= *end,
            Condition::Words { words, mode } => {
                let keywords: HashSet<String> = feed
                    .words
                    .iter()
                    .map(|w| w.trim().to_lowercase())
                    .collect();
                match mode {
                    WordMatch::All => words.iter().all(|w| keywords.contains(w)),
                    WordMatch::Any => words.iter().any(|w| keywords.contains(w)),
                }
            }
            Condition::SourceIn(sources) => sources.contains(&feed.source_id),
            Condition::TitleContains(needle) => feed.title.to_lowercase().contains(needle.as_str()),
        }
    }

    fn render(&self, schema: &FeedSchema, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = schema.table;
        match self {
            Condition::PublishedFrom(start) => {
                write!(f, "{}.{} >= '{}'", table, schema.published, start)
            }
            Condition::PublishedUntil(end) => {
                write!(f, "{}.{} <= '{}'", table, schema.published, end)
            }
            Condition::Words { words, mode } => {
                let operator = match mode {
                    WordMatch::All => "@>",
                    WordMatch::Any => "&&",
                };
                let quoted: Vec<String> = words
                    .iter()
                    .map(|w| format!("'{}'", w.replace('\'', "''")))
                    .collect();
                write!(f, "{}.{} {} ARRAY[{}]", table, schema.words, operator, quoted.join(", "))
            }
            Condition::SourceIn(sources) => {
                let ids: Vec<String> = sources.iter().map(|id| id.to_string()).collect();
                write!(f, "{}.{} IN ({})", table, schema.source_id, ids.join(", "))
            }
            Condition::TitleContains(needle) => {
                write!(f, "{}.{} ILIKE '%{}%'", table, schema.title, needle.replace('\'', "''"))
            }
        }
    }
}

/// Готовый предикат: конъюнкция условий, привязанная к схеме
#[derive(Debug, Clone)]
pub struct FeedPredicate {
    schema: &'static FeedSchema,
    conditions: Vec<Condition>,
}

impl FeedPredicate {
    /// Предикат без условий, пропускает любую запись
    pub fn identity(schema: &'static FeedSchema) -> Self {
        FeedPredicate {
            schema,
            conditions: Vec::new(),
        }
    }

    pub fn matches(&self, feed: &Feed) -> bool {
        self.conditions.iter().all(|condition| condition.matches(feed))
    }

    pub fn is_identity(&self) -> bool {
        self.conditions.is_empty()
    }

}

impl fmt::Display for FeedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return f.write_str("TRUE");
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            condition.render(self.schema, f)?;
        }
        Ok(())
    }
}

/// Критерии фильтрации, собранные из запроса. Пустое поле означает
/// отсутствие условия, а не "ничего не найдено".
#[derive(Debug, Clone, Default)]
pub struct FeedFilters {
    schema: Option<&'static FeedSchema>,
    pub start_date: String,
    pub end_date: String,
    pub words: Vec<String>,
    pub sources: Vec<i64>,
    pub free_text: String,
    pub selected_words: Vec<String>,
    pub word_match: WordMatch,
}

impl FeedFilters {
    /// Фильтр по умолчанию для запроса: весь указанный день
    pub fn for_day(day: NaiveDate) -> Self {
        FeedFilters {
            start_date: day.format("%Y-%m-%d 00:00:00").to_string(),
            end_date: day.format("%Y-%m-%d 23:59:59").to_string(),
            ..Default::default()
        }
    }

    pub fn bind(mut self, schema: &'static FeedSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_word_match(mut self, word_match: WordMatch) -> Self {
        self.word_match = word_match;
        self
    }

    /// Копия фильтра без условия по словам
    pub fn without_words(&self) -> Self {
        FeedFilters {
            words: Vec::new(),
            ..self.clone()
        }
    }

    pub fn process_args(&mut self, args: &QueryArgs) -> Result<()> {
        if let Some(start_date) = args.get("start_date") {
            self.start_date = start_date.to_string();
        }
        if let Some(end_date) = args.get("end_date") {
            self.end_date = end_date.to_string();
        }

        let sources = args.list("sources");
        if !sources.is_empty() {
            self.sources = sources
                .iter()
                .map(|id| {
                    id.parse::<i64>().map_err(|_| {
                        NewsSentimentError::Validation(format!(
                            "Invalid sources format. Expected comma-separated integers, got '{}'",
                            id
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
        }

        let words = args.list("words");
        if !words.is_empty() {
            self.selected_words.extend(words.iter().cloned());
            self.words = words;
        }

        if let Some(free_text) = args.get("free_text") {
            self.free_text = free_text.to_string();
            self.selected_words.push(self.free_text.clone());
        }

        Ok(())
    }

    pub fn generate_conditions(&self) -> Result<FeedPredicate> {
        let schema = self
            .schema
            .ok_or_else(|| NewsSentimentError::Configuration("schema not bound".to_string()))?;

        let mut conditions = Vec::new();

        if !self.start_date.trim().is_empty() {
            conditions.push(Condition::PublishedFrom(parse_bound(&self.start_date, false)?));
        }
        if !self.end_date.trim().is_empty() {
            conditions.push(Condition::PublishedUntil(parse_bound(&self.end_date, true)?));
        }

        let words: Vec<String> = self
            .words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        if !words.is_empty() {
            conditions.push(Condition::Words {
                words,
                mode: self.word_match,
            });
        }

        if !self.sources.is_empty() {
            conditions.push(Condition::SourceIn(self.sources.clone()));
        }
        if !self.free_text.is_empty() {
            conditions.push(Condition::TitleContains(self.free_text.to_lowercase()));
        }

        Ok(FeedPredicate { schema, conditions })
    }

    /// Только заданные критерии, для эха в ответе
    pub fn conditions_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if !self.start_date.is_empty() {
            map.insert("start_date".into(), json!(self.start_date));
        }
        if !self.end_date.is_empty() {
            map.insert("end_date".into(), json!(self.end_date));
        }
        if !self.words.is_empty() {
            map.insert("words".into(), json!(self.words));
        }
        if !self.sources.is_empty() {
            map.insert("sources".into(), json!(self.sources));
        }
        if !self.free_text.is_empty() {
            map.insert("free_text".into(), json!(self.free_text));
        }
        if !self.selected_words.is_empty() {
            map.insert("selected_words".into(), json!(self.selected_words));
        }
        map
    }
}

/// Граница периода; для даты без времени конец периода это 23:59:59
fn parse_bound(raw: &str, is_end: bool) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(datetime);
        }
    }

    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        NewsSentimentError::Validation(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
            raw
        ))
    })?;

    let datetime = if is_end {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    datetime.ok_or_else(|| NewsSentimentError::Validation(format!("Invalid date '{}'", raw)))
}
