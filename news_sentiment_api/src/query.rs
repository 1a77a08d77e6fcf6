use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::{NewsSentimentError, Result};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_ITEMS_PER_PAGE: usize = 20;
pub const MAX_ITEMS_PER_PAGE: usize = 100;

/// Параметры строки запроса; один ключ может встречаться несколько раз
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    values: HashMap<String, Vec<String>>,
}

impl QueryArgs {
    pub fn parse(query: &str) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        QueryArgs { values }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            values.entry(key.into()).or_default().push(value.into());
        }
        QueryArgs { values }
    }

    /// Первое непустое значение параметра
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Все значения параметра, в том числе перечисленные через запятую
    pub fn list(&self, key: &str) -> Vec<String> {
        self.values
            .get(key)
            .map(|values| {
                values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parse_opt<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                NewsSentimentError::Validation(format!("Invalid value for '{}': {}", key, raw))
            }),
        }
    }

    pub fn require<T: FromStr>(&self, key: &str) -> Result<T> {
        self.parse_opt(key)?.ok_or_else(|| {
            NewsSentimentError::Validation(format!("Missing required parameter '{}'", key))
        })
    }

    /// Количество элементов в выдаче (`n`), не меньше 1
    pub fn top_n(&self, default: usize) -> Result<usize> {
        let n = self.parse_opt::<i64>("n")?.unwrap_or(default as i64);
        Ok(n.max(1) as usize)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryArgs
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(QueryArgs::parse(parts.uri.query().unwrap_or_default()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub items_per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: DEFAULT_PAGE,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl Pagination {
    /// Номер страницы меньше 1 приводится к 1, размер страницы к диапазону 1..=100.
    /// Нечисловые значения считаются ошибкой валидации.
    pub fn from_args(args: &QueryArgs) -> Result<Self> {
        let page = args.parse_opt::<i64>("page")?.unwrap_or(DEFAULT_PAGE as i64);
        let items_per_page = args
            .parse_opt::<i64>("items_per_page")?
            .unwrap_or(DEFAULT_ITEMS_PER_PAGE as i64);

        Ok(Pagination {
            page: page.max(1) as usize,
            items_per_page: items_per_page.clamp(1, MAX_ITEMS_PER_PAGE as i64) as usize,
        })
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.items_per_page)
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.items_per_page)
            .collect()
    }
}
