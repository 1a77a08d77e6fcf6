use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{default_message, NewsSentimentError, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub known_for_department: Option<String>,
    pub popularity: f64,
    pub profile_path: Option<String>,
    pub known_for: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieCredit {
    pub person_id: i64,
    pub movie_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    pub title: String,
    pub original_title: String,
    pub popularity: f64,
    pub overview: String,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonMovies {
    pub movies: Vec<MovieCredit>,
    pub movies_list: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonCredits {
    pub person_id: i64,
    pub characters: Vec<Value>,
    pub jobs: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommonMovie {
    pub movie_id: i64,
    pub poster_path: Option<String>,
    pub year: String,
    pub title: String,
    pub original_title: String,
    pub original_language: String,
    pub overview: String,
    pub release_date: String,
    pub popularity: f64,
    pub persons: Vec<PersonCredits>,
}

fn str_field(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

fn opt_str_field(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().map(|s| s.to_string())
}

/// Пересечение списков id фильмов, по возрастанию
pub fn intersect_movie_lists(items: &[Vec<i64>]) -> Vec<i64> {
    let mut lists = items.iter();
    let Some(first) = lists.next() else {
        return Vec::new();
    };

    let mut common: BTreeSet<i64> = first.iter().copied().collect();
    for list in lists {
        let other: BTreeSet<i64> = list.iter().copied().collect();
        common = common.intersection(&other).copied().collect();
    }
    common.into_iter().collect()
}

/// Клиент сервиса метаданных фильмов
#[derive(Clone)]
pub struct MovieService {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    max_concurrent: usize,
}

impl MovieService {
    pub fn new(
        client: Client,
        api_url: String,
        api_key: Option<String>,
        max_concurrent: usize,
    ) -> Self {
        MovieService {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            max_concurrent: max_concurrent.max(1),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                NewsSentimentError::Configuration("Movie API key is not configured".to_string())
            })
    }

    /// GET с ключом API; при ошибке берем status_message из ответа
    async fn get_json(&self, url: &str) -> Result<Value> {
        let api_key = self.api_key()?;
        tracing::debug!("URL: {}", url);

        let response = self
            .client
            .get(url)
            .query(&[("api_key", api_key)])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["status_message"]
                .as_str()
                .unwrap_or_else(|| default_message(status))
                .to_string();
            tracing::warn!("Сервис фильмов вернул ошибку: {} - {}", status, message);
            return Err(NewsSentimentError::Upstream { status, message });
        }

        Ok(response.json().await?)
    }

    pub async fn search_persons(&self, name: &str) -> Result<Vec<PersonSummary>> {
        if name.trim().is_empty() {
            return Err(NewsSentimentError::Validation(
                default_message(reqwest::StatusCode::BAD_REQUEST).to_string(),
            ));
        }

        let url = format!(
            "{}/search/person?query={}&sort_by=popularity.desc",
            self.api_url,
            urlencoding::encode(name.trim())
        );
        let json = self.get_json(&url).await?;

        let persons: Vec<PersonSummary> = json["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter(|person| person["gender"].as_i64().unwrap_or(0) > 0)
                    .map(|person| {
                        let known_for: Vec<String> = person["known_for"]
                            .as_array()
                            .map(|items| {
                                items
                                    .iter()
                                    .filter_map(|item| {
                                        let title = item["title"].as_str()?;
                                        let original =
                                            item["original_title"].as_str().unwrap_or(title);
                                        Some(if original != title {
                                            format!("{}({})", title, original)
                                        } else {
                                            title.to_string()
                                        })
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();

                        PersonSummary {
                            id: person["id"].as_i64().unwrap_or_default(),
                            name: str_field(person, "name"),
                            known_for_department: opt_str_field(person, "known_for_department"),
                            popularity: person["popularity"].as_f64().unwrap_or_default(),
                            profile_path: opt_str_field(person, "profile_path"),
                            known_for: known_for.join(", "),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!("Найдено {} персон по запросу '{}'", persons.len(), name);
        Ok(persons)
    }

    pub async fn person_movies(&self, person_id: i64) -> Result<PersonMovies> {
        let url = format!("{}/person/{}/movie_credits", self.api_url, person_id);
        let json = self.get_json(&url).await?;

        let credit = |item: &Value, character: Option<String>, job: Option<String>| MovieCredit {
            person_id,
            movie_id: item["id"].as_i64().unwrap_or_default(),
            character,
            job,
            title: str_field(item, "title"),
            original_title: str_field(item, "original_title"),
            popularity: item["popularity"].as_f64().unwrap_or_default(),
            overview: str_field(item, "overview"),
            poster_path: opt_str_field(item, "poster_path"),
        };

        let mut movies = Vec::new();
        for item in json["cast"].as_array().into_iter().flatten() {
            movies.push(credit(item, Some(str_field(item, "character")), None));
        }
        for item in json["crew"].as_array().into_iter().flatten() {
            movies.push(credit(item, None, Some(str_field(item, "job"))));
        }

        if movies.is_empty() {
            return Err(NewsSentimentError::not_found());
        }

        let movies_list = movies.iter().map(|m| m.movie_id).collect();
        Ok(PersonMovies { movies, movies_list })
    }

    pub async fn common_movies_of_persons(&self, person_ids: &[i64]) -> Result<Vec<CommonMovie>> {
        if person_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = person_ids.iter().map(|id| id.to_string()).collect();
        let url = format!(
            "{}/discover/movie?with_people={}&sort_by=popularity.desc",
            self.api_url,
            ids.join(",")
        );
        let json = self.get_json(&url).await?;
        let discovered: Vec<Value> = json["results"].as_array().cloned().unwrap_or_default();

        // Титры запрашиваем параллельно, порядок по популярности сохраняется
        let movies = stream::iter(discovered)
            .map(|movie| async move {
                let movie_id = movie["id"].as_i64().unwrap_or_default();
                let credits_url = format!("{}/movie/{}/credits", self.api_url, movie_id);

                let persons = match self.get_json(&credits_url).await {
                    Ok(credits) => person_ids
                        .iter()
                        .map(|&person_id| {
                            let matching = |key: &str| -> Vec<Value> {
                                credits[key]
                                    .as_array()
                                    .map(|entries| {
                                        entries
                                            .iter()
                                            .filter(|e| e["id"].as_i64() == Some(person_id))
                                            .cloned()
                                            .collect()
                                    })
                                    .unwrap_or_default()
                            };
                            PersonCredits {
                                person_id,
                                characters: matching("cast"),
                                jobs: matching("crew"),
                            }
                        })
                        .collect(),
                    Err(e) => {
                        tracing::warn!("Титры фильма {} недоступны: {}", movie_id, e);
                        Vec::new()
                    }
                };

                let release_date = str_field(&movie, "release_date");
                CommonMovie {
                    movie_id,
                    poster_path: opt_str_field(&movie, "backdrop_path"),
                    year: release_date.chars().take(4).collect(),
                    title: str_field(&movie, "title"),
                    original_title: str_field(&movie, "original_title"),
                    original_language: str_field(&movie, "original_language"),
                    overview: str_field(&movie, "overview"),
                    release_date,
                    popularity: movie["popularity"].as_f64().unwrap_or_default(),
                    persons,
                }
            })
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        tracing::info!("Найдено {} общих фильмов для {} персон", movies.len(), person_ids.len());
        Ok(movies)
    }
}
