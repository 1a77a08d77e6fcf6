use reqwest::Client;
use serde_json::Value;

use crate::errors::{NewsSentimentError, Result};
use crate::query::QueryArgs;

/// Параметры запроса к сервису землетрясений
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeQuery {
    pub start_date: String,
    pub end_date: String,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub max_lat: Option<f64>,
    pub max_long: Option<f64>,
    pub min_lat: Option<f64>,
    pub min_long: Option<f64>,
}

impl EarthquakeQuery {
    pub fn from_args(args: &QueryArgs) -> Result<Self> {
        Ok(EarthquakeQuery {
            start_date: args.require("start_date")?,
            end_date: args.require("end_date")?,
            min_magnitude: args.require("min_magnitude")?,
            max_magnitude: args.require("max_magnitude")?,
            max_lat: args.parse_opt("max_lat")?,
            max_long: args.parse_opt("max_long")?,
            min_lat: args.parse_opt("min_lat")?,
            min_long: args.parse_opt("min_long")?,
        })
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("starttime", self.start_date.clone()),
            ("endtime", self.end_date.clone()),
            ("minmagnitude", self.min_magnitude.to_string()),
            ("maxmagnitude", self.max_magnitude.to_string()),
        ];

        let optional = [
            ("maxlatitude", self.max_lat),
            ("maxlongitude", self.max_long),
            ("minlatitude", self.min_lat),
            ("minlongitude", self.min_long),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                params.push((name, value.to_string()));
            }
        }

        params
    }
}

#[derive(Clone)]
pub struct EarthquakeService {
    client: Client,
    api_host: String,
}

impl EarthquakeService {
    pub fn new(client: Client, api_host: String) -> Self {
        EarthquakeService { client, api_host }
    }

    pub fn build_url(&self, query: &EarthquakeQuery) -> String {
        let params: Vec<String> = query
            .to_params()
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(&value)))
            .collect();

        let separator = if self.api_host.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.api_host, separator, params.join("&"))
    }

    pub async fn fetch(&self, query: &EarthquakeQuery) -> Result<Value> {
        if self.api_host.is_empty() {
            return Err(NewsSentimentError::Configuration(
                "Earthquake API host is not configured".to_string(),
            ));
        }

        let url = self.build_url(query);
        tracing::debug!("URL: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            tracing::error!("Сервис землетрясений вернул ошибку: {}", status);
            return Err(NewsSentimentError::upstream(status));
        }

        let json: Value = response.json().await?;
        tracing::info!(
            "Получены данные о землетрясениях за {} - {}",
            query.start_date,
            query.end_date
        );
        Ok(json)
    }
}
