use axum::{
    extract::State,
    http::{header::AUTHORIZATION, uri::PathAndQuery, Request, Uri},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::errors::{NewsSentimentError, Result, EXPIRED_TOKEN, INVALID_TOKEN};
use crate::models::AuthenticatedUser;
use crate::AppState;

const INVALID_EMAIL: &str = "Email address cannot be validated because of the wrong format.";

/// Разворачивает значения через запятую в повторяющиеся параметры:
/// `a=1,2&a=3` превращается в `a=1&a=2&a=3`
pub fn flatten_query_string(query: &str) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        for part in value.split(',').filter(|part| !part.is_empty()) {
            serializer.append_pair(&key, part);
        }
    }
    serializer.finish()
}

pub async fn flatten_query<B>(mut req: Request<B>, next: Next<B>) -> Response {
    if let Some(query) = req.uri().query() {
        let flattened = flatten_query_string(query);
        let path_and_query = if flattened.is_empty() {
            req.uri().path().to_string()
        } else {
            format!("{}?{}", req.uri().path(), flattened)
        };

        let mut parts = req.uri().clone().into_parts();
        match path_and_query.parse::<PathAndQuery>() {
            Ok(pq) => {
                parts.path_and_query = Some(pq);
                match Uri::from_parts(parts) {
                    Ok(uri) => *req.uri_mut() = uri,
                    Err(e) => tracing::warn!("Не удалось пересобрать URI: {}", e),
                }
            }
            Err(e) => tracing::warn!("Не удалось разобрать строку запроса: {}", e),
        }
    }

    next.run(req).await
}

#[derive(Debug, Deserialize)]
struct Claims {
    email: Option<String>,
    iss: Option<String>,
}

/// Проверка JWT (HS256) с обязательными полями `email` и `iss`
#[derive(Clone)]
pub struct BearerAuth {
    key: DecodingKey,
    validation: Validation,
    allowed_domains: Vec<String>,
    allowed_users: Vec<String>,
}

impl BearerAuth {
    pub fn new(secret: &str, allowed_domains: Vec<String>, allowed_users: Vec<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp проверяется, только если он есть в токене
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        BearerAuth {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            allowed_domains: allowed_domains.into_iter().map(|d| d.to_lowercase()).collect(),
            allowed_users: allowed_users.into_iter().map(|u| u.to_lowercase()).collect(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            let message = match e.kind() {
                ErrorKind::ExpiredSignature => EXPIRED_TOKEN,
                _ => INVALID_TOKEN,
            };
            NewsSentimentError::Unauthorized(message.to_string())
        })?;

        let (email, issuer) = match (data.claims.email, data.claims.iss) {
            (Some(email), Some(issuer)) => (email, issuer),
            _ => {
                return Err(NewsSentimentError::Unauthorized(
                    "Invalid token. Missing email or issuer.".to_string(),
                ))
            }
        };

        if !email.contains('@') {
            return Err(NewsSentimentError::Unauthorized(INVALID_EMAIL.to_string()));
        }

        if !self.is_allowed(&email) {
            tracing::warn!("Доступ запрещен для {}", email);
            return Err(NewsSentimentError::forbidden());
        }

        Ok(AuthenticatedUser { email, issuer })
    }

    fn is_allowed(&self, email: &str) -> bool {
        if self.allowed_users.is_empty() && self.allowed_domains.is_empty() {
            return true;
        }

        let email = email.to_lowercase();
        if self.allowed_users.contains(&email) {
            return true;
        }

        email
            .rsplit_once('@')
            .map(|(_, domain)| self.allowed_domains.iter().any(|d| d == domain))
            .unwrap_or(false)
    }
}

pub async fn require_bearer<B>(
    State(state): State<AppState>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<Response> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            NewsSentimentError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| NewsSentimentError::Unauthorized("Invalid token format".to_string()))?;

    let user = state.auth.verify(token.trim()).map_err(|e| {
        tracing::warn!("Отклонен запрос к {}: {}", req.uri().path(), e);
        e
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
