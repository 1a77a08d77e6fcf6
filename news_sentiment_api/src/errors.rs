// errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsSentimentError {
    #[error("Ошибка HTTP запроса: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Ошибка парсинга JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Ошибка regex: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    IoError(#[from] std::io::Error),

    // Ошибки ниже уходят клиенту как есть
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Задача анализа завершилась с ошибкой: {0}")]
    JobFailed(String),
}

// Определяем псевдоним Result с фиксированным типом ошибки
pub type Result<T> = std::result::Result<T, NewsSentimentError>;

impl NewsSentimentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => *status,
            Self::HttpError(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound(default_message(StatusCode::NOT_FOUND).to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(default_message(StatusCode::FORBIDDEN).to_string())
    }

    /// Ошибка внешнего сервиса со стандартным текстом для его статуса
    pub fn upstream(status: StatusCode) -> Self {
        Self::Upstream {
            status,
            message: default_message(status).to_string(),
        }
    }
}

/// Стандартные тексты ответов по HTTP статусу
pub fn default_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "The request was successfully completed.",
        StatusCode::CREATED => "A new resource was successfully created.",
        StatusCode::BAD_REQUEST => "The request was invalid.",
        StatusCode::UNAUTHORIZED => "Authorization Required.",
        StatusCode::FORBIDDEN => "Forbidden. You don't have permission to this action.",
        StatusCode::NOT_FOUND => "Item not found.",
        StatusCode::METHOD_NOT_ALLOWED => "The method is not supported by the resource.",
        _ => "An internal error occurred in the server.",
    }
}

pub const PAGE_NOT_FOUND: &str = "The API resource not found.";
pub const EXPIRED_TOKEN: &str = "Token signature has expired.";
pub const INVALID_TOKEN: &str = "Token is invalid, cannot be validated.";

impl IntoResponse for NewsSentimentError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Внутренние подробности в ответ не отдаем
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR
            && !matches!(self, Self::Configuration(_))
        {
            tracing::error!("Внутренняя ошибка: {}", self);
            default_message(status).to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "status_code": status.as_u16(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
