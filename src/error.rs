use std::{collections::HashMap, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Failures surfaced by the catalog data-access layer.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("query `{query}` exceeded its {deadline:?} deadline")]
    Timeout { query: &'static str, deadline: Duration },

    #[error("movie {id} not found")]
    NotFound { id: i32 },

    #[error("cannot decode column `{column}`: {reason}")]
    Decode { column: &'static str, reason: String },

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        CatalogError::Store(Box::new(err))
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Store(Box::new(err))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Catalog(CatalogError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Catalog(CatalogError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Catalog(CatalogError::Decode { .. } | CatalogError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = HashMap::from([("error", HashMap::from([("message", self.to_string())]))]);
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
