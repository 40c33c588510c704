use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{AppStatus, Genre, Movie},
};

pub const VERSION: &str = "1.0.0";

type Envelope<T> = Json<HashMap<&'static str, T>>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/v1/movie/{id}", get(movie))
        .route("/v1/movies", get(movies))
        .route("/v1/movies/{genre_id}", get(movies_by_genre))
        .route("/v1/genres", get(genres))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<AppStatus> {
    Json(AppStatus {
        status: "Available",
        environment: state.config.env.to_string(),
        version: VERSION,
    })
}

pub async fn movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Envelope<Movie>> {
    let id = parse_id(&id, "movie")?;
    debug!(movie_id = id, "get movie");
    Ok(wrap("movie", state.catalog.get_movie(id).await?))
}

pub async fn movies(State(state): State<Arc<AppState>>) -> AppResult<Envelope<Vec<Movie>>> {
    Ok(wrap("movies", state.catalog.list_movies(None).await?))
}

pub async fn movies_by_genre(
    State(state): State<Arc<AppState>>,
    Path(genre_id): Path<String>,
) -> AppResult<Envelope<Vec<Movie>>> {
    let genre_id = parse_id(&genre_id, "genre")?;
    Ok(wrap("movies", state.catalog.list_movies(Some(genre_id)).await?))
}

pub async fn genres(State(state): State<Arc<AppState>>) -> AppResult<Envelope<Vec<Genre>>> {
    Ok(wrap("genres", state.catalog.list_genres().await?))
}

fn parse_id(raw: &str, what: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("invalid {what} id")))
}

fn wrap<T: Serialize>(key: &'static str, value: T) -> Envelope<T> {
    Json(HashMap::from([(key, value)]))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{Config, Environment},
        executor::QueryExecutor,
        repository::MovieRepository,
        testing,
    };

    async fn app(db: sea_orm::DatabaseConnection) -> Router {
        let config = Config {
            addr: "127.0.0.1:0".parse().unwrap(),
            env: Environment::Development,
            database_url: "sqlite::memory:".to_string(),
        };
        router(Arc::new(AppState {
            config: Arc::new(config),
            catalog: MovieRepository::new(QueryExecutor::new(db)),
        }))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn seeded() -> sea_orm::DatabaseConnection {
        let db = testing::catalog_db().await;
        testing::movie_with(&db, 1, "The Shawshank Redemption", 1994, "1994-10-14", 142, 9, "R")
            .await;
        testing::movie(&db, 2, "Alpha").await;
        testing::genre(&db, 1, "Drama").await;
        testing::genre(&db, 2, "Crime").await;
        testing::link(&db, 1, 1, 1).await;
        testing::link(&db, 2, 1, 2).await;
        db
    }

    #[tokio::test]
    async fn status_reports_environment_and_version() {
        let (status, body) = get(app(testing::catalog_db().await).await, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "Available", "environment": "development", "version": "1.0.0" })
        );
    }

    #[tokio::test]
    async fn movie_is_wrapped_with_genres() {
        let (status, body) = get(app(seeded().await).await, "/v1/movie/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "movie": {
                    "id": 1,
                    "title": "The Shawshank Redemption",
                    "description": "About The Shawshank Redemption",
                    "year": 1994,
                    "release_date": "1994-10-14",
                    "runtime": 142,
                    "rating": 9,
                    "mpaa_rating": "R",
                    "genres": { "1": "Drama", "2": "Crime" }
                }
            })
        );
    }

    #[tokio::test]
    async fn missing_movie_is_404() {
        let (status, body) = get(app(seeded().await).await, "/v1/movie/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": { "message": "movie 99 not found" } }));
    }

    #[tokio::test]
    async fn malformed_ids_are_400() {
        for uri in ["/v1/movie/abc", "/v1/movie/0", "/v1/movie/-3", "/v1/movies/drama"] {
            let (status, body) = get(app(seeded().await).await, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"]["message"].as_str().unwrap().starts_with("invalid"), "{uri}");
        }
    }

    #[tokio::test]
    async fn movies_are_listed_by_title_and_filtered() {
        let app = app(seeded().await).await;

        let (status, body) = get(app.clone(), "/v1/movies").await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> =
            body["movies"].as_array().unwrap().iter().map(|m| m["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["Alpha", "The Shawshank Redemption"]);
        assert_eq!(body["movies"][0]["genres"], json!({}));

        let (status, body) = get(app, "/v1/movies/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["movies"].as_array().unwrap().len(), 1);
        assert_eq!(body["movies"][0]["id"], 1);
    }

    #[tokio::test]
    async fn genres_are_listed_by_name() {
        let (status, body) = get(app(seeded().await).await, "/v1/genres").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "genres": [
                { "id": 2, "genre_name": "Crime" },
                { "id": 1, "genre_name": "Drama" }
            ] })
        );
    }
}
