use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    error::{CatalogError, CatalogResult},
    executor::QueryExecutor,
    mapper,
    models::{Genre, Movie},
};

const MOVIE_COLUMNS: &str = "id, title, description, year, release_date, runtime, rating, \
                             mpaa_rating, created_at, updated_at";

const MOVIE_GENRES: &str = "SELECT mg.id, mg.movie_id, mg.genre_id, g.genre_name \
                            FROM movies_genres mg \
                            LEFT JOIN genres g ON g.id = mg.genre_id \
                            WHERE mg.movie_id = $1";

const ALL_GENRES: &str =
    "SELECT id, genre_name, created_at, updated_at FROM genres ORDER BY genre_name";

/// Read access to the catalog. Holds no mutable state, so one instance can
/// serve any number of concurrent requests.
#[derive(Clone, Debug)]
pub struct MovieRepository {
    executor: QueryExecutor,
}

impl MovieRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Fetches one movie with its genres. `id` is expected to be a positive
    /// integer already validated by the caller.
    pub async fn get_movie(&self, id: i32) -> CatalogResult<Movie> {
        debug!(movie_id = id, "fetching movie");

        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        let mut movie = self
            .executor
            .fetch_optional("movie_by_id", &sql, vec![id.into()], mapper::movie)
            .await?
            .ok_or(CatalogError::NotFound { id })?;

        movie.genres = self.genres_of(movie.id).await?;
        Ok(movie)
    }

    /// All movies ordered by title, optionally restricted to one genre.
    ///
    /// Genres are joined once per movie after the base cursor has been drained,
    /// so at most one pooled connection is in use at a time.
    pub async fn list_movies(&self, genre_id: Option<i32>) -> CatalogResult<Vec<Movie>> {
        debug!(genre_id = ?genre_id, "listing movies");

        let (sql, values) = movies_query(genre_id);
        let mut movies = self.executor.fetch_all("movies", &sql, values, mapper::movie).await?;

        for movie in &mut movies {
            movie.genres = self.genres_of(movie.id).await?;
        }

        debug!(genre_id = ?genre_id, count = movies.len(), "listed movies");
        Ok(movies)
    }

    pub async fn list_genres(&self) -> CatalogResult<Vec<Genre>> {
        self.executor.fetch_all("genres", ALL_GENRES, vec![], mapper::genre).await
    }

    async fn genres_of(&self, movie_id: i32) -> CatalogResult<BTreeMap<i32, Option<String>>> {
        let links = self
            .executor
            .fetch_all("movie_genres", MOVIE_GENRES, vec![movie_id.into()], mapper::movie_genre)
            .await?;

        Ok(links
            .into_iter()
            .map(|link| {
                if link.genre_name.is_none() {
                    warn!(
                        movie_id = link.movie_id,
                        genre_id = link.genre_id,
                        association_id = link.id,
                        "association references a missing genre"
                    );
                }
                (link.id, link.genre_name)
            })
            .collect())
    }
}

fn movies_query(genre_id: Option<i32>) -> (String, Vec<sea_orm::Value>) {
    match genre_id {
        Some(genre_id) => (
            format!(
                "SELECT {MOVIE_COLUMNS} FROM movies \
                 WHERE id IN (SELECT movie_id FROM movies_genres WHERE genre_id = $1) \
                 ORDER BY title"
            ),
            vec![genre_id.into()],
        ),
        None => (format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY title"), vec![]),
    }
}
