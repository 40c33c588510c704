//! Positional row decoding. Each decoder expects the projection order of the
//! matching query in `repository`.

use std::collections::BTreeMap;

use jiff::{Timestamp, civil::Date};
use sea_orm::{DbErr, QueryResult, TryGetable};

use crate::{
    error::{CatalogError, CatalogResult},
    models::{Genre, Movie, MovieGenre},
};

/// id, title, description, year, release_date, runtime, rating, mpaa_rating,
/// created_at, updated_at
pub fn movie(row: &QueryResult) -> CatalogResult<Movie> {
    Ok(Movie {
        id: column(row, 0, "id")?,
        title: column(row, 1, "title")?,
        description: column(row, 2, "description")?,
        year: column(row, 3, "year")?,
        release_date: date(row, 4, "release_date")?,
        runtime: column(row, 5, "runtime")?,
        rating: column(row, 6, "rating")?,
        mpaa_rating: column(row, 7, "mpaa_rating")?,
        created_at: timestamp(row, 8, "created_at")?,
        updated_at: timestamp(row, 9, "updated_at")?,
        genres: BTreeMap::new(),
    })
}

/// id, genre_name, created_at, updated_at
pub fn genre(row: &QueryResult) -> CatalogResult<Genre> {
    Ok(Genre {
        id: column(row, 0, "id")?,
        genre_name: column(row, 1, "genre_name")?,
        created_at: timestamp(row, 2, "created_at")?,
        updated_at: timestamp(row, 3, "updated_at")?,
    })
}

/// association id, movie_id, genre_id, genre_name (nullable, from the left join)
pub fn movie_genre(row: &QueryResult) -> CatalogResult<MovieGenre> {
    Ok(MovieGenre {
        id: column(row, 0, "id")?,
        movie_id: column(row, 1, "movie_id")?,
        genre_id: column(row, 2, "genre_id")?,
        genre_name: column(row, 3, "genre_name")?,
    })
}

fn column<T: TryGetable>(row: &QueryResult, index: usize, name: &'static str) -> CatalogResult<T> {
    row.try_get_by_index(index).map_err(|err| CatalogError::Decode {
        column: name,
        reason: DbErr::from(err).to_string(),
    })
}

fn date(row: &QueryResult, index: usize, name: &'static str) -> CatalogResult<Date> {
    let raw: String = column(row, index, name)?;
    raw.trim()
        .parse()
        .map_err(|err: jiff::Error| CatalogError::Decode { column: name, reason: err.to_string() })
}

fn timestamp(row: &QueryResult, index: usize, name: &'static str) -> CatalogResult<Timestamp> {
    let seconds: i64 = column(row, index, name)?;
    Timestamp::from_second(seconds)
        .map_err(|err| CatalogError::Decode { column: name, reason: err.to_string() })
}
