use std::collections::BTreeMap;

use jiff::{Timestamp, civil::Date};
use serde::Serialize;

/// A movie together with its genre associations.
///
/// `genres` is keyed by association id; a `None` name means the association
/// points at a genre row that no longer exists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub year: i32,
    pub release_date: Date,
    pub runtime: i32,
    pub rating: i32,
    pub mpaa_rating: String,
    #[serde(skip_serializing)]
    pub created_at: Timestamp,
    #[serde(skip_serializing)]
    pub updated_at: Timestamp,
    pub genres: BTreeMap<i32, Option<String>>,
}

impl Movie {
    pub fn genre_names(&self) -> impl Iterator<Item = &str> {
        self.genres.values().filter_map(|name| name.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Genre {
    pub id: i32,
    pub genre_name: String,
    #[serde(skip_serializing)]
    pub created_at: Timestamp,
    #[serde(skip_serializing)]
    pub updated_at: Timestamp,
}

/// One row of `movies_genres` left-joined to `genres`.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieGenre {
    pub id: i32,
    pub movie_id: i32,
    pub genre_id: i32,
    pub genre_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AppStatus {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
}
