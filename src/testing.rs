//! Fixtures shared by the unit tests: a migrated in-memory catalog and raw
//! inserts, since the service itself has no write path.

use sea_orm::{ConnectionTrait, DatabaseConnection, Statement, Value};

pub const SLOW_COUNT: &str = "WITH RECURSIVE spin(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM spin \
                              WHERE n < 100000000) SELECT count(*) FROM spin";

const CREATED_AT: i64 = 1_700_000_000;

pub async fn catalog_db() -> DatabaseConnection {
    crate::db::connect_and_migrate("sqlite::memory:").await.expect("in-memory catalog")
}

pub async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    db.execute(Statement::from_sql_and_values(db.get_database_backend(), sql, values))
        .await
        .unwrap_or_else(|err| panic!("{sql}: {err}"));
}

pub async fn genre(db: &DatabaseConnection, id: i32, name: &str) {
    exec(
        db,
        "INSERT INTO genres (id, genre_name, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        vec![id.into(), name.into(), CREATED_AT.into(), CREATED_AT.into()],
    )
    .await;
}

pub async fn movie(db: &DatabaseConnection, id: i32, title: &str) {
    movie_with(db, id, title, 2000, "2000-01-01", 100, 5, "PG").await;
}

#[allow(clippy::too_many_arguments)]
pub async fn movie_with(
    db: &DatabaseConnection,
    id: i32,
    title: &str,
    year: i32,
    release_date: &str,
    runtime: i32,
    rating: i32,
    mpaa_rating: &str,
) {
    exec(
        db,
        "INSERT INTO movies (id, title, description, year, release_date, runtime, rating, \
         mpaa_rating, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        vec![
            id.into(),
            title.into(),
            format!("About {title}").into(),
            year.into(),
            release_date.into(),
            runtime.into(),
            rating.into(),
            mpaa_rating.into(),
            CREATED_AT.into(),
            CREATED_AT.into(),
        ],
    )
    .await;
}

pub async fn link(db: &DatabaseConnection, id: i32, movie_id: i32, genre_id: i32) {
    exec(
        db,
        "INSERT INTO movies_genres (id, movie_id, genre_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5)",
        vec![id.into(), movie_id.into(), genre_id.into(), CREATED_AT.into(), CREATED_AT.into()],
    )
    .await;
}

/// Association row pointing at a genre that does not exist. The pool holds a
/// single connection, so switching enforcement off here sticks.
pub async fn dangling_link(db: &DatabaseConnection, id: i32, movie_id: i32, genre_id: i32) {
    exec(db, "PRAGMA foreign_keys = OFF", vec![]).await;
    link(db, id, movie_id, genre_id).await;
}

/// Replaces `movies` with a view that spins before yielding rows, so every
/// movie query outlives a short deadline.
pub async fn slow_movies(db: &DatabaseConnection) {
    exec(db, "ALTER TABLE movies RENAME TO movies_data", vec![]).await;
    exec(
        db,
        &format!("CREATE VIEW movies AS SELECT * FROM movies_data WHERE ({SLOW_COUNT}) > 0"),
        vec![],
    )
    .await;
}

/// Same trick for the association table: movie lookups stay fast, every genre
/// join outlives a short deadline.
pub async fn slow_movie_genres(db: &DatabaseConnection) {
    exec(db, "ALTER TABLE movies_genres RENAME TO movies_genres_data", vec![]).await;
    exec(
        db,
        &format!(
            "CREATE VIEW movies_genres AS SELECT * FROM movies_genres_data \
             WHERE ({SLOW_COUNT}) > 0"
        ),
        vec![],
    )
    .await;
}

/// Association rows whose `genre_id` comes back as text.
pub async fn malformed_movie_genres(db: &DatabaseConnection) {
    exec(db, "ALTER TABLE movies_genres RENAME TO movies_genres_data", vec![]).await;
    exec(
        db,
        "CREATE VIEW movies_genres AS SELECT id, movie_id, 'drama' AS genre_id, created_at, \
         updated_at FROM movies_genres_data",
        vec![],
    )
    .await;
}
