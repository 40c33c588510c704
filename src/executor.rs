use std::{
    future::Future,
    time::{Duration, Instant},
};

use futures::TryStreamExt;
use sea_orm::{DatabaseConnection, QueryResult, Value};
use sqlx::{
    Sqlite,
    pool::PoolConnection,
    query::Query,
    sqlite::{SqliteArguments, SqliteConnection},
};
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};

pub const QUERY_DEADLINE: Duration = Duration::from_secs(3);

/// Virtual machine steps between deadline checks inside sqlite.
const PROGRESS_STEPS: i32 = 1_000;

/// How long past the deadline an interrupted statement gets to unwind before
/// the call is abandoned outright.
const INTERRUPT_GRACE: Duration = Duration::from_millis(250);

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Runs parameterized read statements against the pool, each bounded by a
/// deadline measured from the start of the call.
///
/// The deadline is enforced inside sqlite: a progress handler on the pooled
/// connection interrupts the statement once it passes, so an expired query
/// never keeps running on a connection that goes back to the pool.
#[derive(Clone, Debug)]
pub struct QueryExecutor {
    db: DatabaseConnection,
    deadline: Duration,
}

impl QueryExecutor {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, deadline: QUERY_DEADLINE }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Single-row lookup. `Ok(None)` when the statement matched nothing.
    pub async fn fetch_optional<T>(
        &self,
        label: &'static str,
        sql: &str,
        values: Vec<Value>,
        decode: fn(&QueryResult) -> CatalogResult<T>,
    ) -> CatalogResult<Option<T>> {
        debug!(query = label, "fetch_optional");
        let deadline = Instant::now() + self.deadline;
        let query = bind(sqlx::query(sql), values)?;
        let mut conn = self.acquire(label, deadline).await?;

        let row = self
            .guarded(label, deadline, async {
                Ok::<_, CatalogError>(query.fetch_optional(&mut *conn).await?)
            })
            .await;
        disarm(&mut conn).await?;

        let row = self.settle(label, deadline, row)?;
        row.map(|row| decode(&QueryResult::from(row))).transpose()
    }

    /// Multi-row lookup over a streaming cursor. The cursor is dropped on
    /// success, on the first decode error and when the deadline fires; the
    /// connection goes back to the pool idle in every case.
    pub async fn fetch_all<T>(
        &self,
        label: &'static str,
        sql: &str,
        values: Vec<Value>,
        decode: fn(&QueryResult) -> CatalogResult<T>,
    ) -> CatalogResult<Vec<T>> {
        debug!(query = label, "fetch_all");
        let deadline = Instant::now() + self.deadline;
        let query = bind(sqlx::query(sql), values)?;
        let mut conn = self.acquire(label, deadline).await?;

        let out = self
            .guarded(label, deadline, async {
                let mut rows = query.fetch(&mut *conn);
                let mut out = Vec::new();
                while let Some(row) = rows.try_next().await? {
                    out.push(decode(&QueryResult::from(row))?);
                }
                Ok::<_, CatalogError>(out)
            })
            .await;
        disarm(&mut conn).await?;

        let out = self.settle(label, deadline, out)?;
        debug!(query = label, rows = out.len(), "fetch_all done");
        Ok(out)
    }

    /// Checks a connection out of the pool and arms the deadline on it.
    async fn acquire(
        &self,
        label: &'static str,
        deadline: Instant,
    ) -> CatalogResult<PoolConnection<Sqlite>> {
        let pool = self.db.get_sqlite_connection_pool();
        let mut conn = match tokio::time::timeout_at(deadline.into(), pool.acquire()).await {
            Ok(conn) => conn?,
            Err(_) => return Err(self.timeout(label)),
        };

        conn.lock_handle()
            .await?
            .set_progress_handler(PROGRESS_STEPS, move || Instant::now() < deadline);
        Ok(conn)
    }

    /// Backstop for waits sqlite cannot interrupt.
    async fn guarded<T>(
        &self,
        label: &'static str,
        deadline: Instant,
        fut: impl Future<Output = CatalogResult<T>>,
    ) -> CatalogResult<T> {
        let cutoff = deadline + INTERRUPT_GRACE;
        match tokio::time::timeout_at(cutoff.into(), fut).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout(label)),
        }
    }

    /// A store failure raised after the deadline is the interrupt firing.
    fn settle<T>(
        &self,
        label: &'static str,
        deadline: Instant,
        result: CatalogResult<T>,
    ) -> CatalogResult<T> {
        match result {
            Err(CatalogError::Store(_)) if Instant::now() >= deadline => Err(self.timeout(label)),
            other => other,
        }
    }

    fn timeout(&self, label: &'static str) -> CatalogError {
        warn!(query = label, deadline = ?self.deadline, "query deadline exceeded");
        CatalogError::Timeout { query: label, deadline: self.deadline }
    }
}

async fn disarm(conn: &mut SqliteConnection) -> CatalogResult<()> {
    conn.lock_handle().await?.remove_progress_handler();
    Ok(())
}

fn bind<'q>(mut query: SqliteQuery<'q>, values: Vec<Value>) -> CatalogResult<SqliteQuery<'q>> {
    for value in values {
        query = match value {
            Value::Int(v) => query.bind(v),
            Value::BigInt(v) => query.bind(v),
            Value::String(v) => query.bind(v.map(|s| *s)),
            other => {
                return Err(CatalogError::Store(format!("unsupported parameter {other:?}").into()));
            },
        };
    }
    Ok(query)
}
