//! Background sweep of expired and cleared token rows.
//!
//! A token row is dead once its `expired_at` has passed, or once all three
//! credential columns have been cleared by `remove_by_*`. The sweep deletes
//! both kinds. Each [`crate::DbTokenStore`] owns at most one [`GcHandle`];
//! there is no process-wide scheduler.

use crate::schema::TokenColumn;
use oauthkeep_types::{Result, token::unix_now};
use sea_orm::{
    ConnectionTrait, DatabaseConnection,
    sea_query::{Alias, Condition, Expr, Query},
};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Current unix time in the representation stored in `expired_at`.
pub(crate) fn now_secs() -> i64 {
    i64::try_from(unix_now()).unwrap_or(i64::MAX)
}

fn dead_rows(now: i64) -> Condition {
    Condition::any()
        .add(Expr::col(TokenColumn::ExpiredAt).lte(now))
        .add(
            Condition::all()
                .add(Expr::col(TokenColumn::Code).eq(""))
                .add(Expr::col(TokenColumn::Access).eq(""))
                .add(Expr::col(TokenColumn::Refresh).eq("")),
        )
}

/// Deletes every dead row in `table` as of `now`, returning how many were removed.
///
/// Rows are counted first so an idle table costs a single read.
pub(crate) async fn sweep_table<C: ConnectionTrait>(db: &C, table: &str, now: i64) -> Result<u64> {
    let backend = db.get_database_backend();

    let count = Query::select()
        .expr_as(Expr::cust("COUNT(*)"), Alias::new("dead"))
        .from(Alias::new(table))
        .cond_where(dead_rows(now))
        .to_owned();
    let dead: i64 = match db.query_one(backend.build(&count)).await? {
        Some(row) => row.try_get("", "dead")?,
        None => 0,
    };
    if dead == 0 {
        return Ok(0);
    }

    let delete = Query::delete()
        .from_table(Alias::new(table))
        .cond_where(dead_rows(now))
        .to_owned();
    Ok(db.execute(backend.build(&delete)).await?.rows_affected())
}

/// Handle to a running sweep task. Dropping it cancels the task.
pub struct GcHandle {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GcHandle {
    /// Spawns a task that sweeps `table` every `interval`, starting one
    /// interval from now.
    ///
    /// Must be called from within a tokio runtime. `interval` must be non-zero.
    #[must_use]
    pub fn spawn(db: DatabaseConnection, table: String, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(db, table, interval, cancel.clone()));
        Self {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stops the sweep and waits for the task to exit.
    ///
    /// A sweep already in progress runs to completion first. Calling `stop`
    /// more than once is harmless.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "token sweep task ended abnormally");
            }
        }
    }

    #[cfg(test)]
    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(db: DatabaseConnection, table: String, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(table = %table, ?interval, "token sweep started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                // Cancellation is only observed between ticks.
                match sweep_table(&db, &table, now_secs()).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(table = %table, removed, "swept token rows"),
                    Err(e) => tracing::warn!(table = %table, error = %e, "token sweep failed"),
                }
            }
        }
    }

    tracing::debug!(table = %table, "token sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::create_token_table;
    use crate::testutil::{count_rows, exec, mem, wait_for_rows};

    async fn insert(db: &DatabaseConnection, expired_at: i64, code: &str, access: &str, refresh: &str) {
        exec(
            db,
            &format!(
                "INSERT INTO tokens (expired_at, code, access, refresh, data) \
                 VALUES ({expired_at}, '{code}', '{access}', '{refresh}', '{{}}')"
            ),
        )
        .await;
    }

    #[tokio::test]
    async fn test_sweep_empty_table() {
        let db = mem().await;
        create_token_table(&db, "tokens").await.unwrap();
        assert_eq!(sweep_table(&db, "tokens", 1_000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_expired_and_cleared() {
        let db = mem().await;
        create_token_table(&db, "tokens").await.unwrap();
        insert(&db, 500, "", "expired", "").await;
        insert(&db, 1_000, "", "", "boundary").await; // expired_at == now
        insert(&db, 5_000, "", "", "").await; // cleared, not expired
        insert(&db, 5_000, "", "live", "").await;
        insert(&db, 5_000, "", "", "live-refresh").await;

        assert_eq!(sweep_table(&db, "tokens", 1_000).await.unwrap(), 3);
        assert_eq!(count_rows(&db, "tokens").await, 2);
    }

    #[tokio::test]
    async fn test_sweep_missing_table_errors() {
        let db = mem().await;
        assert!(sweep_table(&db, "tokens", 1_000).await.is_err());
    }

    #[tokio::test]
    async fn test_background_sweep_runs() {
        let db = mem().await;
        create_token_table(&db, "tokens").await.unwrap();
        insert(&db, 1, "", "expired", "").await;

        let gc = GcHandle::spawn(db.clone(), "tokens".into(), Duration::from_millis(20));
        wait_for_rows(&db, "tokens", 0).await;
        gc.stop().await;
        assert!(gc.is_stopped());
    }

    #[tokio::test]
    async fn test_background_sweep_survives_errors() {
        let db = mem().await;
        // Table does not exist yet: early ticks fail and are only logged.
        let gc = GcHandle::spawn(db.clone(), "tokens".into(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;

        create_token_table(&db, "tokens").await.unwrap();
        insert(&db, 1, "", "expired", "").await;
        wait_for_rows(&db, "tokens", 0).await;
        gc.stop().await;
    }

    #[tokio::test]
    async fn test_stop_halts_sweep() {
        let db = mem().await;
        create_token_table(&db, "tokens").await.unwrap();

        let gc = GcHandle::spawn(db.clone(), "tokens".into(), Duration::from_millis(20));
        gc.stop().await;
        gc.stop().await;

        insert(&db, 1, "", "expired", "").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count_rows(&db, "tokens").await, 1);
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let db = mem().await;
        create_token_table(&db, "tokens").await.unwrap();

        let gc = GcHandle::spawn(db.clone(), "tokens".into(), Duration::from_millis(20));
        let cancel = gc.cancel.clone();
        drop(gc);
        assert!(cancel.is_cancelled());
    }
}
