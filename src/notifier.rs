// src/notifier.rs
//
// Background sweep over the attempt ledger: users whose cooldown on a
// quiz has elapsed get a notification that they can retake it.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{error::AppError, utils::cooldown::cooldown_elapsed};

/// Latest attempt per (user, quiz) joined with the quiz's cooldown.
#[derive(Debug, sqlx::FromRow)]
struct CooldownCandidate {
    user_id: i64,
    quiz_id: i64,
    last_taken: NaiveDate,
    cooldown_in_days: i32,
}

pub struct CooldownNotifier {
    pool: PgPool,
    interval: Duration,
}

impl CooldownNotifier {
    pub fn new(pool: PgPool, interval_secs: u64) -> Self {
        Self {
            pool,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the sweep forever. The sweep is not idempotent within a day
    /// (a rerun re-notifies), so the interval should stay at one run
    /// per day; at-most-once-per-day is this loop's contract, not the
    /// sweep body's.
    pub async fn run(&self) {
        info!(
            "Starting cooldown notifier loop (interval {}s)",
            self.interval.as_secs()
        );

        loop {
            match self.run_once().await {
                Ok(count) => info!("Cooldown notifier tick completed, {} notifications", count),
                Err(err) => warn!(error = %err, "Cooldown notifier tick failed"),
            }

            sleep(self.interval).await;
        }
    }

    /// One sweep: for every (user, quiz) with at least one attempt whose
    /// cooldown has elapsed, insert a retake notification. Returns the
    /// number of notifications created.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let candidates = sqlx::query_as::<_, CooldownCandidate>(
            r#"
            SELECT
                a.user_id,
                a.quiz_id,
                MAX(a.taken_on) AS last_taken,
                q.cooldown_in_days
            FROM attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            GROUP BY a.user_id, a.quiz_id, q.cooldown_in_days
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let today = Utc::now().date_naive();
        let mut created = 0;

        for candidate in candidates {
            if !cooldown_elapsed(candidate.last_taken, today, candidate.cooldown_in_days) {
                continue;
            }

            sqlx::query("INSERT INTO notifications (user_id, message) VALUES ($1, $2)")
                .bind(candidate.user_id)
                .bind(format!(
                    "You can take the quiz {} again.",
                    candidate.quiz_id
                ))
                .execute(&self.pool)
                .await?;

            created += 1;
        }

        Ok(created)
    }
}
