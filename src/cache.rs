// src/cache.rs
//
// Ephemeral detail cache on Redis. Holds the per-question outcome of
// each user's most recent attempt, keyed `{user}-{company}-{quiz}`,
// with a 48-hour TTL. Not authoritative: an expired entry is simply
// gone, the ledger keeps the aggregate numbers.

use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{
    error::AppError,
    models::attempt::{CachedAttempt, QuestionDetail},
};

/// Time-to-live of a detail entry: 48 hours from the last write.
pub const DETAIL_TTL_SECS: u64 = 48 * 3600;

#[derive(Clone)]
pub struct DetailCache {
    conn: ConnectionManager,
}

/// Builds the cache key for one (user, company, quiz) triple.
pub fn detail_key(user_id: i64, company_id: i64, quiz_id: i64) -> String {
    format!("{}-{}-{}", user_id, company_id, quiz_id)
}

/// Decodes (user_id, quiz_id) back out of a matched cache key.
pub fn parse_detail_key(key: &str) -> Option<(i64, i64)> {
    let mut parts = key.split('-');
    let user_id = parts.next()?.parse().ok()?;
    let quiz_id = parts.next_back()?.parse().ok()?;
    Some((user_id, quiz_id))
}

impl DetailCache {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Overwrites the detail entry for this (user, company, quiz).
    /// Each submission replaces the previous attempt's detail; only the
    /// most recent attempt is ever retrievable.
    pub async fn put_detail(
        &self,
        user_id: i64,
        company_id: i64,
        quiz_id: i64,
        detail: &[QuestionDetail],
    ) -> Result<(), AppError> {
        let payload = serde_json::to_string(detail)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(detail_key(user_id, company_id, quiz_id), payload, DETAIL_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Scans cache keys against a glob pattern and decodes every live
    /// entry. A pattern scan, not an index; fine at the cache's expected
    /// cardinality.
    pub async fn scan_detail(&self, pattern: &str) -> Result<Vec<CachedAttempt>, AppError> {
        let mut conn = self.conn.clone();

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            // The entry may expire between SCAN and GET.
            let value: Option<String> = conn.get(&key).await?;
            let Some(value) = value else { continue };

            let Some((user_id, quiz_id)) = parse_detail_key(&key) else {
                tracing::warn!("Skipping malformed detail cache key: {}", key);
                continue;
            };

            let questions: Vec<QuestionDetail> = serde_json::from_str(&value)
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;

            results.push(CachedAttempt {
                user_id,
                quiz_id,
                questions,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_through_parse() {
        let key = detail_key(42, 7, 13);
        assert_eq!(key, "42-7-13");
        assert_eq!(parse_detail_key(&key), Some((42, 13)));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(parse_detail_key("not-a-key"), None);
        assert_eq!(parse_detail_key(""), None);
        assert_eq!(parse_detail_key("12"), None);
    }
}
