use std::sync::Arc;

use serde_json::Value;

use quiz_core::model::{Question, Score};
use storage::keys;
use storage::repository::{KeyValueStore, StorageError};

/// Pool and counters as found in the store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PersistedProgress {
    pub pool: Vec<Question>,
    pub score: Score,
}

/// Store wrapper that never fails the session.
///
/// Every failure is logged and flips `degraded`; the caller keeps running in
/// memory. Writes are awaited one after another, so a later write for a key
/// always lands after an earlier one.
pub(crate) struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
    degraded: bool,
}

impl ProgressStore {
    pub(crate) fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            degraded: false,
        }
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Load the saved pool and counters, if a pool was ever saved.
    pub(crate) async fn load(&mut self) -> Option<PersistedProgress> {
        let raw_pool = match self.kv.load(keys::QUESTIONS).await {
            Ok(value) => value?,
            Err(err) => {
                self.mark_degraded("load", keys::QUESTIONS, &err);
                return None;
            }
        };

        let pool: Vec<Question> = match serde_json::from_value(raw_pool) {
            Ok(pool) => pool,
            Err(err) => {
                tracing::warn!(key = keys::QUESTIONS, error = %err, "ignoring undecodable saved pool");
                return None;
            }
        };
        // An invalid entry could never leave the pool.
        for (index, question) in pool.iter().enumerate() {
            if let Err(err) = question.validate() {
                tracing::warn!(key = keys::QUESTIONS, index, error = %err, "ignoring saved pool with invalid question");
                return None;
            }
        }

        let correct = self.load_count(keys::CORRECT_COUNT).await;
        let incorrect = self.load_count(keys::INCORRECT_COUNT).await;

        Some(PersistedProgress {
            pool,
            score: Score::new(correct, incorrect),
        })
    }

    async fn load_count(&mut self, key: &'static str) -> u32 {
        match self.kv.load(key).await {
            Ok(Some(value)) => decode_count(&value).unwrap_or_else(|| {
                tracing::warn!(key, %value, "ignoring undecodable saved counter");
                0
            }),
            Ok(None) => 0,
            Err(err) => {
                self.mark_degraded("load", key, &err);
                0
            }
        }
    }

    pub(crate) async fn save_pool(&mut self, pool: &[Question]) {
        match serde_json::to_value(pool) {
            Ok(value) => self.save(keys::QUESTIONS, &value).await,
            Err(err) => {
                tracing::warn!(error = %err, "could not encode question pool");
                self.degraded = true;
            }
        }
    }

    pub(crate) async fn save_score(&mut self, score: Score) {
        self.save(keys::CORRECT_COUNT, &Value::from(score.correct))
            .await;
        self.save(keys::INCORRECT_COUNT, &Value::from(score.incorrect))
            .await;
    }

    pub(crate) async fn save_progress(&mut self, pool: &[Question], score: Score) {
        self.save_pool(pool).await;
        self.save_score(score).await;
    }

    pub(crate) async fn clear(&mut self) {
        if let Err(err) = self.kv.clear().await {
            self.mark_degraded("clear", "*", &err);
        }
    }

    async fn save(&mut self, key: &'static str, value: &Value) {
        if let Err(err) = self.kv.save(key, value).await {
            self.mark_degraded("save", key, &err);
        }
    }

    pub(crate) fn mark_volatile(&mut self) {
        if !self.degraded {
            tracing::warn!("progress store is volatile, progress will not survive a restart");
        }
        self.degraded = true;
    }

    fn mark_degraded(&mut self, op: &'static str, key: &str, err: &StorageError) {
        if !self.degraded {
            tracing::warn!(op, key, error = %err, "persistence unavailable, continuing in memory");
        } else {
            tracing::debug!(op, key, error = %err, "persistence still unavailable");
        }
        self.degraded = true;
    }
}

fn decode_count(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}
