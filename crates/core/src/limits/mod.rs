//! Token bucket admission control for per-indexer query quotas.
//!
//! Indexers without a configured quota are unlimited. The dispatcher
//! consults [`QueryLimiter::at_query_limit`] before every fetch; a
//! `true` answer means the indexer is skipped for this search.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::config::IndexerConfig;
use crate::indexers::IndexerDefinition;

/// Quota check consulted by the dispatcher before each indexer fetch.
#[async_trait]
pub trait QueryLimiter: Send + Sync {
    /// Returns true if the indexer has exhausted its quota.
    ///
    /// A `false` answer reserves one query against the quota.
    async fn at_query_limit(&self, definition: &IndexerDefinition) -> bool;
}

/// Quota status for an indexer.
#[derive(Debug, Clone)]
pub struct QueryLimitStatus {
    pub queries_per_minute: u32,
    pub tokens_available: f32,
    pub next_available_in_ms: Option<u64>,
}

/// Token bucket for a single indexer.
///
/// Tokens are added at a constant rate and consumed when queries are
/// dispatched. An empty bucket means the indexer sits out until it refills.
pub struct TokenBucket {
    /// Max tokens (= queries per minute).
    capacity: f32,
    /// Current available tokens.
    tokens: f32,
    /// Tokens added per second.
    refill_rate: f32,
    /// Last refill time.
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a new token bucket with the given quota.
    ///
    /// The bucket starts full, allowing immediate queries up to the capacity.
    pub fn new(queries_per_minute: u32) -> Self {
        let capacity = queries_per_minute as f32;
        Self {
            capacity,
            tokens: capacity, // Start full
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Try to acquire a token.
    ///
    /// Returns `Ok(())` if a token was acquired successfully.
    /// Returns `Err(wait_duration)` if over quota, with the duration to wait.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            // Calculate wait time until 1 token available
            let tokens_needed = 1.0 - self.tokens;
            let wait_secs = tokens_needed / self.refill_rate;
            Err(Duration::from_secs_f32(wait_secs))
        }
    }

    /// Get the current quota status.
    pub fn status(&mut self) -> QueryLimitStatus {
        self.refill();
        QueryLimitStatus {
            queries_per_minute: self.capacity as u32,
            tokens_available: self.tokens,
            next_available_in_ms: if self.tokens >= 1.0 {
                None
            } else {
                let tokens_needed = 1.0 - self.tokens;
                Some((tokens_needed / self.refill_rate * 1000.0) as u64)
            },
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f32();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Pool of token buckets, one per quota-limited indexer.
///
/// Thread-safe and async-compatible.
pub struct QueryLimitService {
    buckets: RwLock<HashMap<i32, TokenBucket>>,
}

impl QueryLimitService {
    /// Create a pool from configured indexers.
    ///
    /// Only indexers with a `queries_per_minute` quota get a bucket.
    pub fn new(indexers: &[IndexerConfig]) -> Self {
        let mut buckets = HashMap::new();
        for indexer in indexers {
            if let Some(qpm) = indexer.queries_per_minute {
                buckets.insert(indexer.id, TokenBucket::new(qpm));
            }
        }
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    /// Create an empty pool where every indexer is unlimited.
    pub fn unlimited() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Get quota status for a specific indexer. None for unlimited indexers.
    pub async fn status(&self, indexer_id: i32) -> Option<QueryLimitStatus> {
        let mut buckets = self.buckets.write().await;
        buckets.get_mut(&indexer_id).map(|bucket| bucket.status())
    }
}

#[async_trait]
impl QueryLimiter for QueryLimitService {
    async fn at_query_limit(&self, definition: &IndexerDefinition) -> bool {
        let mut buckets = self.buckets.write().await;
        match buckets.get_mut(&definition.id) {
            Some(bucket) => bucket.try_acquire().is_err(),
            // No bucket means no quota configured
            None => false,
        }
    }
}
