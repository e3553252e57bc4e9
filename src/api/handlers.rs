//! API Handlers
//!
//! HTTP request handlers mapping methods on `/<key>` to the cache core.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info};

use crate::cache::{current_unix_secs, ExpiringStore, KeyInfo, Record, RecordIdAllocator};
use crate::config::Config;
use crate::error::{CacheError, ConfigError, Result};
use crate::models::{ExpiresRequest, HealthResponse};
use crate::replication::{ReplItem, ReplicationLog};
use crate::scheduler::{ExpirationScheduler, ExpiredKeys};

/// Application state shared across all handlers.
///
/// Every component is built once here and handed out by reference.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ExpiringStore>,
    pub scheduler: Arc<ExpirationScheduler>,
    pub replication: Arc<ReplicationLog>,
    pub ids: Arc<RecordIdAllocator>,
    /// TTL in seconds for inserts without TTL headers
    pub default_ttl: i64,
    /// Replication rotation cadence
    pub rotate_interval: Duration,
}

impl AppState {
    /// Builds the core components from configuration.
    ///
    /// Also returns the receiving end of the scheduler's expired-key queue,
    /// which belongs to the eviction task. The config is validated first, so
    /// a zero tick or queue size is reported instead of reaching the
    /// scheduler and channel constructors.
    pub fn from_config(config: &Config) -> std::result::Result<(Self, ExpiredKeys), ConfigError> {
        config.validate()?;

        let ids = Arc::new(RecordIdAllocator::new());
        let (scheduler, expired) = ExpirationScheduler::new(
            config.scheduler_del_expired_every_sec,
            config.scheduler_expired_queue_size,
        );
        let replication = ReplicationLog::new(ids.clone(), config.replication_active_queue_size)
            .with_backoff(config.replication_backoff());

        let state = Self {
            cache: Arc::new(ExpiringStore::new()),
            scheduler: Arc::new(scheduler),
            replication: Arc::new(replication),
            ids,
            default_ttl: config.expires_default_duration_sec,
            rotate_interval: config.rotate_interval(),
        };
        Ok((state, expired))
    }

    // == Insert ==
    /// Applies one mutation: store insert, then replication add, then
    /// scheduler add.
    ///
    /// The three steps are not atomic as a group. A record can be visible in
    /// the store before its replication item or expiry entry exists.
    pub async fn insert(&self, key: String, value: Vec<u8>, expires: i64) -> Record {
        let key_info = KeyInfo::new(key, expires);
        let record = self.ids.new_record(expires, value);

        self.cache.insert(key_info.key.clone(), record.clone()).await;
        self.replication
            .add(ReplItem::insert(key_info.clone(), record.clone()))
            .await;
        self.scheduler.add(&key_info).await;

        record
    }
}

/// Handler for GET / and HEAD /
pub async fn health_handler() -> Json<HealthResponse> {
    debug!("health request");
    Json(HealthResponse::healthy())
}

/// Handler for GET /<key>
///
/// Answers with the raw stored value.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let record = match state.cache.lookup(&key, current_unix_secs()).await {
        Some(record) => record,
        None => {
            debug!(key = %key, "cache MISS");
            return Err(CacheError::NotFound(key));
        }
    };

    debug!(key = %key, "cache HIT");
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        record.value,
    )
        .into_response())
}

/// Handler for HEAD /<key>
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    if state.cache.lookup(&key, current_unix_secs()).await.is_none() {
        debug!(key = %key, "cache MISS");
        return Err(CacheError::NotFound(key));
    }

    debug!(key = %key, "cache HIT");
    Ok(StatusCode::OK)
}

/// Handler for POST /<key>
///
/// The request body is stored as the value. TTL comes from the
/// `X-Content-Expires-Sec` or `X-Content-Expires-At` header.
pub async fn insert_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let now = current_unix_secs();
    let ttl = ExpiresRequest::from_headers(&headers)
        .and_then(|req| req.ttl_secs(now, state.default_ttl))
        .map_err(CacheError::InvalidRequest)?;

    info!(key = %key, expires_sec = ttl, "insert");
    state.insert(key, body.to_vec(), now.saturating_add(ttl)).await;

    Ok(StatusCode::OK)
}

/// Handler for DELETE /<key>
///
/// Removes the key regardless of its expiry. Succeeds even if absent.
pub async fn delete_handler(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    info!(key = %key, "delete");
    state.cache.delete(&key, i64::MAX).await;
    StatusCode::OK
}

/// Handler for any unsupported method.
pub async fn bad_method_handler() -> StatusCode {
    StatusCode::BAD_REQUEST
}
