//! Confirmation Ledger - single-use grants for destructive operations
//!
//! A token is bound to one operation instance through a fingerprint of its
//! method, resolved path and canonical parameters. Redemption checks, in order:
//! existence, consumption, expiry, fingerprint. Only a successful redemption
//! marks the token consumed, and it does so under the entry's write guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use riskgate_core::{HttpMethod, OperationRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::template::normalize_path;

/// Why a confirmation id could not be redeemed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConfirmationError {
    #[error("confirmation id not found")]
    NotFound,

    #[error("confirmation id has expired")]
    Expired,

    #[error("confirmation id has already been used")]
    AlreadyConsumed,

    #[error("confirmation id was issued for a different operation or parameters")]
    Mismatch,
}

impl ConfirmationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Expired => "expired",
            Self::AlreadyConsumed => "already-consumed",
            Self::Mismatch => "mismatch",
        }
    }
}

/// One concrete invocation of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInstance {
    pub method: HttpMethod,

    /// Resolved path, normalized
    pub path: String,

    pub query: Value,
    pub body: Value,
}

impl OperationInstance {
    pub fn new(method: HttpMethod, resolved_path: &str, query: Value, body: Value) -> Self {
        Self {
            method,
            path: normalize_path(resolved_path),
            query: normalize_params(query),
            body: normalize_params(body),
        }
    }

    pub fn operation_ref(&self) -> OperationRef {
        OperationRef::new(self.method, self.path.clone())
    }

    /// SHA-256 over `METHOD\npath\ncanonical-json`
    pub fn fingerprint(&self) -> String {
        let params = serde_json::json!({
            "query": self.query,
            "body": self.body,
        });
        let mut canonical = String::new();
        write_canonical(&params, &mut canonical);

        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.path.as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Absent, `null` and empty-object parameters are the same thing
fn normalize_params(value: Value) -> Value {
    match value {
        Value::Object(map) if map.is_empty() => Value::Null,
        other => other,
    }
}

/// JSON with object keys sorted at every level
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// A single-use grant for one operation instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationToken {
    pub id: String,

    /// Operation template the token was issued for
    pub operation: OperationRef,

    /// Concrete call the token authorizes
    pub instance: OperationRef,

    pub fingerprint: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl ConfirmationToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired_at(now)
    }
}

/// Store of issued confirmation tokens
#[derive(Debug)]
pub struct ConfirmationLedger {
    tokens: DashMap<String, ConfirmationToken>,
    ttl: chrono::Duration,
}

impl ConfirmationLedger {
    /// Create a ledger; a zero TTL issues tokens that are already expired
    pub fn new(ttl: Duration) -> Self {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            tokens: DashMap::new(),
            ttl: chrono::Duration::milliseconds(millis),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Issue a token bound to `instance`
    pub fn issue(&self, operation: OperationRef, instance: &OperationInstance) -> ConfirmationToken {
        let now = Utc::now();
        let token = ConfirmationToken {
            id: Uuid::new_v4().to_string(),
            summary: format!("{} {}", instance.method, instance.path),
            instance: instance.operation_ref(),
            operation,
            fingerprint: instance.fingerprint(),
            created_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            consumed: false,
        };

        info!(
            confirmation_id = %token.id,
            operation = %token.operation,
            expires_at = %token.expires_at,
            "Issued confirmation token"
        );
        self.tokens.insert(token.id.clone(), token.clone());
        token
    }

    /// Redeem a token for `instance`
    pub fn redeem(
        &self,
        id: &str,
        instance: &OperationInstance,
    ) -> Result<ConfirmationToken, ConfirmationError> {
        self.redeem_at(id, instance, Utc::now())
    }

    pub(crate) fn redeem_at(
        &self,
        id: &str,
        instance: &OperationInstance,
        now: DateTime<Utc>,
    ) -> Result<ConfirmationToken, ConfirmationError> {
        let result = match self.tokens.get_mut(id.trim()) {
            None => Err(ConfirmationError::NotFound),
            Some(mut entry) => {
                let token = entry.value_mut();
                if token.consumed {
                    Err(ConfirmationError::AlreadyConsumed)
                } else if token.is_expired_at(now) {
                    Err(ConfirmationError::Expired)
                } else if token.fingerprint != instance.fingerprint() {
                    Err(ConfirmationError::Mismatch)
                } else {
                    token.consumed = true;
                    Ok(token.clone())
                }
            }
        };

        match &result {
            Ok(token) => info!(confirmation_id = %token.id, operation = %token.operation, "Redeemed confirmation token"),
            Err(e) => warn!(confirmation_id = id, reason = e.kind(), "Confirmation rejected"),
        }
        result
    }

    /// Drop expired tokens, consumed ones included; returns how many went
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub(crate) fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, token| !token.is_expired_at(now));
        let removed = before.saturating_sub(self.tokens.len());
        if removed > 0 {
            debug!(removed, "Purged expired confirmation tokens");
        }
        removed
    }

    /// Outstanding tokens, oldest first
    pub fn pending(&self) -> Vec<ConfirmationToken> {
        let now = Utc::now();
        let mut pending: Vec<ConfirmationToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.is_pending_at(now))
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by_key(|t| t.created_at);
        pending
    }

    pub fn get(&self, id: &str) -> Option<ConfirmationToken> {
        self.tokens.get(id.trim()).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Purge expired tokens every `interval` on the current Tokio runtime
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.purge_expired();
            }
        })
    }
}
