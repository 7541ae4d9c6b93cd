//! In-memory adapters: the map-backed resolver and a recording route
//! sink for tests and embedding.

use crate::domain::entities::ShadowRecord;
use crate::ports::outbound::{AccountResolver, ActivationFetcher, ResolverError, RouteSink};
use async_trait::async_trait;
use murmur_keys::PublicId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Map-backed account resolver. `store` overwrites by identifier.
#[derive(Default)]
pub struct MemResolver {
    claims: RwLock<HashMap<PublicId, String>>,
}

impl MemResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountResolver for MemResolver {
    async fn fetch(&self, account: &PublicId) -> Result<Option<String>, ResolverError> {
        Ok(self.claims.read().get(account).cloned())
    }

    async fn store(&self, account: &PublicId, claims: String) -> Result<(), ResolverError> {
        self.claims.write().insert(*account, claims);
        Ok(())
    }
}

/// Activation fetcher that serves tokens from a map keyed by URL.
///
/// Lets tests exercise the URL-token path without a network.
#[derive(Default)]
pub struct MemActivationFetcher {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemActivationFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, url: impl Into<String>, token: impl Into<String>) {
        self.tokens.write().insert(url.into(), token.into());
    }
}

#[async_trait]
impl ActivationFetcher for MemActivationFetcher {
    async fn fetch_token(&self, url: &str) -> Result<String, ResolverError> {
        self.tokens
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| ResolverError::Unavailable(format!("no token at {url}")))
    }
}

/// A route-table operation observed by [`RecordingRouteSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOp {
    Install(ShadowRecord),
    Remove(ShadowRecord),
}

/// Route sink that records every install/remove, for tests and for
/// embedders that drain operations themselves.
#[derive(Default)]
pub struct RecordingRouteSink {
    ops: RwLock<Vec<RouteOp>>,
}

impl RecordingRouteSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<RouteOp> {
        self.ops.read().clone()
    }

    /// Install operations minus removals, i.e. what the routing table
    /// currently holds.
    pub fn live(&self) -> Vec<ShadowRecord> {
        let ops = self.ops.read();
        let mut live: Vec<ShadowRecord> = Vec::new();
        for op in ops.iter() {
            match op {
                RouteOp::Install(rec) => live.push(rec.clone()),
                RouteOp::Remove(rec) => live.retain(|r| r.id != rec.id),
            }
        }
        live
    }
}

impl RouteSink for RecordingRouteSink {
    fn install_shadow(&self, record: &ShadowRecord) {
        self.ops.write().push(RouteOp::Install(record.clone()));
    }

    fn remove_shadow(&self, record: &ShadowRecord) {
        self.ops.write().push(RouteOp::Remove(record.clone()));
    }
}
