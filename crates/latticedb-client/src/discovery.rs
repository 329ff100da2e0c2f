//! Endpoint discovery and the live cluster registry.
//!
//! A background task periodically asks the meta endpoint for the current
//! endpoint set and reconciles it into the balancer. Every refresh is
//! authoritative: there is no cache, and a failed refresh leaves the
//! current set untouched until the next tick.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::balancer::{Balancer, ConnInfo, Element};
use crate::conn::Conn;
use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientErrorKind, ClientResult};

/// ListEndpoints request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEndpointsRequest {
    pub database: String,
}

/// One endpoint as the control plane reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointInfo {
    pub address: String,
    pub port: u16,
    pub load_factor: f32,
    pub ssl: bool,
    pub location: String,
}

/// ListEndpoints response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEndpointsResult {
    pub endpoints: Vec<EndpointInfo>,
    pub self_location: String,
}

/// The discovery RPC, implemented by the transport plumbing (and by test
/// doubles).
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    async fn list_endpoints(
        &self,
        request: ListEndpointsRequest,
    ) -> ClientResult<ListEndpointsResult>;
}

/// Calls ListEndpoints against a fixed meta endpoint and normalizes the
/// result for the registry.
pub struct DiscoveryClient {
    service: Arc<dyn DiscoveryService>,
    database: String,
    ssl: bool,
    timeout: Duration,
}

impl DiscoveryClient {
    pub fn new(
        service: Arc<dyn DiscoveryService>,
        database: impl Into<String>,
        ssl: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            database: database.into(),
            ssl,
            timeout,
        }
    }

    /// One authoritative refresh. Endpoints whose `ssl` flag mismatches the
    /// client configuration are dropped; the rest are marked `local` when
    /// their location equals the reported self-location.
    ///
    /// Cancellation yields [`ClientErrorKind::Cancelled`] without partial
    /// effects.
    pub async fn discover(&self, cancel: &CancellationToken) -> ClientResult<Vec<Endpoint>> {
        let request = ListEndpointsRequest {
            database: self.database.clone(),
        };
        let result = tokio::select! {
            // Cancellation wins over a ready response; a cancelled refresh
            // must not partially update anything downstream.
            biased;
            _ = cancel.cancelled() => return Err(ClientErrorKind::Cancelled.into()),
            result = tokio::time::timeout(self.timeout, self.service.list_endpoints(request)) => {
                match result {
                    Ok(inner) => inner.map_err(|e| e.context("listing endpoints"))?,
                    Err(_) => return Err(ClientError::new(ClientErrorKind::Timeout)
                        .context("listing endpoints")),
                }
            }
        };
        let endpoints = result
            .endpoints
            .into_iter()
            .filter(|e| e.ssl == self.ssl)
            .map(|e| Endpoint {
                local: e.location == result.self_location,
                addr: e.address,
                port: e.port,
                load_factor: e.load_factor,
            })
            .collect();
        Ok(endpoints)
    }
}

struct ClusterEntry {
    element: Element,
    conn: Arc<Conn>,
}

struct ClusterInner {
    balancer: Box<dyn Balancer>,
    index: HashMap<(String, u16), ClusterEntry>,
}

/// The live endpoint set: a balancer plus the identity index the discovery
/// loop reconciles against.
///
/// One mutex guards both, so a refresh is atomic: a concurrent
/// [`Cluster::next`] observes either the pre- or the post-refresh set.
pub struct Cluster {
    inner: Mutex<ClusterInner>,
}

impl Cluster {
    pub fn new(balancer: Box<dyn Balancer>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ClusterInner {
                balancer,
                index: HashMap::new(),
            }),
        })
    }

    /// Reconciles an authoritative endpoint set: survivors get their load
    /// factor refreshed, new endpoints are inserted Online, vanished ones
    /// are removed and marked Offline.
    pub fn apply_endpoints(&self, endpoints: Vec<Endpoint>) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mut seen: HashSet<(String, u16)> = HashSet::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let key = endpoint.key();
            seen.insert(key.clone());
            let info = ConnInfo {
                load_factor: endpoint.load_factor,
            };
            match inner.index.get(&key) {
                Some(entry) => {
                    inner.balancer.update(entry.element, info);
                }
                None => {
                    debug!("discovered endpoint {endpoint}");
                    let conn = Arc::new(Conn::new(endpoint));
                    let element = inner.balancer.insert(Arc::clone(&conn), info);
                    inner.index.insert(key, ClusterEntry { element, conn });
                }
            }
        }
        let gone: Vec<(String, u16)> = inner
            .index
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        for key in gone {
            if let Some(entry) = inner.index.remove(&key) {
                debug!("endpoint {} left the cluster", entry.conn.endpoint());
                inner.balancer.remove(entry.element);
            }
        }
    }

    /// Picks a connection for the next RPC. Returns `None` immediately when
    /// the set is empty; this never blocks.
    pub fn next(&self) -> Option<Arc<Conn>> {
        self.inner.lock().balancer.next()
    }

    /// Bans the element owning `conn`. See [`Balancer::pessimize`] for the
    /// advisory error.
    pub fn pessimize(&self, conn: &Conn) -> ClientResult<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let key = conn.endpoint().key();
        match inner.index.get(&key) {
            Some(entry) => inner.balancer.pessimize(entry.element),
            None => Ok(()),
        }
    }

    /// Snapshot of the registered endpoints.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let inner = self.inner.lock();
        inner
            .index
            .values()
            .map(|e| e.conn.endpoint().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to the background discovery loop.
pub struct Discoverer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Discoverer {
    /// Spawns the refresh loop: tick every `interval`, reconcile on
    /// success, log and retry on failure. Missed ticks are skipped rather
    /// than bunched.
    pub fn spawn(client: DiscoveryClient, cluster: Arc<Cluster>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match client.discover(&token).await {
                            Ok(endpoints) => {
                                debug!("discovery refresh: {} endpoints", endpoints.len());
                                cluster.apply_endpoints(endpoints);
                            }
                            Err(e) if matches!(e.kind(), ClientErrorKind::Cancelled) => break,
                            // The current set stays valid; retry next tick.
                            Err(e) => warn!("endpoint discovery failed: {e}"),
                        }
                    }
                }
            }
        });
        Self { cancel, task }
    }

    /// Cancels the loop and waits for it to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
