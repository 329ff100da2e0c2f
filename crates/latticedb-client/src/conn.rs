//! Per-endpoint connection handles owned by the balancer.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::endpoint::Endpoint;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Not part of the active set (initial, or removed by discovery).
    Offline,
    /// Eligible for selection.
    Online,
    /// Pessimized; skipped by selection until everything else is banned.
    Banned,
}

impl ConnState {
    fn from_u8(v: u8) -> ConnState {
        match v {
            1 => ConnState::Online,
            2 => ConnState::Banned,
            _ => ConnState::Offline,
        }
    }
}

/// A connection handle for one endpoint.
///
/// The RPC transport rides above this type; here it is the unit the
/// balancer selects and the discovery loop reconciles. Thread-safe and held
/// past the balancer lock as `Arc<Conn>`.
#[derive(Debug)]
pub struct Conn {
    endpoint: Endpoint,
    state: AtomicU8,
}

impl Conn {
    /// Connections start Offline; the balancer flips them Online on insert.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            state: AtomicU8::new(ConnState::Offline as u8),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_online(&self) -> bool {
        self.state() == ConnState::Online
    }
}
