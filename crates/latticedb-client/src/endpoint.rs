//! Cluster endpoints as discovery reports them.

use std::fmt;
use std::hash::{Hash, Hasher};

/// One advertised cluster endpoint.
///
/// Identity is `(addr, port)` only; `load_factor` and `local` are mutable
/// attributes refreshed by discovery and do not participate in equality.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub addr: String,
    pub port: u16,
    /// Non-negative; lower attracts more traffic.
    pub load_factor: f32,
    /// Whether the endpoint sits in the client's own location.
    pub local: bool,
}

impl Endpoint {
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            load_factor: 0.0,
            local: false,
        }
    }

    /// The identity key used by the registry.
    pub fn key(&self) -> (String, u16) {
        (self.addr.clone(), self.port)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.port == other.port
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}
