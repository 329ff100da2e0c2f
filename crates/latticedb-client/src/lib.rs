//! Endpoint discovery and load-aware balancing for the LatticeDB client
//! SDK.
//!
//! A [`Cluster`] owns one connection per live endpoint; a background
//! [`Discoverer`] refreshes the set from the control plane, and a
//! [`Balancer`] picks the connection for each RPC, weighted by the
//! endpoints' reported load.

pub mod balancer;
pub mod config;
pub mod conn;
pub mod discovery;
pub mod endpoint;
pub mod error;

pub use crate::balancer::{Balancer, ConnInfo, Element, RandomChoice, RoundRobin};
pub use crate::config::ClientConfig;
pub use crate::conn::{Conn, ConnState};
pub use crate::discovery::{
    Cluster, Discoverer, DiscoveryClient, DiscoveryService, EndpointInfo, ListEndpointsRequest,
    ListEndpointsResult,
};
pub use crate::endpoint::Endpoint;
pub use crate::error::{ClientError, ClientErrorKind, ClientResult};
