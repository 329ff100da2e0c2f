//! LatticeDB client SDK.
//!
//! Two subsystems make up the core: the typed value and wire model
//! ([`latticedb_core`]) and endpoint discovery plus load-aware balancing
//! ([`latticedb_client`]). The session, query and transport layers ride on
//! top of these.
//!
//! ```
//! use latticedb::{Arena, Value};
//!
//! let v = Value::optional_value(Value::Int32(-1));
//! let mut arena = Arena::pooled();
//! let wire = v.to_typed(&mut arena);
//! assert_eq!(Value::from_typed(&arena, wire).unwrap(), v);
//! ```

pub use latticedb_client::{
    Balancer, ClientConfig, ClientError, ClientErrorKind, ClientResult, Cluster, Conn, ConnInfo,
    ConnState, Discoverer, DiscoveryClient, DiscoveryService, Element, Endpoint, EndpointInfo,
    ListEndpointsRequest, ListEndpointsResult, RandomChoice, RoundRobin,
};
pub use latticedb_core::{
    big_endian_u128, Arena, BufferPool, Decimal, Error, ErrorKind, FromValue, Primitive,
    PooledArena, Result, StructField, Type, TypeId, TypeNode, TypedValue, Value, ValueId,
    ValueKind, ValueNode,
};
