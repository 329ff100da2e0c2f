//! Typed value and wire model for the LatticeDB client SDK.
//!
//! The type registry describes every datatype the cluster speaks; values
//! carry a type plus a concrete payload, serialize into arena-owned wire
//! nodes, decode back against a type, and cast into caller-supplied native
//! destinations.

pub mod arena;
pub mod cast;
pub mod decimal;
pub mod error;
pub mod types;
pub mod value;
pub mod wire;

pub use crate::arena::{Arena, BufferPool, PooledArena};
pub use crate::cast::FromValue;
pub use crate::decimal::Decimal;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::types::{StructField, Type};
pub use crate::value::Value;
pub use crate::wire::{
    big_endian_u128, Primitive, TypeId, TypeNode, TypedValue, ValueId, ValueKind, ValueNode,
};
