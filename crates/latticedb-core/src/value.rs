//! Concrete values carrying their type, with wire conversions.
//!
//! Containers canonicalize at construction: struct fields are stored in
//! name-lexicographic order, dict pairs in key-lexicographic order of the
//! key's raw rendering. Temporal payloads are the canonical integers (days,
//! seconds or microseconds since the epoch).

use std::fmt;
use std::fmt::Write as _;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::arena::{Arena, BUFFERS};
use crate::decimal::Decimal;
use crate::error::{ErrorKind, Result};
use crate::types::{StructField, Type};
use crate::wire::{
    big_endian_u128, u128_halves, Primitive, TypedValue, ValueId, ValueKind, ValueNode,
};

const MICROS_PER_SECOND: u64 = 1_000_000;
const SECONDS_PER_DAY: u64 = 86_400;

/// A typed value.
///
/// A value exclusively owns its payload; container values own their element
/// values. Equality is structural and includes the carried types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    /// Days since 1970-01-01.
    Date(u32),
    /// Seconds since the epoch.
    Datetime(u32),
    /// Microseconds since the epoch.
    Timestamp(u64),
    /// Signed microseconds.
    Interval(i64),
    Text(String),
    Bytes(Vec<u8>),
    Json(String),
    JsonDocument(String),
    Yson(Vec<u8>),
    DyNumber(String),
    TzDate(String),
    TzDatetime(String),
    TzTimestamp(String),
    /// Big-endian 16-byte buffer.
    Uuid([u8; 16]),
    Decimal(Decimal),
    /// `value: None` is NULL of the wrapped inner type.
    Optional {
        /// The full `Optional<...>` type.
        ty: Type,
        value: Option<Box<Value>>,
    },
    List {
        /// `List<T>`, or `EmptyList` for the untyped empty literal.
        ty: Type,
        items: Vec<Value>,
    },
    Tuple(Vec<Value>),
    /// Fields in name-lexicographic order.
    Struct(Vec<(String, Value)>),
    Dict {
        /// `Dict<K,V>`, or `EmptyDict` for the untyped empty literal.
        ty: Type,
        pairs: Vec<(Value, Value)>,
    },
    /// Holds the element selected by `index` inside the inner tuple/struct.
    Variant {
        /// The full `Variant<...>` type.
        ty: Type,
        index: u32,
        value: Box<Value>,
    },
    Void,
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

impl Value {
    pub fn optional_value(value: Value) -> Value {
        Value::Optional {
            ty: Type::optional(value.ty()),
            value: Some(Box::new(value)),
        }
    }

    /// NULL of the given inner type; the result has type `Optional<inner>`.
    pub fn null_value(inner: Type) -> Value {
        Value::Optional {
            ty: Type::optional(inner),
            value: None,
        }
    }

    /// A list takes its element type from the first item; the empty literal
    /// has type `EmptyList`.
    ///
    /// Panics when items disagree on their type; a mixed list is
    /// unrepresentable.
    pub fn list_value(items: Vec<Value>) -> Value {
        let ty = match items.first() {
            Some(first) => Type::list(first.ty()),
            None => Type::EmptyList,
        };
        if let Type::List(item_ty) = &ty {
            for item in &items {
                let found = item.ty();
                if found != **item_ty {
                    panic!(
                        "{}",
                        ErrorKind::TypeMismatch(format!(
                            "list items must share one type: got {item_ty} and {found}"
                        ))
                    );
                }
            }
        }
        Value::List { ty, items }
    }

    pub fn tuple_value(items: Vec<Value>) -> Value {
        Value::Tuple(items)
    }

    /// Builds a struct value with fields canonicalized by ascending name.
    ///
    /// Panics on duplicate field names.
    pub fn struct_value(mut fields: Vec<(String, Value)>) -> Value {
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in fields.windows(2) {
            if pair[0].0 == pair[1].0 {
                panic!("duplicate struct field name: {}", pair[0].0);
            }
        }
        Value::Struct(fields)
    }

    /// Builds a dict value with pairs canonicalized by the key's raw
    /// rendering; the empty literal has type `EmptyDict`.
    ///
    /// Panics on duplicate keys.
    pub fn dict_value(mut pairs: Vec<(Value, Value)>) -> Value {
        let ty = match pairs.first() {
            Some((k, v)) => Type::dict(k.ty(), v.ty()),
            None => Type::EmptyDict,
        };
        pairs.sort_by_key(|(k, _)| k.raw_string());
        for pair in pairs.windows(2) {
            if pair[0].0.raw_string() == pair[1].0.raw_string() {
                panic!("duplicate dict key: {}", pair[0].0);
            }
        }
        Value::Dict { ty, pairs }
    }

    /// A variant over a tuple type, holding the element at `index`.
    ///
    /// Panics when `inner` is not a tuple, the index is out of range, or
    /// the element type does not match.
    pub fn variant_tuple(inner: Type, index: u32, value: Value) -> Value {
        let Type::Tuple(items) = &inner else {
            panic!("variant value requires a tuple type, got {inner}");
        };
        Self::check_variant_element(items.get(index as usize), index, &value);
        Value::Variant {
            ty: Type::Variant(Box::new(inner)),
            index,
            value: Box::new(value),
        }
    }

    /// A variant over a struct type, holding the element at `index`.
    ///
    /// Panics when `inner` is not a struct, the index is out of range, or
    /// the element type does not match.
    pub fn variant_struct(inner: Type, index: u32, value: Value) -> Value {
        let Type::Struct(fields) = &inner else {
            panic!("variant value requires a struct type, got {inner}");
        };
        let element = fields.get(index as usize).map(|f| &f.ty);
        Self::check_variant_element(element, index, &value);
        Value::Variant {
            ty: Type::Variant(Box::new(inner)),
            index,
            value: Box::new(value),
        }
    }

    fn check_variant_element(element: Option<&Type>, index: u32, value: &Value) {
        match element {
            None => panic!("variant index {index} out of range"),
            Some(expected) => {
                let found = value.ty();
                if *expected != found {
                    panic!(
                        "{}",
                        ErrorKind::TypeMismatch(format!(
                            "variant element {index} has type {expected}, got {found}"
                        ))
                    );
                }
            }
        }
    }

    /// Date from a wall-clock instant; instants before the epoch saturate
    /// to day zero.
    pub fn date_from_system_time(t: SystemTime) -> Value {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Value::Date((secs / SECONDS_PER_DAY) as u32)
    }

    pub fn datetime_from_system_time(t: SystemTime) -> Value {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Value::Datetime(secs as u32)
    }

    /// Interval from an elapsed duration. Negative intervals are built
    /// directly from signed microseconds.
    pub fn interval_from_duration(d: Duration) -> Value {
        Value::Interval(d.as_micros() as i64)
    }

    pub fn timestamp_from_system_time(t: SystemTime) -> Value {
        let micros = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or(0);
        Value::Timestamp(micros as u64)
    }

    /// The conventional zero of a type.
    pub fn zero(ty: &Type) -> Value {
        match ty {
            Type::Primitive(p) => Self::zero_primitive(*p),
            Type::Optional(inner) => Value::null_value((**inner).clone()),
            Type::List(_) | Type::EmptyList => Value::List {
                ty: ty.clone(),
                items: Vec::new(),
            },
            Type::Tuple(items) => Value::Tuple(items.iter().map(Value::zero).collect()),
            Type::Struct(fields) => Value::Struct(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), Value::zero(&f.ty)))
                    .collect(),
            ),
            Type::Dict(_, _) | Type::EmptyDict => Value::Dict {
                ty: ty.clone(),
                pairs: Vec::new(),
            },
            Type::Decimal { .. } => Value::Decimal(Decimal::from_i128(0, 22, 9)),
            Type::Variant(inner) => {
                let element = match &**inner {
                    Type::Tuple(items) => items.first(),
                    Type::Struct(fields) => fields.first().map(|f| &f.ty),
                    _ => None,
                };
                let Some(element) = element else {
                    panic!("cannot build the zero of a variant over an empty {inner}");
                };
                Value::Variant {
                    ty: ty.clone(),
                    index: 0,
                    value: Box::new(Value::zero(element)),
                }
            }
            Type::Void => Value::Void,
            Type::Null => Value::null_value(Type::Null),
        }
    }

    fn zero_primitive(p: Primitive) -> Value {
        match p {
            Primitive::Bool => Value::Bool(false),
            Primitive::Int8 => Value::Int8(0),
            Primitive::Int16 => Value::Int16(0),
            Primitive::Int32 => Value::Int32(0),
            Primitive::Int64 => Value::Int64(0),
            Primitive::Uint8 => Value::Uint8(0),
            Primitive::Uint16 => Value::Uint16(0),
            Primitive::Uint32 => Value::Uint32(0),
            Primitive::Uint64 => Value::Uint64(0),
            Primitive::Float => Value::Float(0.0),
            Primitive::Double => Value::Double(0.0),
            Primitive::Date => Value::Date(0),
            Primitive::Datetime => Value::Datetime(0),
            Primitive::Timestamp => Value::Timestamp(0),
            Primitive::Interval => Value::Interval(0),
            Primitive::Text => Value::Text(String::new()),
            Primitive::Bytes => Value::Bytes(Vec::new()),
            Primitive::Uuid => Value::Uuid([0; 16]),
            Primitive::Json => Value::Json(String::new()),
            Primitive::JsonDocument => Value::JsonDocument(String::new()),
            Primitive::Yson => Value::Yson(Vec::new()),
            Primitive::DyNumber => Value::DyNumber(String::new()),
            Primitive::TzDate => Value::TzDate(String::new()),
            Primitive::TzDatetime => Value::TzDatetime(String::new()),
            Primitive::TzTimestamp => Value::TzTimestamp(String::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Type and payload accessors
// ---------------------------------------------------------------------------

impl Value {
    /// The value's type descriptor.
    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Primitive(Primitive::Bool),
            Value::Int8(_) => Type::Primitive(Primitive::Int8),
            Value::Int16(_) => Type::Primitive(Primitive::Int16),
            Value::Int32(_) => Type::Primitive(Primitive::Int32),
            Value::Int64(_) => Type::Primitive(Primitive::Int64),
            Value::Uint8(_) => Type::Primitive(Primitive::Uint8),
            Value::Uint16(_) => Type::Primitive(Primitive::Uint16),
            Value::Uint32(_) => Type::Primitive(Primitive::Uint32),
            Value::Uint64(_) => Type::Primitive(Primitive::Uint64),
            Value::Float(_) => Type::Primitive(Primitive::Float),
            Value::Double(_) => Type::Primitive(Primitive::Double),
            Value::Date(_) => Type::Primitive(Primitive::Date),
            Value::Datetime(_) => Type::Primitive(Primitive::Datetime),
            Value::Timestamp(_) => Type::Primitive(Primitive::Timestamp),
            Value::Interval(_) => Type::Primitive(Primitive::Interval),
            Value::Text(_) => Type::Primitive(Primitive::Text),
            Value::Bytes(_) => Type::Primitive(Primitive::Bytes),
            Value::Json(_) => Type::Primitive(Primitive::Json),
            Value::JsonDocument(_) => Type::Primitive(Primitive::JsonDocument),
            Value::Yson(_) => Type::Primitive(Primitive::Yson),
            Value::DyNumber(_) => Type::Primitive(Primitive::DyNumber),
            Value::TzDate(_) => Type::Primitive(Primitive::TzDate),
            Value::TzDatetime(_) => Type::Primitive(Primitive::TzDatetime),
            Value::TzTimestamp(_) => Type::Primitive(Primitive::TzTimestamp),
            Value::Uuid(_) => Type::Primitive(Primitive::Uuid),
            Value::Decimal(d) => Type::decimal(d.precision(), d.scale()),
            Value::Optional { ty, .. }
            | Value::List { ty, .. }
            | Value::Dict { ty, .. }
            | Value::Variant { ty, .. } => ty.clone(),
            Value::Tuple(items) => Type::Tuple(items.iter().map(Value::ty).collect()),
            Value::Struct(fields) => Type::Struct(
                fields
                    .iter()
                    .map(|(name, v)| StructField::new(name.clone(), v.ty()))
                    .collect(),
            ),
            Value::Void => Type::Void,
        }
    }

    /// Elements of a list or tuple.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List { items, .. } => Some(items),
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Name-ordered fields of a struct.
    pub fn fields(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Key-ordered pairs of a dict.
    pub fn pairs(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Dict { pairs, .. } => Some(pairs),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

impl Value {
    /// The bare payload rendering, without type qualification.
    pub fn raw_string(&self) -> String {
        let mut buf = BUFFERS.get();
        self.render_raw(&mut buf);
        let out = buf.clone();
        BUFFERS.put(buf);
        out
    }

    fn render_raw(&self, out: &mut String) {
        match self {
            Value::Bool(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Int8(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Int16(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Int32(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Int64(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Uint8(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Uint16(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Uint32(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Uint64(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Float(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Double(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Date(days) => render_date(*days as u64, out),
            Value::Datetime(secs) => render_datetime(*secs as u64, None, out),
            Value::Timestamp(micros) => render_datetime(
                micros / MICROS_PER_SECOND,
                Some((micros % MICROS_PER_SECOND) as u32),
                out,
            ),
            Value::Interval(micros) => render_interval(*micros, out),
            Value::Text(s)
            | Value::Json(s)
            | Value::JsonDocument(s)
            | Value::DyNumber(s)
            | Value::TzDate(s)
            | Value::TzDatetime(s)
            | Value::TzTimestamp(s) => out.push_str(s),
            Value::Bytes(b) | Value::Yson(b) => out.push_str(&String::from_utf8_lossy(b)),
            Value::Uuid(b) => render_uuid(b, out),
            Value::Decimal(d) => {
                let _ = write!(out, "{d}");
            }
            Value::Optional { value, .. } => match value {
                Some(inner) => inner.render_raw(out),
                None => out.push_str("NULL"),
            },
            Value::List { items, .. } => {
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    item.render_raw(out);
                }
            }
            Value::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{item}");
                }
            }
            Value::Struct(fields) => {
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{value} AS `{name}`");
                }
            }
            Value::Dict { pairs, .. } => {
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "AsTuple({k},{v})");
                }
            }
            Value::Variant { index, value, .. } => {
                out.push('"');
                value.render_raw(out);
                let _ = write!(out, "\",{index}");
            }
            Value::Void => out.push_str("VOID"),
        }
    }
}

impl fmt::Display for Value {
    /// The human-readable form with type qualification, in the shape the
    /// SQL-ish constructors take: `Int32("1")`, `AsList(...)`,
    /// `CAST("NULL" AS Optional<Int32>)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Json(_) | Value::JsonDocument(_) => {
                write!(f, "{}(@@{}@@)", self.ty(), self.raw_string())
            }
            Value::Decimal(d) => write!(
                f,
                "Decimal(\"{}\",{},{})",
                d,
                d.precision(),
                d.scale()
            ),
            Value::Optional { .. } => {
                write!(f, "CAST(\"{}\" AS {})", self.raw_string(), self.ty())
            }
            Value::List { .. } => write!(f, "AsList({})", self.raw_string()),
            Value::Tuple(_) => write!(f, "AsTuple({})", self.raw_string()),
            Value::Struct(_) => write!(f, "AsStruct({})", self.raw_string()),
            Value::Dict { .. } => write!(f, "AsDict({})", self.raw_string()),
            Value::Variant { .. } => write!(f, "AsVariant({})", self.raw_string()),
            Value::Void => f.write_str("VOID"),
            _ => write!(f, "{}(\"{}\")", self.ty(), self.raw_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire encoding
// ---------------------------------------------------------------------------

impl Value {
    /// Serializes the payload into `arena`, returning the root node.
    pub fn to_wire(&self, arena: &mut Arena) -> ValueId {
        match self {
            Value::Bool(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Bool(*v))),
            Value::Int8(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Int32(*v as i32))),
            Value::Int16(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Int32(*v as i32))),
            Value::Int32(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Int32(*v))),
            Value::Int64(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Int64(*v))),
            Value::Uint8(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint32(*v as u32))),
            Value::Uint16(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint32(*v as u32))),
            Value::Uint32(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint32(*v))),
            Value::Uint64(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint64(*v))),
            Value::Float(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Float(*v))),
            Value::Double(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Double(*v))),
            Value::Date(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint32(*v))),
            Value::Datetime(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint32(*v))),
            Value::Timestamp(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Uint64(*v))),
            Value::Interval(v) => arena.alloc_value(ValueNode::leaf(ValueKind::Int64(*v))),
            Value::Text(s)
            | Value::Json(s)
            | Value::JsonDocument(s)
            | Value::DyNumber(s)
            | Value::TzDate(s)
            | Value::TzDatetime(s)
            | Value::TzTimestamp(s) => {
                arena.alloc_value(ValueNode::leaf(ValueKind::Text(s.clone())))
            }
            Value::Bytes(b) | Value::Yson(b) => {
                arena.alloc_value(ValueNode::leaf(ValueKind::Bytes(b.clone())))
            }
            Value::Uuid(bytes) => alloc_u128(arena, bytes),
            Value::Decimal(d) => alloc_u128(arena, d.bytes()),
            Value::Optional { value, .. } => match value {
                // A nested optional keeps its depth on the wire; a plain
                // payload is emitted in place.
                Some(inner) if matches!(**inner, Value::Optional { .. }) => {
                    let nested = inner.to_wire(arena);
                    arena.alloc_value(ValueNode::leaf(ValueKind::Nested(nested)))
                }
                Some(inner) => inner.to_wire(arena),
                None => arena.alloc_value(ValueNode::leaf(ValueKind::NullFlag)),
            },
            Value::List { items, .. } => {
                let ids = items.iter().map(|v| v.to_wire(arena)).collect();
                arena.alloc_value(ValueNode {
                    items: ids,
                    ..ValueNode::default()
                })
            }
            Value::Tuple(items) => {
                let ids = items.iter().map(|v| v.to_wire(arena)).collect();
                arena.alloc_value(ValueNode {
                    items: ids,
                    ..ValueNode::default()
                })
            }
            Value::Struct(fields) => {
                let ids = fields.iter().map(|(_, v)| v.to_wire(arena)).collect();
                arena.alloc_value(ValueNode {
                    items: ids,
                    ..ValueNode::default()
                })
            }
            Value::Dict { pairs, .. } => {
                let ids = pairs
                    .iter()
                    .map(|(k, v)| (k.to_wire(arena), v.to_wire(arena)))
                    .collect();
                arena.alloc_value(ValueNode {
                    pairs: ids,
                    ..ValueNode::default()
                })
            }
            Value::Variant { index, value, .. } => {
                let nested = value.to_wire(arena);
                arena.alloc_value(ValueNode {
                    kind: ValueKind::Nested(nested),
                    variant_index: *index,
                    ..ValueNode::default()
                })
            }
            Value::Void => arena.void_value(),
        }
    }

    /// Serializes the `(type, value)` pair shipped to the server.
    pub fn to_typed(&self, arena: &mut Arena) -> TypedValue {
        let ty = self.ty().to_wire(arena);
        let value = self.to_wire(arena);
        TypedValue { ty, value }
    }

    /// Inverse of [`Value::to_typed`].
    pub fn from_typed(arena: &Arena, tv: TypedValue) -> Result<Value> {
        let ty = Type::from_wire(arena, tv.ty)?;
        Value::from_wire(arena, &ty, tv.value)
    }
}

fn alloc_u128(arena: &mut Arena, bytes: &[u8; 16]) -> ValueId {
    let (hi, lo) = u128_halves(bytes);
    arena.alloc_value(ValueNode {
        kind: ValueKind::Low128(lo),
        high_128: hi,
        ..ValueNode::default()
    })
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

impl Value {
    /// Rebuilds a value from its wire form, driven by the type.
    pub fn from_wire(arena: &Arena, ty: &Type, id: ValueId) -> Result<Value> {
        let node = arena.value_node(id);
        if let Type::Optional(inner) = ty {
            // One optional level is unwrapped per NestedValue; a NullFlag
            // terminates as NULL of whatever inner type remains.
            return match &node.kind {
                ValueKind::NullFlag => Ok(Value::null_value((**inner).clone())),
                ValueKind::Nested(next) => {
                    Ok(Value::optional_value(Value::from_wire(arena, inner, *next)?))
                }
                _ => Ok(Value::optional_value(Value::from_wire(arena, inner, id)?)),
            };
        }
        match ty {
            Type::Optional(_) => unreachable!(),
            Type::Primitive(p) => decode_primitive(*p, node),
            Type::Decimal { precision, scale } => match node.kind {
                ValueKind::Low128(lo) => Ok(Value::Decimal(Decimal::from_bytes(
                    big_endian_u128(node.high_128, lo),
                    *precision,
                    *scale,
                ))),
                _ => Err(decode_mismatch(ty, node)),
            },
            Type::Void => match node.kind {
                ValueKind::NullFlag => Ok(Value::Void),
                _ => Err(decode_mismatch(ty, node)),
            },
            Type::Null => match node.kind {
                ValueKind::NullFlag => Ok(Value::null_value(Type::Null)),
                _ => Err(decode_mismatch(ty, node)),
            },
            Type::List(item) => {
                let items = node
                    .items
                    .iter()
                    .map(|id| Value::from_wire(arena, item, *id))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List {
                    ty: ty.clone(),
                    items,
                })
            }
            Type::EmptyList => {
                if node.items.is_empty() {
                    Ok(Value::List {
                        ty: Type::EmptyList,
                        items: Vec::new(),
                    })
                } else {
                    Err(ErrorKind::Decode("items under an EmptyList type".to_string()).into())
                }
            }
            Type::Tuple(types) => {
                if node.items.len() != types.len() {
                    return Err(ErrorKind::Decode(format!(
                        "tuple arity mismatch: type has {}, wire has {}",
                        types.len(),
                        node.items.len()
                    ))
                    .into());
                }
                let items = types
                    .iter()
                    .zip(&node.items)
                    .map(|(t, id)| Value::from_wire(arena, t, *id))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Tuple(items))
            }
            Type::Struct(fields) => {
                if node.items.len() != fields.len() {
                    return Err(ErrorKind::Decode(format!(
                        "struct arity mismatch: type has {}, wire has {}",
                        fields.len(),
                        node.items.len()
                    ))
                    .into());
                }
                // Wire items follow the declared field order of the type.
                let decoded = fields
                    .iter()
                    .zip(&node.items)
                    .map(|(f, id)| Ok((f.name.clone(), Value::from_wire(arena, &f.ty, *id)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Struct(decoded))
            }
            Type::Dict(key_ty, value_ty) => {
                let mut pairs = node
                    .pairs
                    .iter()
                    .map(|(k, v)| {
                        Ok((
                            Value::from_wire(arena, key_ty, *k)?,
                            Value::from_wire(arena, value_ty, *v)?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                pairs.sort_by_key(|(k, _)| k.raw_string());
                for pair in pairs.windows(2) {
                    if pair[0].0.raw_string() == pair[1].0.raw_string() {
                        return Err(
                            ErrorKind::Decode(format!("duplicate dict key {}", pair[0].0)).into()
                        );
                    }
                }
                Ok(Value::Dict {
                    ty: ty.clone(),
                    pairs,
                })
            }
            Type::EmptyDict => {
                if node.pairs.is_empty() {
                    Ok(Value::Dict {
                        ty: Type::EmptyDict,
                        pairs: Vec::new(),
                    })
                } else {
                    Err(ErrorKind::Decode("pairs under an EmptyDict type".to_string()).into())
                }
            }
            Type::Variant(inner) => {
                let index = node.variant_index;
                let element = match &**inner {
                    Type::Tuple(items) => items.get(index as usize),
                    Type::Struct(fields) => fields.get(index as usize).map(|f| &f.ty),
                    _ => None,
                };
                let Some(element) = element else {
                    return Err(ErrorKind::Decode(format!(
                        "variant index {index} out of range for {inner}"
                    ))
                    .into());
                };
                let ValueKind::Nested(nested) = node.kind else {
                    return Err(decode_mismatch(ty, node));
                };
                let value = Value::from_wire(arena, element, nested)?;
                Ok(Value::Variant {
                    ty: ty.clone(),
                    index,
                    value: Box::new(value),
                })
            }
        }
    }
}

fn decode_primitive(p: Primitive, node: &ValueNode) -> Result<Value> {
    let mismatch = || decode_mismatch(&Type::Primitive(p), node);
    let value = match (p, &node.kind) {
        (Primitive::Bool, ValueKind::Bool(v)) => Value::Bool(*v),
        (Primitive::Int8, ValueKind::Int32(v)) => {
            Value::Int8(i8::try_from(*v).map_err(|_| out_of_range(p, *v as i64))?)
        }
        (Primitive::Int16, ValueKind::Int32(v)) => {
            Value::Int16(i16::try_from(*v).map_err(|_| out_of_range(p, *v as i64))?)
        }
        (Primitive::Int32, ValueKind::Int32(v)) => Value::Int32(*v),
        (Primitive::Int64, ValueKind::Int64(v)) => Value::Int64(*v),
        (Primitive::Uint8, ValueKind::Uint32(v)) => {
            Value::Uint8(u8::try_from(*v).map_err(|_| out_of_range(p, *v as i64))?)
        }
        (Primitive::Uint16, ValueKind::Uint32(v)) => {
            Value::Uint16(u16::try_from(*v).map_err(|_| out_of_range(p, *v as i64))?)
        }
        (Primitive::Uint32, ValueKind::Uint32(v)) => Value::Uint32(*v),
        (Primitive::Uint64, ValueKind::Uint64(v)) => Value::Uint64(*v),
        (Primitive::Float, ValueKind::Float(v)) => Value::Float(*v),
        (Primitive::Double, ValueKind::Double(v)) => Value::Double(*v),
        (Primitive::Date, ValueKind::Uint32(v)) => Value::Date(*v),
        (Primitive::Datetime, ValueKind::Uint32(v)) => Value::Datetime(*v),
        (Primitive::Timestamp, ValueKind::Uint64(v)) => Value::Timestamp(*v),
        (Primitive::Interval, ValueKind::Int64(v)) => Value::Interval(*v),
        (Primitive::Text, ValueKind::Text(s)) => Value::Text(s.clone()),
        (Primitive::Json, ValueKind::Text(s)) => Value::Json(s.clone()),
        (Primitive::JsonDocument, ValueKind::Text(s)) => Value::JsonDocument(s.clone()),
        (Primitive::DyNumber, ValueKind::Text(s)) => Value::DyNumber(s.clone()),
        (Primitive::TzDate, ValueKind::Text(s)) => Value::TzDate(s.clone()),
        (Primitive::TzDatetime, ValueKind::Text(s)) => Value::TzDatetime(s.clone()),
        (Primitive::TzTimestamp, ValueKind::Text(s)) => Value::TzTimestamp(s.clone()),
        (Primitive::Bytes, ValueKind::Bytes(b)) => Value::Bytes(b.clone()),
        // YSON travels as either leaf, depending on the producer.
        (Primitive::Yson, ValueKind::Bytes(b)) => Value::Yson(b.clone()),
        (Primitive::Yson, ValueKind::Text(s)) => Value::Yson(s.clone().into_bytes()),
        (Primitive::Uuid, ValueKind::Low128(lo)) => {
            Value::Uuid(big_endian_u128(node.high_128, *lo))
        }
        _ => return Err(mismatch()),
    };
    Ok(value)
}

fn out_of_range(p: Primitive, got: i64) -> crate::error::Error {
    ErrorKind::Decode(format!("{} out of range: {got}", p.name())).into()
}

fn decode_mismatch(ty: &Type, node: &ValueNode) -> crate::error::Error {
    ErrorKind::Decode(format!(
        "wire field {} does not decode as {ty}",
        kind_name(&node.kind)
    ))
    .into()
}

fn kind_name(kind: &ValueKind) -> &'static str {
    match kind {
        ValueKind::Unset => "unset",
        ValueKind::Bool(_) => "bool_value",
        ValueKind::Int32(_) => "int32_value",
        ValueKind::Int64(_) => "int64_value",
        ValueKind::Uint32(_) => "uint32_value",
        ValueKind::Uint64(_) => "uint64_value",
        ValueKind::Float(_) => "float_value",
        ValueKind::Double(_) => "double_value",
        ValueKind::Text(_) => "text_value",
        ValueKind::Bytes(_) => "bytes_value",
        ValueKind::Low128(_) => "low_128",
        ValueKind::NullFlag => "null_flag",
        ValueKind::Nested(_) => "nested_value",
    }
}

// ---------------------------------------------------------------------------
// Temporal rendering
// ---------------------------------------------------------------------------

/// Civil date from days since 1970-01-01 (Gregorian, proleptic).
fn civil_from_days(days: u64) -> (i64, u32, u32) {
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (year + i64::from(month <= 2), month, day)
}

fn render_date(days: u64, out: &mut String) {
    let (y, m, d) = civil_from_days(days);
    let _ = write!(out, "{y:04}-{m:02}-{d:02}");
}

fn render_datetime(secs: u64, subsec_micros: Option<u32>, out: &mut String) {
    render_date(secs / SECONDS_PER_DAY, out);
    let rest = secs % SECONDS_PER_DAY;
    let (h, m, s) = (rest / 3600, rest % 3600 / 60, rest % 60);
    let _ = write!(out, "T{h:02}:{m:02}:{s:02}");
    if let Some(micros) = subsec_micros {
        let _ = write!(out, ".{micros:06}");
    }
    out.push('Z');
}

/// ISO-8601-ish duration: `P1DT2H3M4.000005S`, leading `-` when negative.
fn render_interval(micros: i64, out: &mut String) {
    if micros < 0 {
        out.push('-');
    }
    let mut rest = micros.unsigned_abs();
    out.push('P');
    let days = rest / (SECONDS_PER_DAY * MICROS_PER_SECOND);
    if days > 0 {
        rest -= days * SECONDS_PER_DAY * MICROS_PER_SECOND;
        let _ = write!(out, "{days}D");
    }
    if rest > 0 {
        out.push('T');
    }
    let hours = rest / (3_600 * MICROS_PER_SECOND);
    if hours > 0 {
        rest -= hours * 3_600 * MICROS_PER_SECOND;
        let _ = write!(out, "{hours}H");
    }
    let minutes = rest / (60 * MICROS_PER_SECOND);
    if minutes > 0 {
        rest -= minutes * 60 * MICROS_PER_SECOND;
        let _ = write!(out, "{minutes}M");
    }
    if rest > 0 {
        let _ = write!(
            out,
            "{}.{:06}S",
            rest / MICROS_PER_SECOND,
            rest % MICROS_PER_SECOND
        );
    }
}

fn render_uuid(bytes: &[u8; 16], out: &mut String) {
    for (i, byte) in bytes.iter().enumerate() {
        if i == 4 || i == 6 || i == 8 || i == 10 {
            out.push('-');
        }
        let _ = write!(out, "{byte:02x}");
    }
}

/// Timestamp cast destinations resolve against the Unix epoch.
pub(crate) fn system_time_from_micros(micros: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(micros)
}

pub(crate) fn system_time_from_secs(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub(crate) fn system_time_from_days(days: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(days * SECONDS_PER_DAY)
}
