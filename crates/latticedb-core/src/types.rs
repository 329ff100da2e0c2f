//! In-memory type descriptors and their wire conversions.

use std::fmt;

use crate::arena::Arena;
use crate::error::{ErrorKind, Result};
use crate::wire::{Primitive, TypeId, TypeNode};

/// One field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Algebraic description of a datatype.
///
/// Equality is structural: `Decimal` compares `(precision, scale)`, struct
/// fields compare as ordered `(name, type)` pairs, and every `Optional`
/// level counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(Primitive),
    Optional(Box<Type>),
    List(Box<Type>),
    EmptyList,
    Tuple(Vec<Type>),
    Struct(Vec<StructField>),
    Dict(Box<Type>, Box<Type>),
    EmptyDict,
    Decimal { precision: u32, scale: u32 },
    Variant(Box<Type>),
    Void,
    Null,
}

impl Type {
    pub fn optional(inner: Type) -> Type {
        Type::Optional(Box::new(inner))
    }

    pub fn list(item: Type) -> Type {
        Type::List(Box::new(item))
    }

    pub fn tuple(items: Vec<Type>) -> Type {
        Type::Tuple(items)
    }

    /// Builds a struct type with fields canonicalized by ascending name.
    ///
    /// Panics on duplicate field names; those are unrepresentable.
    pub fn struct_type(mut fields: Vec<StructField>) -> Type {
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in fields.windows(2) {
            if pair[0].name == pair[1].name {
                panic!("duplicate struct field name: {}", pair[0].name);
            }
        }
        Type::Struct(fields)
    }

    pub fn dict(key: Type, value: Type) -> Type {
        Type::Dict(Box::new(key), Box::new(value))
    }

    pub fn decimal(precision: u32, scale: u32) -> Type {
        Type::Decimal { precision, scale }
    }

    /// Builds a variant type. The inner type must be a tuple or a struct;
    /// anything else is a construction bug and panics.
    pub fn variant(inner: Type) -> Type {
        match inner {
            Type::Tuple(_) | Type::Struct(_) => Type::Variant(Box::new(inner)),
            other => panic!("variant inner type must be a tuple or struct, got {other}"),
        }
    }

    /// Builds the tree-shaped wire description inside `arena`.
    pub fn to_wire(&self, arena: &mut Arena) -> TypeId {
        match self {
            Type::Primitive(p) => arena.primitive(*p),
            Type::Optional(inner) => {
                let inner = inner.to_wire(arena);
                arena.alloc_type(TypeNode::Optional(inner))
            }
            Type::List(item) => {
                let item = item.to_wire(arena);
                arena.alloc_type(TypeNode::List(item))
            }
            Type::EmptyList => arena.alloc_type(TypeNode::EmptyList),
            Type::Tuple(items) => {
                let ids = items.iter().map(|t| t.to_wire(arena)).collect();
                arena.alloc_type(TypeNode::Tuple(ids))
            }
            Type::Struct(fields) => {
                let ids = fields
                    .iter()
                    .map(|f| (f.name.clone(), f.ty.to_wire(arena)))
                    .collect();
                arena.alloc_type(TypeNode::Struct(ids))
            }
            Type::Dict(key, value) => {
                let key = key.to_wire(arena);
                let value = value.to_wire(arena);
                arena.alloc_type(TypeNode::Dict { key, value })
            }
            Type::EmptyDict => arena.alloc_type(TypeNode::EmptyDict),
            Type::Decimal { precision, scale } => arena.alloc_type(TypeNode::Decimal {
                precision: *precision,
                scale: *scale,
            }),
            Type::Variant(inner) => {
                let inner = inner.to_wire(arena);
                arena.alloc_type(TypeNode::Variant(inner))
            }
            Type::Void => arena.alloc_type(TypeNode::Void),
            Type::Null => arena.alloc_type(TypeNode::Null),
        }
    }

    /// Rebuilds an in-memory type from its wire description, allocating
    /// fresh nodes.
    pub fn from_wire(arena: &Arena, id: TypeId) -> Result<Type> {
        let ty = match arena.type_node(id) {
            TypeNode::Primitive(p) => Type::Primitive(*p),
            TypeNode::Optional(inner) => Type::optional(Type::from_wire(arena, *inner)?),
            TypeNode::List(item) => Type::list(Type::from_wire(arena, *item)?),
            TypeNode::EmptyList => Type::EmptyList,
            TypeNode::Tuple(items) => Type::Tuple(
                items
                    .iter()
                    .map(|t| Type::from_wire(arena, *t))
                    .collect::<Result<_>>()?,
            ),
            TypeNode::Struct(fields) => Type::Struct(
                fields
                    .iter()
                    .map(|(name, t)| Ok(StructField::new(name.clone(), Type::from_wire(arena, *t)?)))
                    .collect::<Result<_>>()?,
            ),
            TypeNode::Dict { key, value } => Type::dict(
                Type::from_wire(arena, *key)?,
                Type::from_wire(arena, *value)?,
            ),
            TypeNode::EmptyDict => Type::EmptyDict,
            TypeNode::Decimal { precision, scale } => Type::decimal(*precision, *scale),
            TypeNode::Variant(inner) => {
                let inner = Type::from_wire(arena, *inner)?;
                match inner {
                    Type::Tuple(_) | Type::Struct(_) => Type::Variant(Box::new(inner)),
                    other => {
                        return Err(ErrorKind::Decode(format!(
                            "variant inner type on wire is {other}, expected tuple or struct"
                        ))
                        .into())
                    }
                }
            }
            TypeNode::Void => Type::Void,
            TypeNode::Null => Type::Null,
        };
        Ok(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => f.write_str(p.name()),
            Type::Optional(inner) => write!(f, "Optional<{inner}>"),
            Type::List(item) => write!(f, "List<{item}>"),
            Type::EmptyList => f.write_str("EmptyList"),
            Type::Tuple(items) => {
                f.write_str("Tuple<")?;
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(">")
            }
            Type::Struct(fields) => {
                f.write_str("Struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i != 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", field.name, field.ty)?;
                }
                f.write_str(">")
            }
            Type::Dict(key, value) => write!(f, "Dict<{key},{value}>"),
            Type::EmptyDict => f.write_str("EmptyDict"),
            Type::Decimal { precision, scale } => write!(f, "Decimal({precision},{scale})"),
            Type::Variant(inner) => write!(f, "Variant<{inner}>"),
            Type::Void => f.write_str("Void"),
            Type::Null => f.write_str("Null"),
        }
    }
}
