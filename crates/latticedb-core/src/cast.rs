//! Safe casts from values into caller-supplied native destinations.
//!
//! Every scalar kind accepts an explicit set of destination kinds; anything
//! else is a `Cast` error. Signed and unsigned widths only widen, never
//! narrow. Before the destination is consulted, [`Value::cast_to`] resolves
//! delegating shapes: an optional with a payload delegates to it (an empty
//! one is an `OptionalNil` error), a one-element tuple delegates to its
//! element, and a variant delegates to the held element. Other containers
//! refuse every destination.

use std::time::{Duration, SystemTime};

use crate::error::{Error, ErrorKind, Result};
use crate::value::{system_time_from_days, system_time_from_micros, system_time_from_secs, Value};

/// A native destination kind for [`Value::cast_to`].
///
/// The accept matrix, by source kind:
///
/// | source | destinations |
/// |---|---|
/// | Bool | `bool`, `String` |
/// | Int8 | `String`, `Vec<u8>`, `i8`..`i64`, `f32`, `f64` |
/// | Int16 | `String`, `Vec<u8>`, `i16`..`i64`, `f32`, `f64` |
/// | Int32 | `String`, `Vec<u8>`, `i32`, `i64`, `f32`, `f64` |
/// | Int64 | `String`, `Vec<u8>`, `i64`, `f64` |
/// | Uint8 | `String`, `Vec<u8>`, `u8`..`u64`, `i16`..`i64`, `f32`, `f64` |
/// | Uint16 | `String`, `Vec<u8>`, `u16`..`u64`, `i32`, `i64`, `f32`, `f64` |
/// | Uint32 | `String`, `Vec<u8>`, `u32`, `u64`, `i64`, `f64` |
/// | Uint64 | `String`, `Vec<u8>`, `u64` |
/// | Float | `String`, `Vec<u8>`, `f32`, `f64` |
/// | Double | `String`, `Vec<u8>`, `f64` |
/// | Date | `SystemTime`, `u64`, `i64`, `i32` |
/// | Datetime | `SystemTime`, `u64`, `i64`, `u32` |
/// | Timestamp | `SystemTime`, `u64` |
/// | Interval | `Duration` (non-negative), `i64` |
/// | Text family | `String`, `Vec<u8>` |
/// | Bytes, Yson | `String`, `Vec<u8>` |
/// | Uuid | `String` (raw 16 bytes), `Vec<u8>`, `[u8; 16]` |
/// | Decimal, containers, Void | none |
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl Value {
    /// Casts into the caller's destination slot, per the matrix on
    /// [`FromValue`].
    pub fn cast_to<T: FromValue>(&self, dst: &mut T) -> Result<()> {
        *dst = T::from_value(self.cast_source()?)?;
        Ok(())
    }

    /// Resolves the delegation chain down to the value that actually meets
    /// the destination matrix.
    fn cast_source(&self) -> Result<&Value> {
        match self {
            Value::Optional {
                value: Some(inner), ..
            } => inner.cast_source(),
            Value::Optional { value: None, .. } => Err(ErrorKind::OptionalNil.into()),
            Value::Tuple(items) if items.len() == 1 => items[0].cast_source(),
            Value::Variant { value, .. } => value.cast_source(),
            other => Ok(other),
        }
    }
}

fn cast_err(value: &Value, target: &'static str) -> Error {
    ErrorKind::Cast {
        value: value.to_string(),
        target,
    }
    .into()
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<bool> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(cast_err(other, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<String> {
        let out = match value {
            Value::Bool(v) => v.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Uint8(v) => v.to_string(),
            Value::Uint16(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Text(s)
            | Value::Json(s)
            | Value::JsonDocument(s)
            | Value::DyNumber(s)
            | Value::TzDate(s)
            | Value::TzDatetime(s)
            | Value::TzTimestamp(s) => s.clone(),
            Value::Bytes(b) | Value::Yson(b) => String::from_utf8_lossy(b).into_owned(),
            // The raw 16 bytes, not the hyphenated rendering.
            Value::Uuid(b) => String::from_utf8_lossy(b).into_owned(),
            other => return Err(cast_err(other, "string")),
        };
        Ok(out)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Vec<u8>> {
        let out = match value {
            Value::Int8(v) => v.to_string().into_bytes(),
            Value::Int16(v) => v.to_string().into_bytes(),
            Value::Int32(v) => v.to_string().into_bytes(),
            Value::Int64(v) => v.to_string().into_bytes(),
            Value::Uint8(v) => v.to_string().into_bytes(),
            Value::Uint16(v) => v.to_string().into_bytes(),
            Value::Uint32(v) => v.to_string().into_bytes(),
            Value::Uint64(v) => v.to_string().into_bytes(),
            Value::Float(v) => v.to_string().into_bytes(),
            Value::Double(v) => v.to_string().into_bytes(),
            Value::Text(s)
            | Value::Json(s)
            | Value::JsonDocument(s)
            | Value::DyNumber(s)
            | Value::TzDate(s)
            | Value::TzDatetime(s)
            | Value::TzTimestamp(s) => s.clone().into_bytes(),
            Value::Bytes(b) | Value::Yson(b) => b.clone(),
            Value::Uuid(b) => b.to_vec(),
            other => return Err(cast_err(other, "bytes")),
        };
        Ok(out)
    }
}

impl FromValue for i8 {
    fn from_value(value: &Value) -> Result<i8> {
        match value {
            Value::Int8(v) => Ok(*v),
            other => Err(cast_err(other, "i8")),
        }
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> Result<i16> {
        match value {
            Value::Int8(v) => Ok(*v as i16),
            Value::Int16(v) => Ok(*v),
            Value::Uint8(v) => Ok(*v as i16),
            other => Err(cast_err(other, "i16")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<i32> {
        match value {
            Value::Int8(v) => Ok(*v as i32),
            Value::Int16(v) => Ok(*v as i32),
            Value::Int32(v) => Ok(*v),
            Value::Uint8(v) => Ok(*v as i32),
            Value::Uint16(v) => Ok(*v as i32),
            Value::Date(v) => Ok(*v as i32),
            other => Err(cast_err(other, "i32")),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<i64> {
        match value {
            Value::Int8(v) => Ok(*v as i64),
            Value::Int16(v) => Ok(*v as i64),
            Value::Int32(v) => Ok(*v as i64),
            Value::Int64(v) => Ok(*v),
            Value::Uint8(v) => Ok(*v as i64),
            Value::Uint16(v) => Ok(*v as i64),
            Value::Uint32(v) => Ok(*v as i64),
            Value::Date(v) => Ok(*v as i64),
            Value::Datetime(v) => Ok(*v as i64),
            Value::Interval(v) => Ok(*v),
            other => Err(cast_err(other, "i64")),
        }
    }
}

impl FromValue for u8 {
    fn from_value(value: &Value) -> Result<u8> {
        match value {
            Value::Uint8(v) => Ok(*v),
            other => Err(cast_err(other, "u8")),
        }
    }
}

impl FromValue for u16 {
    fn from_value(value: &Value) -> Result<u16> {
        match value {
            Value::Uint8(v) => Ok(*v as u16),
            Value::Uint16(v) => Ok(*v),
            other => Err(cast_err(other, "u16")),
        }
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Result<u32> {
        match value {
            Value::Uint8(v) => Ok(*v as u32),
            Value::Uint16(v) => Ok(*v as u32),
            Value::Uint32(v) => Ok(*v),
            Value::Datetime(v) => Ok(*v),
            other => Err(cast_err(other, "u32")),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<u64> {
        match value {
            Value::Uint8(v) => Ok(*v as u64),
            Value::Uint16(v) => Ok(*v as u64),
            Value::Uint32(v) => Ok(*v as u64),
            Value::Uint64(v) => Ok(*v),
            Value::Date(v) => Ok(*v as u64),
            Value::Datetime(v) => Ok(*v as u64),
            Value::Timestamp(v) => Ok(*v),
            other => Err(cast_err(other, "u64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<f32> {
        match value {
            Value::Int8(v) => Ok(*v as f32),
            Value::Int16(v) => Ok(*v as f32),
            Value::Int32(v) => Ok(*v as f32),
            Value::Uint8(v) => Ok(*v as f32),
            Value::Uint16(v) => Ok(*v as f32),
            Value::Float(v) => Ok(*v),
            other => Err(cast_err(other, "f32")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<f64> {
        match value {
            Value::Int8(v) => Ok(*v as f64),
            Value::Int16(v) => Ok(*v as f64),
            Value::Int32(v) => Ok(*v as f64),
            Value::Int64(v) => Ok(*v as f64),
            Value::Uint8(v) => Ok(*v as f64),
            Value::Uint16(v) => Ok(*v as f64),
            Value::Uint32(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            other => Err(cast_err(other, "f64")),
        }
    }
}

impl FromValue for [u8; 16] {
    fn from_value(value: &Value) -> Result<[u8; 16]> {
        match value {
            Value::Uuid(b) => Ok(*b),
            other => Err(cast_err(other, "[u8; 16]")),
        }
    }
}

impl FromValue for SystemTime {
    fn from_value(value: &Value) -> Result<SystemTime> {
        match value {
            Value::Date(days) => Ok(system_time_from_days(*days as u64)),
            Value::Datetime(secs) => Ok(system_time_from_secs(*secs as u64)),
            Value::Timestamp(micros) => Ok(system_time_from_micros(*micros)),
            other => Err(cast_err(other, "SystemTime")),
        }
    }
}

impl FromValue for Duration {
    fn from_value(value: &Value) -> Result<Duration> {
        match value {
            // std has no signed duration; the i64 destination is the
            // lossless path for negative intervals.
            Value::Interval(micros) if *micros >= 0 => Ok(Duration::from_micros(*micros as u64)),
            other => Err(cast_err(other, "Duration")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use crate::wire::Primitive;

    fn accepts(value: &Value) -> Vec<&'static str> {
        let mut ok = Vec::new();
        macro_rules! probe {
            ($name:literal, $ty:ty) => {
                let mut slot: $ty = Default::default();
                if value.cast_to(&mut slot).is_ok() {
                    ok.push($name);
                }
            };
        }
        probe!("bool", bool);
        probe!("string", String);
        probe!("bytes", Vec<u8>);
        probe!("i8", i8);
        probe!("i16", i16);
        probe!("i32", i32);
        probe!("i64", i64);
        probe!("u8", u8);
        probe!("u16", u16);
        probe!("u32", u32);
        probe!("u64", u64);
        probe!("f32", f32);
        probe!("f64", f64);
        probe!("uuid", [u8; 16]);
        probe!("duration", Duration);
        let mut t = SystemTime::UNIX_EPOCH;
        if value.cast_to(&mut t).is_ok() {
            ok.push("time");
        }
        ok
    }

    #[test]
    fn scalar_accept_matrix() {
        let cases: Vec<(Value, Vec<&'static str>)> = vec![
            (Value::Bool(true), vec!["bool", "string"]),
            (
                Value::Int8(5),
                vec!["string", "bytes", "i8", "i16", "i32", "i64", "f32", "f64"],
            ),
            (
                Value::Int16(5),
                vec!["string", "bytes", "i16", "i32", "i64", "f32", "f64"],
            ),
            (
                Value::Int32(5),
                vec!["string", "bytes", "i32", "i64", "f32", "f64"],
            ),
            (Value::Int64(5), vec!["string", "bytes", "i64", "f64"]),
            (
                Value::Uint8(5),
                vec![
                    "string", "bytes", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32",
                    "f64",
                ],
            ),
            (
                Value::Uint16(5),
                vec!["string", "bytes", "i32", "i64", "u16", "u32", "u64", "f32", "f64"],
            ),
            (
                Value::Uint32(5),
                vec!["string", "bytes", "i64", "u32", "u64", "f64"],
            ),
            (Value::Uint64(5), vec!["string", "bytes", "u64"]),
            (Value::Float(0.5), vec!["string", "bytes", "f32", "f64"]),
            (Value::Double(0.5), vec!["string", "bytes", "f64"]),
            (Value::Date(1), vec!["i32", "i64", "u64", "time"]),
            (Value::Datetime(1), vec!["i64", "u32", "u64", "time"]),
            (Value::Timestamp(1), vec!["u64", "time"]),
            (Value::Interval(1), vec!["i64", "duration"]),
            (Value::Interval(-1), vec!["i64"]),
            (Value::Text("x".into()), vec!["string", "bytes"]),
            (Value::Bytes(vec![1]), vec!["string", "bytes"]),
            (Value::Json("{}".into()), vec!["string", "bytes"]),
            (Value::Uuid([7; 16]), vec!["string", "bytes", "uuid"]),
            (
                Value::Decimal(crate::decimal::Decimal::from_i128(1, 22, 9)),
                vec![],
            ),
            (Value::Void, vec![]),
        ];
        for (value, expected) in &cases {
            let mut got = accepts(value);
            let mut want = expected.clone();
            got.sort_unstable();
            want.sort_unstable();
            assert_eq!(got, want, "destination set for {value}");
        }
    }

    #[test]
    fn int8_to_string_and_bool_scenario() {
        let mut s = String::new();
        Value::Int8(5).cast_to(&mut s).unwrap();
        assert_eq!(s, "5");

        let mut b = false;
        let err = Value::Int8(5).cast_to(&mut b).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Cast { .. }));
    }

    #[test]
    fn optional_delegates_and_nil_refuses() {
        let mut n = 0i32;
        Value::optional_value(Value::Int32(42))
            .cast_to(&mut n)
            .unwrap();
        assert_eq!(n, 42);

        let err = Value::null_value(Type::Primitive(Primitive::Int32))
            .cast_to(&mut n)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OptionalNil));

        // Delegation unwraps nesting all the way down.
        Value::optional_value(Value::optional_value(Value::Int32(7)))
            .cast_to(&mut n)
            .unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn one_element_tuple_delegates() {
        let mut n = 0i32;
        Value::Tuple(vec![Value::Int32(3)]).cast_to(&mut n).unwrap();
        assert_eq!(n, 3);

        let err = Value::Tuple(vec![Value::Int32(3), Value::Int32(4)])
            .cast_to(&mut n)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Cast { .. }));
    }

    #[test]
    fn variant_delegates_to_its_element() {
        let inner = Type::tuple(vec![
            Type::Primitive(Primitive::Int32),
            Type::Primitive(Primitive::Text),
        ]);
        let mut s = String::new();
        Value::variant_tuple(inner, 1, Value::Text("alt".into()))
            .cast_to(&mut s)
            .unwrap();
        assert_eq!(s, "alt");
    }

    #[test]
    fn containers_refuse_casts() {
        let mut s = String::new();
        assert!(Value::list_value(vec![Value::Int32(1)])
            .cast_to(&mut s)
            .is_err());
        assert!(Value::struct_value(vec![("a".into(), Value::Int32(1))])
            .cast_to(&mut s)
            .is_err());
        assert!(Value::dict_value(vec![(Value::Text("k".into()), Value::Int32(1))])
            .cast_to(&mut s)
            .is_err());
    }

    #[test]
    fn uuid_string_is_raw_bytes() {
        let mut s = String::new();
        Value::Uuid(*b"0123456789abcdef").cast_to(&mut s).unwrap();
        assert_eq!(s, "0123456789abcdef");
    }

    #[test]
    fn temporal_destinations() {
        let mut t = SystemTime::UNIX_EPOCH;
        Value::Timestamp(1_500_000).cast_to(&mut t).unwrap();
        assert_eq!(t, SystemTime::UNIX_EPOCH + Duration::from_micros(1_500_000));

        let mut d = Duration::default();
        Value::Interval(2_000_000).cast_to(&mut d).unwrap();
        assert_eq!(d, Duration::from_secs(2));
    }
}
