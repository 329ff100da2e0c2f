//! End-to-end checks of the typed value model against the wire schema.

use latticedb::{Arena, Decimal, Primitive, StructField, Type, Value, ValueKind};

fn int32() -> Type {
    Type::Primitive(Primitive::Int32)
}

fn text() -> Type {
    Type::Primitive(Primitive::Text)
}

// ========================== Encoding scenarios ==========================

#[test]
fn optional_int32_is_a_bare_leaf_with_optional_type() {
    let v = Value::optional_value(Value::Int32(-1));
    let mut arena = Arena::pooled();
    let wire = v.to_typed(&mut arena);
    assert_eq!(Type::from_wire(&arena, wire.ty).unwrap().to_string(), "Optional<Int32>");
    assert_eq!(arena.value_node(wire.value).kind, ValueKind::Int32(-1));
}

#[test]
fn null_int32_is_a_null_flag_with_optional_type() {
    let v = Value::null_value(int32());
    let mut arena = Arena::pooled();
    let wire = v.to_typed(&mut arena);
    assert_eq!(Type::from_wire(&arena, wire.ty).unwrap().to_string(), "Optional<Int32>");
    assert_eq!(arena.value_node(wire.value).kind, ValueKind::NullFlag);
}

#[test]
fn struct_fields_travel_in_name_order() {
    let v = Value::struct_value(vec![
        ("b".to_string(), Value::Text("y".to_string())),
        ("a".to_string(), Value::Int32(1)),
    ]);
    let mut arena = Arena::pooled();
    let wire = v.to_typed(&mut arena);
    assert_eq!(
        Type::from_wire(&arena, wire.ty).unwrap().to_string(),
        "Struct<a:Int32,b:Text>"
    );
    let node = arena.value_node(wire.value);
    assert_eq!(arena.value_node(node.items[0]).kind, ValueKind::Int32(1));
    assert_eq!(
        arena.value_node(node.items[1]).kind,
        ValueKind::Text("y".to_string())
    );
}

#[test]
fn struct_permutations_encode_identically() {
    let ab = Value::struct_value(vec![
        ("b".to_string(), Value::Int32(1)),
        ("a".to_string(), Value::Int32(2)),
    ]);
    let ba = Value::struct_value(vec![
        ("a".to_string(), Value::Int32(2)),
        ("b".to_string(), Value::Int32(1)),
    ]);
    let mut arena = Arena::pooled();
    let left = ab.to_wire(&mut arena);
    let right = ba.to_wire(&mut arena);
    let render = |id| {
        let node = arena.value_node(id);
        node.items
            .iter()
            .map(|item| format!("{:?}", arena.value_node(*item).kind))
            .collect::<Vec<_>>()
    };
    assert_eq!(render(left), render(right));
}

// ========================== Round-trips ==========================

fn roundtrip(v: &Value) -> Value {
    let mut arena = Arena::pooled();
    let wire = v.to_typed(&mut arena);
    Value::from_typed(&arena, wire).expect("decode what we encoded")
}

#[test]
fn values_survive_the_wire() {
    let samples = vec![
        Value::Bool(false),
        Value::Int32(i32::MIN),
        Value::Uint64(u64::MAX),
        Value::Double(2.5),
        Value::Text("snowflake".into()),
        Value::Uuid(*b"fedcba9876543210"),
        Value::Decimal(Decimal::from_i128(-42, 22, 9)),
        Value::optional_value(Value::Int32(-1)),
        Value::null_value(int32()),
        Value::list_value(vec![Value::Text("a".into()), Value::Text("b".into())]),
        Value::Tuple(vec![Value::Bool(true), Value::Uint8(9)]),
        Value::struct_value(vec![
            ("xs".to_string(), Value::list_value(vec![Value::Int32(5)])),
            ("name".to_string(), Value::Text("row".into())),
        ]),
        Value::dict_value(vec![
            (Value::Text("k".into()), Value::optional_value(Value::Int32(1))),
            (Value::Text("j".into()), Value::null_value(int32())),
        ]),
        Value::variant_struct(
            Type::struct_type(vec![
                StructField::new("num", int32()),
                StructField::new("txt", text()),
            ]),
            1,
            Value::Text("picked".into()),
        ),
        Value::Void,
    ];
    for v in &samples {
        assert_eq!(&roundtrip(v), v, "round-trip changed {v}");
    }
}

#[test]
fn optional_nesting_is_preserved() {
    // NULL at each depth of Optional<Optional<Int32>> is a distinct shape.
    let outer_null = Value::null_value(Type::optional(int32()));
    let inner_null = Value::optional_value(Value::null_value(int32()));
    let present = Value::optional_value(Value::optional_value(Value::Int32(1)));
    assert_ne!(outer_null, inner_null);

    let mut arena = Arena::pooled();
    let outer_wire = outer_null.to_wire(&mut arena);
    let inner_wire = inner_null.to_wire(&mut arena);
    assert_eq!(arena.value_node(outer_wire).kind, ValueKind::NullFlag);
    assert!(matches!(
        arena.value_node(inner_wire).kind,
        ValueKind::Nested(_)
    ));
    drop(arena);

    for v in [outer_null, inner_null, present] {
        assert_eq!(roundtrip(&v), v);
    }
}

// ========================== Casts ==========================

#[test]
fn casts_follow_the_documented_matrix() {
    let mut s = String::new();
    Value::Int8(5).cast_to(&mut s).unwrap();
    assert_eq!(s, "5");

    let mut b = false;
    assert!(Value::Int8(5).cast_to(&mut b).is_err());

    let mut wide = 0i64;
    Value::Int8(-5).cast_to(&mut wide).unwrap();
    assert_eq!(wide, -5);

    let mut narrow = 0i8;
    assert!(Value::Int64(5).cast_to(&mut narrow).is_err());

    let mut raw = [0u8; 16];
    Value::Uuid(*b"0123456789abcdef").cast_to(&mut raw).unwrap();
    assert_eq!(&raw, b"0123456789abcdef");
}

// ========================== Decimal ==========================

#[test]
fn decimal_zero_renders_and_travels_as_zero_bytes() {
    let zero = Value::zero(&Type::decimal(22, 9));
    assert_eq!(zero.raw_string(), "0.000000000");
    let mut arena = Arena::pooled();
    let wire = zero.to_typed(&mut arena);
    let node = arena.value_node(wire.value);
    assert_eq!(node.high_128, 0);
    assert_eq!(node.kind, ValueKind::Low128(0));
    assert_eq!(Value::from_typed(&arena, wire).unwrap(), zero);
}

#[test]
fn decimal_unscaled_roundtrip_under_precision() {
    for n in [0i128, 1, -1, 999_999_999, -123_456_789_012_345_678] {
        let d = Decimal::from_i128(n, 22, 9);
        assert_eq!(Decimal::from_bytes(*d.bytes(), 22, 9).to_i128(), n);
    }
}
