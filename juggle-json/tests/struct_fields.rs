use juggle_core::{IntWidth, Shape, ShapeRef, Slot, StructShapeBuilder};
use juggle_json::{DecodeOptions, from_str, from_str_with_options};

fn i64_shape() -> ShapeRef {
    Shape::int(IntWidth::I64).into_ref()
}

fn decode(input: &str, shape: &ShapeRef) -> Slot {
    let mut slot = shape.empty_slot();
    from_str(input, &mut slot, shape).unwrap();
    slot
}

#[test]
fn fields_match_by_name() {
    let shape = StructShapeBuilder::new("Point")
        .field("x", i64_shape())
        .field("y", i64_shape())
        .build();
    let slot = decode("{\"x\": 1, \"y\": 2}", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::Int(1), Slot::Int(2)]));
}

#[test]
fn renamed_field_matches_its_tag_name() {
    let shape = StructShapeBuilder::new("Msg")
        .renamed_field("body", "payload", Shape::string().into_ref())
        .build();
    let slot = decode("{\"payload\": \"hi\"}", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::String("hi".into())]));
    // The identifier itself no longer matches exactly, but the
    // case-insensitive fallback does not apply across different names.
    let slot = decode("{\"body\": \"hi\"}", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::String(String::new())]));
}

#[test]
fn case_insensitive_fallback() {
    let shape = StructShapeBuilder::new("Point")
        .field("x", i64_shape())
        .build();
    let slot = decode("{\"X\": 5}", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::Int(5)]));
}

#[test]
fn unknown_fields_are_skipped_by_default() {
    let shape = StructShapeBuilder::new("Point")
        .field("x", i64_shape())
        .build();
    let slot = decode("{\"x\": 1, \"z\": 9}", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::Int(1)]));
}

#[test]
fn strict_mode_rejects_unknown_fields() {
    let shape = StructShapeBuilder::new("Point")
        .field("x", i64_shape())
        .build();
    let options = DecodeOptions {
        disallow_unknown_fields: true,
        ..DecodeOptions::default()
    };
    let mut slot = shape.empty_slot();
    let err = from_str_with_options("{\"z\": 9}", &mut slot, &shape, &options).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::unknown_field");
    assert!(err.to_string().contains("Point"));
}

#[test]
fn ignored_fields_never_decode() {
    let shape = StructShapeBuilder::new("Rec")
        .ignored_field("secret", Shape::string().into_ref())
        .field("name", Shape::string().into_ref())
        .build();
    let slot = decode("{\"secret\": \"x\", \"name\": \"n\"}", &shape);
    assert_eq!(
        slot,
        Slot::Struct(vec![Slot::String(String::new()), Slot::String("n".into())])
    );
}

#[test]
fn embedded_struct_fields_are_promoted() {
    let base = StructShapeBuilder::new("Base")
        .field("id", i64_shape())
        .build();
    let shape = StructShapeBuilder::new("Rec")
        .embedded_field("Base", base)
        .field("name", Shape::string().into_ref())
        .build();
    let slot = decode("{\"id\": 3, \"name\": \"n\"}", &shape);
    assert_eq!(
        slot,
        Slot::Struct(vec![
            Slot::Struct(vec![Slot::Int(3)]),
            Slot::String("n".into()),
        ])
    );
}

#[test]
fn embedded_pointer_is_allocated_on_demand() {
    let base = StructShapeBuilder::new("Base")
        .field("id", i64_shape())
        .build();
    let shape = StructShapeBuilder::new("Rec")
        .embedded_field("Base", Shape::pointer(base).into_ref())
        .build();
    let slot = decode("{\"id\": 3}", &shape);
    assert_eq!(
        slot,
        Slot::Struct(vec![Slot::reference(Slot::Struct(vec![Slot::Int(3)]))])
    );
}

#[test]
fn embedded_pointer_stays_null_without_matching_keys() {
    let base = StructShapeBuilder::new("Base")
        .field("id", i64_shape())
        .build();
    let shape = StructShapeBuilder::new("Rec")
        .embedded_field("Base", Shape::pointer(base).into_ref())
        .field("name", Shape::string().into_ref())
        .build();
    let slot = decode("{\"name\": \"n\"}", &shape);
    assert_eq!(
        slot,
        Slot::Struct(vec![Slot::Pointer(None), Slot::String("n".into())])
    );
}

#[test]
fn shallow_field_shadows_embedded() {
    let base = StructShapeBuilder::new("Base")
        .field("id", i64_shape())
        .build();
    let shape = StructShapeBuilder::new("Rec")
        .embedded_field("Base", base)
        .field("id", i64_shape())
        .build();
    let slot = decode("{\"id\": 7}", &shape);
    assert_eq!(
        slot,
        Slot::Struct(vec![Slot::Struct(vec![Slot::Int(0)]), Slot::Int(7)])
    );
}

#[test]
fn annihilated_name_is_treated_as_unknown() {
    let a = StructShapeBuilder::new("A").field("id", i64_shape()).build();
    let b = StructShapeBuilder::new("B").field("id", i64_shape()).build();
    let shape = StructShapeBuilder::new("Rec")
        .embedded_field("A", a)
        .embedded_field("B", b)
        .build();
    // Two candidates at equal depth: "id" matches nothing and is skipped.
    let slot = decode("{\"id\": 7}", &shape);
    assert_eq!(
        slot,
        Slot::Struct(vec![
            Slot::Struct(vec![Slot::Int(0)]),
            Slot::Struct(vec![Slot::Int(0)]),
        ])
    );
}

#[test]
fn duplicate_keys_decode_once_with_the_last_value() {
    // Only the last occurrence decodes; an earlier [1, 2, 3] would leave
    // the slice three elements long.
    let shape = StructShapeBuilder::new("Rec")
        .field("xs", Shape::slice(i64_shape()).into_ref())
        .build();
    let slot = decode("{\"xs\": [1, 2, 3], \"xs\": [9]}", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::Slice(vec![Slot::Int(9)])]));
}

#[test]
fn error_context_names_struct_and_field() {
    let shape = StructShapeBuilder::new("Point")
        .field("x", i64_shape())
        .build();
    let mut slot = shape.empty_slot();
    let err = from_str("{\"x\": \"abc\"}", &mut slot, &shape).unwrap_err();
    assert_eq!(err.struct_ident.as_deref(), Some("Point"));
    assert_eq!(err.field.as_deref(), Some("x"));
    let rendered = err.to_string();
    assert!(rendered.contains("Point"), "{rendered}");
    assert!(rendered.contains("x"), "{rendered}");
}

#[test]
fn error_context_does_not_leak_to_siblings() {
    let inner = StructShapeBuilder::new("Inner")
        .field("n", i64_shape())
        .build();
    let shape = StructShapeBuilder::new("Outer")
        .field("a", inner)
        .field("b", i64_shape())
        .build();
    // The failure is in "b", after "a" decoded fine; context must say so.
    let mut slot = shape.empty_slot();
    let err = from_str("{\"a\": {\"n\": 1}, \"b\": \"abc\"}", &mut slot, &shape).unwrap_err();
    assert_eq!(err.struct_ident.as_deref(), Some("Outer"));
    assert_eq!(err.field.as_deref(), Some("b"));
}

#[test]
fn nested_error_context_names_the_inner_struct() {
    let inner = StructShapeBuilder::new("Inner")
        .field("n", i64_shape())
        .build();
    let shape = StructShapeBuilder::new("Outer").field("a", inner).build();
    let mut slot = shape.empty_slot();
    let err = from_str("{\"a\": {\"n\": \"abc\"}}", &mut slot, &shape).unwrap_err();
    assert_eq!(err.struct_ident.as_deref(), Some("Inner"));
    assert_eq!(err.field.as_deref(), Some("n"));
}

#[test]
fn scalar_wraps_into_struct_at_field_zero() {
    let shape = StructShapeBuilder::new("Wrapped")
        .renamed_field("first", "0", Shape::string().into_ref())
        .build();
    let slot = decode("\"solo\"", &shape);
    assert_eq!(slot, Slot::Struct(vec![Slot::String("solo".into())]));
}

#[test]
fn null_never_touches_struct_fields() {
    let shape = StructShapeBuilder::new("Point")
        .field("x", i64_shape())
        .build();
    let mut slot = Slot::Struct(vec![Slot::Int(9)]);
    from_str("null", &mut slot, &shape).unwrap();
    assert_eq!(slot, Slot::Struct(vec![Slot::Int(9)]));
}
