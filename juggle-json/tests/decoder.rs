use juggle_core::{IntWidth, Shape, Slot, StructShapeBuilder};
use juggle_json::{DecodeOptions, Decoder, from_str};

#[test]
fn decodes_a_stream_of_values() {
    let shape = Shape::int(IntWidth::I64).into_ref();
    let mut decoder = Decoder::from_str(" 1 \"2\" 3.9 ");
    let mut out = Vec::new();
    while decoder.has_more() {
        let mut slot = shape.empty_slot();
        decoder.decode(&mut slot, &shape).unwrap();
        out.push(slot);
    }
    assert_eq!(out, vec![Slot::Int(1), Slot::Int(2), Slot::Int(3)]);
}

#[test]
fn stream_can_switch_target_shapes() {
    let int_shape = Shape::int(IntWidth::I64).into_ref();
    let string_shape = Shape::string().into_ref();
    let mut decoder = Decoder::from_str("true false");
    let mut int_slot = int_shape.empty_slot();
    decoder.decode(&mut int_slot, &int_shape).unwrap();
    let mut string_slot = string_shape.empty_slot();
    decoder.decode(&mut string_slot, &string_shape).unwrap();
    assert_eq!(int_slot, Slot::Int(1));
    assert_eq!(string_slot, Slot::String(String::new()));
    assert!(!decoder.has_more());
}

#[test]
fn invalid_target_fails_before_consuming_input() {
    let shape = Shape::pointer(Shape::bool().into_ref()).into_ref();
    let mut decoder = Decoder::from_str("true false");
    let mut null_target = Slot::Pointer(None);
    let err = decoder.decode(&mut null_target, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::invalid_target");
    // The value is still there for a valid target.
    let mut target = Slot::reference(Slot::Bool(false));
    decoder.decode(&mut target, &shape).unwrap();
    assert_eq!(target, Slot::reference(Slot::Bool(true)));
    assert!(decoder.has_more());
}

#[test]
fn mismatched_target_shape_is_invalid() {
    let shape = Shape::string().into_ref();
    let mut slot = Slot::Bool(false);
    let err = from_str("\"x\"", &mut slot, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::invalid_target");
}

#[test]
fn depth_limit_applies_per_decode_call() {
    let shape = Shape::slice(Shape::slice(Shape::int(IntWidth::I64).into_ref()).into_ref())
        .into_ref();
    let options = DecodeOptions {
        max_depth: 2,
        ..DecodeOptions::default()
    };
    let mut decoder = Decoder::with_options(b"[[1]] [[1]]", options);
    let mut slot = shape.empty_slot();
    let err = decoder.decode(&mut slot, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::depth_limit");
    // The failed value was consumed; the next one fails the same way.
    let mut slot = shape.empty_slot();
    let err = decoder.decode(&mut slot, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::depth_limit");
    assert!(!decoder.has_more());
}

#[test]
fn default_depth_limit_handles_reasonable_nesting() {
    let mut shape = Shape::int(IntWidth::I64).into_ref();
    let mut input = String::from("7");
    for _ in 0..100 {
        shape = Shape::slice(shape).into_ref();
        input = format!("[{input}]");
    }
    let mut slot = shape.empty_slot();
    from_str(&input, &mut slot, &shape).unwrap();
}

#[test]
fn parse_errors_surface_with_offsets() {
    let shape = Shape::bool().into_ref();
    let mut slot = shape.empty_slot();
    let err = from_str("[1, ]", &mut slot, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::parse");
    assert!(err.to_string().contains("offset 4"), "{err}");
}

#[test]
fn decoder_methods_toggle_options() {
    let shape = StructShapeBuilder::new("Rec")
        .field("x", Shape::int(IntWidth::I64).into_ref())
        .build();
    let mut decoder = Decoder::from_str("{\"y\": 1}");
    decoder.disallow_unknown_fields();
    let mut slot = shape.empty_slot();
    let err = decoder.decode(&mut slot, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::unknown_field");

    let dynamic = Shape::dynamic().into_ref();
    let mut decoder = Decoder::from_str("1.50");
    decoder.use_literal_numbers();
    let mut slot = dynamic.empty_slot();
    decoder.decode(&mut slot, &dynamic).unwrap();
    assert_eq!(
        slot,
        Slot::Dynamic(juggle_core::Dynamic::Number("1.50".into()))
    );
}

#[test]
fn failed_decode_keeps_earlier_mutations() {
    // Decoding is not atomic: elements before the failing one stay written.
    let shape = Shape::slice(Shape::int(IntWidth::I64).into_ref()).into_ref();
    let mut slot = shape.empty_slot();
    let err = from_str("[1, 2, \"abc\"]", &mut slot, &shape).unwrap_err();
    assert_eq!(err.kind.code(), "juggle::type_mismatch");
    let Slot::Slice(items) = &slot else {
        panic!("expected slice")
    };
    assert_eq!(items[0], Slot::Int(1));
    assert_eq!(items[1], Slot::Int(2));
}
