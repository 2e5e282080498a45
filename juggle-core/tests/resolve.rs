//! Embedding, shadowing, and annihilation rules of the field resolver.

use juggle_core::{IntWidth, Shape, ShapeRef, StructShapeBuilder, find_field, resolve};

fn int() -> ShapeRef {
    Shape::int(IntWidth::I64).into_ref()
}

#[test]
fn shallow_field_shadows_embedded() {
    let embedded = StructShapeBuilder::new("Embedded")
        .field("level0", int())
        .field("level1", int())
        .build();
    let outer = StructShapeBuilder::new("Outer")
        .field("level0", int())
        .embedded_field("Embedded", embedded)
        .build();

    let entries = resolve(&outer);
    let level0 = find_field(&entries, "level0").expect("level0 resolves");
    assert_eq!(level0.path, [0], "outer field wins over embedded one");
    let level1 = find_field(&entries, "level1").expect("level1 resolves");
    assert_eq!(level1.path, [1, 1]);
}

#[test]
fn equal_depth_same_name_annihilates() {
    let a = StructShapeBuilder::new("A")
        .field("x", int())
        .field("only_a", int())
        .build();
    let b = StructShapeBuilder::new("B")
        .field("x", int())
        .field("only_b", int())
        .build();
    let outer = StructShapeBuilder::new("Outer")
        .embedded_field("A", a)
        .embedded_field("B", b)
        .build();

    let entries = resolve(&outer);
    assert!(find_field(&entries, "x").is_none(), "x annihilates");
    assert!(find_field(&entries, "only_a").is_some());
    assert!(find_field(&entries, "only_b").is_some());
}

#[test]
fn shallower_field_survives_deeper_annihilation() {
    // The textual name "x" collides at depth 1, but the directly declared
    // "y" tagged as "x" sits at depth 0 and is unaffected.
    let a = StructShapeBuilder::new("A2").field("x", int()).build();
    let b = StructShapeBuilder::new("B2").field("x", int()).build();
    let outer = StructShapeBuilder::new("Outer2")
        .renamed_field("y", "x", int())
        .embedded_field("A2", a)
        .embedded_field("B2", b)
        .build();

    let entries = resolve(&outer);
    let x = find_field(&entries, "x").expect("shallow x resolves");
    assert_eq!(x.path, [0]);
    assert_eq!(x.depth, 0);
}

#[test]
fn single_renamed_candidate_wins_tie() {
    let a = StructShapeBuilder::new("A3")
        .renamed_field("val", "shared", int())
        .build();
    let b = StructShapeBuilder::new("B3").field("shared", int()).build();
    let outer = StructShapeBuilder::new("Outer3")
        .embedded_field("A3", a)
        .embedded_field("B3", b)
        .build();

    let entries = resolve(&outer);
    let shared = find_field(&entries, "shared").expect("renamed candidate wins");
    assert!(shared.renamed);
    assert_eq!(shared.path, [0, 0]);
}

#[test]
fn two_renamed_candidates_still_annihilate() {
    let a = StructShapeBuilder::new("A4")
        .renamed_field("u", "shared", int())
        .build();
    let b = StructShapeBuilder::new("B4")
        .renamed_field("v", "shared", int())
        .build();
    let outer = StructShapeBuilder::new("Outer4")
        .embedded_field("A4", a)
        .embedded_field("B4", b)
        .build();

    assert!(find_field(&resolve(&outer), "shared").is_none());
}

#[test]
fn annihilation_blocks_deeper_occurrence() {
    // Mirrors the classic reflect case: X collides at depth 1 and the
    // collision also hides the X another level down.
    let with_x = |name: &'static str| StructShapeBuilder::new(name).field("X", int()).build();
    let s9 = with_x("S9");
    let s8 = StructShapeBuilder::new("S8")
        .embedded_field("S9", s9)
        .build();
    let outer = StructShapeBuilder::new("S13")
        .embedded_field("S6", with_x("S6"))
        .embedded_field("S7", with_x("S7"))
        .embedded_field("S8", s8)
        .build();

    let entries = resolve(&outer);
    assert!(
        find_field(&entries, "X").is_none(),
        "depth-1 collision blocks the depth-2 X as well"
    );
}

#[test]
fn renamed_embedded_field_is_not_expanded() {
    let inner = StructShapeBuilder::new("Inner5").field("x", int()).build();
    let outer = StructShapeBuilder::new("Outer5")
        .renamed_embedded_field("Inner5", "e", inner)
        .build();

    let entries = resolve(&outer);
    assert!(find_field(&entries, "e").is_some(), "matched under the tag");
    assert!(find_field(&entries, "x").is_none(), "fields not promoted");
}

#[test]
fn case_insensitive_fallback_prefers_exact_then_earliest() {
    let outer = StructShapeBuilder::new("Outer6")
        .field("Hello", int())
        .field("HELLO", int())
        .build();

    let entries = resolve(&outer);
    let exact = find_field(&entries, "HELLO").expect("exact match");
    assert_eq!(exact.path, [1]);
    let folded = find_field(&entries, "hello").expect("fold match");
    assert_eq!(folded.path, [0], "earliest-discovered candidate wins");
}
