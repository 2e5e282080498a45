//! Shape layer of the juggle decoder.
//!
//! This crate carries everything the coercion engine needs to know about a
//! destination before any input is seen:
//!
//! - [`Shape`] / [`Def`] — static type descriptors for decode targets,
//!   including decode-hook capabilities ([`RawHook`], [`TextHook`]);
//! - [`Slot`] — the mutable typed location decode writes through;
//! - [`resolve`] / [`FieldCache`] — the struct field resolver, with
//!   embedded-field expansion, depth shadowing, and annihilation.
//!
//! The value tree, the coercion matrix, and the decoder itself live in
//! `juggle-json`.

mod resolve;
mod shape;
mod slot;

pub use resolve::{FieldCache, FieldEntry, find_field, resolve};
pub use shape::{
    Def, FieldDef, FloatWidth, IntWidth, RawHook, Shape, ShapeId, ShapeRef, StructDef,
    StructShapeBuilder, TextHook, UintWidth, strip_pointers,
};
pub use slot::{Dynamic, MapKey, Slot, map_insert};
