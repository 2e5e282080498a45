//! Mutable typed locations the decode engine writes through.
//!
//! A [`Slot`] is the runtime instance of a [`Shape`](crate::Shape): one
//! variant per shape kind, holding the actual data. The engine never takes
//! ownership of a slot; it only mutates through `&mut Slot`, so a failed
//! decode leaves whatever was already written in place.

/// A typed, settable decode destination.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// Boolean value.
    Bool(bool),
    /// Signed integer, stored at full width; the shape carries the declared
    /// width and the engine range-checks before writing.
    Int(i64),
    /// Unsigned integer, stored at full width.
    Uint(u64),
    /// Floating-point value. For `f32` shapes the value is rounded through
    /// `f32` before being stored.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Growable sequence.
    Slice(Vec<Slot>),
    /// Fixed-length sequence; the length always equals the shape's.
    Array(Vec<Slot>),
    /// Keyed collection, insertion-ordered, one entry per key.
    Map(Vec<(MapKey, Slot)>),
    /// Struct fields, parallel to the shape's declared field list.
    Struct(Vec<Slot>),
    /// Untyped value for dynamic destinations.
    Dynamic(Dynamic),
    /// Nullable indirection.
    Pointer(Option<Box<Slot>>),
}

impl Slot {
    /// Short name of the slot's kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Slot::Bool(_) => "bool",
            Slot::Int(_) => "int",
            Slot::Uint(_) => "uint",
            Slot::Float(_) => "float",
            Slot::String(_) => "string",
            Slot::Slice(_) => "slice",
            Slot::Array(_) => "array",
            Slot::Map(_) => "map",
            Slot::Struct(_) => "struct",
            Slot::Dynamic(_) => "dynamic",
            Slot::Pointer(_) => "pointer",
        }
    }

    /// Wrap a slot in a non-null pointer slot, the usual top-level decode
    /// target.
    pub fn reference(inner: Slot) -> Slot {
        Slot::Pointer(Some(Box::new(inner)))
    }

    /// Dereference a pointer slot built with [`Slot::reference`], consuming
    /// the wrapper. Panics on non-pointer or null slots; meant for tests and
    /// call sites that just built the reference.
    pub fn into_pointee(self) -> Slot {
        match self {
            Slot::Pointer(Some(inner)) => *inner,
            other => panic!("into_pointee on {}", other.kind_name()),
        }
    }
}

/// Key of a map slot entry.
///
/// String and integer keys are stored directly; keys of text-hooked shapes
/// hold whatever slot the hook produced.
#[derive(Clone, Debug, PartialEq)]
pub enum MapKey {
    /// String key.
    Str(String),
    /// Signed integer key.
    Int(i64),
    /// Unsigned integer key.
    Uint(u64),
    /// Key decoded through the key shape's text hook.
    Hooked(Box<Slot>),
}

/// Insert into a map slot's entry list, replacing any existing entry with an
/// equal key (last write wins).
pub fn map_insert(entries: &mut Vec<(MapKey, Slot)>, key: MapKey, value: Slot) {
    if let Some(existing) = entries.iter_mut().find(|(k, _)| *k == key) {
        existing.1 = value;
    } else {
        entries.push((key, value));
    }
}

/// An untyped decoded value, the materialization of a dynamic destination.
///
/// Numbers are 64-bit floats by default; in literal-number mode the decoder
/// keeps them as opaque literal text instead.
#[derive(Clone, Debug, PartialEq)]
pub enum Dynamic {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number parsed as a 64-bit float.
    Float(f64),
    /// Number kept as its literal text (literal-number mode).
    Number(String),
    /// String.
    String(String),
    /// Ordered sequence.
    Array(Vec<Dynamic>),
    /// Key/value map, insertion-ordered, one entry per key.
    Object(Vec<(String, Dynamic)>),
}

impl Dynamic {
    /// Insert into an object, replacing any existing entry with the same key.
    pub fn object_insert(entries: &mut Vec<(String, Dynamic)>, key: String, value: Dynamic) {
        if let Some(existing) = entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            entries.push((key, value));
        }
    }
}
