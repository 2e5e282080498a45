//! Shape descriptors for decode targets.
//!
//! A [`Shape`] is the static description of a destination: its kind, its
//! nested element/key/value shapes, its declared struct fields, and its
//! decode hooks. Shapes are built once (through the constructors here and
//! [`StructShapeBuilder`]) and shared behind [`ShapeRef`]; the decode engine
//! only ever reads them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::slot::Slot;

/// Shared handle to an immutable shape.
pub type ShapeRef = Arc<Shape>;

/// Process-unique identity of a shape, assigned at build time.
///
/// Used as the key of the field-resolution cache: two struct shapes built
/// separately are distinct targets even if their field lists coincide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

fn next_shape_id() -> ShapeId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    ShapeId(NEXT.fetch_add(1, Ordering::Relaxed))
}

/// A raw decode hook: receives the canonical JSON re-encoding of the value
/// subtree and writes the result through the slot. Numeric literals in the
/// re-encoding are preserved verbatim.
pub type RawHook = fn(&mut Slot, &str) -> Result<(), String>;

/// A text decode hook: receives the payload of a string value, or the
/// literal text of a number value, and writes the result through the slot.
pub type TextHook = fn(&mut Slot, &str) -> Result<(), String>;

/// Width of a signed integer destination.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// Whether `v` fits the destination width.
    pub fn fits(self, v: i128) -> bool {
        match self {
            IntWidth::I8 => v >= i8::MIN as i128 && v <= i8::MAX as i128,
            IntWidth::I16 => v >= i16::MIN as i128 && v <= i16::MAX as i128,
            IntWidth::I32 => v >= i32::MIN as i128 && v <= i32::MAX as i128,
            IntWidth::I64 => v >= i64::MIN as i128 && v <= i64::MAX as i128,
        }
    }

    /// The Rust spelling of the width, used in shape idents and errors.
    pub fn ident(self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
        }
    }
}

/// Width of an unsigned integer destination.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UintWidth {
    U8,
    U16,
    U32,
    U64,
}

impl UintWidth {
    /// Whether `v` fits the destination width.
    pub fn fits(self, v: i128) -> bool {
        match self {
            UintWidth::U8 => v >= 0 && v <= u8::MAX as i128,
            UintWidth::U16 => v >= 0 && v <= u16::MAX as i128,
            UintWidth::U32 => v >= 0 && v <= u32::MAX as i128,
            UintWidth::U64 => v >= 0 && v <= u64::MAX as i128,
        }
    }

    /// The Rust spelling of the width, used in shape idents and errors.
    pub fn ident(self) -> &'static str {
        match self {
            UintWidth::U8 => "u8",
            UintWidth::U16 => "u16",
            UintWidth::U32 => "u32",
            UintWidth::U64 => "u64",
        }
    }
}

/// Width of a floating-point destination.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    /// The Rust spelling of the width, used in shape idents and errors.
    pub fn ident(self) -> &'static str {
        match self {
            FloatWidth::F32 => "f32",
            FloatWidth::F64 => "f64",
        }
    }
}

/// The kind of a decode destination, with nested shapes where applicable.
#[derive(Clone)]
pub enum Def {
    /// `bool`
    Bool,
    /// Signed integer of the given width.
    Int(IntWidth),
    /// Unsigned integer of the given width.
    Uint(UintWidth),
    /// Floating-point number of the given width.
    Float(FloatWidth),
    /// UTF-8 string.
    String,
    /// Growable sequence of elements.
    Slice(ShapeRef),
    /// Fixed-length sequence of elements.
    Array {
        /// Number of elements.
        len: usize,
        /// Element shape.
        elem: ShapeRef,
    },
    /// Keyed collection.
    Map {
        /// Key shape. The engine only accepts string, integer, or
        /// text-hooked key shapes.
        key: ShapeRef,
        /// Value shape.
        value: ShapeRef,
    },
    /// Structure with a declared field list.
    Struct(StructDef),
    /// "Decode into whatever the source is" destination, the analog of an
    /// untyped interface target.
    Dynamic,
    /// Nullable indirection. Decoding null zeroes it; decoding anything
    /// else allocates the pointee on demand.
    Pointer(ShapeRef),
}

/// Declared field list of a struct shape.
#[derive(Clone)]
pub struct StructDef {
    /// Declared fields, in declaration order. Ignored and embedded fields
    /// are part of the list; the resolver decides what is addressable.
    pub fields: Vec<FieldDef>,
}

/// One declared struct field.
#[derive(Clone)]
pub struct FieldDef {
    /// Declared identifier of the field.
    pub ident: &'static str,
    /// Tag-derived name override. A renamed embedded field is matched as an
    /// ordinary field instead of being expanded.
    pub rename: Option<&'static str>,
    /// Dropped before any conflict resolution; never decoded into.
    pub ignored: bool,
    /// Anonymous substructure whose fields are promoted into this struct's
    /// namespace at depth + 1.
    pub embedded: bool,
    /// Shape of the field's value.
    pub shape: ShapeRef,
}

impl FieldDef {
    /// The name this field resolves under: the tag name if renamed,
    /// otherwise the declared identifier.
    pub fn name(&self) -> &'static str {
        self.rename.unwrap_or(self.ident)
    }
}

/// Static description of a decode destination.
pub struct Shape {
    ident: String,
    /// Kind and nested shapes.
    pub def: Def,
    raw_hook: Option<RawHook>,
    text_hook: Option<TextHook>,
    id: ShapeId,
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("ident", &self.ident)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Shape {
    fn new(ident: String, def: Def) -> Self {
        Shape {
            ident,
            def,
            raw_hook: None,
            text_hook: None,
            id: next_shape_id(),
        }
    }

    /// `bool` destination.
    pub fn bool() -> Self {
        Self::new("bool".into(), Def::Bool)
    }

    /// Signed integer destination of the given width.
    pub fn int(width: IntWidth) -> Self {
        Self::new(width.ident().into(), Def::Int(width))
    }

    /// Unsigned integer destination of the given width.
    pub fn uint(width: UintWidth) -> Self {
        Self::new(width.ident().into(), Def::Uint(width))
    }

    /// Floating-point destination of the given width.
    pub fn float(width: FloatWidth) -> Self {
        Self::new(width.ident().into(), Def::Float(width))
    }

    /// String destination.
    pub fn string() -> Self {
        Self::new("String".into(), Def::String)
    }

    /// Growable sequence destination.
    pub fn slice(elem: ShapeRef) -> Self {
        let ident = format!("Vec<{}>", elem.ident);
        Self::new(ident, Def::Slice(elem))
    }

    /// Fixed-length sequence destination.
    pub fn array(len: usize, elem: ShapeRef) -> Self {
        let ident = format!("[{}; {}]", elem.ident, len);
        Self::new(ident, Def::Array { len, elem })
    }

    /// Keyed-collection destination.
    pub fn map(key: ShapeRef, value: ShapeRef) -> Self {
        let ident = format!("Map<{}, {}>", key.ident, value.ident);
        Self::new(ident, Def::Map { key, value })
    }

    /// Untyped destination that materializes whatever the source holds.
    pub fn dynamic() -> Self {
        Self::new("Dynamic".into(), Def::Dynamic)
    }

    /// Nullable indirection around `inner`.
    pub fn pointer(inner: ShapeRef) -> Self {
        let ident = format!("Option<Box<{}>>", inner.ident);
        Self::new(ident, Def::Pointer(inner))
    }

    /// Attach a raw decode hook. Takes precedence over everything else when
    /// this shape is the destination.
    pub fn with_raw_hook(mut self, hook: RawHook) -> Self {
        self.raw_hook = Some(hook);
        self
    }

    /// Attach a text decode hook, consulted for string and number sources
    /// when no raw hook is present.
    pub fn with_text_hook(mut self, hook: TextHook) -> Self {
        self.text_hook = Some(hook);
        self
    }

    /// Wrap the shape in a shared handle.
    pub fn into_ref(self) -> ShapeRef {
        Arc::new(self)
    }

    /// Display name of the destination type.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Process-unique identity of this shape.
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Raw decode hook, if any.
    pub fn raw_hook(&self) -> Option<RawHook> {
        self.raw_hook
    }

    /// Text decode hook, if any.
    pub fn text_hook(&self) -> Option<TextHook> {
        self.text_hook
    }

    /// Whether a raw decode hook is attached.
    pub fn has_raw_hook(&self) -> bool {
        self.raw_hook.is_some()
    }

    /// Whether a text decode hook is attached.
    pub fn has_text_hook(&self) -> bool {
        self.text_hook.is_some()
    }

    /// The zero value of this shape: false, 0, the empty string, the empty
    /// sequence/collection, a null pointer, or a struct of zero fields.
    pub fn empty_slot(&self) -> Slot {
        match &self.def {
            Def::Bool => Slot::Bool(false),
            Def::Int(_) => Slot::Int(0),
            Def::Uint(_) => Slot::Uint(0),
            Def::Float(_) => Slot::Float(0.0),
            Def::String => Slot::String(String::new()),
            Def::Slice(_) => Slot::Slice(Vec::new()),
            Def::Array { len, elem } => {
                let mut items = Vec::with_capacity(*len);
                for _ in 0..*len {
                    items.push(elem.empty_slot());
                }
                Slot::Array(items)
            }
            Def::Map { .. } => Slot::Map(Vec::new()),
            Def::Struct(def) => {
                Slot::Struct(def.fields.iter().map(|f| f.shape.empty_slot()).collect())
            }
            Def::Dynamic => Slot::Dynamic(crate::slot::Dynamic::Null),
            Def::Pointer(_) => Slot::Pointer(None),
        }
    }
}

/// Builder for struct shapes.
///
/// ```
/// use juggle_core::{Shape, StructShapeBuilder};
///
/// let point = StructShapeBuilder::new("Point")
///     .field("x", Shape::int(juggle_core::IntWidth::I64).into_ref())
///     .field("y", Shape::int(juggle_core::IntWidth::I64).into_ref())
///     .build();
/// assert_eq!(point.ident(), "Point");
/// ```
pub struct StructShapeBuilder {
    ident: &'static str,
    fields: Vec<FieldDef>,
    raw_hook: Option<RawHook>,
    text_hook: Option<TextHook>,
}

impl StructShapeBuilder {
    /// Start a struct shape with the given type name.
    pub fn new(ident: &'static str) -> Self {
        StructShapeBuilder {
            ident,
            fields: Vec::new(),
            raw_hook: None,
            text_hook: None,
        }
    }

    /// Add an ordinary named field.
    pub fn field(mut self, ident: &'static str, shape: ShapeRef) -> Self {
        self.fields.push(FieldDef {
            ident,
            rename: None,
            ignored: false,
            embedded: false,
            shape,
        });
        self
    }

    /// Add a field matched under a tag-derived name instead of its
    /// identifier.
    pub fn renamed_field(
        mut self,
        ident: &'static str,
        rename: &'static str,
        shape: ShapeRef,
    ) -> Self {
        self.fields.push(FieldDef {
            ident,
            rename: Some(rename),
            ignored: false,
            embedded: false,
            shape,
        });
        self
    }

    /// Add a field that is never decoded into (the `-` tag).
    pub fn ignored_field(mut self, ident: &'static str, shape: ShapeRef) -> Self {
        self.fields.push(FieldDef {
            ident,
            rename: None,
            ignored: true,
            embedded: false,
            shape,
        });
        self
    }

    /// Add an anonymous embedded field. If `shape` is a struct (possibly
    /// behind pointers) its fields are promoted at depth + 1; otherwise the
    /// field is matched under `ident` like an ordinary field.
    pub fn embedded_field(mut self, ident: &'static str, shape: ShapeRef) -> Self {
        self.fields.push(FieldDef {
            ident,
            rename: None,
            ignored: false,
            embedded: true,
            shape,
        });
        self
    }

    /// Add an embedded field carrying an explicit tag name. Per the
    /// resolution rules it is treated as an ordinary named field and is not
    /// expanded.
    pub fn renamed_embedded_field(
        mut self,
        ident: &'static str,
        rename: &'static str,
        shape: ShapeRef,
    ) -> Self {
        self.fields.push(FieldDef {
            ident,
            rename: Some(rename),
            ignored: false,
            embedded: true,
            shape,
        });
        self
    }

    /// Attach a raw decode hook to the built shape.
    pub fn raw_hook(mut self, hook: RawHook) -> Self {
        self.raw_hook = Some(hook);
        self
    }

    /// Attach a text decode hook to the built shape.
    pub fn text_hook(mut self, hook: TextHook) -> Self {
        self.text_hook = Some(hook);
        self
    }

    /// Finish the shape.
    pub fn build(self) -> ShapeRef {
        let mut shape = Shape::new(
            self.ident.to_string(),
            Def::Struct(StructDef {
                fields: self.fields,
            }),
        );
        shape.raw_hook = self.raw_hook;
        shape.text_hook = self.text_hook;
        shape.into_ref()
    }
}

/// Strip pointer indirections, yielding the first non-pointer shape.
pub fn strip_pointers(shape: &ShapeRef) -> &ShapeRef {
    let mut current = shape;
    while let Def::Pointer(inner) = &current.def {
        current = inner;
    }
    current
}
