//! The type coercion engine and the decoder around it.
//!
//! The engine walks a [`Value`] and a [`Shape`] together and writes through
//! a [`Slot`], applying the PHP-flavored coercion matrix: any source kind
//! converts into any destination kind through fixed, total rules instead of
//! a one-kind-per-target discipline. See the crate docs for the matrix.

use juggle_core::{
    Def, Dynamic, FieldCache, FloatWidth, IntWidth, MapKey, ShapeRef, Slot, UintWidth, find_field,
    map_insert,
};
use log::trace;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use lexical_parse_integer::FromLexical as _;

use crate::canonical::{byte_slice_elem, to_canonical};
use crate::error::{Error, ErrorKind, Result};
use crate::number::{NumError, is_zero_literal, parse_f32, parse_f64, parse_int_literal};
use crate::parse::{Parser, parse};
use crate::value::Value;

/// Configuration of a decode call.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// Decode numbers hitting dynamic destinations as opaque literal text
    /// instead of 64-bit floats.
    pub use_literal_numbers: bool,
    /// Turn object keys that match no struct field into a hard
    /// [`ErrorKind::UnknownField`] instead of skipping them.
    pub disallow_unknown_fields: bool,
    /// Make `null` write the falsy literal into scalar destinations
    /// (false, 0, the empty string). The default leaves the prior value
    /// untouched, which is what the semantics being reproduced do; pointer,
    /// dynamic, map, and slice destinations are zeroed either way.
    pub null_zeroes_scalars: bool,
    /// Input nesting bound for one decode call.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            use_literal_numbers: false,
            disallow_unknown_fields: false,
            null_zeroes_scalars: false,
            max_depth: 128,
        }
    }
}

/// Streaming decoder over a buffer of whitespace-separated JSON values.
///
/// Owns the decode configuration and the field-resolution cache; each call
/// to [`Decoder::decode`] parses the next value from the buffer and runs
/// one engine invocation against it.
pub struct Decoder<'de> {
    parser: Parser<'de>,
    options: DecodeOptions,
    cache: FieldCache,
}

impl<'de> Decoder<'de> {
    /// Decoder over raw bytes with default options.
    pub fn from_slice(input: &'de [u8]) -> Self {
        Self::with_options(input, DecodeOptions::default())
    }

    /// Decoder over a string with default options.
    pub fn from_str(input: &'de str) -> Self {
        Self::from_slice(input.as_bytes())
    }

    /// Decoder with explicit options.
    pub fn with_options(input: &'de [u8], options: DecodeOptions) -> Self {
        Decoder {
            parser: Parser::new(input),
            options,
            cache: FieldCache::new(),
        }
    }

    /// Switch dynamic-destination numbers to opaque literals.
    pub fn use_literal_numbers(&mut self) {
        self.options.use_literal_numbers = true;
    }

    /// Make unmatched struct keys a hard error.
    pub fn disallow_unknown_fields(&mut self) {
        self.options.disallow_unknown_fields = true;
    }

    /// Whether another top-level value remains in the buffer.
    pub fn has_more(&mut self) -> bool {
        self.parser.has_more()
    }

    /// Parse the next value from the buffer and decode it into `target`.
    ///
    /// The target must be a non-null reference: a [`Slot::Pointer`] holding
    /// a value, or any slot structurally matching `shape`. An invalid
    /// target fails with [`ErrorKind::InvalidTarget`] before any input is
    /// consumed.
    pub fn decode(&mut self, target: &mut Slot, shape: &ShapeRef) -> Result<()> {
        validate_target(target, shape)?;
        let value = self.parser.next_value()?;
        trace!("decoding {} into {}", value.kind_name(), shape.ident());
        let mut engine = CoercionEngine::new(&self.options, &self.cache);
        engine.decode(&value, target, shape, self.options.max_depth)
    }
}

/// Decode an already-parsed value into `target` with default options.
pub fn decode_value(value: &Value, target: &mut Slot, shape: &ShapeRef) -> Result<()> {
    decode_value_with_options(value, target, shape, &DecodeOptions::default())
}

/// Decode an already-parsed value into `target`.
pub fn decode_value_with_options(
    value: &Value,
    target: &mut Slot,
    shape: &ShapeRef,
    options: &DecodeOptions,
) -> Result<()> {
    validate_target(target, shape)?;
    let cache = FieldCache::new();
    let mut engine = CoercionEngine::new(options, &cache);
    engine.decode(value, target, shape, options.max_depth)
}

/// Parse one JSON document and decode it into `target` with default
/// options.
pub fn from_str(input: &str, target: &mut Slot, shape: &ShapeRef) -> Result<()> {
    from_slice_with_options(input.as_bytes(), target, shape, &DecodeOptions::default())
}

/// Parse one JSON document and decode it into `target`.
pub fn from_str_with_options(
    input: &str,
    target: &mut Slot,
    shape: &ShapeRef,
    options: &DecodeOptions,
) -> Result<()> {
    from_slice_with_options(input.as_bytes(), target, shape, options)
}

/// Parse one JSON document from bytes and decode it into `target` with
/// default options.
pub fn from_slice(input: &[u8], target: &mut Slot, shape: &ShapeRef) -> Result<()> {
    from_slice_with_options(input, target, shape, &DecodeOptions::default())
}

/// Parse one JSON document from bytes and decode it into `target`.
pub fn from_slice_with_options(
    input: &[u8],
    target: &mut Slot,
    shape: &ShapeRef,
    options: &DecodeOptions,
) -> Result<()> {
    validate_target(target, shape)?;
    let value = parse(input)?;
    let cache = FieldCache::new();
    let mut engine = CoercionEngine::new(options, &cache);
    engine.decode(&value, target, shape, options.max_depth)
}

/// The target must structurally match its shape and, if it is a pointer,
/// must not be null. Checked before any input is consumed.
fn validate_target(target: &Slot, shape: &ShapeRef) -> Result<()> {
    let invalid = || {
        Error::new(ErrorKind::InvalidTarget {
            shape: shape.ident().to_string(),
        })
    };
    if matches!(target, Slot::Pointer(None)) {
        return Err(invalid());
    }
    if !kind_matches(target, &shape.def) {
        return Err(invalid());
    }
    Ok(())
}

fn kind_matches(slot: &Slot, def: &Def) -> bool {
    matches!(
        (slot, def),
        (Slot::Bool(_), Def::Bool)
            | (Slot::Int(_), Def::Int(_))
            | (Slot::Uint(_), Def::Uint(_))
            | (Slot::Float(_), Def::Float(_))
            | (Slot::String(_), Def::String)
            | (Slot::Slice(_), Def::Slice(_))
            | (Slot::Array(_), Def::Array { .. })
            | (Slot::Map(_), Def::Map { .. })
            | (Slot::Struct(_), Def::Struct(_))
            | (Slot::Dynamic(_), Def::Dynamic)
            | (Slot::Pointer(_), Def::Pointer(_))
    )
}

/// Per-call error context: the structure and field currently being decoded,
/// attached to the next raised error and cleared after each field.
#[derive(Default)]
struct ErrorContext {
    struct_ident: Option<String>,
    field: Option<String>,
}

struct CoercionEngine<'a> {
    options: &'a DecodeOptions,
    cache: &'a FieldCache,
    ctx: ErrorContext,
}

impl<'a> CoercionEngine<'a> {
    fn new(options: &'a DecodeOptions, cache: &'a FieldCache) -> Self {
        CoercionEngine {
            options,
            cache,
            ctx: ErrorContext::default(),
        }
    }

    fn fail(&self, kind: ErrorKind) -> Error {
        Error {
            kind,
            struct_ident: self.ctx.struct_ident.clone(),
            field: self.ctx.field.clone(),
        }
    }

    fn mismatch(&self, shape: &ShapeRef, got: impl Into<String>) -> Error {
        self.fail(ErrorKind::TypeMismatch {
            expected: shape.ident().to_string(),
            got: got.into(),
        })
    }

    fn out_of_range(&self, value: &str, shape: &ShapeRef) -> Error {
        self.fail(ErrorKind::NumberOutOfRange {
            value: value.to_string(),
            target: shape.ident().to_string(),
        })
    }

    fn hook_failure(&self, message: String) -> Error {
        self.fail(ErrorKind::Hook(message))
    }

    /// One step of the coercion matrix.
    fn decode(
        &mut self,
        value: &Value,
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        let Some(depth) = depth.checked_sub(1) else {
            return Err(self.fail(ErrorKind::DepthLimit {
                limit: self.options.max_depth,
            }));
        };
        // Slots built through `empty_slot` always match their shape; a
        // hand-constructed mismatch is reset to the shape's zero value.
        if !kind_matches(slot, &shape.def) {
            *slot = shape.empty_slot();
        }

        // Hooks take precedence over the generic matrix.
        if let Some(hook) = shape.raw_hook() {
            let payload = to_canonical(value);
            return hook(slot, &payload).map_err(|msg| self.hook_failure(msg));
        }
        if let Some(hook) = shape.text_hook() {
            match value {
                Value::String(text) | Value::Number(text) => {
                    return hook(slot, text).map_err(|msg| self.hook_failure(msg));
                }
                // Null never reaches the hook; it keeps its usual meaning.
                Value::Null => {}
                other => return Err(self.mismatch(shape, other.kind_name())),
            }
        }

        // Null zeroes a pointer without allocating its pointee; everything
        // else allocates on demand and decodes through.
        if let Def::Pointer(inner) = &shape.def {
            if matches!(value, Value::Null) {
                *slot = Slot::Pointer(None);
                return Ok(());
            }
            let Slot::Pointer(opt) = slot else {
                unreachable!("slot normalized to pointer shape")
            };
            let boxed = opt.get_or_insert_with(|| Box::new(inner.empty_slot()));
            return self.decode(value, boxed, inner, depth);
        }

        // Dynamic destinations take whatever the source holds.
        if matches!(shape.def, Def::Dynamic) {
            *slot = Slot::Dynamic(self.materialize(value)?);
            return Ok(());
        }

        match value {
            Value::Null => {
                self.decode_null(slot, shape);
                Ok(())
            }
            Value::Bool(b) => self.decode_bool(*b, slot, shape, depth),
            Value::Number(literal) => self.decode_number(literal, slot, shape, depth),
            Value::String(s) => self.decode_string(s, slot, shape, depth),
            Value::Array(items) => self.decode_array(items, slot, shape, depth),
            Value::Object(pairs) => self.decode_object(pairs, slot, shape, depth),
        }
    }

    fn decode_null(&self, slot: &mut Slot, shape: &ShapeRef) {
        match &shape.def {
            Def::Slice(_) => *slot = Slot::Slice(Vec::new()),
            Def::Map { .. } => *slot = Slot::Map(Vec::new()),
            Def::Bool | Def::Int(_) | Def::Uint(_) | Def::Float(_) | Def::String
                if self.options.null_zeroes_scalars =>
            {
                *slot = shape.empty_slot();
            }
            // Scalars keep their prior value; struct and fixed-array
            // destinations are never touched by null.
            _ => {}
        }
    }

    fn decode_bool(&mut self, b: bool, slot: &mut Slot, shape: &ShapeRef, depth: usize) -> Result<()> {
        match &shape.def {
            Def::Bool => *slot = Slot::Bool(b),
            // A boolean casts to "1"/"" so the two directions agree.
            Def::String => *slot = Slot::String(if b { "1".into() } else { String::new() }),
            Def::Int(_) => *slot = Slot::Int(b as i64),
            Def::Uint(_) => *slot = Slot::Uint(b as u64),
            Def::Float(_) => *slot = Slot::Float(if b { 1.0 } else { 0.0 }),
            Def::Slice(elem) => {
                let elem = elem.clone();
                return self.wrap_into_slice(&Value::Bool(b), slot, &elem, depth);
            }
            Def::Map { .. } | Def::Struct(_) => {
                return self.wrap_into_keyed(Value::Bool(b), slot, shape, depth);
            }
            _ => return Err(self.mismatch(shape, "bool")),
        }
        Ok(())
    }

    fn decode_number(
        &mut self,
        literal: &str,
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        match &shape.def {
            Def::String => *slot = Slot::String(literal.to_string()),
            Def::Int(width) => {
                let v = self.int_from_literal(literal, shape, *width)?;
                *slot = Slot::Int(v as i64);
            }
            Def::Uint(width) => {
                let v = self.uint_from_literal(literal, shape, *width)?;
                *slot = Slot::Uint(v as u64);
            }
            Def::Float(width) => {
                let n = self.float_from_literal(literal, shape, *width)?;
                *slot = Slot::Float(n);
            }
            Def::Bool => *slot = Slot::Bool(!is_zero_literal(literal)),
            Def::Slice(elem) => {
                let elem = elem.clone();
                return self.wrap_into_slice(&Value::Number(literal.to_string()), slot, &elem, depth);
            }
            Def::Map { .. } | Def::Struct(_) => {
                return self.wrap_into_keyed(Value::Number(literal.to_string()), slot, shape, depth);
            }
            _ => return Err(self.mismatch(shape, format!("number {literal}"))),
        }
        Ok(())
    }

    fn int_from_literal(&self, literal: &str, shape: &ShapeRef, width: IntWidth) -> Result<i128> {
        let v = parse_int_literal(literal).map_err(|e| match e {
            NumError::Malformed => self.mismatch(shape, format!("number {literal}")),
            NumError::Overflow => self.out_of_range(literal, shape),
        })?;
        if !width.fits(v) {
            return Err(self.out_of_range(literal, shape));
        }
        Ok(v)
    }

    fn uint_from_literal(&self, literal: &str, shape: &ShapeRef, width: UintWidth) -> Result<i128> {
        let v = parse_int_literal(literal).map_err(|e| match e {
            NumError::Malformed => self.mismatch(shape, format!("number {literal}")),
            NumError::Overflow => self.out_of_range(literal, shape),
        })?;
        if !width.fits(v) {
            return Err(self.out_of_range(literal, shape));
        }
        Ok(v)
    }

    fn float_from_literal(
        &self,
        literal: &str,
        shape: &ShapeRef,
        width: FloatWidth,
    ) -> Result<f64> {
        let map_err = |e| match e {
            NumError::Malformed => self.mismatch(shape, format!("number {literal}")),
            NumError::Overflow => self.out_of_range(literal, shape),
        };
        match width {
            FloatWidth::F64 => parse_f64(literal).map_err(map_err),
            FloatWidth::F32 => parse_f32(literal).map(f64::from).map_err(map_err),
        }
    }

    fn decode_string(
        &mut self,
        s: &str,
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        match &shape.def {
            Def::String => *slot = Slot::String(s.to_string()),
            // The empty string casts to zero; any other text must parse as
            // a number, and every failure (including range) is a plain type
            // mismatch, matching the semantics being reproduced.
            Def::Int(width) => {
                if s.is_empty() {
                    *slot = Slot::Int(0);
                } else {
                    let v = parse_int_literal(s)
                        .ok()
                        .filter(|v| width.fits(*v))
                        .ok_or_else(|| self.mismatch(shape, "string"))?;
                    *slot = Slot::Int(v as i64);
                }
            }
            Def::Uint(width) => {
                if s.is_empty() {
                    *slot = Slot::Uint(0);
                } else {
                    let v = parse_int_literal(s)
                        .ok()
                        .filter(|v| width.fits(*v))
                        .ok_or_else(|| self.mismatch(shape, "string"))?;
                    *slot = Slot::Uint(v as u64);
                }
            }
            Def::Float(width) => {
                if s.is_empty() {
                    *slot = Slot::Float(0.0);
                } else {
                    let n = match width {
                        FloatWidth::F64 => parse_f64(s),
                        FloatWidth::F32 => parse_f32(s).map(f64::from),
                    }
                    .map_err(|_| self.mismatch(shape, "string"))?;
                    *slot = Slot::Float(n);
                }
            }
            Def::Bool => *slot = Slot::Bool(!(s.is_empty() || s == "0")),
            Def::Slice(elem) => {
                // Byte sequences take base64 text, ahead of the generic
                // single-element wrap.
                if byte_slice_elem(shape).is_some() {
                    let bytes = BASE64_STANDARD
                        .decode(s)
                        .map_err(|_| self.mismatch(shape, "string"))?;
                    *slot = Slot::Slice(bytes.into_iter().map(|b| Slot::Uint(b as u64)).collect());
                    return Ok(());
                }
                let elem = elem.clone();
                return self.wrap_into_slice(&Value::String(s.to_string()), slot, &elem, depth);
            }
            Def::Map { .. } | Def::Struct(_) => {
                return self.wrap_into_keyed(Value::String(s.to_string()), slot, shape, depth);
            }
            _ => return Err(self.mismatch(shape, "string")),
        }
        Ok(())
    }

    fn decode_array(
        &mut self,
        items: &[Value],
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        match &shape.def {
            Def::Slice(elem) => {
                let elem = elem.clone();
                let Slot::Slice(current) = slot else {
                    unreachable!("slot normalized to slice shape")
                };
                if items.is_empty() {
                    current.clear();
                    return Ok(());
                }
                while current.len() < items.len() {
                    current.push(elem.empty_slot());
                }
                current.truncate(items.len());
                for (value, element) in items.iter().zip(current.iter_mut()) {
                    self.decode(value, element, &elem, depth)?;
                }
                Ok(())
            }
            Def::Array { len, elem } => {
                let (len, elem) = (*len, elem.clone());
                let Slot::Array(current) = slot else {
                    unreachable!("slot normalized to array shape")
                };
                let filled = items.len().min(len);
                for (value, element) in items.iter().zip(current.iter_mut()).take(filled) {
                    self.decode(value, element, &elem, depth)?;
                }
                // Ran out of source elements: zero the rest.
                for element in current.iter_mut().skip(filled) {
                    *element = elem.empty_slot();
                }
                Ok(())
            }
            Def::Bool => {
                *slot = Slot::Bool(!items.is_empty());
                Ok(())
            }
            // JSON arrays and objects are the same thing to the semantics
            // being reproduced: re-key the sequence by its indices.
            Def::Map { .. } | Def::Struct(_) => {
                let pairs: Vec<(String, Value)> = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v.clone()))
                    .collect();
                self.decode_object(&pairs, slot, shape, depth)
            }
            _ => Err(self.mismatch(shape, "array")),
        }
    }

    fn decode_object(
        &mut self,
        pairs: &[(String, Value)],
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        match &shape.def {
            Def::Struct(_) => self.decode_object_into_struct(pairs, slot, shape, depth),
            Def::Map { key, value } => {
                let (key_shape, value_shape) = (key.clone(), value.clone());
                self.decode_object_into_map(pairs, slot, shape, &key_shape, &value_shape, depth)
            }
            Def::Slice(elem) => {
                let elem = elem.clone();
                self.decode_object_into_slice(pairs, slot, &elem, depth)
            }
            Def::Array { len, elem } => {
                let (len, elem) = (*len, elem.clone());
                self.decode_object_into_fixed_array(pairs, slot, len, &elem, depth)
            }
            Def::Bool => {
                *slot = Slot::Bool(!pairs.is_empty());
                Ok(())
            }
            _ => Err(self.mismatch(shape, "object")),
        }
    }

    fn decode_object_into_struct(
        &mut self,
        pairs: &[(String, Value)],
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        let entries = self.cache.entries(shape);
        for (key, value) in last_wins(pairs) {
            let Some(entry) = find_field(&entries, key) else {
                if self.options.disallow_unknown_fields {
                    return Err(self.fail(ErrorKind::UnknownField {
                        field: key.clone(),
                        struct_ident: shape.ident().to_string(),
                    }));
                }
                trace!("ignoring unknown field `{key}` for struct {}", shape.ident());
                continue;
            };
            let (field_slot, field_shape) = locate_field(slot, shape, &entry.path);
            self.ctx.struct_ident = Some(shape.ident().to_string());
            self.ctx.field = Some(entry.name.clone());
            let outcome = self.decode(value, field_slot, &field_shape, depth);
            // Context is per field: clear it whether the field decoded or
            // not, so sibling fields report their own names.
            self.ctx.struct_ident = None;
            self.ctx.field = None;
            outcome?;
        }
        Ok(())
    }

    fn decode_object_into_map(
        &mut self,
        pairs: &[(String, Value)],
        slot: &mut Slot,
        shape: &ShapeRef,
        key_shape: &ShapeRef,
        value_shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        // Map keys must be strings, integers, or text-hooked.
        let key_supported = key_shape.has_text_hook()
            || matches!(key_shape.def, Def::String | Def::Int(_) | Def::Uint(_));
        if !key_supported {
            return Err(self.mismatch(shape, "object"));
        }
        let Slot::Map(entries) = slot else {
            unreachable!("slot normalized to map shape")
        };
        for (key_text, value) in last_wins(pairs) {
            // Decode into a scratch slot first so a failure never leaves a
            // half-written entry in the map.
            let mut scratch = value_shape.empty_slot();
            self.decode(value, &mut scratch, value_shape, depth)?;
            let key = self.decode_map_key(key_text, key_shape)?;
            map_insert(entries, key, scratch);
        }
        Ok(())
    }

    fn decode_map_key(&self, key_text: &str, key_shape: &ShapeRef) -> Result<MapKey> {
        if let Some(hook) = key_shape.text_hook() {
            let mut key_slot = key_shape.empty_slot();
            hook(&mut key_slot, key_text).map_err(|msg| self.hook_failure(msg))?;
            return Ok(MapKey::Hooked(Box::new(key_slot)));
        }
        match &key_shape.def {
            Def::String => Ok(MapKey::Str(key_text.to_string())),
            Def::Int(width) => {
                let v = i128::from_lexical(key_text.as_bytes()).map_err(|e| {
                    if e.is_overflow() || e.is_underflow() {
                        self.out_of_range(key_text, key_shape)
                    } else {
                        self.fail(ErrorKind::MalformedKey {
                            key: key_text.to_string(),
                        })
                    }
                })?;
                if !width.fits(v) {
                    return Err(self.out_of_range(key_text, key_shape));
                }
                Ok(MapKey::Int(v as i64))
            }
            Def::Uint(width) => {
                let v = i128::from_lexical(key_text.as_bytes()).map_err(|e| {
                    if e.is_overflow() || e.is_underflow() {
                        self.out_of_range(key_text, key_shape)
                    } else {
                        self.fail(ErrorKind::MalformedKey {
                            key: key_text.to_string(),
                        })
                    }
                })?;
                if !width.fits(v) {
                    return Err(self.out_of_range(key_text, key_shape));
                }
                Ok(MapKey::Uint(v as u64))
            }
            _ => unreachable!("key kind checked before decoding entries"),
        }
    }

    /// "Forced-object" arrays: every key is a non-negative index, the
    /// largest one sets the length, holes are zero-filled.
    fn decode_object_into_slice(
        &mut self,
        pairs: &[(String, Value)],
        slot: &mut Slot,
        elem: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        let mut required = 0usize;
        for (key, _) in pairs {
            let index = self.parse_index(key)?;
            required = required.max(index + 1);
        }
        let Slot::Slice(items) = slot else {
            unreachable!("slot normalized to slice shape")
        };
        *items = (0..required).map(|_| elem.empty_slot()).collect();
        for (key, value) in last_wins(pairs) {
            let index = self.parse_index(key)?;
            self.decode(value, &mut items[index], elem, depth)?;
        }
        Ok(())
    }

    fn decode_object_into_fixed_array(
        &mut self,
        pairs: &[(String, Value)],
        slot: &mut Slot,
        len: usize,
        elem: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        let Slot::Array(items) = slot else {
            unreachable!("slot normalized to array shape")
        };
        for item in items.iter_mut() {
            *item = elem.empty_slot();
        }
        for (key, value) in last_wins(pairs) {
            let index = self.parse_index(key)?;
            if index >= len {
                // Indices past the fixed length are dropped.
                continue;
            }
            self.decode(value, &mut items[index], elem, depth)?;
        }
        Ok(())
    }

    fn parse_index(&self, key: &str) -> Result<usize> {
        if key.starts_with('-') || key.is_empty() {
            return Err(self.fail(ErrorKind::MalformedKey {
                key: key.to_string(),
            }));
        }
        usize::from_lexical(key.as_bytes()).map_err(|_| {
            self.fail(ErrorKind::MalformedKey {
                key: key.to_string(),
            })
        })
    }

    /// Scalars wrap into a single-element container at key/index "0".
    fn wrap_into_slice(
        &mut self,
        value: &Value,
        slot: &mut Slot,
        elem: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        let Slot::Slice(items) = slot else {
            unreachable!("slot normalized to slice shape")
        };
        if items.is_empty() {
            items.push(elem.empty_slot());
        } else {
            items.truncate(1);
        }
        self.decode(value, &mut items[0], elem, depth)
    }

    fn wrap_into_keyed(
        &mut self,
        value: Value,
        slot: &mut Slot,
        shape: &ShapeRef,
        depth: usize,
    ) -> Result<()> {
        let pairs = vec![("0".to_string(), value)];
        self.decode_object(&pairs, slot, shape, depth)
    }

    /// Materialize a value for a dynamic destination: booleans and strings
    /// natively, numbers as floats (or literals in literal-number mode),
    /// containers as generic sequences and maps.
    fn materialize(&self, value: &Value) -> Result<Dynamic> {
        Ok(match value {
            Value::Null => Dynamic::Null,
            Value::Bool(b) => Dynamic::Bool(*b),
            Value::Number(literal) => {
                if self.options.use_literal_numbers {
                    Dynamic::Number(literal.clone())
                } else {
                    let n = parse_f64(literal).map_err(|e| match e {
                        NumError::Overflow => self.fail(ErrorKind::NumberOutOfRange {
                            value: literal.clone(),
                            target: "f64".to_string(),
                        }),
                        NumError::Malformed => self.fail(ErrorKind::TypeMismatch {
                            expected: "f64".to_string(),
                            got: format!("number {literal}"),
                        }),
                    })?;
                    Dynamic::Float(n)
                }
            }
            Value::String(s) => Dynamic::String(s.clone()),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.materialize(item)?);
                }
                Dynamic::Array(out)
            }
            Value::Object(pairs) => {
                let mut out: Vec<(String, Dynamic)> = Vec::with_capacity(pairs.len());
                for (key, val) in pairs {
                    let materialized = self.materialize(val)?;
                    Dynamic::object_insert(&mut out, key.clone(), materialized);
                }
                Dynamic::Object(out)
            }
        })
    }
}

/// Iterate object pairs with duplicate keys collapsed, the last occurrence
/// winning.
fn last_wins(pairs: &[(String, Value)]) -> impl Iterator<Item = (&String, &Value)> {
    pairs.iter().enumerate().filter_map(|(i, (key, value))| {
        let superseded = pairs[i + 1..].iter().any(|(later, _)| later == key);
        (!superseded).then_some((key, value))
    })
}

/// Walk a resolved field path from a struct slot down to the destination
/// field, allocating through null pointers on the way.
fn locate_field<'s>(
    slot: &'s mut Slot,
    shape: &ShapeRef,
    path: &[usize],
) -> (&'s mut Slot, ShapeRef) {
    let mut current_slot = slot;
    let mut current_shape = shape.clone();
    for &index in path {
        // Embedded substructures may sit behind pointers; allocate them on
        // demand before indexing.
        loop {
            let inner = match &current_shape.def {
                Def::Pointer(inner) => inner.clone(),
                _ => break,
            };
            let Slot::Pointer(opt) = current_slot else {
                unreachable!("slot normalized to pointer shape")
            };
            let boxed = opt.get_or_insert_with(|| Box::new(inner.empty_slot()));
            current_slot = &mut **boxed;
            current_shape = inner;
        }
        let field_shape = match &current_shape.def {
            Def::Struct(def) => def.fields[index].shape.clone(),
            _ => unreachable!("field paths only traverse structs"),
        };
        let Slot::Struct(fields) = current_slot else {
            unreachable!("slot normalized to struct shape")
        };
        current_slot = &mut fields[index];
        current_shape = field_shape;
    }
    (current_slot, current_shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use juggle_core::Shape;

    #[test]
    fn last_wins_skips_superseded_pairs() {
        let pairs = vec![
            ("a".to_string(), Value::Number("1".into())),
            ("b".to_string(), Value::Number("2".into())),
            ("a".to_string(), Value::Number("3".into())),
        ];
        let kept: Vec<&str> = last_wins(&pairs).map(|(k, _)| k.as_str()).collect();
        assert_eq!(kept, ["b", "a"]);
    }

    #[test]
    fn validate_rejects_null_pointer_target() {
        let shape = Shape::pointer(Shape::bool().into_ref()).into_ref();
        let mut slot = Slot::Pointer(None);
        let err = validate_target(&slot, &shape).unwrap_err();
        assert_eq!(err.kind.code(), "juggle::invalid_target");
        slot = Slot::reference(Slot::Bool(false));
        assert!(validate_target(&slot, &shape).is_ok());
    }

    #[test]
    fn validate_rejects_shape_disagreement() {
        let shape = Shape::string().into_ref();
        let slot = Slot::Bool(false);
        assert!(validate_target(&slot, &shape).is_err());
    }
}
