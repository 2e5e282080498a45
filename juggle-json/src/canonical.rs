//! Canonical re-encoding.
//!
//! [`to_canonical`] turns a [`Value`] subtree back into compact JSON text,
//! lossless with respect to numeric literals — this is the payload raw
//! hooks receive. [`slot_to_value`] lowers a decoded slot back into a
//! `Value`, which is what the round-trip property tests re-decode.

use juggle_core::{Def, Dynamic, MapKey, Shape, ShapeRef, Slot, UintWidth, strip_pointers};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::value::Value;

/// Re-serialize a value subtree to compact JSON text. Numeric literals are
/// emitted verbatim; object pairs keep their source order, duplicates
/// included.
pub fn to_canonical(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(literal) => out.push_str(literal),
        Value::String(s) => write_escaped(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(pairs) => {
            out.push('{');
            for (i, (key, val)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(out, key);
                out.push(':');
                write_value(out, val);
            }
            out.push('}');
        }
    }
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// The element shape of `shape` if it is a plain byte slice: a slice whose
/// element is a hook-less `u8`. Those targets decode strings as base64 and
/// re-encode the same way.
pub(crate) fn byte_slice_elem(shape: &Shape) -> Option<&ShapeRef> {
    match &shape.def {
        Def::Slice(elem)
            if matches!(elem.def, Def::Uint(UintWidth::U8))
                && !elem.has_raw_hook()
                && !elem.has_text_hook() =>
        {
            Some(elem)
        }
        _ => None,
    }
}

/// Lower a decoded slot back into a generic value.
///
/// The inverse of the unambiguous decode paths: integers and floats become
/// numeric literals, byte slices become base64 strings, struct fields are
/// emitted under their resolved names with unrenamed embedded substructures
/// flattened into the parent object.
pub fn slot_to_value(slot: &Slot, shape: &ShapeRef) -> Value {
    match (slot, &shape.def) {
        (Slot::Pointer(inner), Def::Pointer(pointee)) => match inner {
            Some(boxed) => slot_to_value(boxed, pointee),
            None => Value::Null,
        },
        (Slot::Bool(b), _) => Value::Bool(*b),
        (Slot::Int(n), _) => {
            let mut buf = itoa::Buffer::new();
            Value::Number(buf.format(*n).to_string())
        }
        (Slot::Uint(n), _) => {
            let mut buf = itoa::Buffer::new();
            Value::Number(buf.format(*n).to_string())
        }
        (Slot::Float(n), Def::Float(width)) => {
            let mut buf = ryu::Buffer::new();
            let literal = if matches!(width, juggle_core::FloatWidth::F32) {
                buf.format(*n as f32).to_string()
            } else {
                buf.format(*n).to_string()
            };
            Value::Number(literal)
        }
        (Slot::String(s), _) => Value::String(s.clone()),
        (Slot::Slice(items), _) if byte_slice_elem(shape).is_some() => {
            let bytes: Vec<u8> = items
                .iter()
                .map(|item| match item {
                    Slot::Uint(n) => *n as u8,
                    _ => 0,
                })
                .collect();
            Value::String(BASE64_STANDARD.encode(bytes))
        }
        (Slot::Slice(items), Def::Slice(elem)) | (Slot::Array(items), Def::Array { elem, .. }) => {
            Value::Array(items.iter().map(|item| slot_to_value(item, elem)).collect())
        }
        (Slot::Map(entries), Def::Map { key, value }) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (map_key_text(k, key), slot_to_value(v, value)))
                .collect(),
        ),
        (Slot::Struct(fields), Def::Struct(def)) => {
            let mut pairs: Vec<(String, Value)> = Vec::new();
            for (field_def, field_slot) in def.fields.iter().zip(fields) {
                if field_def.ignored {
                    continue;
                }
                let expandable = field_def.embedded
                    && field_def.rename.is_none()
                    && matches!(strip_pointers(&field_def.shape).def, Def::Struct(_));
                if expandable {
                    if matches!(field_slot, Slot::Pointer(None)) {
                        continue;
                    }
                    if let Value::Object(inner) = slot_to_value(field_slot, &field_def.shape) {
                        pairs.extend(inner);
                    }
                    continue;
                }
                pairs.push((
                    field_def.name().to_string(),
                    slot_to_value(field_slot, &field_def.shape),
                ));
            }
            Value::Object(pairs)
        }
        (Slot::Dynamic(dynamic), _) => dynamic_to_value(dynamic),
        // A slot that disagrees with its shape only happens through direct
        // construction; encode what is actually there.
        (other, _) => fallback_value(other),
    }
}

fn map_key_text(key: &MapKey, key_shape: &ShapeRef) -> String {
    match key {
        MapKey::Str(s) => s.clone(),
        MapKey::Int(n) => itoa::Buffer::new().format(*n).to_string(),
        MapKey::Uint(n) => itoa::Buffer::new().format(*n).to_string(),
        MapKey::Hooked(slot) => match slot_to_value(slot, key_shape) {
            Value::String(s) => s,
            other => to_canonical(&other),
        },
    }
}

fn dynamic_to_value(dynamic: &Dynamic) -> Value {
    match dynamic {
        Dynamic::Null => Value::Null,
        Dynamic::Bool(b) => Value::Bool(*b),
        Dynamic::Float(n) => Value::Number(ryu::Buffer::new().format(*n).to_string()),
        Dynamic::Number(literal) => Value::Number(literal.clone()),
        Dynamic::String(s) => Value::String(s.clone()),
        Dynamic::Array(items) => Value::Array(items.iter().map(dynamic_to_value).collect()),
        Dynamic::Object(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.clone(), dynamic_to_value(v)))
                .collect(),
        ),
    }
}

fn fallback_value(slot: &Slot) -> Value {
    match slot {
        Slot::Bool(b) => Value::Bool(*b),
        Slot::Int(n) => Value::Number(itoa::Buffer::new().format(*n).to_string()),
        Slot::Uint(n) => Value::Number(itoa::Buffer::new().format(*n).to_string()),
        Slot::Float(n) => Value::Number(ryu::Buffer::new().format(*n).to_string()),
        Slot::String(s) => Value::String(s.clone()),
        Slot::Dynamic(d) => dynamic_to_value(d),
        Slot::Pointer(Some(inner)) => fallback_value(inner),
        Slot::Pointer(None) => Value::Null,
        Slot::Slice(items) | Slot::Array(items) | Slot::Struct(items) => {
            Value::Array(items.iter().map(fallback_value).collect())
        }
        Slot::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        MapKey::Str(s) => s.clone(),
                        MapKey::Int(n) => itoa::Buffer::new().format(*n).to_string(),
                        MapKey::Uint(n) => itoa::Buffer::new().format(*n).to_string(),
                        MapKey::Hooked(slot) => to_canonical(&fallback_value(slot)),
                    };
                    (key, fallback_value(v))
                })
                .collect(),
        ),
    }
}
