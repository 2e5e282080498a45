//! A JSON decoder with PHP-style type juggling.
//!
//! Standard JSON decoding insists that the source kind and the destination
//! kind agree. This crate instead applies a total coercion matrix modeled
//! on PHP's `json_decode`: booleans cast into numbers and strings, numeric
//! text casts into numbers, scalars wrap into single-element containers at
//! key `"0"`, arrays and objects are interchangeable, and fractional
//! numbers truncate toward zero into integer destinations with exact
//! arbitrary-precision range checks.
//!
//! Destinations are described by [`Shape`](juggle_core::Shape) descriptors
//! from `juggle-core` and written through [`Slot`](juggle_core::Slot)
//! instances. The quickest entry point is [`from_str`]:
//!
//! ```
//! use juggle_core::{IntWidth, Shape, Slot};
//!
//! let shape = Shape::int(IntWidth::I64).into_ref();
//! let mut slot = shape.empty_slot();
//! juggle_json::from_str("\"42\"", &mut slot, &shape).unwrap();
//! assert_eq!(slot, Slot::Int(42));
//! ```
//!
//! For a sequence of whitespace-separated values, or to reuse the field
//! cache across calls, use [`Decoder`].

mod canonical;
mod decode;
mod error;
mod number;
mod parse;
mod value;

pub use canonical::{slot_to_value, to_canonical};
pub use decode::{
    DecodeOptions, Decoder, decode_value, decode_value_with_options, from_slice,
    from_slice_with_options, from_str, from_str_with_options,
};
pub use error::{Error, ErrorKind, Result};
pub use parse::{ParseError, ParseErrorKind, Parser, parse};
pub use value::Value;
