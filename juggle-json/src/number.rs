//! Numeric-literal coercion helpers.
//!
//! Integer destinations parse base-10 text, truncating a fractional part
//! toward zero; the fractional path works on the literal's decimal digits
//! directly, so values near the 63/64-bit boundary never round through a
//! binary float. Width checks happen on the exact value.

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;

/// Failure modes of literal coercion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum NumError {
    /// The text is not numeric.
    Malformed,
    /// The exact value does not fit the destination.
    Overflow,
}

/// Largest number of decimal digits that can still fit an `i128` once the
/// exponent has been applied. Anything longer overflows every destination
/// width we support.
const MAX_INT_DIGITS: i64 = 39;

/// Whether `literal` matches the numeric grammar accepted by the coercion
/// paths: optional sign, digits, optional fraction, optional exponent.
/// Looser than JSON in that leading zeros are allowed, mirroring what the
/// original accepts for string sources.
fn is_numeric(literal: &str) -> bool {
    let b = literal.as_bytes();
    let mut i = 0;
    if b.first() == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    if i == int_start {
        return false;
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == b.len()
}

/// Parse a literal as an exact integer, truncating any fractional component
/// toward zero. The result is exact; width checks against the destination
/// happen at the call site.
pub(crate) fn parse_int_literal(literal: &str) -> Result<i128, NumError> {
    if literal.is_empty() {
        return Err(NumError::Malformed);
    }
    // Fast path for plain integers.
    if !literal.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        if !is_numeric(literal) {
            return Err(NumError::Malformed);
        }
        return i128::from_lexical(literal.as_bytes()).map_err(|_| NumError::Overflow);
    }
    if !is_numeric(literal) {
        return Err(NumError::Malformed);
    }
    truncate_decimal(literal)
}

/// Exact truncation of a decimal literal with fraction and/or exponent.
fn truncate_decimal(literal: &str) -> Result<i128, NumError> {
    let b = literal.as_bytes();
    let mut i = 0;
    let negative = b[0] == b'-';
    if negative {
        i = 1;
    }

    // Collect the significand's digits and where its decimal point sits.
    let mut digits: Vec<u8> = Vec::with_capacity(b.len());
    while i < b.len() && b[i].is_ascii_digit() {
        digits.push(b[i] - b'0');
        i += 1;
    }
    let mut point: i64 = digits.len() as i64;
    if b.get(i) == Some(&b'.') {
        i += 1;
        while i < b.len() && b[i].is_ascii_digit() {
            digits.push(b[i] - b'0');
            i += 1;
        }
    }
    let mut exponent: i64 = 0;
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        let mut negative_exp = false;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            negative_exp = b[i] == b'-';
            i += 1;
        }
        for &d in &b[i..] {
            // Clamp: exponents beyond the digit budget either overflow or
            // truncate to zero regardless of the exact magnitude.
            exponent = (exponent * 10 + (d - b'0') as i64).min(10 * MAX_INT_DIGITS);
        }
        if negative_exp {
            exponent = -exponent;
        }
    }
    point += exponent;

    // Strip leading zeros so they don't count against the digit budget.
    let leading = digits.iter().take_while(|&&d| d == 0).count();
    digits.drain(..leading);
    point -= leading as i64;
    if digits.is_empty() || point <= 0 {
        // Purely fractional (or zero): truncates to zero.
        return Ok(0);
    }
    if point > MAX_INT_DIGITS {
        return Err(NumError::Overflow);
    }

    let mut value: i128 = 0;
    for idx in 0..point as usize {
        let d = digits.get(idx).copied().unwrap_or(0);
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as i128))
            .ok_or(NumError::Overflow)?;
    }
    Ok(if negative { -value } else { value })
}

/// Parse a literal as a finite `f64`. Overflow to infinity is rejected, the
/// way the original rejects out-of-range float parses.
pub(crate) fn parse_f64(literal: &str) -> Result<f64, NumError> {
    if !is_numeric(literal) {
        return Err(NumError::Malformed);
    }
    let n = f64::from_lexical(literal.as_bytes()).map_err(|_| NumError::Malformed)?;
    if n.is_finite() { Ok(n) } else { Err(NumError::Overflow) }
}

/// Parse a literal as a float that must fit an `f32` destination.
pub(crate) fn parse_f32(literal: &str) -> Result<f32, NumError> {
    let n = parse_f64(literal)?;
    let narrowed = n as f32;
    if narrowed.is_infinite() && n.is_finite() {
        return Err(NumError::Overflow);
    }
    Ok(narrowed)
}

/// Whether the literal denotes exactly zero, the falsy case for numbers.
/// Decided on the significand's digits, so a tiny-but-nonzero literal that
/// would underflow a binary float is still truthy.
pub(crate) fn is_zero_literal(literal: &str) -> bool {
    if !is_numeric(literal) {
        return false;
    }
    literal
        .bytes()
        .take_while(|b| !matches!(b, b'e' | b'E'))
        .all(|b| !b.is_ascii_digit() || b == b'0')
}
