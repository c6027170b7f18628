//! Runtime values and the constant pool.

use core::fmt;

use crate::array::DynArray;

/// Scalar runtime datum: an IEEE-754 double, copied by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct Value(f64);

impl Value {
    /// Wrap a number.
    pub const fn new(number: f64) -> Self { Self(number) }

    /// The underlying number.
    pub const fn as_f64(self) -> f64 { self.0 }

    /// Bit-exact comparison (distinguishes `0.0`/`-0.0`, matches equal NaNs).
    pub fn bit_eq(self, other: Self) -> bool { self.0.to_bits() == other.0.to_bits() }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self { Self(number) }
}

impl From<Value> for f64 {
    fn from(value: Value) -> Self { value.0 }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&format_g(self.0)) }
}

/// Print `value` to stdout, `%g` style, without a trailing newline.
pub fn print_value(value: Value) {
    print!("{value}");
}

const SIGNIFICANT_DIGITS: i32 = 6;

/// Render like C's `printf("%g")`: 6 significant digits, trailing zeros
/// trimmed, scientific notation when the exponent is below -4 or at least 6.
pub fn format_g(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf".into() } else { "inf".into() };
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    // The exponent is taken after rounding to the target precision.
    let sci = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..SIGNIFICANT_DIGITS).contains(&exp) {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exp) as usize;
        trim_fraction(&format!("{x:.decimals$}")).to_owned()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/* ─────────────────────────── Pool ─────────────────────────── */

/// Ordered, append-only constant pool. Indices are stable and 0-based.
#[derive(Debug, Default, PartialEq)]
pub struct ValuePool {
    values: DynArray<Value>,
}

impl ValuePool {
    /// Empty pool; nothing is allocated until the first write.
    pub fn new() -> Self { Self { values: DynArray::new() } }

    /// Append `value`. Duplicates get their own slot.
    pub fn write_value(&mut self, value: Value) { self.values.push(value); }

    /// Number of stored values.
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Allocated slots.
    pub fn capacity(&self) -> usize { self.values.capacity() }

    /// Lookup a value by index.
    pub fn get(&self, index: usize) -> Option<Value> { self.values.get(index) }

    /// Stored values, in insertion order.
    pub fn as_slice(&self) -> &[Value] { self.values.as_slice() }

    /// Iterate as `(index, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// Release storage and return to the empty state.
    pub fn free(&mut self) { self.values.free(); }
}
