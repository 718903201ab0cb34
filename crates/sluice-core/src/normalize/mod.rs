//! # Value Normalization
//!
//! Turns an arbitrary field value into a [`Value`] tree that is safe to
//! print: indirection is followed to its target, containers are expanded
//! element by element, records become name → value maps, and an absent value
//! at any depth becomes the sentinel `"<nil>"`.
//!
//! Any type implementing [`serde::Serialize`] can be normalized. Record
//! fields the type does not serialize (`#[serde(skip)]`) are left out, which
//! is how private state is kept out of log lines.
//!
//! ```rust
//! use sluice_core::normalize::{normalize, Value};
//!
//! let missing: Option<Box<u32>> = None;
//! assert_eq!(normalize(&missing).to_string(), "<nil>");
//!
//! let boxed = vec![Box::new(1), Box::new(2)];
//! assert_eq!(normalize(&boxed).to_string(), "[1, 2]");
//! ```

mod serializer;

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub use serializer::{NormalizeError, ValueSerializer};

/// Text written wherever a value is absent.
pub const NIL: &str = "<nil>";

/// A normalized, printable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value
{
    /// Absent value; renders as [`NIL`]
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Text (also used for unit variants and out-of-range 128-bit integers)
    Str(String),
    /// Ordered sequence
    Seq(Vec<Value>),
    /// Ordered key/value entries
    Map(Vec<(Value, Value)>),
}

impl Value
{
    const fn rank(&self) -> u8
    {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Seq(_) => 4,
            Value::Map(_) => 5,
        }
    }

    /// Total order used to sort map keys.
    ///
    /// Numbers compare by magnitude regardless of representation; otherwise
    /// values of different kinds order by kind.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering
    {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(b),
            (Value::Int(a), Value::UInt(b)) => i128::from(*a).cmp(&i128::from(*b)),
            (Value::UInt(a), Value::Int(b)) => i128::from(*a).cmp(&i128::from(*b)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            #[allow(clippy::cast_precision_loss)]
            (Value::Float(a), Value::UInt(b)) => a.total_cmp(&(*b as f64)),
            (Value::Int(_) | Value::UInt(_), Value::Float(_)) => other.total_cmp(self).reverse(),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Seq(a), Value::Seq(b)) => cmp_iter(a.iter(), b.iter(), Value::total_cmp),
            (Value::Map(a), Value::Map(b)) => cmp_iter(a.iter(), b.iter(), |(ak, av), (bk, bv)| {
                ak.total_cmp(bk).then_with(|| av.total_cmp(bv))
            }),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn cmp_iter<'a, T: 'a>(
    mut a: impl Iterator<Item = &'a T>,
    mut b: impl Iterator<Item = &'a T>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering
{
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp(x, y) {
                Ordering::Equal => {}
                unequal => return unequal,
            },
        }
    }
}

impl fmt::Display for Value
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Value::Nil => f.write_str(NIL),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Map keys are written as their display text so any key kind fits a JSON
/// object.
struct KeyText<'a>(&'a Value);

impl Serialize for KeyText<'_>
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        match self.0 {
            Value::Str(text) => serializer.serialize_str(text),
            other => serializer.collect_str(other),
        }
    }
}

impl Serialize for Value
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        match self {
            Value::Nil => serializer.serialize_str(NIL),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&KeyText(key), value)?;
                }
                map.end()
            }
        }
    }
}

/// Normalize a single value.
///
/// Never fails: if the value's own `Serialize` implementation reports an
/// error, the result is the text `<error: ...>` instead.
#[must_use]
pub fn normalize<T>(value: &T) -> Value
where
    T: ?Sized + Serialize,
{
    value
        .serialize(ValueSerializer)
        .unwrap_or_else(|err| Value::Str(format!("<error: {err}>")))
}

/// A value that can be attached to a log event.
///
/// Implemented for every `Serialize` type; log calls take fields as
/// `&[&dyn Field]` so heterogeneous values can be passed together.
pub trait Field
{
    /// Normalize this field for printing.
    fn normalize(&self) -> Value;
}

impl<T> Field for T
where
    T: ?Sized + Serialize,
{
    fn normalize(&self) -> Value
    {
        normalize(self)
    }
}

/// Normalize every field, in order.
#[must_use]
pub fn normalize_all(fields: &[&dyn Field]) -> Vec<Value>
{
    fields.iter().map(|field| field.normalize()).collect()
}
