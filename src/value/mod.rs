//! Defines the [`Value`] enum, representing any valid renderable data.

mod cow;
mod from;

use std::cmp::Ordering;
use std::fmt;
use std::mem;

pub use std::collections::BTreeMap as Map;
pub use std::vec::Vec as List;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub use crate::value::cow::ValueCow;
use crate::Result;

/// Data to be rendered represented as a recursive enum.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(List<Value>),
    Map(Map<String, Value>),
}

/// Convert a serializable type into a [`Value`].
///
/// # Errors
///
/// Fails if the data cannot be represented, e.g. a map with non-string keys.
pub fn to_value<S>(s: S) -> Result<Value>
where
    S: Serialize,
{
    Ok(Value::from(serde_json::to_value(s)?))
}

impl Value {
    /// Whether this value renders a section body.
    ///
    /// `None`, `false`, zero, the empty string and empty lists and maps are
    /// falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Integer(n) => *n != 0,
            Self::Float(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }

    /// Returns a human readable name of the value's type.
    pub fn human(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns the string if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value, parsing numeric strings.
    pub fn as_number(&self) -> Option<Value> {
        match self {
            Self::Integer(_) | Self::Float(_) => Some(self.clone()),
            Self::String(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    Some(Self::Integer(n))
                } else {
                    s.parse::<f64>().ok().filter(|n| n.is_finite()).map(Self::Float)
                }
            }
            _ => None,
        }
    }

    /// Returns the value as a float, parsing numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self.as_number()? {
            Self::Integer(n) => Some(n as f64),
            Self::Float(n) => Some(n),
            _ => None,
        }
    }

    /// Looks up a key in a map or an index in a list.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        }
    }

    /// Looks up an index in a list.
    pub fn get_index(&self, i: usize) -> Option<&Value> {
        match self {
            Self::List(list) => list.get(i),
            Self::Map(map) => map.get(&i.to_string()),
            _ => None,
        }
    }

    /// The number of elements in a list or map, zero for `None` and one for
    /// scalars.
    pub fn size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::List(l) => l.len(),
            Self::Map(m) => m.len(),
            _ => 1,
        }
    }

    /// Loose equality, numbers and numeric strings compare by value.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.loose_cmp(other) == Some(Ordering::Equal)
    }

    /// Loose ordering.
    ///
    /// - `None` equals any falsy value.
    /// - Booleans compare by truthiness.
    /// - Numbers and numeric strings compare numerically.
    /// - Strings compare lexicographically.
    /// - Lists and maps are only ever equal.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::None, v) | (v, Self::None) => match v.is_truthy() {
                false => Some(Ordering::Equal),
                true if matches!(self, Self::None) => Some(Ordering::Less),
                true => Some(Ordering::Greater),
            },
            (Self::Bool(_), _) | (_, Self::Bool(_)) => {
                Some(self.is_truthy().cmp(&other.is_truthy()))
            }
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => match (self.as_f64(), other.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Some(a.cmp(b)),
            },
            (Self::List(_) | Self::Map(_), _) | (_, Self::List(_) | Self::Map(_)) => {
                (self == other).then_some(Ordering::Equal)
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Some(self.to_string().cmp(&other.to_string())),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(s), Self::Bool(o)) => s == o,
            (Self::Integer(s), Self::Integer(o)) => s == o,
            (Self::Float(s), Self::Float(o)) => s == o,
            (Self::String(s), Self::String(o)) => s == o,
            (Self::List(s), Self::List(o)) => s == o,
            (Self::Map(s), Self::Map(o)) => s == o,
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }
}

/// Formats the value the way it is written into template output.
///
/// `None`, lists and maps are written as nothing.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None | Self::List(_) | Self::Map(_) => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for v in list {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}
