//! Scalar leaf values shared by flattened rows, the store, and diff tuples.
//!
//! `Leaf` has a total order (variant rank first, reals via `f64::total_cmp`)
//! and a matching hash, so projections can be collected into ordered sets and
//! compared deterministically. Booleans are bound to `SQLite` as `0`/`1` and
//! come back as [`Leaf::Integer`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// A single scalar attribute value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Leaf {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

/// One projected row: leaf values in requested column order.
pub type Tuple = Vec<Leaf>;

impl Leaf {
    /// Convert a JSON scalar into a leaf.
    ///
    /// Returns `None` for objects, which are nested records rather than
    /// leaves. Arrays are kept whole as their compact JSON text.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value as Json;

        match value {
            Json::Object(_) => None,
            Json::Null => Some(Self::Null),
            Json::Bool(b) => Some(Self::Bool(*b)),
            Json::Number(n) => Some(n.as_i64().map_or_else(
                || Self::Real(n.as_f64().unwrap_or(f64::NAN)),
                Self::Integer,
            )),
            Json::String(s) => Some(Self::Text(s.clone())),
            Json::Array(_) => Some(Self::Text(value.to_string())),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness for flag columns: zero, empty text, and null are false.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Real(r) => *r != 0.0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric view used for timestamps; text is not coerced.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            Self::Bool(_) | Self::Text(_) | Self::Null => None,
        }
    }

    /// Booleans and integers that mean the same thing when read back from
    /// the store compare equal through this view.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::Bool(b) => Self::Integer(i64::from(*b)),
            other => other.clone(),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) => 2,
            Self::Real(_) => 3,
            Self::Text(_) => 4,
        }
    }
}

impl Ord for Leaf {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Leaf {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Leaf {}

impl Hash for Leaf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Real(r) => r.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Leaf {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Leaf {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Leaf {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Leaf {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Leaf {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl ToSql for Leaf {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            Self::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Self::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Leaf {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Self::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        })
    }
}
