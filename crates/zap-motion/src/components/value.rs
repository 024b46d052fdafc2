use glam::{DQuat, DVec2, DVec3, Vec2, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::types::PathSegment;

/// A host object whose numeric leaves the animator can read and write.
///
/// Paths are relative to the object; an empty path addresses the object
/// itself (meaningful only for scalar hosts).
pub trait Animatable {
    /// The numeric leaf at `path`, or `None` if it is missing or not a number.
    fn field(&self, path: &[PathSegment]) -> Option<f64>;

    /// Overwrite the numeric leaf at `path`. Returns `false` if there is none.
    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool;
}

impl Animatable for f64 {
    fn field(&self, path: &[PathSegment]) -> Option<f64> {
        path.is_empty().then_some(*self)
    }

    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
        if path.is_empty() {
            *self = value;
        }
        path.is_empty()
    }
}

impl Animatable for f32 {
    fn field(&self, path: &[PathSegment]) -> Option<f64> {
        path.is_empty().then_some(*self as f64)
    }

    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
        if path.is_empty() {
            *self = value as f32;
        }
        path.is_empty()
    }
}

// Component-wise access for glam types: `x`, `y`, ... as single-key paths.
macro_rules! impl_animatable_components {
    ($ty:ty, $scalar:ty, $($name:ident),+) => {
        impl Animatable for $ty {
            fn field(&self, path: &[PathSegment]) -> Option<f64> {
                match path {
                    [PathSegment::Key(key)] => match key.as_str() {
                        $(stringify!($name) => Some(self.$name as f64),)+
                        _ => None,
                    },
                    _ => None,
                }
            }

            fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
                match path {
                    [PathSegment::Key(key)] => match key.as_str() {
                        $(stringify!($name) => {
                            self.$name = value as $scalar;
                            true
                        })+
                        _ => false,
                    },
                    _ => false,
                }
            }
        }
    };
}

impl_animatable_components!(DVec2, f64, x, y);
impl_animatable_components!(DVec3, f64, x, y, z);
impl_animatable_components!(DQuat, f64, x, y, z, w);
impl_animatable_components!(Vec2, f32, x, y);
impl_animatable_components!(Vec3, f32, x, y, z);

impl<T: Animatable> Animatable for Vec<T> {
    fn field(&self, path: &[PathSegment]) -> Option<f64> {
        match path.split_first() {
            Some((PathSegment::Index(i), rest)) => self.get(*i)?.field(rest),
            _ => None,
        }
    }

    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
        match path.split_first() {
            Some((PathSegment::Index(i), rest)) => self
                .get_mut(*i)
                .is_some_and(|item| item.set_field(rest, value)),
            _ => false,
        }
    }
}

impl<T: Animatable, const N: usize> Animatable for [T; N] {
    fn field(&self, path: &[PathSegment]) -> Option<f64> {
        match path.split_first() {
            Some((PathSegment::Index(i), rest)) => self.get(*i)?.field(rest),
            _ => None,
        }
    }

    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
        match path.split_first() {
            Some((PathSegment::Index(i), rest)) => self
                .get_mut(*i)
                .is_some_and(|item| item.set_field(rest, value)),
            _ => false,
        }
    }
}

/// A dynamically shaped host: nested records and lists with numeric leaves.
///
/// Handy for data loaded from JSON, or for hosts whose shape is only known at
/// runtime. Strongly typed hosts implement [`Animatable`] directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    List(Vec<Value>),
    Record(IndexMap<String, Value>),
    /// Non-numeric payload; readable by path but never animated.
    Text(String),
}

impl Value {
    /// Build a record from `(name, value)` pairs, keeping their order.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The subtree at `path`.
    pub fn get(&self, path: &[PathSegment]) -> Option<&Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, head) {
            (Value::Record(fields), PathSegment::Key(key)) => fields.get(key)?,
            (Value::List(items), PathSegment::Index(i)) => items.get(*i)?,
            _ => return None,
        };
        child.get(rest)
    }

    pub fn get_mut(&mut self, path: &[PathSegment]) -> Option<&mut Value> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, head) {
            (Value::Record(fields), PathSegment::Key(key)) => fields.get_mut(key)?,
            (Value::List(items), PathSegment::Index(i)) => items.get_mut(*i)?,
            _ => return None,
        };
        child.get_mut(rest)
    }
}

impl Animatable for Value {
    fn field(&self, path: &[PathSegment]) -> Option<f64> {
        self.get(path)?.as_f64()
    }

    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
        match self.get_mut(path) {
            Some(Value::Number(n)) => {
                *n = value;
                true
            }
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<DVec3> for Value {
    fn from(v: DVec3) -> Self {
        Value::record([("x", v.x.into()), ("y", v.y.into()), ("z", v.z.into())])
    }
}

impl From<DQuat> for Value {
    fn from(q: DQuat) -> Self {
        Value::record([
            ("x", q.x.into()),
            ("y", q.y.into()),
            ("z", q.z.into()),
            ("w", q.w.into()),
        ])
    }
}
