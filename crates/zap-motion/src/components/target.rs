// components/target.rs
//
// Target descriptions: the tree of numeric leaves an animation drives toward.
// Mirrors the shape of the host, but only the leaves named here are touched.

use glam::{DQuat, DVec2, DVec3, Vec2, Vec3};

use crate::api::types::{FieldPath, PathSegment};

/// Destination values for one or more numeric leaves of a host.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A single leaf.
    Number(f64),
    /// Elements `0..n` of a list.
    List(Vec<Target>),
    /// Named members of a record, visited in order.
    Fields(Vec<(String, Target)>),
    /// A subtree placed at a relative path, for sparse or deeply nested targets.
    At(FieldPath, Box<Target>),
}

impl Target {
    /// A record target with a single member. Chain [`Target::with`] for more.
    pub fn field(name: impl Into<String>, value: impl Into<Target>) -> Self {
        Target::Fields(vec![(name.into(), value.into())])
    }

    /// Builder: add a record member. Wraps non-record targets into a record.
    pub fn with(self, name: impl Into<String>, value: impl Into<Target>) -> Self {
        let mut fields = match self {
            Target::Fields(fields) => fields,
            other => vec![(String::new(), other)],
        };
        fields.push((name.into(), value.into()));
        Target::Fields(fields)
    }

    /// Place `value` at `path`, e.g. `Target::at("points[3].y", 1.0)`.
    pub fn at(path: impl Into<FieldPath>, value: impl Into<Target>) -> Self {
        Target::At(path.into(), Box::new(value.into()))
    }

    /// Visit every leaf depth-first with its full path, stopping at the first error.
    pub fn try_visit_leaves<E>(
        &self,
        visit: &mut impl FnMut(&FieldPath, f64) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut path = FieldPath::root();
        self.walk(&mut path, visit)
    }

    fn walk<E>(
        &self,
        path: &mut FieldPath,
        visit: &mut impl FnMut(&FieldPath, f64) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Target::Number(value) => visit(path, *value),
            Target::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(i));
                    let result = item.walk(path, visit);
                    path.pop();
                    result?;
                }
                Ok(())
            }
            Target::Fields(fields) => {
                for (name, item) in fields {
                    let pushed = !name.is_empty();
                    if pushed {
                        path.push(PathSegment::Key(name.clone()));
                    }
                    let result = item.walk(path, visit);
                    if pushed {
                        path.pop();
                    }
                    result?;
                }
                Ok(())
            }
            Target::At(relative, item) => {
                let mut nested = path.join(relative);
                item.walk(&mut nested, visit)
            }
        }
    }

    /// Every leaf as `(path, value)`, in visit order.
    pub fn leaves(&self) -> Vec<(FieldPath, f64)> {
        let mut out = Vec::new();
        let _ = self.try_visit_leaves(&mut |path, value| {
            out.push((path.clone(), value));
            Ok::<(), ()>(())
        });
        out
    }
}

impl From<f64> for Target {
    fn from(value: f64) -> Self {
        Target::Number(value)
    }
}

impl From<f32> for Target {
    fn from(value: f32) -> Self {
        Target::Number(value as f64)
    }
}

impl<const N: usize> From<[f64; N]> for Target {
    fn from(values: [f64; N]) -> Self {
        Target::List(values.into_iter().map(Target::Number).collect())
    }
}

impl From<Vec<f64>> for Target {
    fn from(values: Vec<f64>) -> Self {
        Target::List(values.into_iter().map(Target::Number).collect())
    }
}

impl From<&Target> for Target {
    fn from(target: &Target) -> Self {
        target.clone()
    }
}

impl From<Vec<Target>> for Target {
    fn from(items: Vec<Target>) -> Self {
        Target::List(items)
    }
}

impl From<DVec2> for Target {
    fn from(v: DVec2) -> Self {
        Target::field("x", v.x).with("y", v.y)
    }
}

impl From<DVec3> for Target {
    fn from(v: DVec3) -> Self {
        Target::field("x", v.x).with("y", v.y).with("z", v.z)
    }
}

impl From<Vec2> for Target {
    fn from(v: Vec2) -> Self {
        Target::from(v.as_dvec2())
    }
}

impl From<Vec3> for Target {
    fn from(v: Vec3) -> Self {
        Target::from(v.as_dvec3())
    }
}

/// Component-wise; for slerp-like motion use the orientation springs instead.
impl From<DQuat> for Target {
    fn from(q: DQuat) -> Self {
        Target::field("x", q.x).with("y", q.y).with("z", q.z).with("w", q.w)
    }
}
