use std::fmt;

use slotmap::new_key_type;

new_key_type! {
    /// Opaque handle to a host object registered with the animator.
    /// Stays valid until the host is unregistered or dropped.
    pub struct HostHandle;
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Named member of a record.
    Key(String),
    /// Element of a list.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Address of a numeric leaf (or of a subtree, when used as a prefix) inside a host.
///
/// Displays as `pos.x` or `points[2].y`; [`FieldPath::parse`] reads the same form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path: the host itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `a.b[2].c`. Bare numeric components (`points.2`) are list indices.
    /// Malformed brackets are kept verbatim as keys.
    pub fn parse(text: &str) -> Self {
        let mut path = Self::root();
        for part in text.split('.').filter(|p| !p.is_empty()) {
            let (name, mut rest) = match part.find('[') {
                Some(at) => (&part[..at], &part[at..]),
                None => (part, ""),
            };
            if !name.is_empty() {
                path.segments.push(match name.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(name.to_owned()),
                });
            }
            while let Some(open) = rest.strip_prefix('[') {
                let Some(close) = open.find(']') else {
                    path.segments.push(PathSegment::Key(rest.to_owned()));
                    break;
                };
                let inner = &open[..close];
                path.segments.push(match inner.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(inner.to_owned()),
                });
                rest = &open[close + 1..];
            }
        }
        path
    }

    /// Builder: append a named member.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Builder: append a list index.
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// `self` followed by every segment of `other`.
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        FieldPath { segments }
    }
}

impl From<&str> for FieldPath {
    fn from(text: &str) -> Self {
        FieldPath::parse(text)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

impl From<Vec<PathSegment>> for FieldPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        FieldPath { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// What an [`AnimationEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A single field reached its target (or was stopped with completion requested).
    FieldComplete,
    /// A host has no animations left.
    ObjectComplete,
    /// A single field was written.
    FieldChange,
    /// One or more fields of a host (under `field`, when non-root) were written.
    ObjectChange,
}

/// Payload handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEvent {
    pub kind: EventKind,
    pub host: HostHandle,
    /// The field for per-field events; the subscribed prefix (root for whole-object) otherwise.
    pub field: FieldPath,
}
