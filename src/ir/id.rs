use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Untyped index of a statement inside a `Fusion` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StmtId(pub(crate) u32);

impl StmtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Build an id from a raw arena index. Nothing guarantees the index is
    /// live in any particular fusion; the router rejects ids that are not.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Typed handle to a statement of kind `T`.
///
/// `T` is either a concrete node (`Split`, `Int`, ...) or one of the abstract
/// families (`Val`, `Expr`). Handles are only minted by the fusion
/// constructors and by the router after checking the discriminant, so
/// indexing a fusion with one cannot observe the wrong kind.
pub struct Id<T> {
    raw: StmtId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub(crate) fn new(raw: StmtId) -> Self {
        Self { raw, _marker: PhantomData }
    }

    pub fn stmt(self) -> StmtId {
        self.raw
    }

    /// Reinterpret the handle as a handle to another kind. Only used where the
    /// kind has already been checked (concrete -> family upcasts, router).
    pub(crate) fn cast<U>(self) -> Id<U> {
        Id::new(self.raw)
    }
}

// Manual impls: derives would require `T: Clone`, `T: PartialEq`, ...

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T> From<Id<T>> for StmtId {
    fn from(id: Id<T>) -> Self {
        id.raw
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        StmtId::deserialize(deserializer).map(Id::new)
    }
}
