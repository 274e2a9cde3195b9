//! Identifier newtypes and the set type used for membership-only collections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Catalog identifier of a field type, e.g. "conventional", "offshore".
    FieldTypeId
);
string_id!(
    /// Catalog identifier of a technology, e.g. "advanced_drilling".
    TechId
);
string_id!(
    /// Catalog identifier of a crisis template, e.g. "market_crash".
    CrisisId
);
string_id!(
    /// Continent key, e.g. "north_america".
    ContinentId
);
string_id!(
    /// Achievement key, e.g. "oil_baron".
    AchievementId
);

/// Identifier of a purchased field instance. Allocated sequentially per game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field-{}", self.0)
    }
}

/// Unique id collection.
///
/// Stored as a sorted set in memory and written as a plain sequence. Reading
/// a sequence with repeated entries collapses them, so a hand-edited save
/// cannot smuggle duplicates back in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Ord + Clone + Serialize",
    deserialize = "T: Ord + Deserialize<'de>"
))]
pub struct IdSet<T: Ord> {
    items: BTreeSet<T>,
}

impl<T: Ord> IdSet<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeSet::new(),
        }
    }

    /// Rebuild a set from its stored sequence form.
    pub fn from_sequence(seq: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: seq.into_iter().collect(),
        }
    }

    /// Returns true when the id was not present before.
    pub fn insert(&mut self, id: T) -> bool {
        self.items.insert(id)
    }

    pub fn contains(&self, id: &T) -> bool {
        self.items.contains(id)
    }

    pub fn remove(&mut self, id: &T) -> bool {
        self.items.remove(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Ord + Clone> IdSet<T> {
    /// Sequence form used by persisted snapshots (sorted, no duplicates).
    pub fn to_sequence(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Ord> Default for IdSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> From<Vec<T>> for IdSet<T> {
    fn from(seq: Vec<T>) -> Self {
        Self::from_sequence(seq)
    }
}

impl<T: Ord> From<IdSet<T>> for Vec<T> {
    fn from(set: IdSet<T>) -> Self {
        set.items.into_iter().collect()
    }
}

impl<T: Ord> FromIterator<T> for IdSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_sequence(iter)
    }
}
