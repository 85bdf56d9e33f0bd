//! Identity contract shared by every aggregate root.

use std::fmt;
use std::hash::Hash;

/// An aggregate with a stable identity.
///
/// Two aggregates are the same when their identities are equal, whatever the
/// rest of their state looks like. This is distinct from `PartialEq`, which
/// aggregates do not implement.
pub trait AggregateRoot {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    /// Label used in log fields and error messages (`"Device"`, `"Room"`, ...).
    const KIND: &'static str;

    fn identity(&self) -> &Self::Id;

    fn is_same_as(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}
