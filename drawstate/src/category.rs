// Copyright 2025 the Drawstate Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Field-wise matching of category descriptors.
//!
//! The classification engine owns category descriptors and hands out
//! [`CategoryId`] handles. When it needs to find an existing descriptor that
//! is equivalent to a new one, it compares them field by field through
//! [`Matchable`]; each concrete descriptor type lists its own fields.

use smallvec::SmallVec;

use crate::types::CategoryId;

/// Outcome of comparing one named field of two descriptors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldMatch {
    /// Field name.
    pub field: &'static str,
    /// Whether both descriptors agree on the field.
    pub equal: bool,
}

impl FieldMatch {
    /// Compares `a` and `b` under the name `field`.
    #[must_use]
    pub fn compare<T: PartialEq + ?Sized>(field: &'static str, a: &T, b: &T) -> Self {
        Self {
            field,
            equal: a == b,
        }
    }
}

/// Per-field comparison results, inline for descriptors with few fields.
pub type FieldMatches = SmallVec<[FieldMatch; 8]>;

/// A category descriptor that can be compared field by field.
///
/// ```
/// use drawstate::{FieldMatch, FieldMatches, Matchable};
///
/// struct Range { low: i32, high: i32, label: &'static str }
///
/// impl Matchable for Range {
///     fn compare_fields(&self, other: &Self) -> FieldMatches {
///         [
///             FieldMatch::compare("low", &self.low, &other.low),
///             FieldMatch::compare("high", &self.high, &other.high),
///             FieldMatch::compare("label", self.label, other.label),
///         ]
///         .into_iter()
///         .collect()
///     }
/// }
///
/// let a = Range { low: 0, high: 10, label: "small" };
/// let b = Range { low: 0, high: 10, label: "tiny" };
/// assert!(!a.matches(&b));
/// assert_eq!(a.mismatched_fields(&b).as_slice(), ["label"]);
/// ```
pub trait Matchable {
    /// Compares every identifying field of `self` and `other`.
    fn compare_fields(&self, other: &Self) -> FieldMatches;

    /// Returns `true` if every field compares equal.
    fn matches(&self, other: &Self) -> bool {
        self.compare_fields(other).iter().all(|m| m.equal)
    }

    /// Names of the fields that differ.
    fn mismatched_fields(&self, other: &Self) -> SmallVec<[&'static str; 8]> {
        self.compare_fields(other)
            .into_iter()
            .filter(|m| !m.equal)
            .map(|m| m.field)
            .collect()
    }
}

/// Finds the first catalog entry that matches `probe`.
pub fn find_category<'a, C, I>(catalog: I, probe: &C) -> Option<CategoryId>
where
    C: Matchable + 'a,
    I: IntoIterator<Item = (CategoryId, &'a C)>,
{
    catalog
        .into_iter()
        .find(|(_, candidate)| candidate.matches(probe))
        .map(|(id, _)| id)
}
