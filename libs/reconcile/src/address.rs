//! Unordered collections of distinct network addresses.

use std::collections::BTreeSet;
use std::fmt;

/// A set of node addresses.
///
/// Backed by a `BTreeSet` so iteration (and therefore log output) is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AddressSet(BTreeSet<String>);

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address. Surrounding whitespace is trimmed and empty
    /// strings are ignored.
    ///
    /// Returns true if the address was not already present.
    pub fn insert(&mut self, address: impl AsRef<str>) -> bool {
        let address = address.as_ref().trim();
        if address.is_empty() {
            return false;
        }
        self.0.insert(address.to_string())
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.contains(address.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Addresses in `self` that are not in `other`.
    pub fn difference(&self, other: &AddressSet) -> AddressSet {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    pub fn union(&self, other: &AddressSet) -> AddressSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn is_disjoint(&self, other: &AddressSet) -> bool {
        self.0.is_disjoint(&other.0)
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, address) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{address}")?;
        }
        write!(f, "]")
    }
}

impl FromIterator<String> for AddressSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

impl<'a> FromIterator<&'a str> for AddressSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for AddressSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
