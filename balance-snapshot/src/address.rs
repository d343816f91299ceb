use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A holder address as found in the source data.
///
/// Sources disagree on casing (e.g. checksummed hex vs lower-case hex), so addresses
/// are only ever compared through [`normalize`].
pub type Address = String;

pub fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A row of an address list export (blacklists, winners of previous rounds).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AddressRecord {
    pub address: Address,
}

/// A case-insensitive set of addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressSet(HashSet<String>);

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.0.contains(&normalize(address))
    }

    pub(crate) fn contains_normalized(&self, normalized: &str) -> bool {
        self.0.contains(normalized)
    }

    pub fn insert(&mut self, address: &str) -> bool {
        self.0.insert(normalize(address))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<A: AsRef<str>> FromIterator<A> for AddressSet {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self(iter.into_iter().map(|a| normalize(a.as_ref())).collect())
    }
}

impl AsRef<str> for AddressRecord {
    fn as_ref(&self) -> &str {
        &self.address
    }
}
