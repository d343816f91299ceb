mod address;
#[cfg(any(test, feature = "proptest"))]
pub mod arbitrary;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use address::{normalize, Address, AddressRecord, AddressSet};

pub type Balance = Decimal;

/// A single row of a holders export.
///
/// Exports are noisy: the balance cell may be empty, negative or not a number at all.
/// Such values are kept as `None` (or as the negative amount) rather than rejected,
/// it's up to the consumer to decide what an unusable balance is worth.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BalanceRecord {
    pub address: Address,
    #[serde(alias = "pols_balance", default)]
    #[serde(deserialize_with = "deser::lenient_balance")]
    pub balance: Option<Balance>,
}

impl BalanceRecord {
    pub fn new(address: impl Into<Address>, balance: Option<Balance>) -> Self {
        Self {
            address: address.into(),
            balance,
        }
    }
}

/// Balances of every holder, keyed by normalized address.
///
/// Iteration follows the normalized address order so that anything derived from a
/// snapshot is reproducible regardless of the order of the source rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    inner: BTreeMap<String, BalanceRecord>,
}

impl Snapshot {
    /// When an address appears more than once (possibly in a different casing)
    /// the last record wins.
    pub fn from_records(records: impl IntoIterator<Item = BalanceRecord>) -> Self {
        Self {
            inner: records
                .into_iter()
                .map(|record| (normalize(&record.address), record))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&BalanceRecord> {
        self.inner.get(&normalize(address))
    }

    /// `None` both for unknown holders and for unusable balances.
    pub fn balance_of(&self, address: &str) -> Option<Balance> {
        self.get(address).and_then(|record| record.balance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BalanceRecord> {
        self.inner.values()
    }

    /// Drop every holder listed in `excluded`.
    pub fn without(self, excluded: &AddressSet) -> Self {
        Self {
            inner: self
                .inner
                .into_iter()
                .filter(|(key, _)| !excluded.contains_normalized(key))
                .collect(),
        }
    }
}

impl FromIterator<BalanceRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = BalanceRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

impl From<Vec<BalanceRecord>> for Snapshot {
    fn from(from: Vec<BalanceRecord>) -> Self {
        Self::from_records(from)
    }
}

/// Balances are parsed from the cell text, never through a float.
mod deser {
    use super::Balance;
    use rust_decimal::Decimal;
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;
    use std::str::FromStr;

    struct LenientBalanceVisitor;

    fn parse(v: &str) -> Option<Balance> {
        let v = v.trim();
        Decimal::from_str(v)
            .or_else(|_| Decimal::from_scientific(v))
            .ok()
    }

    impl<'de> Visitor<'de> for LenientBalanceVisitor {
        type Value = Option<Balance>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a balance amount as text, possibly empty")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(Decimal::from(v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(Decimal::from(v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(parse(v))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_str(LenientBalanceVisitor)
        }
    }

    pub(super) fn lenient_balance<'de, D>(deserializer: D) -> Result<Option<Balance>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(LenientBalanceVisitor)
    }
}
