use crate::{Balance, BalanceRecord, Snapshot};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Mostly positive balances spread over several orders of magnitude, plus the
/// dust and garbage real exports contain.
pub fn balance() -> impl Strategy<Value = Option<Balance>> {
    prop_oneof![
        1 => Just(None),
        1 => (-1_000i64..0).prop_map(|v| Some(Decimal::from(v))),
        8 => (0i64..5_000_000, 0u32..3)
            .prop_map(|(mantissa, scale)| Some(Decimal::new(mantissa, scale))),
    ]
}

impl Arbitrary for BalanceRecord {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        ("0x[0-9a-fA-F]{6}", balance())
            .prop_map(|(address, balance)| BalanceRecord { address, balance })
            .boxed()
    }
}

impl Arbitrary for Snapshot {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        proptest::collection::vec(any::<BalanceRecord>(), 0..64)
            .prop_map(Snapshot::from_records)
            .boxed()
    }
}
