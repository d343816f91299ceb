pub mod csv;

use rust_decimal::Decimal;

pub fn assert_are_close(a: Decimal, b: Decimal) {
    const DECIMAL_PRECISION: u32 = 10;
    assert_eq!(a.round_dp(DECIMAL_PRECISION), b.round_dp(DECIMAL_PRECISION));
}
