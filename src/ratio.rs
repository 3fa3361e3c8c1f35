//! Collateralization ratio arithmetic.
//!
//! ICR = collateral * price / debt for a single position, TCR is the same over
//! system aggregates, and NICR = collateral / debt is the price-independent
//! key used for index ordering. Seizure math converts between a debt repayment
//! and the collateral it buys at the capped LICR rate: a repayment `r` is worth
//! `r * licr` in collateral value, i.e. `r * licr / price` collateral units.

use crate::types::{Amount, Price, Ratio};
use rust_decimal::Decimal;

/// Price-independent ratio used only for ordering the index.
pub fn nominal_icr(coll: Amount, debt: Amount) -> Ratio {
    if debt.is_zero() {
        return Ratio::MAX;
    }
    Ratio::new(coll.value() / debt.value())
}

/// Individual collateralization ratio at the given price. Zero debt means infinite.
pub fn icr(coll: Amount, debt: Amount, price: Price) -> Ratio {
    if debt.is_zero() {
        return Ratio::MAX;
    }
    Ratio::new(coll.value() * price.value() / debt.value())
}

/// Total collateralization ratio over system aggregates.
pub fn tcr(total_coll: Amount, total_debt: Amount, price: Price) -> Ratio {
    icr(total_coll, total_debt, price)
}

/// Collateral units seized for repaying `repay` debt at the capped rate.
pub fn collateral_for_repayment(repay: Amount, licr: Decimal, price: Price) -> Amount {
    Amount::new(repay.value() * licr / price.value())
}

/// Debt repayment funded by seizing `coll` collateral at the capped rate.
pub fn repayment_for_collateral(coll: Amount, licr: Decimal, price: Price) -> Amount {
    Amount::new(coll.value() * price.value() / licr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn icr_basic() {
        let r = icr(
            Amount::new(dec!(150)),
            Amount::new(dec!(100)),
            Price::new_unchecked(dec!(1)),
        );
        assert_eq!(r.value(), dec!(1.5));
    }

    #[test]
    fn icr_scales_with_price() {
        let r = icr(
            Amount::new(dec!(2)),
            Amount::new(dec!(100)),
            Price::new_unchecked(dec!(60)),
        );
        assert_eq!(r.value(), dec!(1.2));
    }

    #[test]
    fn zero_debt_is_infinite() {
        let r = icr(
            Amount::new(dec!(10)),
            Amount::zero(),
            Price::new_unchecked(dec!(1)),
        );
        assert!(r.is_infinite());
        assert!(nominal_icr(Amount::new(dec!(10)), Amount::zero()).is_infinite());
    }

    #[test]
    fn nominal_icr_ignores_price() {
        let n = nominal_icr(Amount::new(dec!(300)), Amount::new(dec!(200)));
        assert_eq!(n.value(), dec!(1.5));
    }

    #[test]
    fn seizure_round_trip() {
        let price = Price::new_unchecked(dec!(0.5));
        let licr = dec!(1.03);
        let repay = Amount::new(dec!(100));

        let coll = collateral_for_repayment(repay, licr, price);
        assert_eq!(coll.value(), dec!(206)); // 100 * 1.03 / 0.5

        let back = repayment_for_collateral(coll, licr, price);
        assert_eq!(back.value(), dec!(100));
    }

    #[test]
    fn seized_value_exceeds_repayment_by_licr() {
        let price = Price::new_unchecked(dec!(2));
        let repay = Amount::new(dec!(100));
        let coll = collateral_for_repayment(repay, dec!(1.03), price);

        // seized collateral value = repay * licr
        assert_eq!(coll.value() * price.value(), dec!(103));
    }
}
