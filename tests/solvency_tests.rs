//! Solvency invariant tests.
//!
//! These tests verify the accounting invariants that must hold for the
//! system to remain solvent under all conditions: pool totals match the
//! per-position books, token supply is conserved, and the index ordering
//! and reward accumulators never regress.

use cdp_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const LIQUIDATOR: OwnerId = OwnerId(1000);

/// (debt, collateralization percent at the opening price of 2.00)
fn position_seed() -> impl Strategy<Value = (u32, u32)> {
    (200u32..1000u32, 110u32..300u32)
}

fn build_engine(seeds: &[(u32, u32)]) -> Engine {
    let mut engine = Engine::new(EngineConfig::default(), EngineParams::default());
    engine.set_price(Price::new_unchecked(dec!(2)));
    engine.fund_caller(LIQUIDATOR, Amount::new(dec!(10_000_000)));

    for (i, (debt, pct)) in seeds.iter().enumerate() {
        let debt = Decimal::from(*debt);
        let coll = debt * Decimal::from(*pct) / dec!(100);
        engine
            .open_position(OwnerId(i as u64 + 1), Amount::new(coll), Amount::new(debt), None, None)
            .unwrap();
    }
    engine
}

/// Crash the price and run sequences both before and after the cooldown.
fn crash_and_liquidate(engine: &mut Engine, crash_pct: u32, max: usize) {
    engine.set_price(Price::new_unchecked(Decimal::new(i64::from(crash_pct), 2)));
    let _ = engine.liquidate_sequence(LIQUIDATOR, max);
    engine.advance_time(engine.params().grace_period_ms + 1);
    let _ = engine.liquidate_sequence(LIQUIDATOR, max);
}

proptest! {
    /// The pool ledger totals must equal the sum of entire (pending-included)
    /// balances over active positions, whatever the liquidation history.
    #[test]
    fn pool_totals_match_per_position_books(
        seeds in proptest::collection::vec(position_seed(), 2..12),
        crash_pct in 30u32..100u32,
    ) {
        let mut engine = build_engine(&seeds);
        crash_and_liquidate(&mut engine, crash_pct, seeds.len());

        let mut active_debt = Decimal::ZERO;
        let mut active_coll = Decimal::ZERO;
        for id in engine.index().ids_descending() {
            let pos = engine.get_position(id).unwrap();
            prop_assert!(pos.is_active());
            active_debt += engine.entire_debt_of(id).unwrap().value();
            active_coll += engine.entire_coll_of(id).unwrap().value();
        }

        // redistribution carries an unallocated division residue, so the
        // debt side is compared within dust tolerance
        let debt_drift = (engine.ledger().total_debt().value() - active_debt).abs();
        prop_assert!(
            debt_drift < dec!(0.000001),
            "debt books diverged: ledger={}, positions={}",
            engine.ledger().total_debt(),
            active_debt
        );

        // no collateral is ever redistributed on this path, so exact
        prop_assert_eq!(engine.ledger().total_coll().value(), active_coll);
    }

    /// Debt-token supply conservation: everything ever minted is either still
    /// in a caller balance or still owed on the books.
    #[test]
    fn debt_token_supply_is_conserved(
        seeds in proptest::collection::vec(position_seed(), 2..12),
        crash_pct in 30u32..100u32,
    ) {
        let mut engine = build_engine(&seeds);
        crash_and_liquidate(&mut engine, crash_pct, seeds.len());

        let mut balances = engine.caller_balance(LIQUIDATOR).value();
        for i in 0..seeds.len() {
            balances += engine.caller_balance(OwnerId(i as u64 + 1)).value();
        }

        // every token above the liquidator's seed was minted against debt
        // still on the books; repayments burned the rest. Decimal keeps 28
        // significant digits, so subtracting a repayment with a long
        // fractional tail from the 10M seed truncates the tail while
        // total_debt retains it; compare within dust tolerance
        let supply_drift =
            (balances - dec!(10_000_000) - engine.ledger().total_debt().value()).abs();
        prop_assert!(
            supply_drift < dec!(0.000001),
            "supply diverged: balances={}, total_debt={}",
            balances,
            engine.ledger().total_debt()
        );
    }

    /// The NICR ordering must survive liquidations and pending-reward folds,
    /// and the redistribution accumulator never decreases.
    #[test]
    fn index_ordering_and_accumulators_never_regress(
        seeds in proptest::collection::vec(position_seed(), 2..12),
        crash_pct in 30u32..100u32,
    ) {
        let mut engine = build_engine(&seeds);

        engine.set_price(Price::new_unchecked(Decimal::new(i64::from(crash_pct), 2)));
        let _ = engine.liquidate_sequence(LIQUIDATOR, seeds.len());
        let acc_mid = engine.rewards().debt_per_unit_staked();

        engine.advance_time(engine.params().grace_period_ms + 1);
        let _ = engine.liquidate_sequence(LIQUIDATOR, seeds.len());
        let acc_end = engine.rewards().debt_per_unit_staked();

        prop_assert!(acc_mid >= Decimal::ZERO);
        prop_assert!(acc_end >= acc_mid);

        let ids = engine.index().ids_descending();
        prop_assert_eq!(ids.len(), engine.active_count());
        for pair in ids.windows(2) {
            let hi = engine.index().nicr(pair[0]).unwrap();
            let lo = engine.index().nicr(pair[1]).unwrap();
            prop_assert!(hi >= lo, "index out of order: {} before {}", hi, lo);
        }
    }
}
