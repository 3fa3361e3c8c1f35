//! CDP Liquidation Engine Simulation.
//!
//! Demonstrates the full position lifecycle including opening and closing,
//! capped-seizure liquidation with surplus escrow, bad-debt redistribution,
//! recovery-mode sequences under the grace period, and partial liquidation.

use cdp_core::*;
use rust_decimal_macros::dec;

const LIQUIDATOR: OwnerId = OwnerId(1000);

fn main() {
    println!("CDP Liquidation Engine Simulation");
    println!("Single Collateral, Direct Repayment, Full Lifecycle\n");

    scenario_1_position_lifecycle();
    scenario_2_liquidation_with_surplus();
    scenario_3_bad_debt_redistribution();
    scenario_4_recovery_mode_sequence();
    scenario_5_partial_liquidation();
    scenario_6_batch_liquidation();

    println!("\nAll simulations completed successfully.");
}

fn new_engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default(), EngineParams::default());
    engine.set_time(Timestamp::now());
    engine.set_price(Price::new_unchecked(dec!(1)));
    engine.fund_caller(LIQUIDATOR, Amount::new(dec!(1_000_000)));
    engine
}

/// Open two positions, close one, inspect the index ordering.
fn scenario_1_position_lifecycle() {
    println!("Scenario 1: Position Lifecycle\n");

    let mut engine = new_engine();
    let alice = OwnerId(1);
    let bob = OwnerId(2);

    let a = engine
        .open_position(alice, Amount::new(dec!(450)), Amount::new(dec!(300)), None, None)
        .unwrap();
    let b = engine
        .open_position(bob, Amount::new(dec!(900)), Amount::new(dec!(300)), None, None)
        .unwrap();

    println!("  Alice opens 450 coll / 300 debt (ICR 150%)");
    println!("  Bob opens 900 coll / 300 debt (ICR 300%)");
    println!("  TCR: {}", engine.tcr().unwrap());
    println!(
        "  Index: safest {:?}, riskiest {:?}",
        engine.index().first().unwrap(),
        engine.index().last().unwrap()
    );
    assert_eq!(engine.index().first(), Some(b));
    assert_eq!(engine.index().last(), Some(a));

    engine.close_position(alice, a).unwrap();
    println!("  Alice repays and closes; {} positions remain\n", engine.active_count());
}

/// A 105% position is fully liquidated; the seizure is capped at LICR and the
/// owner keeps the surplus.
fn scenario_2_liquidation_with_surplus() {
    println!("Scenario 2: Capped Seizure With Surplus\n");

    let mut engine = new_engine();
    let whale = OwnerId(1);
    let victim_owner = OwnerId(2);

    engine
        .open_position(whale, Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
        .unwrap();
    let victim = engine
        .open_position(victim_owner, Amount::new(dec!(1500)), Amount::new(dec!(1000)), None, None)
        .unwrap();

    println!("  Victim opens 1500 coll / 1000 debt at price 1.00 (ICR 150%)");
    engine.set_price(Price::new_unchecked(dec!(0.7)));
    println!("  Price drops to 0.70; victim ICR {}", engine.icr_of(victim).unwrap());

    let outcome = engine.liquidate(LIQUIDATOR, victim).unwrap();
    println!("  Liquidated in {:?} mode", outcome.mode);
    println!("  Debt extinguished: {}", outcome.debt_extinguished);
    println!("  Collateral to liquidator (stipend included): {}", outcome.coll_seized);
    println!("  Surplus escrowed for owner: {}", outcome.surplus_credited);

    let claimed = engine.claim_surplus(victim_owner);
    println!("  Owner claims surplus: {}\n", claimed);
}

/// An underwater position leaves bad debt; the offset pool eats part of it
/// and the rest is socialized over the survivor's stake.
fn scenario_3_bad_debt_redistribution() {
    println!("Scenario 3: Bad Debt Redistribution\n");

    let mut engine = new_engine();
    let survivor_owner = OwnerId(1);

    let survivor = engine
        .open_position(survivor_owner, Amount::new(dec!(2000)), Amount::new(dec!(200)), None, None)
        .unwrap();
    let victim = engine
        .open_position(OwnerId(2), Amount::new(dec!(412)), Amount::new(dec!(220)), None, None)
        .unwrap();

    engine.set_price(Price::new_unchecked(dec!(0.5)));
    engine.fund_offset_pool(Amount::new(dec!(3)));
    println!("  Victim at ICR {} (underwater)", engine.icr_of(victim).unwrap());
    println!("  Offset pool funded with 3 debt tokens");

    let outcome = engine.liquidate(LIQUIDATOR, victim).unwrap();
    println!("  Bad debt: {}", outcome.offset_absorbed.add(outcome.bad_debt_redistributed));
    println!("  Offset pool absorbed: {}", outcome.offset_absorbed);
    println!("  Redistributed to survivors: {}", outcome.bad_debt_redistributed);
    println!(
        "  Survivor entire debt is now: {}\n",
        engine.entire_debt_of(survivor).unwrap()
    );
}

/// TCR drops below CCR; recovery liquidations are debounced by the grace
/// period, then a sequence walks the risky end of the index and exits
/// recovery mode mid-run.
fn scenario_4_recovery_mode_sequence() {
    println!("Scenario 4: Recovery Mode Sequence\n");

    let mut engine = new_engine();
    engine.set_price(Price::new_unchecked(dec!(2)));

    engine
        .open_position(OwnerId(1), Amount::new(dec!(510)), Amount::new(dec!(500)), None, None)
        .unwrap();
    engine
        .open_position(OwnerId(2), Amount::new(dec!(540)), Amount::new(dec!(500)), None, None)
        .unwrap();
    engine
        .open_position(OwnerId(3), Amount::new(dec!(656.25)), Amount::new(dec!(218.75)), None, None)
        .unwrap();

    engine.set_price(Price::new_unchecked(dec!(1)));
    println!("  Price halves; TCR {} (below CCR 1.50)", engine.tcr().unwrap());

    // pre-cooldown, nothing is below 100% so the sequence finds no work
    match engine.liquidate_sequence(LIQUIDATOR, 10) {
        Err(EngineError::NothingToLiquidate) => {
            println!("  Sequence before cooldown elapses: nothing to liquidate")
        }
        other => panic!("unexpected: {other:?}"),
    }

    engine.advance_time(engine.params().grace_period_ms);
    let outcome = engine.liquidate_sequence(LIQUIDATOR, 10).unwrap();
    println!("  Sequence after cooldown: {} liquidated", outcome.liquidations.len());
    for step in &outcome.liquidations {
        println!(
            "    position {:?} mode {:?}: debt {} coll {}",
            step.id, step.mode, step.debt_extinguished, step.coll_seized
        );
    }
    println!("  TCR after sequence: {}", engine.tcr().unwrap());
    println!("  Grace deadline armed: {}\n", engine.grace_deadline().is_some());
}

/// Shave a slice off an oversized risky position without closing it.
fn scenario_5_partial_liquidation() {
    println!("Scenario 5: Partial Liquidation\n");

    let mut engine = new_engine();
    engine
        .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
        .unwrap();
    let victim = engine
        .open_position(OwnerId(2), Amount::new(dec!(2100)), Amount::new(dec!(1000)), None, None)
        .unwrap();
    engine.set_price(Price::new_unchecked(dec!(0.5)));

    println!("  Victim at ICR {}", engine.icr_of(victim).unwrap());
    let outcome = engine
        .partially_liquidate(LIQUIDATOR, victim, Amount::new(dec!(400)), None, None)
        .unwrap();

    println!("  Repaid {} of the debt, seized {} collateral", outcome.debt_extinguished, outcome.coll_seized);
    println!(
        "  Position stays active: debt {}, ICR {}\n",
        engine.entire_debt_of(victim).unwrap(),
        engine.icr_of(victim).unwrap()
    );
}

/// Liquidate an explicit list; healthy and duplicate entries are skipped.
fn scenario_6_batch_liquidation() {
    println!("Scenario 6: Batch Liquidation\n");

    let mut engine = new_engine();
    engine
        .open_position(OwnerId(1), Amount::new(dec!(10000)), Amount::new(dec!(1000)), None, None)
        .unwrap();
    let risky_a = engine
        .open_position(OwnerId(2), Amount::new(dec!(2100)), Amount::new(dec!(1000)), None, None)
        .unwrap();
    let risky_b = engine
        .open_position(OwnerId(3), Amount::new(dec!(2000)), Amount::new(dec!(950)), None, None)
        .unwrap();
    let healthy = engine
        .open_position(OwnerId(4), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
        .unwrap();
    engine.set_price(Price::new_unchecked(dec!(0.5)));

    let outcome = engine
        .batch_liquidate(LIQUIDATOR, &[risky_a, risky_b, risky_a, healthy])
        .unwrap();

    println!("  Batch of 4 entries: {} liquidated, {} skipped", outcome.liquidations.len(), outcome.skipped);
    println!("  Total debt extinguished: {}", outcome.total_debt_extinguished);
    println!("  Total collateral seized: {}", outcome.total_coll_seized);
    println!("  Events recorded this run: {}", engine.events().len());
}
