//! Liquidation entry points: single, partial, ordered sequence, explicit batch.
//!
//! Every entry point snapshots state up front and restores it on failure, so
//! a call commits or reverts as one unit. The grace-period sync runs before
//! every eligibility decision, and again before each step of a multi-position
//! call: a step can push TCR back above CCR and flip the mode mid-run.
//!
//! Settlement per position, at price `p` with cap rate LICR:
//!   repay   = min(debt, coll * p / LICR)   debt the caller burns
//!   seized  = min(coll, repay * LICR / p)  collateral to the caller
//!   surplus = coll - seized                escrowed for the owner
//!   bad     = debt - repay                 offset pool first, then socialized
//!
//! The caller always receives collateral worth repay * LICR, plus the fixed
//! stipend set aside at opening. Above LICR the owner keeps a surplus; below
//! 100% the shortfall becomes bad debt.

use super::core::Engine;
use super::results::{EngineError, LiquidationOutcome, SequenceOutcome};
use crate::events::{
    BadDebtEvent, EventPayload, LiquidationEvent, LiquidationMode, SurplusCreditedEvent,
};
use crate::position::PositionStatus;
use crate::ratio::{collateral_for_repayment, icr, nominal_icr, repayment_for_collateral};
use crate::types::{Amount, OwnerId, PositionId};

impl Engine {
    /// Fully liquidate one position. The caller burns the repayable debt from
    /// their token balance and receives the seized collateral plus stipend.
    pub fn liquidate(
        &mut self,
        caller: OwnerId,
        id: PositionId,
    ) -> Result<LiquidationOutcome, EngineError> {
        // mode transitions driven by the current price stick even when the
        // liquidation itself fails, so sync before the checkpoint
        let recovery = self.sync_grace_period()?;
        let checkpoint = self.checkpoint();
        let result = self.liquidate_single(caller, id, recovery);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    /// Repay `amount` of the position's debt and seize the matching
    /// collateral, leaving the position active. Escalates to a full
    /// liquidation when the amount covers the entire debt (or the matching
    /// collateral exceeds what the position holds).
    pub fn partially_liquidate(
        &mut self,
        caller: OwnerId,
        id: PositionId,
        amount: Amount,
        hint_hi: Option<PositionId>,
        hint_lo: Option<PositionId>,
    ) -> Result<LiquidationOutcome, EngineError> {
        let recovery = self.sync_grace_period()?;
        let checkpoint = self.checkpoint();
        let result =
            self.partially_liquidate_inner(caller, id, amount, recovery, hint_hi, hint_lo);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    /// Liquidate up to `max_positions` positions from the risky end of the
    /// index. Stops at the first ineligible candidate; errors with
    /// `NothingToLiquidate` (and no state change) when no position qualifies.
    pub fn liquidate_sequence(
        &mut self,
        caller: OwnerId,
        max_positions: usize,
    ) -> Result<SequenceOutcome, EngineError> {
        if max_positions == 0 {
            return Err(EngineError::NothingToLiquidate);
        }

        // arm or disarm the cooldown before checkpointing: a sequence that
        // finds nothing must not undo a mode entry caused by the price
        self.sync_grace_period()?;
        let checkpoint = self.checkpoint();
        let mut outcome = SequenceOutcome::default();

        for _ in 0..max_positions {
            let recovery = match self.sync_grace_period() {
                Ok(r) => r,
                Err(err) => {
                    self.restore(checkpoint);
                    return Err(err);
                }
            };

            let Some(candidate) = self.index.last() else {
                break;
            };

            match self.liquidate_single(caller, candidate, recovery) {
                Ok(step) => outcome.push(step),
                // riskiest remaining position is safe, so everything above it is too
                Err(EngineError::IneligibleForLiquidation { .. })
                | Err(EngineError::LastPositionStanding) => break,
                Err(err) => {
                    self.restore(checkpoint);
                    return Err(err);
                }
            }
        }

        if outcome.liquidations.is_empty() {
            self.restore(checkpoint);
            return Err(EngineError::NothingToLiquidate);
        }

        Ok(outcome)
    }

    /// Liquidate an explicit list of positions. Unknown, inactive (including
    /// duplicates already consumed earlier in the list), and ineligible
    /// entries are skipped and counted; errors with `NothingToLiquidate`
    /// (and no state change) when every entry was skipped.
    pub fn batch_liquidate(
        &mut self,
        caller: OwnerId,
        ids: &[PositionId],
    ) -> Result<SequenceOutcome, EngineError> {
        if ids.is_empty() {
            return Err(EngineError::NothingToLiquidate);
        }

        self.sync_grace_period()?;
        let checkpoint = self.checkpoint();
        let mut outcome = SequenceOutcome::default();

        for &id in ids {
            let recovery = match self.sync_grace_period() {
                Ok(r) => r,
                Err(err) => {
                    self.restore(checkpoint);
                    return Err(err);
                }
            };

            match self.liquidate_single(caller, id, recovery) {
                Ok(step) => outcome.push(step),
                Err(EngineError::PositionNotFound(_))
                | Err(EngineError::PositionNotActive(_))
                | Err(EngineError::IneligibleForLiquidation { .. })
                | Err(EngineError::LastPositionStanding) => outcome.skipped += 1,
                Err(err) => {
                    self.restore(checkpoint);
                    return Err(err);
                }
            }
        }

        if outcome.liquidations.is_empty() {
            self.restore(checkpoint);
            return Err(EngineError::NothingToLiquidate);
        }

        Ok(outcome)
    }

    /// One full-liquidation step. The callers above own checkpointing and the
    /// grace sync; this only validates, settles, and emits.
    pub(super) fn liquidate_single(
        &mut self,
        caller: OwnerId,
        id: PositionId,
        recovery: bool,
    ) -> Result<LiquidationOutcome, EngineError> {
        let price = self.price()?;

        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        if !position.is_active() {
            return Err(EngineError::PositionNotActive(id));
        }
        if self.index.len() <= 1 {
            return Err(EngineError::LastPositionStanding);
        }

        // fold pending redistribution shares in so eligibility and settlement
        // see the entire balances
        self.apply_pending_rewards(id)?;

        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        let owner = position.owner;
        let coll = position.coll;
        let debt = position.debt;
        let stake = position.stake;
        let stipend = position.stipend;

        let position_icr = icr(coll, debt, price);
        let current_tcr = self.tcr()?;
        let mode = self
            .classify_eligibility(position_icr, current_tcr, recovery)
            .map_err(|threshold| EngineError::IneligibleForLiquidation {
                id,
                icr: position_icr,
                threshold,
            })?;

        let licr = self.params.licr;
        let repay = repayment_for_collateral(coll, licr, price).min(debt);
        let seized = collateral_for_repayment(repay, licr, price).min(coll);
        let surplus = coll.sub(seized);
        let bad_debt = debt.sub(repay);

        // funds validated here, before any mutation below
        self.burn_caller_funds(caller, repay)?;

        let position = self
            .positions
            .get_mut(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        position.status = PositionStatus::ClosedByLiquidation;
        position.debt = Amount::zero();
        position.coll = Amount::zero();
        position.stake = Amount::zero();
        position.stipend = Amount::zero();
        position.updated_at = self.current_time;

        // victim's stake leaves before any redistribution of its own bad debt
        self.rewards.remove_stake(stake);
        self.index.remove(id);
        self.ledger.sub_coll(coll)?;
        self.ledger.sub_debt(repay)?;

        let offset_absorbed = if bad_debt.is_zero() {
            Amount::zero()
        } else {
            self.offset_pool.absorb(bad_debt)
        };
        if !offset_absorbed.is_zero() {
            self.ledger.sub_debt(offset_absorbed)?;
        }

        // what neither the caller nor the offset pool covered lands on the
        // survivors; it stays in total_debt as their pending share
        let redistributed = bad_debt.sub(offset_absorbed);
        if !redistributed.is_zero() {
            self.rewards
                .redistribute(redistributed, Amount::zero(), self.ledger.total_coll());
        }

        if !surplus.is_zero() {
            self.escrow.credit(owner, surplus);
        }

        let debt_extinguished = repay.add(offset_absorbed);
        let coll_to_caller = seized.add(stipend);

        self.emit_event(EventPayload::Liquidation(LiquidationEvent {
            id,
            owner,
            debt_extinguished,
            coll_seized: coll_to_caller,
            mode,
        }));

        if !bad_debt.is_zero() {
            self.emit_event(EventPayload::BadDebtRedistributed(BadDebtEvent {
                id,
                bad_debt,
                offset_absorbed,
                redistributed,
                debt_per_unit_staked: self.rewards.debt_per_unit_staked(),
            }));
        }

        if !surplus.is_zero() {
            self.emit_event(EventPayload::SurplusCredited(SurplusCreditedEvent {
                id,
                owner,
                amount: surplus,
            }));
        }

        Ok(LiquidationOutcome {
            id,
            owner,
            mode,
            debt_extinguished,
            coll_seized: coll_to_caller,
            stipend_paid: stipend,
            surplus_credited: surplus,
            bad_debt_redistributed: redistributed,
            offset_absorbed,
            closed: true,
        })
    }

    fn partially_liquidate_inner(
        &mut self,
        caller: OwnerId,
        id: PositionId,
        amount: Amount,
        recovery: bool,
        hint_hi: Option<PositionId>,
        hint_lo: Option<PositionId>,
    ) -> Result<LiquidationOutcome, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::NothingToLiquidate);
        }

        let price = self.price()?;

        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        if !position.is_active() {
            return Err(EngineError::PositionNotActive(id));
        }

        self.apply_pending_rewards(id)?;

        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        let owner = position.owner;
        let coll = position.coll;
        let debt = position.debt;
        let old_stake = position.stake;

        let position_icr = icr(coll, debt, price);
        let current_tcr = self.tcr()?;
        let mode = self
            .classify_eligibility(position_icr, current_tcr, recovery)
            .map_err(|threshold| EngineError::IneligibleForLiquidation {
                id,
                icr: position_icr,
                threshold,
            })?;
        debug_assert_ne!(mode, LiquidationMode::Partial);

        let licr = self.params.licr;
        let coll_removed = collateral_for_repayment(amount, licr, price);

        // the requested slice covers the whole position: settle it fully
        if amount >= debt || coll_removed >= coll {
            return self.liquidate_single(caller, id, recovery);
        }

        let remaining_debt = debt.sub(amount);
        if remaining_debt < self.params.min_debt {
            return Err(EngineError::BelowMinimumSize {
                remaining: remaining_debt,
                minimum: self.params.min_debt,
            });
        }

        self.burn_caller_funds(caller, amount)?;

        let remaining_coll = coll.sub(coll_removed);
        let new_stake = self.rewards.compute_stake(remaining_coll);

        let position = self
            .positions
            .get_mut(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        position.debt = remaining_debt;
        position.coll = remaining_coll;
        position.stake = new_stake;
        position.updated_at = self.current_time;

        self.rewards.remove_stake(old_stake);
        self.rewards.add_stake(new_stake);
        self.ledger.sub_debt(amount)?;
        self.ledger.sub_coll(coll_removed)?;

        let nicr = nominal_icr(remaining_coll, remaining_debt);
        self.index.reinsert(id, nicr, hint_hi, hint_lo);

        self.emit_event(EventPayload::Liquidation(LiquidationEvent {
            id,
            owner,
            debt_extinguished: amount,
            coll_seized: coll_removed,
            mode: LiquidationMode::Partial,
        }));

        Ok(LiquidationOutcome {
            id,
            owner,
            mode: LiquidationMode::Partial,
            debt_extinguished: amount,
            coll_seized: coll_removed,
            stipend_paid: Amount::zero(),
            surplus_credited: Amount::zero(),
            bad_debt_redistributed: Amount::zero(),
            offset_absorbed: Amount::zero(),
            closed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, EngineParams};
    use crate::types::Price;
    use rust_decimal_macros::dec;

    const LIQUIDATOR: OwnerId = OwnerId(99);

    fn setup_engine() -> Engine {
        let mut engine = Engine::new(EngineConfig::default(), EngineParams::default());
        engine.set_price(Price::new_unchecked(dec!(1)));
        engine.fund_caller(LIQUIDATOR, Amount::new(dec!(100000)));
        engine
    }

    #[test]
    fn full_liquidation_above_cap_escrows_surplus() {
        let mut engine = setup_engine();
        engine
            .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(1500)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        // 150% -> 105% after the drop; TCR 6500*0.7/2000 = 227.5%, normal mode
        engine.set_price(Price::new_unchecked(dec!(0.7)));

        let outcome = engine.liquidate(LIQUIDATOR, victim).unwrap();

        assert_eq!(outcome.mode, LiquidationMode::Normal);
        assert!(outcome.closed);
        assert_eq!(outcome.debt_extinguished.value(), dec!(1000));
        // seized = 1000 * 1.03 / 0.7, plus the 0.5 stipend
        let seized = dec!(1000) * dec!(1.03) / dec!(0.7);
        assert_eq!(outcome.coll_seized.value(), seized + dec!(0.5));
        assert_eq!(outcome.surplus_credited.value(), dec!(1500) - seized);
        assert!(outcome.bad_debt_redistributed.is_zero());

        assert_eq!(engine.surplus_of(OwnerId(2)).value(), dec!(1500) - seized);
        assert_eq!(
            engine.caller_balance(LIQUIDATOR).value(),
            dec!(100000) - dec!(1000)
        );
        let victim_pos = engine.get_position(victim).unwrap();
        assert_eq!(victim_pos.status, PositionStatus::ClosedByLiquidation);
        assert!(!engine.index().contains(victim));
    }

    #[test]
    fn underwater_liquidation_socializes_bad_debt() {
        let mut engine = setup_engine();
        let survivor = engine
            .open_position(OwnerId(1), Amount::new(dec!(2000)), Amount::new(dec!(200)), None, None)
            .unwrap();
        // 412 * 0.5 / 1.03 = 200 exactly, so the seizure math is dust-free
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(412)), Amount::new(dec!(220)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));
        // victim at 93.6%, TCR = 2412 * 0.5 / 420 = 287% so normal mode holds

        let outcome = engine.liquidate(LIQUIDATOR, victim).unwrap();

        assert_eq!(outcome.mode, LiquidationMode::Normal);
        assert_eq!(outcome.debt_extinguished.value(), dec!(200));
        // all collateral goes to the caller, plus the stipend
        assert_eq!(outcome.coll_seized.value(), dec!(412.5));
        assert!(outcome.surplus_credited.is_zero());
        assert_eq!(outcome.bad_debt_redistributed.value(), dec!(20));

        // the survivor, as sole remaining stake, inherits the whole shortfall
        assert_eq!(
            engine.entire_debt_of(survivor).unwrap().value(),
            dec!(220)
        );
        // total_debt kept the redistributed portion on the books
        assert_eq!(engine.ledger().total_debt().value(), dec!(220));
    }

    #[test]
    fn offset_pool_absorbs_before_redistribution() {
        let mut engine = setup_engine();
        let survivor = engine
            .open_position(OwnerId(1), Amount::new(dec!(2000)), Amount::new(dec!(200)), None, None)
            .unwrap();
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(412)), Amount::new(dec!(220)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));
        engine.fund_offset_pool(Amount::new(dec!(3)));

        let outcome = engine.liquidate(LIQUIDATOR, victim).unwrap();

        // bad debt is 20; the pool eats 3, survivors take 17
        assert_eq!(outcome.offset_absorbed.value(), dec!(3));
        assert_eq!(outcome.bad_debt_redistributed.value(), dec!(17));
        assert!(engine.offset_pool_balance().is_zero());

        assert_eq!(
            engine.entire_debt_of(survivor).unwrap().value(),
            dec!(217)
        );
    }

    #[test]
    fn partial_liquidation_shrinks_and_reorders() {
        let mut engine = setup_engine();
        engine
            .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(1050)), Amount::new(dec!(1000)), None, None)
            .unwrap_err();
        // 105% open is rejected; open healthy then crash the price instead
        assert!(matches!(victim, EngineError::UndercollateralizedOpen { .. }));
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(2100)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));
        // victim at 105%, TCR = 7100 * 0.5 / 2000 = 177.5%, normal mode

        let outcome = engine
            .partially_liquidate(LIQUIDATOR, victim, Amount::new(dec!(400)), None, None)
            .unwrap();

        assert_eq!(outcome.mode, LiquidationMode::Partial);
        assert!(!outcome.closed);
        assert_eq!(outcome.debt_extinguished.value(), dec!(400));
        // coll removed = 400 * 1.03 / 0.5 = 824
        assert_eq!(outcome.coll_seized.value(), dec!(824));
        assert!(outcome.stipend_paid.is_zero());

        let pos = engine.get_position(victim).unwrap();
        assert!(pos.is_active());
        assert_eq!(pos.debt.value(), dec!(600));
        assert_eq!(pos.coll.value(), dec!(2100) - dec!(824));
        assert!(engine.index().contains(victim));
        // ICR improved but only slightly: 1276 * 0.5 / 600 = 106.33%
        let new_icr = engine.icr_of(victim).unwrap();
        assert!(new_icr.value() > dec!(1.0633) && new_icr.value() < dec!(1.064));
    }

    #[test]
    fn partial_that_would_leave_dust_is_rejected_atomically() {
        let mut engine = setup_engine();
        engine
            .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(2100)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));

        let err = engine
            .partially_liquidate(LIQUIDATOR, victim, Amount::new(dec!(900)), None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::BelowMinimumSize { .. }));

        let pos = engine.get_position(victim).unwrap();
        assert_eq!(pos.debt.value(), dec!(1000));
        assert_eq!(engine.caller_balance(LIQUIDATOR).value(), dec!(100000));
    }

    #[test]
    fn partial_covering_entire_debt_escalates_to_full() {
        let mut engine = setup_engine();
        engine
            .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(2100)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));

        let outcome = engine
            .partially_liquidate(LIQUIDATOR, victim, Amount::new(dec!(1000)), None, None)
            .unwrap();

        assert!(outcome.closed);
        assert_ne!(outcome.mode, LiquidationMode::Partial);
        assert!(!engine.index().contains(victim));
    }

    #[test]
    fn healthy_position_is_not_liquidatable() {
        let mut engine = setup_engine();
        engine
            .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        let healthy = engine
            .open_position(OwnerId(2), Amount::new(dec!(2000)), Amount::new(dec!(1000)), None, None)
            .unwrap();

        let err = engine.liquidate(LIQUIDATOR, healthy).unwrap_err();
        assert!(matches!(err, EngineError::IneligibleForLiquidation { .. }));
        assert!(engine.get_position(healthy).unwrap().is_active());
    }

    #[test]
    fn last_position_cannot_be_liquidated() {
        let mut engine = setup_engine();
        let only = engine
            .open_position(OwnerId(1), Amount::new(dec!(300)), Amount::new(dec!(200)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));

        let err = engine.liquidate(LIQUIDATOR, only).unwrap_err();
        assert!(matches!(err, EngineError::LastPositionStanding));
    }

    #[test]
    fn insufficient_funds_reverts_the_whole_call() {
        let mut engine = setup_engine();
        engine
            .open_position(OwnerId(1), Amount::new(dec!(5000)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        let victim = engine
            .open_position(OwnerId(2), Amount::new(dec!(2100)), Amount::new(dec!(1000)), None, None)
            .unwrap();
        engine.set_price(Price::new_unchecked(dec!(0.5)));

        let broke = OwnerId(77);
        engine.fund_caller(broke, Amount::new(dec!(10)));
        let events_before = engine.events().len();

        let err = engine.liquidate(broke, victim).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientCallerFunds { .. }));

        assert!(engine.get_position(victim).unwrap().is_active());
        assert_eq!(engine.ledger().total_debt().value(), dec!(2000));
        assert_eq!(engine.events().len(), events_before);
        assert_eq!(engine.caller_balance(broke).value(), dec!(10));
    }
}
