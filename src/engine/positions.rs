//! Position lifecycle: open, owner close, pending-reward application.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, PositionClosedEvent, PositionOpenedEvent};
use crate::position::{Position, PositionStatus};
use crate::ratio::{icr, nominal_icr};
use crate::rewards::{entire_coll, entire_debt, entire_icr, pending_coll_reward, pending_debt_reward};
use crate::types::{Amount, OwnerId, PositionId, Ratio};

impl Engine {
    /// Open a position: lock `coll` (plus the fixed stipend) and mint `debt`
    /// to the owner's token balance. Stake is derived against the live
    /// stakes/collateral snapshot ratio.
    pub fn open_position(
        &mut self,
        owner: OwnerId,
        coll: Amount,
        debt: Amount,
        hint_hi: Option<PositionId>,
        hint_lo: Option<PositionId>,
    ) -> Result<PositionId, EngineError> {
        let price = self.price()?;

        if debt < self.params.min_debt {
            return Err(EngineError::DebtBelowMinimum {
                debt,
                minimum: self.params.min_debt,
            });
        }

        // opening into recovery mode must not dilute the system further
        let required = if self.check_recovery_mode()? {
            Ratio::new(self.params.ccr)
        } else {
            Ratio::new(self.params.mcr)
        };
        let opening_icr = icr(coll, debt, price);
        if opening_icr < required {
            return Err(EngineError::UndercollateralizedOpen {
                icr: opening_icr,
                required,
            });
        }

        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;

        let stake = self.rewards.compute_stake(coll);
        let position = Position::new(
            id,
            owner,
            coll,
            debt,
            stake,
            self.params.stipend,
            self.rewards.current_snapshot(),
            self.current_time,
        );
        let nicr = position.recorded_nominal_icr();

        self.rewards.add_stake(stake);
        self.ledger.add_coll(coll);
        self.ledger.add_debt(debt);
        self.index.insert(id, nicr, hint_hi, hint_lo);
        self.positions.insert(id, position);

        // minted debt lands in the owner's token balance
        self.fund_caller(owner, debt);

        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            id,
            owner,
            coll,
            debt,
            stake,
            nicr,
        }));

        Ok(id)
    }

    /// Owner repays the entire debt and takes back collateral plus stipend.
    pub fn close_position(&mut self, caller: OwnerId, id: PositionId) -> Result<(), EngineError> {
        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        if !position.is_active() {
            return Err(EngineError::PositionNotActive(id));
        }
        if position.owner != caller {
            return Err(EngineError::NotPositionOwner { caller, id });
        }

        let debt = entire_debt(position, &self.rewards);
        let coll = entire_coll(position, &self.rewards);

        // validate funds before any mutation
        let available = self.caller_balance(caller);
        if available < debt {
            return Err(EngineError::InsufficientCallerFunds {
                required: debt,
                available,
            });
        }

        self.burn_caller_funds(caller, debt)?;
        self.ledger.sub_debt(debt)?;
        self.ledger.sub_coll(coll)?;

        let position = self
            .positions
            .get_mut(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        let stake = position.stake;
        let stipend = position.stipend;
        position.status = PositionStatus::ClosedByOwner;
        position.debt = Amount::zero();
        position.coll = Amount::zero();
        position.stake = Amount::zero();
        position.stipend = Amount::zero();
        position.updated_at = self.current_time;

        self.rewards.remove_stake(stake);
        self.index.remove(id);

        self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
            id,
            owner: caller,
            debt_repaid: debt,
            coll_returned: coll.add(stipend),
        }));

        Ok(())
    }

    /// Entire debt of a position, pending redistribution share included.
    pub fn entire_debt_of(&self, id: PositionId) -> Result<Amount, EngineError> {
        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        Ok(entire_debt(position, &self.rewards))
    }

    /// Entire collateral of a position, pending redistribution share included.
    pub fn entire_coll_of(&self, id: PositionId) -> Result<Amount, EngineError> {
        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        Ok(entire_coll(position, &self.rewards))
    }

    /// ICR of a position at the current price, over entire balances.
    pub fn icr_of(&self, id: PositionId) -> Result<Ratio, EngineError> {
        let price = self.price()?;
        let position = self
            .positions
            .get(&id)
            .ok_or(EngineError::PositionNotFound(id))?;
        Ok(entire_icr(position, &self.rewards, price))
    }

    /// Fold pending rewards into the recorded balances and re-snapshot.
    /// Ledger totals already count pending rewards, so they do not move.
    pub(super) fn apply_pending_rewards(&mut self, id: PositionId) -> Result<(), EngineError> {
        let snapshot = self.rewards.current_snapshot();
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(EngineError::PositionNotFound(id))?;

        let pending_debt = pending_debt_reward(position, &self.rewards);
        let pending_coll = pending_coll_reward(position, &self.rewards);

        position.debt = position.debt.add(pending_debt);
        position.coll = position.coll.add(pending_coll);
        position.snapshot = snapshot;
        position.updated_at = self.current_time;

        // recorded balances changed, so the NICR ordering key may have too
        let nicr = nominal_icr(position.coll, position.debt);
        let id = position.id;
        if self.index.contains(id) && self.index.nicr(id) != Some(nicr) {
            self.index.reinsert(id, nicr, None, None);
        }

        Ok(())
    }
}
