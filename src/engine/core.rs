// 6.1 engine/core.rs: main engine. owns all positions, the ordered index,
// the reward accumulators, pool totals, escrow, and caller balances.
// deterministic and event-driven with no external I/O.

use super::results::EngineError;
use crate::config::{EngineConfig, EngineParams};
use crate::escrow::SurplusEscrow;
use crate::events::{
    CallerFundedEvent, Event, EventId, EventPayload, PriceUpdateEvent, SurplusClaimedEvent,
};
use crate::index::SortedPositions;
use crate::ledger::{OffsetPool, PoolLedger};
use crate::position::Position;
use crate::rewards::RewardLedger;
use crate::types::{Amount, OwnerId, PositionId, Price, Timestamp};
use std::collections::HashMap;

/** 6.2: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) params: EngineParams,
    pub(super) positions: HashMap<PositionId, Position>,
    pub(super) index: SortedPositions,
    pub(super) rewards: RewardLedger,
    pub(super) ledger: PoolLedger,
    pub(super) escrow: SurplusEscrow,
    pub(super) offset_pool: OffsetPool,
    pub(super) caller_funds: HashMap<OwnerId, Amount>,
    pub(super) price: Option<Price>,
    pub(super) grace_deadline: Option<Timestamp>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_position_id: u64,
    pub(super) current_time: Timestamp,
}

// snapshot of everything a multi-step call may mutate, restored on failure so
// the whole call commits or reverts as one unit
#[derive(Debug, Clone)]
pub(super) struct StateCheckpoint {
    positions: HashMap<PositionId, Position>,
    index: SortedPositions,
    rewards: RewardLedger,
    ledger: PoolLedger,
    escrow: SurplusEscrow,
    offset_pool: OffsetPool,
    caller_funds: HashMap<OwnerId, Amount>,
    grace_deadline: Option<Timestamp>,
    events_len: usize,
    next_event_id: u64,
}

impl Engine {
    pub fn new(config: EngineConfig, params: EngineParams) -> Self {
        Self {
            config,
            params,
            positions: HashMap::new(),
            index: SortedPositions::new(),
            rewards: RewardLedger::new(),
            ledger: PoolLedger::new(),
            escrow: SurplusEscrow::new(),
            offset_pool: OffsetPool::new(),
            caller_funds: HashMap::new(),
            price: None,
            grace_deadline: None,
            events: Vec::new(),
            next_event_id: 1,
            next_position_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = self.current_time.plus_millis(millis);
    }

    pub fn set_price(&mut self, price: Price) {
        self.price = Some(price);
        self.emit_event(EventPayload::PriceUpdate(PriceUpdateEvent { price }));
    }

    pub fn price(&self) -> Result<Price, EngineError> {
        self.price.ok_or(EngineError::NoPrice)
    }

    pub fn get_position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn active_count(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &SortedPositions {
        &self.index
    }

    pub fn rewards(&self) -> &RewardLedger {
        &self.rewards
    }

    pub fn ledger(&self) -> &PoolLedger {
        &self.ledger
    }

    pub fn grace_deadline(&self) -> Option<Timestamp> {
        self.grace_deadline
    }

    /// Credit the caller with debt tokens to fund repayments.
    pub fn fund_caller(&mut self, caller: OwnerId, amount: Amount) {
        let entry = self
            .caller_funds
            .entry(caller)
            .or_insert_with(Amount::zero);
        *entry = entry.add(amount);
        let new_balance = *entry;

        self.emit_event(EventPayload::CallerFunded(CallerFundedEvent {
            caller,
            amount,
            new_balance,
        }));
    }

    pub fn caller_balance(&self, caller: OwnerId) -> Amount {
        self.caller_funds
            .get(&caller)
            .copied()
            .unwrap_or_else(Amount::zero)
    }

    /// Burn `amount` from the caller's balance; validated before any mutation.
    pub(super) fn burn_caller_funds(
        &mut self,
        caller: OwnerId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let available = self.caller_balance(caller);
        if available < amount {
            return Err(EngineError::InsufficientCallerFunds {
                required: amount,
                available,
            });
        }
        self.caller_funds.insert(caller, available.sub(amount));
        Ok(())
    }

    pub fn surplus_of(&self, owner: OwnerId) -> Amount {
        self.escrow.claimable(owner)
    }

    /// Drain the owner's escrowed surplus collateral.
    pub fn claim_surplus(&mut self, owner: OwnerId) -> Amount {
        let amount = self.escrow.claim(owner);
        if !amount.is_zero() {
            self.emit_event(EventPayload::SurplusClaimed(SurplusClaimedEvent {
                owner,
                amount,
            }));
        }
        amount
    }

    pub fn fund_offset_pool(&mut self, amount: Amount) {
        self.offset_pool.deposit(amount);
    }

    pub fn offset_pool_balance(&self) -> Amount {
        self.offset_pool.balance()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    pub(super) fn checkpoint(&self) -> StateCheckpoint {
        StateCheckpoint {
            positions: self.positions.clone(),
            index: self.index.clone(),
            rewards: self.rewards.clone(),
            ledger: self.ledger.clone(),
            escrow: self.escrow.clone(),
            offset_pool: self.offset_pool.clone(),
            caller_funds: self.caller_funds.clone(),
            grace_deadline: self.grace_deadline,
            events_len: self.events.len(),
            next_event_id: self.next_event_id,
        }
    }

    pub(super) fn restore(&mut self, checkpoint: StateCheckpoint) {
        self.positions = checkpoint.positions;
        self.index = checkpoint.index;
        self.rewards = checkpoint.rewards;
        self.ledger = checkpoint.ledger;
        self.escrow = checkpoint.escrow;
        self.offset_pool = checkpoint.offset_pool;
        self.caller_funds = checkpoint.caller_funds;
        self.grace_deadline = checkpoint.grace_deadline;
        self.events.truncate(checkpoint.events_len);
        self.next_event_id = checkpoint.next_event_id;
    }
}
