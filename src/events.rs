// 5.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying external systems. the EventPayload enum lists
// all event types; exactly one Liquidation event is emitted per touched
// position, carrying the mode tag.

use crate::types::{Amount, OwnerId, PositionId, Price, Ratio, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

/// How a liquidation qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationMode {
    /// Normal mode, ICR below MCR.
    Normal,
    /// Recovery mode, ICR below MCR.
    RecoveryFull,
    /// Recovery mode, ICR between MCR and TCR; seizure capped, surplus escrowed.
    RecoveryCapped,
    /// Partial liquidation; position stays active.
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Position lifecycle
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),

    // Liquidation events
    Liquidation(LiquidationEvent),
    BadDebtRedistributed(BadDebtEvent),
    SurplusCredited(SurplusCreditedEvent),
    SurplusClaimed(SurplusClaimedEvent),

    // Mode transitions
    RecoveryModeEntered(RecoveryModeEnteredEvent),
    RecoveryModeExited(RecoveryModeExitedEvent),

    // Funding
    CallerFunded(CallerFundedEvent),
    PriceUpdate(PriceUpdateEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub id: PositionId,
    pub owner: OwnerId,
    pub coll: Amount,
    pub debt: Amount,
    pub stake: Amount,
    pub nicr: Ratio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub id: PositionId,
    pub owner: OwnerId,
    pub debt_repaid: Amount,
    pub coll_returned: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub id: PositionId,
    pub owner: OwnerId,
    pub debt_extinguished: Amount,
    pub coll_seized: Amount,
    pub mode: LiquidationMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadDebtEvent {
    pub id: PositionId,
    pub bad_debt: Amount,
    pub offset_absorbed: Amount,
    pub redistributed: Amount,
    pub debt_per_unit_staked: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurplusCreditedEvent {
    pub id: PositionId,
    pub owner: OwnerId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurplusClaimedEvent {
    pub owner: OwnerId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryModeEnteredEvent {
    pub tcr: Ratio,
    pub cooldown_deadline: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryModeExitedEvent {
    pub tcr: Ratio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerFundedEvent {
    pub caller: OwnerId,
    pub amount: Amount,
    pub new_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdateEvent {
    pub price: Price,
}
