// 6.0.2: result types and errors for engine operations.

use crate::ledger::LedgerError;
use crate::events::LiquidationMode;
use crate::types::{Amount, OwnerId, PositionId, Ratio};

/// Outcome of one liquidation touch (full or partial).
#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub id: PositionId,
    pub owner: OwnerId,
    pub mode: LiquidationMode,
    /// Debt burned from the caller plus any pooled-offset absorption.
    pub debt_extinguished: Amount,
    /// Collateral transferred to the caller, stipend included.
    pub coll_seized: Amount,
    pub stipend_paid: Amount,
    pub surplus_credited: Amount,
    pub bad_debt_redistributed: Amount,
    pub offset_absorbed: Amount,
    /// False only for partial liquidation.
    pub closed: bool,
}

/// Aggregate outcome of a sequence or batch call.
#[derive(Debug, Clone, Default)]
pub struct SequenceOutcome {
    pub liquidations: Vec<LiquidationOutcome>,
    pub total_debt_extinguished: Amount,
    /// Total collateral transferred to the caller across all steps.
    pub total_coll_seized: Amount,
    pub skipped: usize,
}

impl SequenceOutcome {
    pub(super) fn push(&mut self, outcome: LiquidationOutcome) {
        self.total_debt_extinguished = self.total_debt_extinguished.add(outcome.debt_extinguished);
        self.total_coll_seized = self.total_coll_seized.add(outcome.coll_seized);
        self.liquidations.push(outcome);
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Position {0:?} not found")]
    PositionNotFound(PositionId),

    #[error("Position {0:?} is not active")]
    PositionNotActive(PositionId),

    #[error("No price available")]
    NoPrice,

    #[error("Position {id:?} not eligible: ICR {icr} vs threshold {threshold}")]
    IneligibleForLiquidation {
        id: PositionId,
        icr: Ratio,
        threshold: Ratio,
    },

    #[error("Refusing to remove the last active position")]
    LastPositionStanding,

    #[error("Caller funds insufficient: required {required}, available {available}")]
    InsufficientCallerFunds { required: Amount, available: Amount },

    #[error("Remaining debt {remaining} below minimum {minimum}")]
    BelowMinimumSize { remaining: Amount, minimum: Amount },

    #[error("Nothing to liquidate")]
    NothingToLiquidate,

    #[error("Opening ICR {icr} below required {required}")]
    UndercollateralizedOpen { icr: Ratio, required: Ratio },

    #[error("Debt {debt} below minimum position size {minimum}")]
    DebtBelowMinimum { debt: Amount, minimum: Amount },

    #[error("Caller {caller:?} does not own position {id:?}")]
    NotPositionOwner { caller: OwnerId, id: PositionId },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
