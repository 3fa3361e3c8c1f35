// 2.0: collateralized debt position. recorded coll/debt plus a reward snapshot;
// the true ("entire") balances add pending redistribution rewards on top,
// computed lazily in rewards.rs. positions are never physically deleted, they
// flip status and leave the ordered index.

use crate::ratio::{icr, nominal_icr};
use crate::types::{Amount, OwnerId, PositionId, Price, Ratio, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    NonExistent,
    Active,
    ClosedByOwner,
    ClosedByLiquidation,
    ClosedByRedemption,
}

// 2.1: accumulator values recorded at the position's last touch.
// pending reward = (current accumulator - snapshot) * stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSnapshot {
    pub debt_per_stake: Decimal,
    pub coll_per_stake: Decimal,
}

impl RewardSnapshot {
    pub fn zero() -> Self {
        Self {
            debt_per_stake: Decimal::ZERO,
            coll_per_stake: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: OwnerId,
    pub coll: Amount,
    pub debt: Amount,
    // redistribution-adjusted share, re-derived whenever coll changes
    pub stake: Amount,
    // liquidator-incentive collateral escrowed at opening, excluded from ICR
    pub stipend: Amount,
    pub status: PositionStatus,
    pub snapshot: RewardSnapshot,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Position {
    pub fn new(
        id: PositionId,
        owner: OwnerId,
        coll: Amount,
        debt: Amount,
        stake: Amount,
        stipend: Amount,
        snapshot: RewardSnapshot,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            coll,
            debt,
            stake,
            stipend,
            status: PositionStatus::Active,
            snapshot,
            opened_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    /// Ordering key for the index, based on recorded balances only.
    pub fn recorded_nominal_icr(&self) -> Ratio {
        nominal_icr(self.coll, self.debt)
    }

    /// ICR over recorded balances. Eligibility decisions use entire balances
    /// (see rewards::entire_icr) so pending rewards are never ignored.
    pub fn recorded_icr(&self, price: Price) -> Ratio {
        icr(self.coll, self.debt, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_position() -> Position {
        Position::new(
            PositionId(1),
            OwnerId(7),
            Amount::new(dec!(150)),
            Amount::new(dec!(100)),
            Amount::new(dec!(150)),
            Amount::new(dec!(0.5)),
            RewardSnapshot::zero(),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn new_position_is_active() {
        let pos = test_position();
        assert!(pos.is_active());
        assert_eq!(pos.status, PositionStatus::Active);
    }

    #[test]
    fn recorded_ratios() {
        let pos = test_position();
        assert_eq!(pos.recorded_nominal_icr().value(), dec!(1.5));

        let r = pos.recorded_icr(Price::new_unchecked(dec!(0.7)));
        assert_eq!(r.value(), dec!(1.05));
    }

    #[test]
    fn stipend_excluded_from_ratio() {
        let pos = test_position();
        // 150 coll at price 1, not 150.5
        assert_eq!(
            pos.recorded_icr(Price::new_unchecked(dec!(1))).value(),
            dec!(1.5)
        );
    }
}
