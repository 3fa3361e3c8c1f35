//! Global reward accumulators for bad-debt redistribution.
//!
//! When a liquidation leaves debt uncovered, the remainder is socialized
//! across the surviving positions pro-rata by stake. The distribution is
//! lazy: only the global per-unit-staked accumulators move, and each
//! position's share materializes as a pending reward the next time it is
//! touched. Pending reward = (current accumulator - position snapshot) * stake.
//!
//! Division leaves a remainder at fixed precision; the per-unit quotient is
//! computed over (amount + carried error) and the unallocated residue is
//! carried into the next redistribution so the accumulators never drift from
//! the ledger totals over arbitrarily long liquidation chains.
//!
//! Stakes are re-based against the (total stakes, total collateral) snapshot
//! pair captured atomically after every redistribution, keeping pro-rata
//! shares fair after past liquidations have shifted the collateral/stake
//! ratio. Both accumulators are monotonically non-decreasing.

use crate::position::{Position, RewardSnapshot};
use crate::types::{Amount, Price, Ratio};
use crate::ratio::icr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardLedger {
    total_stakes: Amount,
    // snapshot pair, always updated together
    total_stakes_snapshot: Amount,
    total_collateral_snapshot: Amount,
    // monotonically non-decreasing accumulators
    debt_per_unit_staked: Decimal,
    coll_per_unit_staked: Decimal,
    // unallocated division residue carried into the next redistribution
    debt_error: Decimal,
    coll_error: Decimal,
}

impl Default for RewardLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardLedger {
    pub fn new() -> Self {
        Self {
            total_stakes: Amount::zero(),
            total_stakes_snapshot: Amount::zero(),
            total_collateral_snapshot: Amount::zero(),
            debt_per_unit_staked: Decimal::ZERO,
            coll_per_unit_staked: Decimal::ZERO,
            debt_error: Decimal::ZERO,
            coll_error: Decimal::ZERO,
        }
    }

    pub fn total_stakes(&self) -> Amount {
        self.total_stakes
    }

    pub fn debt_per_unit_staked(&self) -> Decimal {
        self.debt_per_unit_staked
    }

    pub fn coll_per_unit_staked(&self) -> Decimal {
        self.coll_per_unit_staked
    }

    pub fn snapshot_pair(&self) -> (Amount, Amount) {
        (self.total_stakes_snapshot, self.total_collateral_snapshot)
    }

    /// Current accumulator values, recorded on a position at its last touch.
    pub fn current_snapshot(&self) -> RewardSnapshot {
        RewardSnapshot {
            debt_per_stake: self.debt_per_unit_staked,
            coll_per_stake: self.coll_per_unit_staked,
        }
    }

    /// Derive the stake for a position holding `coll` collateral.
    ///
    /// Before any redistribution the snapshot pair is zero and stake equals
    /// collateral 1:1; afterwards stakes are re-based so a unit of collateral
    /// earns the same share it would have at the time of the last snapshot.
    pub fn compute_stake(&self, coll: Amount) -> Amount {
        if self.total_collateral_snapshot.is_zero() {
            coll
        } else {
            Amount::new(
                coll.value() * self.total_stakes_snapshot.value()
                    / self.total_collateral_snapshot.value(),
            )
        }
    }

    pub fn add_stake(&mut self, stake: Amount) {
        self.total_stakes = self.total_stakes.add(stake);
    }

    pub fn remove_stake(&mut self, stake: Amount) {
        debug_assert!(stake <= self.total_stakes);
        self.total_stakes = self.total_stakes.sub(stake.min(self.total_stakes));
    }

    /// Socialize `debt` and `coll` across all remaining stakes and re-capture
    /// the snapshot pair against `system_coll` (aggregate active collateral
    /// after the triggering liquidation).
    ///
    /// The liquidated position's stake must already be removed from
    /// `total_stakes` before calling: the victim never receives a share of
    /// its own bad debt.
    pub fn redistribute(&mut self, debt: Amount, coll: Amount, system_coll: Amount) {
        if self.total_stakes.is_zero() {
            // nothing to allocate against; the caller keeps the remainder on
            // its own books (cannot happen while >1 active position exists)
            return;
        }

        let stakes = self.total_stakes.value();

        if !debt.is_zero() {
            let numer = debt.value() + self.debt_error;
            let per_unit = numer / stakes;
            self.debt_error = numer - per_unit * stakes;
            self.debt_per_unit_staked += per_unit;
        }

        if !coll.is_zero() {
            let numer = coll.value() + self.coll_error;
            let per_unit = numer / stakes;
            self.coll_error = numer - per_unit * stakes;
            self.coll_per_unit_staked += per_unit;
        }

        // snapshot pair always moves together
        self.total_stakes_snapshot = self.total_stakes;
        self.total_collateral_snapshot = system_coll;
    }
}

/// Debt redistributed to this position since its last snapshot.
pub fn pending_debt_reward(pos: &Position, ledger: &RewardLedger) -> Amount {
    if !pos.is_active() {
        return Amount::zero();
    }
    let delta = ledger.debt_per_unit_staked - pos.snapshot.debt_per_stake;
    debug_assert!(delta >= Decimal::ZERO);
    Amount::new(delta * pos.stake.value())
}

/// Collateral redistributed to this position since its last snapshot.
pub fn pending_coll_reward(pos: &Position, ledger: &RewardLedger) -> Amount {
    if !pos.is_active() {
        return Amount::zero();
    }
    let delta = ledger.coll_per_unit_staked - pos.snapshot.coll_per_stake;
    debug_assert!(delta >= Decimal::ZERO);
    Amount::new(delta * pos.stake.value())
}

/// Recorded debt plus pending redistribution share.
pub fn entire_debt(pos: &Position, ledger: &RewardLedger) -> Amount {
    pos.debt.add(pending_debt_reward(pos, ledger))
}

/// Recorded collateral plus pending redistribution share.
pub fn entire_coll(pos: &Position, ledger: &RewardLedger) -> Amount {
    pos.coll.add(pending_coll_reward(pos, ledger))
}

/// ICR over entire balances; this is what eligibility decisions use.
pub fn entire_icr(pos: &Position, ledger: &RewardLedger, price: Price) -> Ratio {
    icr(entire_coll(pos, ledger), entire_debt(pos, ledger), price)
}
