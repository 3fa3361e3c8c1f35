// 3.0: aggregate pool accounting. PoolLedger holds the authoritative system
// totals TCR is computed from; OffsetPool is an optional debt-token reserve
// that absorbs bad debt ahead of redistribution.

use crate::types::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("collateral underflow: removing {requested} from {available}")]
    CollateralUnderflow { requested: Amount, available: Amount },

    #[error("debt underflow: removing {requested} from {available}")]
    DebtUnderflow { requested: Amount, available: Amount },
}

/// System-wide collateral and debt totals. Escrowed surplus and stipends are
/// outside these totals: they back nobody's debt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolLedger {
    total_coll: Amount,
    total_debt: Amount,
}

impl PoolLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_coll(&self) -> Amount {
        self.total_coll
    }

    pub fn total_debt(&self) -> Amount {
        self.total_debt
    }

    pub fn add_coll(&mut self, amount: Amount) {
        self.total_coll = self.total_coll.add(amount);
    }

    pub fn sub_coll(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount > self.total_coll {
            return Err(LedgerError::CollateralUnderflow {
                requested: amount,
                available: self.total_coll,
            });
        }
        self.total_coll = self.total_coll.sub(amount);
        Ok(())
    }

    pub fn add_debt(&mut self, amount: Amount) {
        self.total_debt = self.total_debt.add(amount);
    }

    pub fn sub_debt(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount > self.total_debt {
            return Err(LedgerError::DebtUnderflow {
                requested: amount,
                available: self.total_debt,
            });
        }
        self.total_debt = self.total_debt.sub(amount);
        Ok(())
    }
}

/// Pooled-offset funding leg. When funded it extinguishes bad debt before any
/// redistribution touches the accumulators; when empty it is a no-op and the
/// direct-repayment model stands alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffsetPool {
    balance: Amount,
    total_deposits: Amount,
    total_absorbed: Amount,
}

impl OffsetPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_absorbed(&self) -> Amount {
        self.total_absorbed
    }

    pub fn deposit(&mut self, amount: Amount) {
        self.balance = self.balance.add(amount);
        self.total_deposits = self.total_deposits.add(amount);
    }

    /// Absorb up to `amount` of bad debt, returning the portion covered.
    pub fn absorb(&mut self, amount: Amount) -> Amount {
        let covered = amount.min(self.balance);
        self.balance = self.balance.sub(covered);
        self.total_absorbed = self.total_absorbed.add(covered);
        covered
    }
}
