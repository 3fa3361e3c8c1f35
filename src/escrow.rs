// 3.1: surplus collateral escrow. when a capped seizure leaves collateral on
// the table, the remainder is held here for the former owner until claimed.
// escrowed collateral no longer backs any debt and is excluded from TCR.

use crate::types::{Amount, OwnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurplusEscrow {
    balances: HashMap<OwnerId, Amount>,
    total_credited: Amount,
    total_claimed: Amount,
}

impl SurplusEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, owner: OwnerId, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        let entry = self.balances.entry(owner).or_insert_with(Amount::zero);
        *entry = entry.add(amount);
        self.total_credited = self.total_credited.add(amount);
    }

    pub fn claimable(&self, owner: OwnerId) -> Amount {
        self.balances.get(&owner).copied().unwrap_or_else(Amount::zero)
    }

    /// Drain the owner's balance, returning what was held.
    pub fn claim(&mut self, owner: OwnerId) -> Amount {
        let amount = self.balances.remove(&owner).unwrap_or_else(Amount::zero);
        self.total_claimed = self.total_claimed.add(amount);
        amount
    }

    pub fn total_held(&self) -> Amount {
        self.total_credited.sub(self.total_claimed)
    }
}
