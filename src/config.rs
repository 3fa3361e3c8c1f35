// 4.0 config.rs: all settings in one place. risk thresholds, dust floor,
// liquidator incentives, grace period.

use crate::types::Amount;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Protocol risk parameters. Ratios are fractions, 1.0 = 100%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    // Minimum collateralization ratio; normal-mode liquidation threshold
    pub mcr: Decimal,
    // Critical ratio; recovery mode triggers when TCR drops below it
    pub ccr: Decimal,
    // Capped seizure rate: collateral worth repay * licr goes to the liquidator
    pub licr: Decimal,
    // Partial liquidation must leave at least this much debt
    pub min_debt: Amount,
    // Fixed collateral stipend escrowed at opening, paid to the liquidator
    pub stipend: Amount,
    // Dwell time after entering recovery mode before recovery-specific
    // liquidations are honored
    pub grace_period_ms: i64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            mcr: dec!(1.10),
            ccr: dec!(1.50),
            licr: dec!(1.03),
            min_debt: Amount::new(dec!(200)),
            stipend: Amount::new(dec!(0.5)),
            grace_period_ms: 15 * 60 * 1000,
        }
    }
}

/// Engine runtime options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Enable verbose logging.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_are_ordered() {
        let params = EngineParams::default();
        // LICR <= MCR < CCR is what the seizure cap relies on
        assert!(params.licr <= params.mcr);
        assert!(params.mcr < params.ccr);
        assert!(params.licr > Decimal::ONE);
    }
}
