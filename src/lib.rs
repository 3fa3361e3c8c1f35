// cdp-core: collateralized debt position liquidation engine.
// risk-first architecture: ratio math and settlement take priority.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: PositionId, OwnerId, Price, Amount, Ratio
//   2.x  position.rs: position struct, status, reward snapshot
//        ratio.rs: ICR/NICR/TCR and capped-seizure conversion math
//        index.rs: NICR-ordered linked index with insertion hints
//        rewards.rs: lazy bad-debt redistribution accumulators
//   3.x  ledger.rs: aggregate pool totals + offset pool
//   3.1  escrow.rs: surplus collateral escrow
//   4.x  config.rs: risk thresholds, dust floor, stipend, grace period
//   5.x  events.rs: state transition events for audit
//   6.x  engine/: core engine: lifecycle, recovery mode, liquidations

// core state modules
pub mod engine;
pub mod events;
pub mod index;
pub mod ledger;
pub mod position;
pub mod types;

// ratio and redistribution math
pub mod ratio;
pub mod rewards;

// settlement side pools
pub mod escrow;

// configuration
pub mod config;

// re exports for convenience
pub use config::{EngineConfig, EngineParams};
pub use engine::{Engine, EngineError, LiquidationOutcome, SequenceOutcome};
pub use escrow::SurplusEscrow;
pub use events::{Event, EventId, EventPayload, LiquidationMode};
pub use index::SortedPositions;
pub use ledger::{LedgerError, OffsetPool, PoolLedger};
pub use position::{Position, PositionStatus, RewardSnapshot};
pub use ratio::{icr, nominal_icr, tcr};
pub use rewards::{entire_coll, entire_debt, entire_icr, RewardLedger};
pub use types::{Amount, OwnerId, PositionId, Price, Ratio, Timestamp};
