// 6.0: core liquidation engine. coordinates position lifecycle, recovery-mode
// tracking, and the liquidation paths (single, partial, sequence, batch).
// deterministic and event-driven with no external I/O.

mod core;
mod liquidations;
mod mode;
mod positions;
mod results;

pub use core::Engine;
pub use results::{EngineError, LiquidationOutcome, SequenceOutcome};
