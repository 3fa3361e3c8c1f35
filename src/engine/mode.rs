//! Recovery-mode evaluation and the grace-period cooldown.
//!
//! TCR is read from the pool ledger aggregates, never recomputed per
//! position. Dropping below CCR arms a cooldown deadline; recovery-specific
//! eligibility (liquidating above MCR, up to TCR) is honored only once the
//! cooldown has elapsed, so a single-tick price dip cannot widen the
//! liquidation window. Before the cooldown elapses only strictly
//! undercollateralized positions (ICR < 100%) qualify. The sync is
//! idempotent and re-run before every sequence/batch step because a
//! sequence can push TCR back above CCR mid-run.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{
    EventPayload, LiquidationMode, RecoveryModeEnteredEvent, RecoveryModeExitedEvent,
};
use crate::ratio::tcr;
use crate::types::Ratio;
use rust_decimal::Decimal;

impl Engine {
    /// Total collateralization ratio at the current price.
    pub fn tcr(&self) -> Result<Ratio, EngineError> {
        let price = self.price()?;
        Ok(tcr(
            self.ledger.total_coll(),
            self.ledger.total_debt(),
            price,
        ))
    }

    /// True when TCR sits below the critical ratio.
    pub fn check_recovery_mode(&self) -> Result<bool, EngineError> {
        Ok(self.tcr()? < Ratio::new(self.params.ccr))
    }

    /// Re-sync the cooldown with the current TCR. Arms the deadline on entry
    /// into recovery mode, disarms it on exit, and leaves an armed deadline
    /// untouched while recovery persists. Returns whether recovery mode holds.
    pub fn sync_grace_period(&mut self) -> Result<bool, EngineError> {
        let current_tcr = self.tcr()?;
        let recovery = current_tcr < Ratio::new(self.params.ccr);

        match (recovery, self.grace_deadline) {
            (true, None) => {
                let deadline = self.current_time.plus_millis(self.params.grace_period_ms);
                self.grace_deadline = Some(deadline);
                self.emit_event(EventPayload::RecoveryModeEntered(RecoveryModeEnteredEvent {
                    tcr: current_tcr,
                    cooldown_deadline: deadline,
                }));
            }
            (false, Some(_)) => {
                self.grace_deadline = None;
                self.emit_event(EventPayload::RecoveryModeExited(RecoveryModeExitedEvent {
                    tcr: current_tcr,
                }));
            }
            _ => {}
        }

        Ok(recovery)
    }

    /// Whether the armed cooldown has elapsed.
    pub(super) fn cooldown_elapsed(&self) -> bool {
        match self.grace_deadline {
            Some(deadline) => self.current_time >= deadline,
            None => false,
        }
    }

    /// Classify a position's eligibility under the current mode. Returns the
    /// mode tag when liquidatable, or the governing threshold when not.
    pub(super) fn classify_eligibility(
        &self,
        icr: Ratio,
        current_tcr: Ratio,
        recovery: bool,
    ) -> Result<LiquidationMode, Ratio> {
        let mcr = Ratio::new(self.params.mcr);

        if !recovery {
            return if icr < mcr {
                Ok(LiquidationMode::Normal)
            } else {
                Err(mcr)
            };
        }

        if !self.cooldown_elapsed() {
            // debounced: only strictly undercollateralized positions qualify
            let par = Ratio::new(Decimal::ONE);
            return if icr < par {
                Ok(LiquidationMode::RecoveryFull)
            } else {
                Err(par)
            };
        }

        if icr < mcr {
            Ok(LiquidationMode::RecoveryFull)
        } else if icr < current_tcr {
            Ok(LiquidationMode::RecoveryCapped)
        } else {
            Err(current_tcr)
        }
    }
}
