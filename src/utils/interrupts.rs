//! Ctrl+C routing for the interactive loop
//!
//! `tokio::signal::ctrl_c` replaces the default SIGINT handler for the rest
//! of the process, so one watcher owns the signal: it stops the reply in
//! flight, or exits when no turn is running.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Clone, Default)]
pub struct TurnInterrupts {
    in_flight: Arc<Mutex<Option<CancellationToken>>>,
}

impl TurnInterrupts {
    /// Spawn the process-wide Ctrl+C watcher
    pub fn install() -> Self {
        let interrupts = Self::default();
        let watcher = interrupts.clone();

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !watcher.interrupt() {
                    println!();
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });

        interrupts
    }

    /// Token for the turn about to start
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = Some(token.clone());
        }
        token
    }

    pub fn end(&self) {
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = None;
        }
    }

    /// Cancel the running turn. Returns `false` when none is running.
    pub fn interrupt(&self) -> bool {
        let token = self.in_flight.lock().ok().and_then(|mut slot| slot.take());
        match token {
            Some(token) => {
                tracing::debug!("[Interrupts] Stopping the reply in flight");
                token.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_cancels_only_the_running_turn() {
        let interrupts = TurnInterrupts::default();
        assert!(!interrupts.interrupt());

        let token = interrupts.begin();
        assert!(interrupts.interrupt());
        assert!(token.is_cancelled());

        // A second Ctrl+C after the stop is an exit request
        assert!(!interrupts.interrupt());
    }

    #[test]
    fn test_finished_turn_is_not_cancelled() {
        let interrupts = TurnInterrupts::default();
        let token = interrupts.begin();
        interrupts.end();

        assert!(!interrupts.interrupt());
        assert!(!token.is_cancelled());
    }
}
