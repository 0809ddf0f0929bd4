use std::thread;

use log::debug;

use super::ScopeClient;
use crate::error::ScopeError;
use crate::types::{CommandOutcome, SettleStrategy};
use crate::utils::{PollError, poll_until};

/// Whether a raw command expects a response.
///
/// The bus has no protocol-level tagging, so the SCPI convention of a
/// trailing `?` (after trimming whitespace) is the only signal. Kept as a
/// named predicate so it can be swapped out if the transport ever
/// distinguishes queries natively.
pub fn is_query(command: &str) -> bool {
    command.trim().ends_with('?')
}

impl ScopeClient {
    /// Send an arbitrary SCPI command.
    ///
    /// Commands recognized as queries by [`is_query`] capture a trimmed
    /// response; everything else is a fire-and-forget write with no
    /// response field.
    pub fn send_command(&mut self, command: &str) -> Result<CommandOutcome, ScopeError> {
        let link = self.link()?;
        if is_query(command) {
            let response = link.query(command)?;
            Ok(CommandOutcome {
                command: command.to_string(),
                response: Some(response.trim().to_string()),
            })
        } else {
            link.write(command)?;
            Ok(CommandOutcome {
                command: command.to_string(),
                response: None,
            })
        }
    }

    /// Trigger the instrument's auto-scale routine and wait for it to
    /// settle.
    ///
    /// The instrument acknowledges `:AUT` before the routine finishes, so
    /// the wait is governed by the configured [`SettleStrategy`]: a flat
    /// sleep by default, or an `*OPC?` poll on instruments that support it.
    /// The flat sleep is not a completion signal; the routine may finish
    /// earlier or overrun it.
    pub fn auto_scale(&mut self) -> Result<(), ScopeError> {
        let settle = self.settle();
        self.link()?.write(":AUT")?;

        match settle {
            SettleStrategy::Fixed { wait } => {
                debug!("Auto-scale settle: sleeping {wait:?}");
                thread::sleep(wait);
                Ok(())
            }
            SettleStrategy::OperationComplete { timeout, interval } => {
                debug!("Auto-scale settle: polling *OPC? for up to {timeout:?}");
                poll_until(
                    || {
                        let reply = self.link()?.query("*OPC?")?;
                        Ok(reply.trim() == "1")
                    },
                    timeout,
                    interval,
                )
                .map_err(|e| match e {
                    PollError::Timeout => ScopeError::Timeout,
                    PollError::ConditionError(e) => e,
                })
            }
        }
    }
}
