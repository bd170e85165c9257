//! # Repeat policy
//!
//! There is no acknowledgement from the motor controller, so a command may be lost without
//! anyone noticing. To make delivery likely the link sends a changed command straight away and
//! then repeats it, no sooner than the repeat interval, until it has been sent `max_sends` times.
//! After that the link stays silent until the command changes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::drive::DriveCmd;

use super::params::MotorLinkParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decides when a drive command needs to be transmitted.
#[derive(Debug, Clone)]
pub struct RepeatPolicy {
    repeat_interval_s: f64,

    max_sends: u32,

    last_sent: Option<DriveCmd>,

    send_count: u32,

    last_send_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RepeatPolicy {
    pub fn new(params: &MotorLinkParams) -> Self {
        Self {
            repeat_interval_s: params.repeat_interval_s,
            max_sends: params.max_sends,
            last_sent: None,
            send_count: 0,
            last_send_time_s: 0.0,
        }
    }

    /// Returns the command to transmit now, if any.
    ///
    /// A returned command is counted as sent.
    pub fn poll(&mut self, desired: DriveCmd, now_s: f64) -> Option<DriveCmd> {
        if self.last_sent != Some(desired) {
            self.record_sent(desired, now_s);
            return Some(desired);
        }

        if self.send_count < self.max_sends
            && now_s - self.last_send_time_s >= self.repeat_interval_s
        {
            self.send_count += 1;
            self.last_send_time_s = now_s;
            return Some(desired);
        }

        None
    }

    /// Record a transmission made outside of [`RepeatPolicy::poll`], which restarts the repeat
    /// count for that command.
    pub fn record_sent(&mut self, cmd: DriveCmd, now_s: f64) {
        self.last_sent = Some(cmd);
        self.send_count = 1;
        self.last_send_time_s = now_s;
    }

    /// Forget the last transmission, so the next poll sends immediately with a fresh repeat
    /// budget.
    pub fn rearm(&mut self) {
        self.last_sent = None;
        self.send_count = 0;
    }

    /// The last command transmitted.
    pub fn last_sent(&self) -> Option<DriveCmd> {
        self.last_sent
    }

    /// Number of transmissions of the last command.
    pub fn send_count(&self) -> u32 {
        self.send_count
    }
}
