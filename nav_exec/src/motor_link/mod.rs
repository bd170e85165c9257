//! # Motor Link
//!
//! The motor link delivers the latest desired drive command to the motor controller and surfaces
//! whatever the controller sends back.
//!
//! The control loop sets the desired command at any time with [`MotorLink::set_command`] (last
//! write wins), and once per cycle calls [`MotorLink::process`], which transmits according to the
//! [`RepeatPolicy`]. Telemetry is read with [`MotorLink::drain_mailbox`], at most once per cycle.
//!
//! A transport fault puts the link into a degraded mode where nothing is sent until
//! [`MotorLink::reinit`] is called.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod params;
mod repeat;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::{io, time::Duration};

use comms_if::{
    eqpt::drive::{DriveCmd, MotorTelemetry, RobotAction},
    net::{DatagramSocket, DatagramSocketError, NetParams, SocketOptions},
};

pub use params::MotorLinkParams;
pub use repeat::RepeatPolicy;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A datagram transport the link can send drive bytes over.
pub trait Transport: Send {
    /// Send one datagram.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Take the latest datagram recieved since the last call.
    fn take_latest(&mut self) -> Option<Vec<u8>>;

    /// Number of datagrams recieved.
    fn rx_count(&self) -> u64;

    /// Stop the transport, including any background recieve.
    fn close(&mut self);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The motor command link.
pub struct MotorLink {
    params: MotorLinkParams,

    /// Network parameters used to (re)open the socket, `None` if the transport was supplied.
    net: Option<NetParams>,

    transport: Option<Box<dyn Transport>>,

    policy: RepeatPolicy,

    command: DriveCmd,

    degraded: bool,

    degraded_warned: bool,

    connected: bool,

    tx_count: u64,

    last_telemetry: Option<MotorTelemetry>,
}

/// Telemetry of the link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkTm {
    pub tx_count: u64,
    pub rx_count: u64,

    /// True once something has been recieved from the controller, false after a fault.
    pub connected: bool,

    pub degraded: bool,

    pub command: DriveCmd,

    pub last_telemetry: Option<String>,
}

/// A transport which discards everything, for running without hardware.
#[derive(Debug, Default)]
pub struct NullTransport {
    num_sent: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MotorLinkError {
    #[error("Could not open the motor link socket: {0}")]
    Socket(#[from] DatagramSocketError),

    #[error("Could not send the drive command: {0}")]
    Send(io::Error),

    #[error("The motor link is degraded and must be reinitialised")]
    Degraded,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Transport for DatagramSocket {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        DatagramSocket::send(self, data).map(|_| ())
    }

    fn take_latest(&mut self) -> Option<Vec<u8>> {
        DatagramSocket::take_latest(self)
    }

    fn rx_count(&self) -> u64 {
        DatagramSocket::rx_count(self)
    }

    fn close(&mut self) {
        DatagramSocket::close(self)
    }
}

impl Transport for NullTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        trace!("NullTransport discarding {:?}", data);
        self.num_sent += 1;
        Ok(())
    }

    fn take_latest(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn rx_count(&self) -> u64 {
        0
    }

    fn close(&mut self) {}
}

impl MotorLink {
    /// Create a link to the motor controller described by `net`.
    ///
    /// The socket isn't opened until [`MotorLink::init`] is called.
    pub fn new(params: MotorLinkParams, net: NetParams) -> Self {
        let mut link = Self::empty(params);
        link.net = Some(net);
        link
    }

    /// Create a link over the given transport.
    pub fn with_transport(params: MotorLinkParams, transport: Box<dyn Transport>) -> Self {
        let mut link = Self::empty(params);
        link.transport = Some(transport);
        link
    }

    /// Create a link which talks to nothing.
    pub fn offline(params: MotorLinkParams) -> Self {
        Self::with_transport(params, Box::new(NullTransport::default()))
    }

    /// Open the socket.
    ///
    /// On failure the link is left degraded, all further operations become no-ops until
    /// [`MotorLink::reinit`] succeeds.
    pub fn init(&mut self) -> Result<(), MotorLinkError> {
        let net = match self.net {
            Some(ref n) => n,
            // Supplied transports are ready as soon as they're constructed
            None => return Ok(()),
        };

        let options = SocketOptions {
            thread_name: String::from("motor-link-recv"),
            ..SocketOptions::client(
                &net.motor_bind,
                &net.motor_endpoint,
                Duration::from_millis(net.recv_timeout_ms),
            )
        };

        match DatagramSocket::new(options) {
            Ok(socket) => {
                info!("Motor link open to {}", net.motor_endpoint);
                self.transport = Some(Box::new(socket));
                Ok(())
            }
            Err(e) => {
                error!("Could not open the motor link: {}", e);
                self.enter_degraded();
                Err(MotorLinkError::Socket(e))
            }
        }
    }

    /// Set the desired command.
    pub fn set_command(&mut self, command: DriveCmd) {
        if command != self.command {
            trace!("Motor command set to {}", command);
        }
        self.command = command;
    }

    /// Set the desired command from an action.
    pub fn set_action(&mut self, action: RobotAction) {
        self.set_command(DriveCmd::from(action))
    }

    /// The desired command.
    pub fn command(&self) -> DriveCmd {
        self.command
    }

    /// Transmit the desired command if the repeat policy calls for it.
    ///
    /// Returns the command transmitted, if any.
    pub fn process(&mut self, now_s: f64) -> Option<DriveCmd> {
        if !self.can_send() {
            return None;
        }

        let cmd = self.policy.poll(self.command, now_s)?;

        match self.transmit(cmd) {
            Ok(()) => Some(cmd),
            Err(e) => {
                error!("{}", e);
                self.enter_degraded();
                None
            }
        }
    }

    /// Take the latest telemetry from the controller, if any arrived since the last call.
    pub fn drain_mailbox(&mut self) -> Option<MotorTelemetry> {
        let data = self.transport.as_mut()?.take_latest()?;
        let tm = MotorTelemetry::from_datagram(&data);

        if !self.connected {
            info!("Motor controller connected");
        }
        debug!("Motor telemetry: {}", tm);

        self.connected = true;
        self.last_telemetry = Some(tm.clone());

        Some(tm)
    }

    /// Command Stop and transmit it now, bypassing the repeat policy.
    pub fn emergency_stop(&mut self, now_s: f64) -> Result<(), MotorLinkError> {
        self.command = DriveCmd::STOP;

        if !self.can_send() {
            return Err(MotorLinkError::Degraded);
        }

        warn!("Emergency stop sent");

        match self.transmit(DriveCmd::STOP) {
            Ok(()) => {
                self.policy.record_sent(DriveCmd::STOP, now_s);
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                self.enter_degraded();
                Err(e)
            }
        }
    }

    /// Force the current command to be transmitted again on the next process, with a fresh
    /// repeat budget.
    pub fn resend(&mut self) {
        debug!("Motor link resend requested");
        self.policy.rearm();
    }

    /// Close the link and open it again, clearing any degraded state.
    pub fn reinit(&mut self) -> Result<(), MotorLinkError> {
        info!("Reinitialising the motor link");

        if self.net.is_some() {
            self.close();
        }

        self.degraded = false;
        self.degraded_warned = false;
        self.policy.rearm();

        self.init()
    }

    /// Close the link, stopping the recieve thread.
    pub fn close(&mut self) {
        if let Some(mut t) = self.transport.take() {
            t.close();
            debug!("Motor link closed");
        }
        self.connected = false;
    }

    /// The last command actually transmitted.
    pub fn last_transmitted(&self) -> Option<DriveCmd> {
        self.policy.last_sent()
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    pub fn rx_count(&self) -> u64 {
        self.transport.as_ref().map(|t| t.rx_count()).unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Get the link telemetry.
    pub fn tm(&self) -> LinkTm {
        LinkTm {
            tx_count: self.tx_count,
            rx_count: self.rx_count(),
            connected: self.connected,
            degraded: self.degraded,
            command: self.command,
            last_telemetry: self.last_telemetry.as_ref().map(|t| t.to_string()),
        }
    }

    fn empty(params: MotorLinkParams) -> Self {
        Self {
            policy: RepeatPolicy::new(&params),
            params,
            net: None,
            transport: None,
            command: DriveCmd::STOP,
            degraded: false,
            degraded_warned: false,
            connected: false,
            tx_count: 0,
            last_telemetry: None,
        }
    }

    fn can_send(&mut self) -> bool {
        if !self.degraded && self.transport.is_some() {
            return true;
        }

        if !self.degraded_warned {
            warn!("Motor link unavailable, commands will not be sent until it is reinitialised");
            self.degraded_warned = true;
        }

        false
    }

    fn transmit(&mut self, cmd: DriveCmd) -> Result<(), MotorLinkError> {
        let transport = self.transport.as_mut().ok_or(MotorLinkError::Degraded)?;
        transport
            .send(&[cmd.as_byte()])
            .map_err(MotorLinkError::Send)?;

        self.tx_count += 1;
        trace!("Sent {} (repeat interval {} s)", cmd, self.params.repeat_interval_s);

        Ok(())
    }

    fn enter_degraded(&mut self) {
        if !self.degraded {
            warn!("Motor link degraded");
        }
        self.degraded = true;
        self.connected = false;
    }
}

impl Drop for MotorLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Recorder {
        sent: Arc<Mutex<Vec<u8>>>,
        inbox: Arc<Mutex<Option<Vec<u8>>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl Transport for Recorder {
        fn send(&mut self, data: &[u8]) -> io::Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(io::Error::new(io::ErrorKind::Other, "unreachable"));
            }
            self.sent.lock().unwrap().extend_from_slice(data);
            Ok(())
        }

        fn take_latest(&mut self) -> Option<Vec<u8>> {
            self.inbox.lock().unwrap().take()
        }

        fn rx_count(&self) -> u64 {
            0
        }

        fn close(&mut self) {}
    }

    fn link() -> (MotorLink, Recorder) {
        let rec = Recorder::default();
        let link = MotorLink::with_transport(MotorLinkParams::default(), Box::new(rec.clone()));
        (link, rec)
    }

    #[test]
    fn test_process_sends_bytes() {
        let (mut link, rec) = link();

        link.set_action(RobotAction::Forward);
        assert_eq!(link.process(0.0), Some(DriveCmd::from(RobotAction::Forward)));
        link.set_action(RobotAction::TurnLeft);
        link.process(0.05);

        assert_eq!(*rec.sent.lock().unwrap(), vec![0b0101, 0b0110]);
        assert_eq!(link.tx_count(), 2);
        assert_eq!(
            link.last_transmitted(),
            Some(DriveCmd::from(RobotAction::TurnLeft))
        );
    }

    #[test]
    fn test_send_failure_degrades() {
        let (mut link, rec) = link();
        *rec.fail.lock().unwrap() = true;

        link.set_action(RobotAction::Forward);
        assert_eq!(link.process(0.0), None);
        assert!(link.is_degraded());

        // Nothing is attempted while degraded, even once the fault clears
        *rec.fail.lock().unwrap() = false;
        assert_eq!(link.process(1.0), None);
        assert!(matches!(
            link.emergency_stop(1.0),
            Err(MotorLinkError::Degraded)
        ));

        link.reinit().unwrap();
        assert!(!link.is_degraded());
        assert_eq!(link.process(1.1), Some(DriveCmd::STOP));
    }

    #[test]
    fn test_emergency_stop_bypasses_policy() {
        let (mut link, rec) = link();

        link.process(0.0);
        link.process(0.1);
        link.process(0.2);
        assert_eq!(rec.sent.lock().unwrap().len(), 3);

        // Stop has used its budget, but an emergency stop still goes out
        link.emergency_stop(5.0).unwrap();
        assert_eq!(rec.sent.lock().unwrap().len(), 4);
        assert_eq!(link.process(5.05), None);
    }

    #[test]
    fn test_resend() {
        let (mut link, rec) = link();
        link.set_action(RobotAction::TurnRight);
        for i in 0..20 {
            link.process(i as f64 * 0.05);
        }
        assert_eq!(rec.sent.lock().unwrap().len(), 3);

        link.resend();
        assert!(link.process(1.0).is_some());
        assert_eq!(rec.sent.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_drain_mailbox() {
        let (mut link, rec) = link();
        assert!(!link.is_connected());
        assert_eq!(link.drain_mailbox(), None);

        *rec.inbox.lock().unwrap() = Some(b"LED_ON".to_vec());
        assert_eq!(link.drain_mailbox(), Some(MotorTelemetry::LedOn));
        assert!(link.is_connected());
        assert_eq!(link.drain_mailbox(), None);
        assert_eq!(link.tm().last_telemetry, Some(String::from("LED_ON")));
    }

    #[test]
    fn test_bad_endpoint_degrades() {
        let net = NetParams {
            motor_endpoint: String::from("not an address"),
            motor_bind: String::from("127.0.0.1:0"),
            ..NetParams::default()
        };
        let mut link = MotorLink::new(MotorLinkParams::default(), net);

        assert!(matches!(link.init(), Err(MotorLinkError::Socket(_))));
        assert!(link.is_degraded());
        assert_eq!(link.process(0.0), None);
    }
}
