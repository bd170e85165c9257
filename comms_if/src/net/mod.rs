//! # Network Module
//!
//! This module provides networking abstractions over UDP, the transport used between the
//! navigation software and the motor controller.
//!
//! A [`DatagramSocket`] owns one background thread which recieves datagrams continuously. Every
//! datagram is written into a single-slot [`Mailbox`], so the cyclic code only ever sees the most
//! recent one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, trace};
use serde::Deserialize;
use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest datagram the recieve thread will accept, anything longer is truncated.
const MAX_DATAGRAM_LEN: usize = 1024;

/// Time the recieve thread waits after a socket error before re-arming.
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters for the executable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Address of the motor controller, for example `"192.168.0.18:3310"`
    pub motor_endpoint: String,

    /// Local address the motor link socket binds to
    pub motor_bind: String,

    /// Local address on which pose datagrams are recieved
    pub pose_bind: String,

    /// Local address on which ground telecommands are recieved
    pub tc_bind: String,

    /// Read timeout of the background recieve threads. This bounds how long closing a socket
    /// takes.
    pub recv_timeout_ms: u64,
}

/// Options used when opening a [`DatagramSocket`].
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Address to bind the local socket to.
    pub bind: String,

    /// Address all datagrams are sent to. `None` for recieve-only sockets.
    pub target: Option<String>,

    /// Read timeout of the recieve thread.
    pub recv_timeout: Duration,

    /// Name given to the recieve thread.
    pub thread_name: String,
}

/// A thread-safe single-slot mailbox.
///
/// Posting overwrites anything not yet taken, taking clears the unread flag.
#[derive(Debug)]
pub struct Mailbox<T> {
    inner: Mutex<MailboxSlot<T>>,
}

#[derive(Debug)]
struct MailboxSlot<T> {
    payload: Option<T>,
    unread: bool,
}

/// A UDP socket with a background recieve thread.
pub struct DatagramSocket {
    socket: UdpSocket,

    target: Option<SocketAddr>,

    join_handle: Option<JoinHandle<()>>,

    closed: Arc<AtomicBool>,

    mailbox: Arc<Mailbox<Vec<u8>>>,

    tx_count: u64,

    rx_count: Arc<AtomicU64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum DatagramSocketError {
    #[error("Could not bind the socket to {0}: {1}")]
    Bind(String, io::Error),

    #[error("Could not resolve the target address {0}")]
    ResolveTarget(String),

    #[error("Could not clone the socket for the recieve thread: {0}")]
    Clone(io::Error),

    #[error("Could not set the recieve timeout: {0}")]
    SetTimeout(io::Error),

    #[error("Could not spawn the recieve thread: {0}")]
    Spawn(io::Error),

    #[error("The socket has no target address to send to")]
    NoTarget,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            motor_endpoint: String::from("192.168.0.18:3310"),
            motor_bind: String::from("0.0.0.0:0"),
            pose_bind: String::from("0.0.0.0:3311"),
            tc_bind: String::from("0.0.0.0:3312"),
            recv_timeout_ms: 50,
        }
    }
}

impl SocketOptions {
    /// Options for a socket which sends to `target` and recieves replies on an ephemeral port.
    pub fn client(bind: &str, target: &str, recv_timeout: Duration) -> Self {
        Self {
            bind: bind.into(),
            target: Some(target.into()),
            recv_timeout,
            thread_name: String::from("udp-recv"),
        }
    }

    /// Options for a socket which only recieves.
    pub fn listener(bind: &str, recv_timeout: Duration) -> Self {
        Self {
            bind: bind.into(),
            target: None,
            recv_timeout,
            thread_name: String::from("udp-listen"),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MailboxSlot {
                payload: None,
                unread: false,
            }),
        }
    }

    /// Place a new payload in the mailbox, replacing any unread one.
    pub fn post(&self, payload: T) {
        match self.inner.lock() {
            Ok(mut slot) => {
                slot.payload = Some(payload);
                slot.unread = true;
            }
            Err(_) => error!("Mailbox lock poisoned, payload dropped"),
        }
    }

    /// Take the payload if there is unread data.
    pub fn take(&self) -> Option<T> {
        match self.inner.lock() {
            Ok(mut slot) => {
                if slot.unread {
                    slot.unread = false;
                    slot.payload.take()
                } else {
                    None
                }
            }
            Err(_) => {
                error!("Mailbox lock poisoned, cannot read payload");
                None
            }
        }
    }

    /// Returns true if there is unread data in the mailbox.
    pub fn has_unread(&self) -> bool {
        self.inner.lock().map(|s| s.unread).unwrap_or(false)
    }
}

impl DatagramSocket {
    /// Open a new socket and start its recieve thread.
    pub fn new(options: SocketOptions) -> Result<Self, DatagramSocketError> {
        // Resolve the target first so a bad address doesn't leave a thread running
        let target = match options.target {
            Some(ref t) => Some(
                t.to_socket_addrs()
                    .ok()
                    .and_then(|mut a| a.next())
                    .ok_or_else(|| DatagramSocketError::ResolveTarget(t.clone()))?,
            ),
            None => None,
        };

        let socket = UdpSocket::bind(&options.bind)
            .map_err(|e| DatagramSocketError::Bind(options.bind.clone(), e))?;

        // The recieve side gets its own handle with a timeout so it can notice the close flag
        let recv_socket = socket.try_clone().map_err(DatagramSocketError::Clone)?;
        recv_socket
            .set_read_timeout(Some(options.recv_timeout))
            .map_err(DatagramSocketError::SetTimeout)?;

        let closed = Arc::new(AtomicBool::new(false));
        let mailbox = Arc::new(Mailbox::new());
        let rx_count = Arc::new(AtomicU64::new(0));

        let closed_clone = closed.clone();
        let mailbox_clone = mailbox.clone();
        let rx_count_clone = rx_count.clone();

        let join_handle = thread::Builder::new()
            .name(options.thread_name.clone())
            .spawn(move || recv_thread(recv_socket, closed_clone, mailbox_clone, rx_count_clone))
            .map_err(DatagramSocketError::Spawn)?;

        debug!(
            "DatagramSocket bound to {:?}, target {:?}",
            socket.local_addr().ok(),
            target
        );

        Ok(Self {
            socket,
            target,
            join_handle: Some(join_handle),
            closed,
            mailbox,
            tx_count: 0,
            rx_count,
        })
    }

    /// Send a datagram to the target address.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, io::Error> {
        let target = self.target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, DatagramSocketError::NoTarget)
        })?;

        let n = self.socket.send_to(data, target)?;
        self.tx_count += 1;

        Ok(n)
    }

    /// Take the most recent datagram recieved since the last call, if any.
    pub fn take_latest(&self) -> Option<Vec<u8>> {
        self.mailbox.take()
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    /// Number of datagrams sent.
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    /// Number of datagrams recieved.
    pub fn rx_count(&self) -> u64 {
        self.rx_count.load(Ordering::Relaxed)
    }

    /// Returns true once the socket has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Close the socket, stopping the recieve thread and waiting for it to exit.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                error!("DatagramSocket recieve thread panicked");
            }
            debug!("DatagramSocket recieve thread exited");
        }
    }
}

impl Drop for DatagramSocket {
    fn drop(&mut self) {
        self.close();
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background recieve loop.
///
/// Re-arms after every datagram and every error until the close flag is raised.
fn recv_thread(
    socket: UdpSocket,
    closed: Arc<AtomicBool>,
    mailbox: Arc<Mailbox<Vec<u8>>>,
    rx_count: Arc<AtomicU64>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    while !closed.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                trace!("Recieved {} byte datagram from {}", len, from);
                rx_count.fetch_add(1, Ordering::Relaxed);
                mailbox.post(buf[..len].to_vec());
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                if closed.load(Ordering::Relaxed) {
                    break;
                }
                error!("Error recieving datagram: {}", e);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}
