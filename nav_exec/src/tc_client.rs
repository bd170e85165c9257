//! # Telecommand Client
//!
//! Recieves telecommands from the ground as JSON datagrams. Unlike the pose and motor telemetry
//! every telecommand matters, so the socket is drained completely each cycle rather than keeping
//! only the latest datagram.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use std::{
    io,
    net::{SocketAddr, UdpSocket},
};

use comms_if::{net::NetParams, tc::Tc};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const MAX_TC_LEN: usize = 4096;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telecommand client
pub struct TcClient {
    socket: UdpSocket,

    num_recieved: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TcClientError {
    #[error("Could not bind the telecommand socket to {0}: {1}")]
    BindError(String, io::Error),

    #[error("Could not make the telecommand socket non-blocking: {0}")]
    NonBlockingError(io::Error),

    #[error("Could not recieve a telecommand: {0}")]
    RecvError(io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcClient {
    /// Create a new instance of the TC Client.
    pub fn new(params: &NetParams) -> Result<Self, TcClientError> {
        let socket = UdpSocket::bind(&params.tc_bind)
            .map_err(|e| TcClientError::BindError(params.tc_bind.clone(), e))?;
        socket
            .set_nonblocking(true)
            .map_err(TcClientError::NonBlockingError)?;

        info!("Listening for telecommands on {}", params.tc_bind);

        Ok(Self {
            socket,
            num_recieved: 0,
        })
    }

    /// Get every telecommand which has arrived since the last call.
    ///
    /// Datagrams which don't parse are logged and skipped.
    pub fn recieve_tcs(&mut self) -> Result<Vec<Tc>, TcClientError> {
        let mut tcs = Vec::new();
        let mut buf = [0u8; MAX_TC_LEN];

        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    self.num_recieved += 1;
                    let text = String::from_utf8_lossy(&buf[..len]);
                    match Tc::from_json(&text) {
                        Ok(tc) => tcs.push(tc),
                        Err(e) => warn!("Invalid TC from {}: {}", from, e),
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(TcClientError::RecvError(e)),
            }
        }

        Ok(tcs)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    pub fn num_recieved(&self) -> u64 {
        self.num_recieved
    }
}
