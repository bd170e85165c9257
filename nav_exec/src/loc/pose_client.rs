//! # Pose Client
//!
//! Recieves poses streamed from the tracking sensor as JSON datagrams:
//!
//! ```json
//! {"position_m": [0.4, 0.0, 1.2], "yaw_deg": 87.5}
//! ```
//!
//! Datagrams are collected by the socket's recieve thread, only the most recent one is decoded
//! each cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use std::{net::SocketAddr, time::Duration};

use comms_if::net::{DatagramSocket, DatagramSocketError, NetParams, SocketOptions};

use super::{Pose, PoseSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose client
pub struct PoseClient {
    socket: DatagramSocket,

    /// Last pose successfully decoded
    last_pose: Option<Pose>,

    num_invalid: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PoseClientError {
    #[error("Socket error: {0}")]
    SocketError(DatagramSocketError),

    #[error("Could not deserialize the pose: {0}")]
    DeserializeError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseClient {
    pub fn new(params: &NetParams) -> Result<Self, PoseClientError> {
        let options = SocketOptions {
            thread_name: String::from("pose-recv"),
            ..SocketOptions::listener(
                &params.pose_bind,
                Duration::from_millis(params.recv_timeout_ms),
            )
        };

        let socket = DatagramSocket::new(options).map_err(PoseClientError::SocketError)?;

        info!("Listening for poses on {}", params.pose_bind);

        Ok(Self {
            socket,
            last_pose: None,
            num_invalid: 0,
        })
    }

    /// Decode the latest pose datagram, if one arrived since the last call.
    pub fn recieve(&mut self) -> Result<Option<Pose>, PoseClientError> {
        let data = match self.socket.take_latest() {
            Some(d) => d,
            None => return Ok(None),
        };

        let pose: Pose =
            serde_json::from_slice(&data).map_err(PoseClientError::DeserializeError)?;

        self.last_pose = Some(pose);

        Ok(Some(pose))
    }

    /// Address the client is listening on.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr()
    }

    /// Number of datagrams which could not be decoded.
    pub fn num_invalid(&self) -> u64 {
        self.num_invalid
    }
}

impl PoseSource for PoseClient {
    /// Returns the most recent valid pose, which may be from an earlier cycle.
    fn pose(&mut self) -> Option<Pose> {
        if let Err(e) = self.recieve() {
            self.num_invalid += 1;
            warn!("Invalid pose datagram: {}", e);
        }

        self.last_pose
    }
}
