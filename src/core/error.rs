//! Error types for the transfer protocol.
//!
//! Backpressure is deliberately not represented here: a refused
//! `write_notify` is a normal flow-control condition surfaced as `false`,
//! never as an error.

use thiserror::Error;

/// Failures reported by the platform transport.
///
/// Every variant is recoverable. The central link logs it, runs its
/// cleanup policy, and returns to scanning; nothing here is fatal to the
/// process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connecting to a discovered device failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Service discovery on a connected device failed.
    #[error("service discovery failed: {0}")]
    ServiceDiscovery(String),

    /// Characteristic discovery on a service failed.
    #[error("characteristic discovery failed: {0}")]
    CharacteristicDiscovery(String),

    /// Changing the notification subscription state failed.
    #[error("notify state change failed: {0}")]
    NotifyState(String),

    /// The transport delivered an error instead of a characteristic value.
    #[error("value update failed: {0}")]
    ValueUpdate(String),

    /// The link dropped for a transport-reported reason.
    #[error("disconnected: {0}")]
    Disconnected(String),
}

/// Failures decoding a completed message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The reassembled message is not valid UTF-8.
    #[error("message is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 {
        /// Number of leading bytes that decoded cleanly.
        valid_up_to: usize,
    },
}

/// Top-level transfer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Transport-reported failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Message decoding failure.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
