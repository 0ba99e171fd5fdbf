//! Receiver-side accumulator (central role).
//!
//! Appends incoming chunks to a growing buffer until the terminator
//! arrives, then hands the reassembled message upward. The transport is
//! trusted to deliver chunks in order and at most once per connection, so
//! reassembly is plain concatenation.

use tracing::debug;

use crate::core::error::DecodeError;
use crate::frame::Frame;

/// Outcome of feeding one received chunk to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Data appended; the message is still incomplete.
    Accumulated {
        /// Bytes buffered so far.
        total: usize,
    },
    /// The terminator arrived and the message decoded cleanly.
    ///
    /// This is the caller's signal to unsubscribe and disconnect.
    Completed(String),
    /// A terminator with no accumulation in progress; dropped.
    Ignored,
    /// The terminator arrived but the buffered bytes are not valid text.
    ///
    /// The accumulation is discarded; the connection continues.
    Failed(DecodeError),
}

/// Reassembles one chunked message per connection.
#[derive(Debug, Default)]
pub struct TransferReceiver {
    buffer: Vec<u8>,
    receiving: bool,
}

impl TransferReceiver {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes accumulated so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether an accumulation is in progress.
    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    /// Discard any partial accumulation; called when a connection begins.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.receiving = false;
    }

    /// Feed one received chunk.
    ///
    /// The terminator completes only an active accumulation: fed twice in
    /// a row it yields one message and then [`ReceiveOutcome::Ignored`],
    /// and a transfer of an empty payload (terminator alone) delivers
    /// nothing.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> ReceiveOutcome {
        match Frame::classify(chunk) {
            Frame::Data(data) => {
                self.receiving = true;
                self.buffer.extend_from_slice(data);
                debug!(
                    "received {} bytes: {:?}",
                    data.len(),
                    String::from_utf8_lossy(data)
                );
                ReceiveOutcome::Accumulated {
                    total: self.buffer.len(),
                }
            }
            Frame::Eom if !self.receiving => ReceiveOutcome::Ignored,
            Frame::Eom => {
                self.receiving = false;
                let bytes = std::mem::take(&mut self.buffer);
                match String::from_utf8(bytes) {
                    Ok(text) => ReceiveOutcome::Completed(text),
                    // The corrupted accumulation has already been taken
                    // out of the buffer, so the next message starts clean.
                    Err(err) => ReceiveOutcome::Failed(DecodeError::InvalidUtf8 {
                        valid_up_to: err.utf8_error().valid_up_to(),
                    }),
                }
            }
        }
    }
}
