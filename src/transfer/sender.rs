//! Sender-side transfer state machine (peripheral role).
//!
//! Drives outbound chunk emission under the transport's flow-control
//! signal. The machine never attempts chunk N+1 before the transport has
//! accepted chunk N, which is what guarantees in-order delivery. A refused
//! write parks the machine in a blocked state; the readiness callback
//! clears it and re-runs the whole remaining emission loop, so the
//! level-triggered platform signal is consumed as if it were
//! edge-triggered.

use tracing::debug;

use super::session::TransferSession;
use crate::core::constants::EOM;
use crate::core::traits::{CharacteristicHandle, PeripheralRadio};

/// Lifecycle of one outbound transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderPhase {
    /// No subscriber; nothing to send.
    Idle,
    /// Streaming data chunks.
    Sending,
    /// All payload bytes accepted; the terminator is outstanding.
    AwaitingEomAck,
    /// Terminator accepted; terminal until the next subscribe.
    Done,
}

/// Sender state machine for the transfer characteristic.
#[derive(Debug)]
pub struct TransferSender {
    phase: SenderPhase,
    /// Set when the transport refused the last write; cleared by the
    /// readiness signal. While set, the pending retry is a data chunk in
    /// `Sending` and the terminator in `AwaitingEomAck`.
    blocked: bool,
    session: Option<TransferSession>,
    mtu: usize,
}

impl TransferSender {
    /// Create an idle sender with the given chunk size.
    pub fn new(mtu: usize) -> Self {
        Self {
            phase: SenderPhase::Idle,
            blocked: false,
            session: None,
            mtu,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SenderPhase {
        self.phase
    }

    /// Whether the machine is parked waiting for the readiness signal.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Start a transfer of `payload`: a subscriber has attached.
    ///
    /// Any previous session is discarded and emission begins immediately,
    /// continuing until the transport refuses a write or the transfer
    /// completes.
    pub fn start<R: PeripheralRadio>(
        &mut self,
        radio: &mut R,
        characteristic: CharacteristicHandle,
        payload: Vec<u8>,
    ) {
        debug!("starting transfer of {} bytes", payload.len());
        self.session = Some(TransferSession::new(payload, self.mtu));
        self.phase = SenderPhase::Sending;
        self.blocked = false;
        self.pump(radio, characteristic);
    }

    /// Readiness callback from the transport: resume from the refused
    /// write.
    ///
    /// Safe to call at any time; when nothing is pending this is a no-op.
    pub fn on_ready_to_send<R: PeripheralRadio>(
        &mut self,
        radio: &mut R,
        characteristic: CharacteristicHandle,
    ) {
        self.blocked = false;
        self.pump(radio, characteristic);
    }

    /// Emit chunks until the transport refuses one or the transfer
    /// completes.
    fn pump<R: PeripheralRadio>(&mut self, radio: &mut R, characteristic: CharacteristicHandle) {
        if matches!(self.phase, SenderPhase::Idle | SenderPhase::Done) {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        // Data chunks first. The cursor only moves once a write is
        // accepted, so a refusal leaves the same chunk queued for the
        // readiness retry.
        loop {
            let accepted_len = {
                let Some(chunk) = session.next_chunk() else {
                    break;
                };
                if !radio.write_notify(characteristic, chunk) {
                    self.blocked = true;
                    return;
                }
                debug!("sent {} bytes: {:?}", chunk.len(), String::from_utf8_lossy(chunk));
                chunk.len()
            };
            session.confirm(accepted_len);
        }

        self.phase = SenderPhase::AwaitingEomAck;
        if session.eom_pending() {
            if !radio.write_notify(characteristic, EOM) {
                self.blocked = true;
                return;
            }
            session.confirm_eom();
            debug!("sent EOM");
        }
        self.phase = SenderPhase::Done;
    }
}
