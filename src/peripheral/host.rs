//! Peripheral role driver.
//!
//! Publishes the transfer service once the adapter is ready, gates
//! advertising, stages the outgoing payload, and forwards subscription
//! and readiness events to the sender state machine. A transfer starts
//! when a central subscribes and restarts from the beginning on every
//! new subscription.

use tracing::{debug, info, warn};

use crate::core::config::TransferConfig;
use crate::core::traits::{CharacteristicHandle, PeripheralRadio};
use crate::transfer::sender::{SenderPhase, TransferSender};

/// Peripheral role: advertises the transfer service and streams the
/// staged payload to whoever subscribes.
#[derive(Debug)]
pub struct TransferPeripheral {
    config: TransferConfig,
    sender: TransferSender,
    /// Payload captured by the next subscription.
    outgoing: Vec<u8>,
    /// Handle of the published transfer characteristic, once the adapter
    /// is ready.
    characteristic: Option<CharacteristicHandle>,
    advertising: bool,
}

impl TransferPeripheral {
    /// Create a peripheral with nothing staged and the service not yet
    /// published.
    pub fn new(config: TransferConfig) -> Self {
        let mtu = config.mtu;
        Self {
            config,
            sender: TransferSender::new(mtu),
            outgoing: Vec::new(),
            characteristic: None,
            advertising: false,
        }
    }

    /// Whether the service is currently being advertised.
    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    /// Phase of the underlying sender state machine.
    pub fn sender_phase(&self) -> SenderPhase {
        self.sender.phase()
    }

    /// The adapter became ready: publish the transfer service.
    pub fn on_adapter_ready<R: PeripheralRadio>(&mut self, radio: &mut R) {
        if self.characteristic.is_some() {
            return;
        }
        let handle =
            radio.publish_service(self.config.service_uuid, self.config.characteristic_uuid);
        self.characteristic = Some(handle);
        info!("published transfer service {}", self.config.service_uuid);
    }

    /// Switch advertising on or off.
    pub fn set_advertising<R: PeripheralRadio>(&mut self, radio: &mut R, enabled: bool) {
        if self.characteristic.is_none() {
            warn!("ignoring advertising change, adapter not ready");
            return;
        }
        if enabled == self.advertising {
            return;
        }
        if enabled {
            radio.start_advertising(self.config.service_uuid);
        } else {
            radio.stop_advertising();
        }
        self.advertising = enabled;
        debug!("advertising {}", if enabled { "started" } else { "stopped" });
    }

    /// Stage the payload for the next subscription.
    ///
    /// Changing the payload stops any active advertising, so a stale
    /// message is never offered; advertising has to be switched back on
    /// deliberately.
    pub fn supply_outgoing_payload<R: PeripheralRadio>(&mut self, radio: &mut R, payload: Vec<u8>) {
        self.outgoing = payload;
        if self.advertising {
            radio.stop_advertising();
            self.advertising = false;
            debug!("payload changed, advertising stopped");
        }
    }

    /// A central subscribed to the transfer characteristic: start
    /// streaming the staged payload from the beginning.
    pub fn on_subscribe<R: PeripheralRadio>(&mut self, radio: &mut R) {
        let Some(characteristic) = self.characteristic else {
            warn!("subscribe before service publication, ignoring");
            return;
        };
        info!("central subscribed, sending {} bytes", self.outgoing.len());
        self.sender.start(radio, characteristic, self.outgoing.clone());
    }

    /// The central unsubscribed.
    pub fn on_unsubscribe(&mut self) {
        info!("central unsubscribed");
    }

    /// The transport can accept writes again: resume a blocked transfer.
    pub fn on_ready_to_send<R: PeripheralRadio>(&mut self, radio: &mut R) {
        let Some(characteristic) = self.characteristic else {
            return;
        };
        self.sender.on_ready_to_send(radio, characteristic);
    }
}
