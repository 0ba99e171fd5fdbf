//! Runtime configuration shared by both roles.
//!
//! Service identity, chunk size, and the optional proximity filter are
//! injected at construction time instead of being read from scattered
//! literals.

use uuid::Uuid;

use super::constants::{NOTIFY_MTU, TRANSFER_CHARACTERISTIC_UUID, TRANSFER_SERVICE_UUID};

/// Configuration for the central and peripheral roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// UUID of the transfer service to advertise and scan for.
    pub service_uuid: Uuid,

    /// UUID of the transfer characteristic within the service.
    pub characteristic_uuid: Uuid,

    /// Maximum bytes per notification chunk.
    ///
    /// Must stay larger than the terminator marker for the two to remain
    /// distinguishable on the wire.
    pub mtu: usize,

    /// Discard discoveries weaker than this RSSI, in dBm.
    ///
    /// `None` accepts any signal strength.
    pub min_rssi: Option<i16>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            service_uuid: TRANSFER_SERVICE_UUID,
            characteristic_uuid: TRANSFER_CHARACTERISTIC_UUID,
            mtu: NOTIFY_MTU,
            min_rssi: None,
        }
    }
}

impl TransferConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service UUID.
    pub fn with_service_uuid(mut self, uuid: Uuid) -> Self {
        self.service_uuid = uuid;
        self
    }

    /// Set the characteristic UUID.
    pub fn with_characteristic_uuid(mut self, uuid: Uuid) -> Self {
        self.characteristic_uuid = uuid;
        self
    }

    /// Set the per-notification chunk size.
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Require a minimum advertisement signal strength, in dBm.
    pub fn with_min_rssi(mut self, rssi: i16) -> Self {
        self.min_rssi = Some(rssi);
        self
    }
}
