//! Interfaces to the platform BLE stack.
//!
//! The GATT transport is an external collaborator: the state machines in
//! this crate issue requests through these traits and receive the
//! platform's delegate callbacks as explicit event methods on the role
//! types. All requests are fire-and-forget; results arrive later as
//! callbacks on the same single-threaded execution context.
//!
//! Devices, services, and characteristics are addressed by opaque handles
//! issued by the platform, checked for existence explicitly instead of
//! being chased through nested optional references.

use std::fmt;

use uuid::Uuid;

/// Opaque identity of a remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Wrap a raw platform identity.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw platform identity.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Opaque handle of a discovered service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(u32);

impl ServiceHandle {
    /// Wrap a raw platform handle.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw platform handle.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque handle of a discovered or published characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(u32);

impl CharacteristicHandle {
    /// Wrap a raw platform handle.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw platform handle.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// One characteristic reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    /// Platform handle for follow-up requests.
    pub handle: CharacteristicHandle,
    /// The characteristic's 128-bit UUID.
    pub uuid: Uuid,
}

/// Requests a central issues to the platform stack.
pub trait CentralRadio {
    /// Scan for devices advertising `service`.
    ///
    /// With `allow_duplicates`, repeated advertisements from the same
    /// device keep producing discovery callbacks instead of being
    /// coalesced.
    fn start_scan(&mut self, service: Uuid, allow_duplicates: bool);

    /// Stop an active scan.
    fn stop_scan(&mut self);

    /// Initiate a connection to `device`.
    fn connect(&mut self, device: DeviceId);

    /// Tear down the connection to `device`.
    fn disconnect(&mut self, device: DeviceId);

    /// Discover services on `device`, filtered to `service`.
    fn discover_services(&mut self, device: DeviceId, service: Uuid);

    /// Discover characteristics of `service`, filtered to `characteristic`.
    fn discover_characteristics(
        &mut self,
        device: DeviceId,
        service: ServiceHandle,
        characteristic: Uuid,
    );

    /// Request a notification subscription change on `characteristic`.
    fn set_notify(&mut self, device: DeviceId, characteristic: CharacteristicHandle, enabled: bool);
}

/// Requests a peripheral issues to the platform stack.
pub trait PeripheralRadio {
    /// Publish the transfer service with its single notify characteristic
    /// and return the handle of the published characteristic.
    fn publish_service(&mut self, service: Uuid, characteristic: Uuid) -> CharacteristicHandle;

    /// Start advertising `service`.
    fn start_advertising(&mut self, service: Uuid);

    /// Stop advertising.
    fn stop_advertising(&mut self);

    /// Push one notification to subscribed centrals.
    ///
    /// Returns `false` when the platform's outbound queue cannot accept
    /// the write right now (backpressure). The caller must hold the same
    /// bytes and retry after the readiness callback; the refusal is not an
    /// error.
    fn write_notify(&mut self, characteristic: CharacteristicHandle, value: &[u8]) -> bool;
}
