//! # gatt-transfer
//!
//! Chunked text transfer over a single BLE GATT notify characteristic,
//! implemented as a pair of role state machines:
//!
//! - **Peripheral** (advertiser/sender): splits an arbitrary-length payload
//!   into MTU-sized notification chunks, streams them under the transport's
//!   flow-control signal, and closes the message with the 3-byte `"EOM"`
//!   terminator.
//! - **Central** (scanner/receiver): scans for the transfer service,
//!   connects, discovers the characteristic, subscribes, reassembles the
//!   incoming chunks, then unsubscribes, disconnects, and scans again.
//!
//! The platform BLE stack is an external collaborator. The crate never
//! talks to real hardware: requests go out through the [`CentralRadio`] and
//! [`PeripheralRadio`] traits, and the platform's delegate callbacks map
//! one-to-one onto event methods of [`TransferCentral`] and
//! [`TransferPeripheral`]. All callbacks are assumed to arrive serially on
//! one logical execution context, so the crate contains no locking.
//!
//! ## Feature flags
//!
//! - `central` (default): the scanner/receiver role
//! - `peripheral` (default): the advertiser/sender role
//! - `loopback` (default): an in-memory radio pair wiring both roles
//!   back-to-back, for tests and demos
//!
//! ## Example
//!
//! ```rust
//! use gatt_transfer::TransferConfig;
//! use gatt_transfer::loopback::LoopbackHarness;
//!
//! let mut link = LoopbackHarness::new(TransferConfig::default());
//! link.power_on();
//!
//! let received = link.transfer("Hello over the air");
//! assert_eq!(received.as_deref(), Some("Hello over the air"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core types (always included)
pub mod core;

// Frame codec (always included)
pub mod frame;

// Transfer state machines (role submodules are feature-gated)
pub mod transfer;

// Central role (feature-gated)
#[cfg(feature = "central")]
#[cfg_attr(docsrs, doc(cfg(feature = "central")))]
pub mod central;

// Peripheral role (feature-gated)
#[cfg(feature = "peripheral")]
#[cfg_attr(docsrs, doc(cfg(feature = "peripheral")))]
pub mod peripheral;

// In-memory radio pair (feature-gated)
#[cfg(feature = "loopback")]
#[cfg_attr(docsrs, doc(cfg(feature = "loopback")))]
pub mod loopback;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::frame::{Frame, is_eom};
    pub use crate::transfer::*;

    #[cfg(feature = "central")]
    pub use crate::central::{LinkPhase, TransferCentral};

    #[cfg(feature = "peripheral")]
    pub use crate::peripheral::TransferPeripheral;
}

// Re-export commonly used items at crate root
pub use crate::core::config::TransferConfig;
pub use crate::core::constants::{
    EOM, NOTIFY_MTU, TRANSFER_CHARACTERISTIC_UUID, TRANSFER_SERVICE_UUID,
};
pub use crate::core::error::{DecodeError, TransferError, TransportError};
pub use crate::core::traits::{
    CentralRadio, CharacteristicHandle, CharacteristicInfo, DeviceId, PeripheralRadio,
    ServiceHandle,
};

#[cfg(feature = "central")]
pub use crate::central::{LinkPhase, TransferCentral};

#[cfg(feature = "peripheral")]
pub use crate::peripheral::TransferPeripheral;
