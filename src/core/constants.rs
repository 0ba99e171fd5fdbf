//! Protocol constants for the transfer service.
//!
//! These feed the [`TransferConfig`](super::config::TransferConfig)
//! defaults; runtime code reads them through the injected config rather
//! than from here.

use uuid::Uuid;

// =============================================================================
// FRAMING
// =============================================================================

/// Maximum chunk size per notification, in bytes.
///
/// Matches the notification payload the platform guarantees to every
/// subscribed central without MTU negotiation.
pub const NOTIFY_MTU: usize = 20;

/// End-of-message terminator marker, sent as the final notification of
/// every transfer.
///
/// Detection is by content equality, so the marker must stay shorter than
/// the MTU: a full-size data chunk can then never compare equal to it.
pub const EOM: &[u8] = b"EOM";

// =============================================================================
// SERVICE IDENTITY
// =============================================================================

/// 128-bit UUID of the transfer service.
pub const TRANSFER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0xE20A_39F4_73F5_4BC4_A12F_17D1_AD07_A961);

/// 128-bit UUID of the transfer characteristic (notify-only).
pub const TRANSFER_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0859_0F7E_DB05_467E_8757_72F6_FAEB_13D4);
