//! Peripheral role: service publication, advertising, and the outbound
//! transfer.

mod host;

pub use host::TransferPeripheral;
