//! Central role: connection management, discovery, and message
//! reassembly.

mod link;

pub use link::{LinkPhase, TransferCentral};
