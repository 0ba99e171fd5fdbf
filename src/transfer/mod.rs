//! The transfer layer: outbound session state, the sender state machine,
//! and the receive accumulator.

pub mod session;

#[cfg(feature = "central")]
#[cfg_attr(docsrs, doc(cfg(feature = "central")))]
pub mod receiver;

#[cfg(feature = "peripheral")]
#[cfg_attr(docsrs, doc(cfg(feature = "peripheral")))]
pub mod sender;

pub use session::TransferSession;

#[cfg(feature = "central")]
pub use receiver::{ReceiveOutcome, TransferReceiver};

#[cfg(feature = "peripheral")]
pub use sender::{SenderPhase, TransferSender};
