//! Frame codec: MTU-bounded chunking and terminator classification.
//!
//! A transfer on the wire is the payload split into MTU-sized notification
//! chunks in ascending offset order, followed by the 3-byte `"EOM"`
//! terminator. Chunks carry no header; the terminator is recognized by
//! content equality. That scheme is only sound while the marker stays
//! shorter than the MTU, which keeps it distinguishable from every
//! full-size data chunk; the final short chunk of a message could in
//! principle collide with it, a caveat inherited from the wire format.

use crate::core::constants::EOM;

/// One received notification, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// An ordinary data chunk to append to the receive buffer.
    Data(&'a [u8]),
    /// The end-of-message terminator.
    Eom,
}

impl<'a> Frame<'a> {
    /// Classify a received chunk.
    pub fn classify(chunk: &'a [u8]) -> Self {
        if is_eom(chunk) {
            Frame::Eom
        } else {
            Frame::Data(chunk)
        }
    }
}

/// Whether `chunk` is the end-of-message terminator.
pub fn is_eom(chunk: &[u8]) -> bool {
    chunk == EOM
}

/// The ascending `(offset, len)` spans a payload of `len` bytes splits
/// into at chunk size `mtu`.
///
/// Every span is `mtu` bytes except possibly the last. A zero-length
/// payload has no spans; its transfer is just the terminator.
pub fn chunk_spans(len: usize, mtu: usize) -> impl Iterator<Item = (usize, usize)> {
    assert!(mtu > 0, "chunk size must be non-zero");
    (0..len).step_by(mtu).map(move |offset| (offset, mtu.min(len - offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_terminator() {
        assert_eq!(Frame::classify(b"EOM"), Frame::Eom);
        assert!(is_eom(b"EOM"));
    }

    #[test]
    fn test_classify_data() {
        assert_eq!(Frame::classify(b"hello"), Frame::Data(b"hello"));
        // Prefix or superstring of the marker is still data.
        assert_eq!(Frame::classify(b"EO"), Frame::Data(b"EO"));
        assert_eq!(Frame::classify(b"EOM!"), Frame::Data(b"EOM!"));
        assert_eq!(Frame::classify(b""), Frame::Data(b""));
    }

    #[test]
    fn test_spans_with_remainder() {
        // 45 bytes at MTU 20 split 20 / 20 / 5.
        let spans: Vec<_> = chunk_spans(45, 20).collect();
        assert_eq!(spans, vec![(0, 20), (20, 20), (40, 5)]);
    }

    #[test]
    fn test_spans_exact_multiple() {
        let spans: Vec<_> = chunk_spans(40, 20).collect();
        assert_eq!(spans, vec![(0, 20), (20, 20)]);
    }

    #[test]
    fn test_spans_short_payload() {
        let spans: Vec<_> = chunk_spans(7, 20).collect();
        assert_eq!(spans, vec![(0, 7)]);
    }

    #[test]
    fn test_spans_empty_payload() {
        assert_eq!(chunk_spans(0, 20).count(), 0);
    }
}
