//! Tx preflight validation (spec.md §4.6).
//!
//! Applications are expected to call this before `tx_burst` when they use
//! any offload flag; it never touches hardware, only checks that what the
//! application is asking for is representable in the descriptor formats.

use crate::error::{OffloadErrno, PrepareError};
use crate::mempool::{Mbuf, OlFlags};

/// Valid `tso_segsz` range (spec.md §4.6): outside this window the segment
/// size either collapses to nothing useful or no longer fits the MTUs the
/// reference driver is qualified against, regardless of what the 14-bit MSS
/// field in the Tx context descriptor could otherwise represent.
pub const MIN_TSO_SEGSZ: u16 = 256;
pub const MAX_TSO_SEGSZ: u16 = 9674;
pub const MAX_SEGS: u16 = 8;

/// Validates `pkts[..]` in order, stopping at the first rejected packet.
/// Returns the number of packets that passed (a prefix of `pkts`, possibly
/// all of them), or the index and reason of the first failure.
///
/// The rejected packet's errno is also recorded in
/// [`OffloadErrno::as_negated_raw`] form to preserve the reference driver's
/// documented (if surprising) negated-errno convention; see spec.md §9.
pub fn tx_prepare<B: Mbuf>(pkts: &[B]) -> Result<usize, PrepareError> {
    for (index, pkt) in pkts.iter().enumerate() {
        if let Err(errno) = validate_one(*pkt) {
            return Err(PrepareError { index, errno });
        }
    }
    Ok(pkts.len())
}

fn validate_one<B: Mbuf>(pkt: B) -> Result<(), OffloadErrno> {
    let flags = pkt.ol_flags();

    if !flags.difference(OlFlags::SUPPORTED_TX_MASK).is_empty() {
        return Err(OffloadErrno::Enotsup);
    }

    if pkt.nb_segs() == 0 || pkt.nb_segs() > MAX_SEGS {
        return Err(OffloadErrno::Einval);
    }

    if flags.contains(OlFlags::TX_TCP_SEG) {
        if pkt.tso_segsz() < MIN_TSO_SEGSZ || pkt.tso_segsz() > MAX_TSO_SEGSZ {
            return Err(OffloadErrno::Einval);
        }
        if pkt.l2_len() == 0 || pkt.l3_len() == 0 {
            return Err(OffloadErrno::Einval);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestMbuf;

    #[test]
    fn accepts_plain_packet() {
        let pkt = TestMbuf::new(0);
        assert_eq!(tx_prepare(&[pkt]).unwrap(), 1);
    }

    #[test]
    fn rejects_unsupported_offload_flag() {
        let mut pkt = TestMbuf::new(0);
        pkt.set_ol_flags(OlFlags::from_bits_retain(1 << 40));
        let err = tx_prepare(&[pkt]).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.errno, OffloadErrno::Enotsup);
        assert_eq!(err.errno.as_negated_raw(), -95);
    }

    #[test]
    fn rejects_tso_without_mss() {
        let mut pkt = TestMbuf::new(0);
        pkt.set_ol_flags(OlFlags::TX_TCP_SEG);
        let err = tx_prepare(&[pkt]).unwrap_err();
        assert_eq!(err.errno, OffloadErrno::Einval);
        assert_eq!(err.errno.as_negated_raw(), -22);
    }

    #[test]
    fn rejects_tso_segsz_below_the_minimum() {
        let mut pkt = TestMbuf::new(0);
        pkt.set_ol_flags(OlFlags::TX_TCP_SEG);
        pkt.set_tso_segsz(64);
        let err = tx_prepare(&[pkt]).unwrap_err();
        assert_eq!(err.errno, OffloadErrno::Einval);
    }

    #[test]
    fn stops_at_first_bad_packet_in_a_batch() {
        let good = TestMbuf::new(0);
        let mut bad = TestMbuf::new(1);
        bad.set_nb_segs(0);
        let err = tx_prepare(&[good, bad, good]).unwrap_err();
        assert_eq!(err.index, 1);
    }
}
