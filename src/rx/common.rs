//! Descriptor-parse primitives shared by all three Rx paths (spec.md §4.1
//! step 4, §4.3).

use crate::descriptor::{rx_qw1, RxWriteback};
use crate::mempool::{Mbuf, OlFlags, PktHash};
use crate::ptype::PtypeTable;

/// Derives the checksum/VLAN/hash offload flags and canonical packet type
/// from one writeback descriptor, and applies them (plus length bookkeeping)
/// to `buf`. Shared verbatim by the single-buffer and bulk-alloc paths,
/// where every descriptor is its own whole packet. The scattered path
/// (spec.md §4.3) instead sets each segment's `data_len` on its own and
/// calls [`apply_packet_metadata`] on the chain head once, at EOF.
pub fn finalize_mbuf<B: Mbuf>(buf: &mut B, wb: &RxWriteback, ptype_table: &PtypeTable, data_len: u16) {
    buf.set_data_len(data_len);
    buf.set_pkt_len(data_len as u32);
    apply_packet_metadata(buf, wb, ptype_table);
}

/// Packet-level half of [`finalize_mbuf`]: packet type, VLAN, checksum and
/// hash flags, none of which make sense on an interior scattered segment
/// (spec.md §4.3 "only the first segment carries packet-level metadata").
pub fn apply_packet_metadata<B: Mbuf>(buf: &mut B, wb: &RxWriteback, ptype_table: &PtypeTable) {
    buf.set_packet_type(ptype_table.lookup(wb.ptype));

    let mut flags = OlFlags::empty();

    if wb.status.contains(crate::descriptor::RxStatus::L2TAG1P) {
        flags.insert(OlFlags::VLAN_STRIPPED);
        buf.set_vlan_tci(wb.l2tag1);
    }

    let low6 = (wb.error_bits as u64) & rx_qw1::ERROR_LOW6_MASK;
    if low6 == 0 {
        flags.insert(OlFlags::IP_CKSUM_GOOD);
        flags.insert(OlFlags::L4_CKSUM_GOOD);
    } else {
        let ipe = low6 & (1 << rx_qw1::ERROR_IPE_SHIFT) != 0;
        let eipe = low6 & (1 << rx_qw1::ERROR_EIPE_SHIFT) != 0;
        let l4e = low6 & (1 << rx_qw1::ERROR_L4E_SHIFT) != 0;
        if ipe || eipe {
            flags.insert(OlFlags::IP_CKSUM_BAD);
        } else {
            flags.insert(OlFlags::IP_CKSUM_GOOD);
        }
        if l4e {
            flags.insert(OlFlags::L4_CKSUM_BAD);
        } else {
            flags.insert(OlFlags::L4_CKSUM_GOOD);
        }
        if eipe {
            flags.insert(OlFlags::OUTER_IP_CKSUM_BAD);
        }
    }

    if let Some(hash) = wb.rss_hash {
        flags.insert(OlFlags::RSS_HASH);
        buf.set_hash(PktHash::Rss(hash));
    } else if let Some((hi, lo)) = wb.fdir_id {
        flags.insert(OlFlags::FDIR);
        buf.set_hash(PktHash::Fdir { hi, lo });
    }

    buf.set_ol_flags(flags);
}
