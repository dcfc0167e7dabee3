//! The mbuf attribute surface and the mempool adapter (spec.md §2 items 4,
//! §3 "Packet buffer (mbuf)"). The core never allocates, frees, or inspects
//! payload; it only reads/writes the fields listed in the data model
//! through this trait.

use alloc::vec::Vec;
use bitflags::bitflags;

bitflags! {
    /// Offload flag set (`ol_flags`). Only the bits the Rx/Tx engines
    /// actually branch on are modeled; unrelated application-facing flags
    /// are out of scope for the core.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OlFlags: u64 {
        const RSS_HASH           = 1 << 0;
        const FDIR               = 1 << 1;
        const IP_CKSUM_GOOD       = 1 << 2;
        const IP_CKSUM_BAD        = 1 << 3;
        const L4_CKSUM_GOOD       = 1 << 4;
        const L4_CKSUM_BAD        = 1 << 5;
        const OUTER_IP_CKSUM_BAD  = 1 << 6;
        const VLAN_STRIPPED       = 1 << 7;
        const QINQ_STRIPPED       = 1 << 8;

        // Tx-side requests set by the application before calling tx_burst.
        const TX_VLAN             = 1 << 16;
        const TX_QINQ             = 1 << 17;
        const TX_IP_CKSUM         = 1 << 18;
        const TX_TCP_CKSUM        = 1 << 19;
        const TX_UDP_CKSUM        = 1 << 20;
        const TX_SCTP_CKSUM       = 1 << 21;
        const TX_TCP_SEG          = 1 << 22; // TSO
        const TX_OUTER_IP_CKSUM   = 1 << 23;
        const TX_IEEE1588_TMST    = 1 << 24;
        const TX_TUNNEL_VXLAN     = 1 << 25;
        const TX_TUNNEL_GENEVE    = 1 << 26;
        const TX_TUNNEL_GRE       = 1 << 27;
        const TX_TUNNEL_IPIP      = 1 << 28;
    }
}

impl OlFlags {
    const TUNNEL_MASK: Self = Self::TX_TUNNEL_VXLAN
        .union(Self::TX_TUNNEL_GENEVE)
        .union(Self::TX_TUNNEL_GRE)
        .union(Self::TX_TUNNEL_IPIP);

    pub fn is_tunneling(self) -> bool {
        self.intersects(Self::TUNNEL_MASK)
    }

    /// The flags `tx_prepare` / the full-featured Tx path understand.
    /// Anything outside this mask is `Enotsup` (spec.md §4.6).
    pub const SUPPORTED_TX_MASK: Self = Self::TX_VLAN
        .union(Self::TX_QINQ)
        .union(Self::TX_IP_CKSUM)
        .union(Self::TX_TCP_CKSUM)
        .union(Self::TX_UDP_CKSUM)
        .union(Self::TX_SCTP_CKSUM)
        .union(Self::TX_TCP_SEG)
        .union(Self::TX_OUTER_IP_CKSUM)
        .union(Self::TX_IEEE1588_TMST)
        .union(Self::TUNNEL_MASK);
}

/// Canonical packet-type classification produced by the 256-entry lookup
/// table in [`crate::ptype`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketType(pub u32);

impl PacketType {
    pub const UNKNOWN: Self = PacketType(0);
}

/// Hash union: either the RSS hash or the flow-director match, never both
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PktHash {
    #[default]
    None,
    Rss(u32),
    Fdir {
        hi: u32,
        lo: u32,
    },
}

/// The accessed attributes of an opaque packet buffer (spec.md §3).
///
/// A buffer is identified by a small `Copy` handle (typically a pointer
/// newtype over mempool-owned memory); the trait methods are the only way
/// the core ever touches buffer state. Segment chaining (`next`) is
/// handle-based, not reference-based, matching the rest of the core's
/// index/handle discipline (spec.md §9 "cyclic next_id/last_id references").
pub trait Mbuf: Copy + Eq {
    /// Headroom reserved ahead of the data area; written by the mempool on
    /// allocation and restored by bulk-replenish (spec.md §4.2 step 5).
    const HEADROOM: u16;

    fn data_off(self) -> u16;
    fn set_data_off(&mut self, off: u16);

    fn data_len(self) -> u16;
    fn set_data_len(&mut self, len: u16);

    fn pkt_len(self) -> u32;
    fn set_pkt_len(&mut self, len: u32);

    fn nb_segs(self) -> u16;
    fn set_nb_segs(&mut self, n: u16);

    fn next(self) -> Option<Self>;
    fn set_next(&mut self, next: Option<Self>);

    fn port(self) -> u16;
    fn set_port(&mut self, port: u16);

    fn ol_flags(self) -> OlFlags;
    fn set_ol_flags(&mut self, flags: OlFlags);

    fn packet_type(self) -> PacketType;
    fn set_packet_type(&mut self, pt: PacketType);

    fn set_hash(&mut self, hash: PktHash);

    fn vlan_tci(self) -> u16;
    fn set_vlan_tci(&mut self, tci: u16);

    fn vlan_tci_outer(self) -> u16;
    fn set_vlan_tci_outer(&mut self, tci: u16);

    fn l2_len(self) -> u16;
    fn l3_len(self) -> u16;
    fn l4_len(self) -> u16;
    fn outer_l2_len(self) -> u16;
    fn outer_l3_len(self) -> u16;
    fn tso_segsz(self) -> u16;

    /// DMA address of the buffer's data area, i.e. the base address plus
    /// `data_off`. The mempool/allocator owns the actual mapping; the core
    /// only ever writes this value into a descriptor's address field.
    fn data_dma_addr(self) -> u64;

    /// Reinitializes a freshly allocated buffer to the single-segment
    /// default state bulk-replenish expects (spec.md §4.2 step 5):
    /// `nb_segs = 1`, `data_off = HEADROOM`, `next = None`.
    fn reset_for_rx(&mut self) {
        self.set_data_off(Self::HEADROOM);
        self.set_nb_segs(1);
        self.set_next(None);
    }
}

/// Bulk-get/put adapter over an opaque mempool (spec.md §2 item 4).
///
/// `get_bulk` is all-or-nothing: DPDK's `rte_mempool_get_bulk` either fills
/// every requested slot or fails outright, never partially, which is what
/// lets the bulk-alloc Rx path roll back cleanly on failure (spec.md §4.2
/// step 6).
pub trait Mempool {
    type Buf: Mbuf;

    /// Acquire one buffer, or `None` if the pool is exhausted.
    fn get(&mut self) -> Option<Self::Buf>;

    /// Acquire `n` buffers, appending them to `out`, or leave `out`
    /// untouched and return `false` if fewer than `n` are available.
    fn get_bulk(&mut self, n: usize, out: &mut Vec<Self::Buf>) -> bool;

    /// Return one buffer to the pool (refcount decrement in DPDK terms).
    fn put(&mut self, buf: Self::Buf);

    /// Return many buffers to the pool in one call.
    fn put_bulk(&mut self, bufs: &[Self::Buf]) {
        for &b in bufs {
            self.put(b);
        }
    }
}
