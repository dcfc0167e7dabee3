//! Packet-type classification (spec.md §3 "ptype lookup table", §4.1 step 5).
//!
//! Hardware reports an 8-bit PTYPE per writeback descriptor; its meaning is
//! firmware-defined. The driver owns a 256-entry table translating that raw
//! value into the canonical [`PacketType`] bits the rest of the stack reads,
//! rebuilt once at queue start the same way DPDK rebuilds `i40e_get_default_pkt_type`.

use crate::mempool::PacketType;

/// Canonical layer bits, OR'd together to build a [`PacketType`].
pub mod layer {
    pub const L2_ETHER: u32 = 1 << 0;
    pub const L2_ETHER_VLAN: u32 = 1 << 1;
    pub const L2_ETHER_QINQ: u32 = 1 << 2;
    pub const L3_IPV4: u32 = 1 << 4;
    pub const L3_IPV4_EXT: u32 = 1 << 5;
    pub const L3_IPV6: u32 = 1 << 6;
    pub const L3_IPV6_EXT: u32 = 1 << 7;
    pub const L4_TCP: u32 = 1 << 8;
    pub const L4_UDP: u32 = 1 << 9;
    pub const L4_SCTP: u32 = 1 << 10;
    pub const L4_ICMP: u32 = 1 << 11;
    pub const L4_FRAG: u32 = 1 << 12;
    pub const TUNNEL_GRENAT: u32 = 1 << 16;
    pub const INNER_L2_ETHER: u32 = 1 << 20;
    pub const INNER_L3_IPV4: u32 = 1 << 21;
    pub const INNER_L3_IPV6: u32 = 1 << 22;
    pub const INNER_L4_TCP: u32 = 1 << 23;
    pub const INNER_L4_UDP: u32 = 1 << 24;
}

const TABLE_LEN: usize = 256;

/// Owns the 256-entry raw-PTYPE → [`PacketType`] table for one device.
pub struct PtypeTable {
    entries: [PacketType; TABLE_LEN],
}

impl PtypeTable {
    /// Builds the default table. The raw PTYPE encoding groups values by L3
    /// family in the low nibble and L4 protocol in the next, which is all
    /// this core needs to distinguish; it does not attempt byte-for-byte
    /// parity with any particular firmware's internal table, only the
    /// resulting classification behavior spec.md §4.1 depends on.
    pub fn new_default() -> Self {
        let mut entries = [PacketType(layer::L2_ETHER); TABLE_LEN];
        for (raw, slot) in entries.iter_mut().enumerate() {
            let l3 = raw & 0x3;
            let l4 = (raw >> 2) & 0x7;
            let tunneled = raw & 0x40 != 0;

            let mut bits = layer::L2_ETHER;
            let l3_bits = match l3 {
                1 => layer::L3_IPV4,
                2 => layer::L3_IPV4_EXT,
                3 => layer::L3_IPV6,
                _ => 0,
            };
            bits |= l3_bits;

            let l4_bits = match l4 {
                1 => layer::L4_TCP,
                2 => layer::L4_UDP,
                3 => layer::L4_SCTP,
                4 => layer::L4_ICMP,
                5 => layer::L4_FRAG,
                _ => 0,
            };
            bits |= l4_bits;

            if tunneled && l3_bits != 0 {
                bits |= layer::TUNNEL_GRENAT;
                bits |= match l3 {
                    1 | 2 => layer::INNER_L3_IPV4,
                    3 => layer::INNER_L3_IPV6,
                    _ => 0,
                };
                bits |= layer::INNER_L2_ETHER;
                bits |= match l4 {
                    1 => layer::INNER_L4_TCP,
                    2 => layer::INNER_L4_UDP,
                    _ => 0,
                };
            }

            *slot = PacketType(bits);
        }
        PtypeTable { entries }
    }

    #[inline]
    pub fn lookup(&self, raw_ptype: u8) -> PacketType {
        self.entries[raw_ptype as usize]
    }
}

impl Default for PtypeTable {
    fn default() -> Self {
        Self::new_default()
    }
}
