//! In-memory fakes for the external traits, used only by this crate's own
//! tests (spec.md §8 "Testable Properties").

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::external::{DmaZone, TailRegister, VsiMap};
use crate::mempool::{Mbuf, Mempool, OlFlags, PacketType, PktHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestMbuf {
    pub id: u32,
    data_off: u16,
    data_len: u16,
    pkt_len: u32,
    nb_segs: u16,
    next: Option<u32>,
    port: u16,
    ol_flags: OlFlags,
    packet_type: PacketType,
    vlan_tci: u16,
    vlan_tci_outer: u16,
    tso_segsz: u16,
    hash: PktHash,
}

impl TestMbuf {
    pub fn new(id: u32) -> Self {
        TestMbuf {
            id,
            data_off: Self::HEADROOM,
            nb_segs: 1,
            ..Default::default()
        }
    }

    pub fn set_tso_segsz(&mut self, segsz: u16) {
        self.tso_segsz = segsz;
    }

    pub fn hash(self) -> PktHash {
        self.hash
    }
}

impl Mbuf for TestMbuf {
    const HEADROOM: u16 = 128;

    fn data_off(self) -> u16 {
        self.data_off
    }
    fn set_data_off(&mut self, off: u16) {
        self.data_off = off;
    }

    fn data_len(self) -> u16 {
        self.data_len
    }
    fn set_data_len(&mut self, len: u16) {
        self.data_len = len;
    }

    fn pkt_len(self) -> u32 {
        self.pkt_len
    }
    fn set_pkt_len(&mut self, len: u32) {
        self.pkt_len = len;
    }

    fn nb_segs(self) -> u16 {
        self.nb_segs
    }
    fn set_nb_segs(&mut self, n: u16) {
        self.nb_segs = n;
    }

    // Reconstructs a fresh placeholder rather than dereferencing shared
    // storage; fine for tests that only assert on chain length and ids, not
    // on a segment's own content once linked.
    fn next(self) -> Option<Self> {
        self.next.map(TestMbuf::new)
    }
    fn set_next(&mut self, next: Option<Self>) {
        self.next = next.map(|b| b.id);
    }

    fn port(self) -> u16 {
        self.port
    }
    fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    fn ol_flags(self) -> OlFlags {
        self.ol_flags
    }
    fn set_ol_flags(&mut self, flags: OlFlags) {
        self.ol_flags = flags;
    }

    fn packet_type(self) -> PacketType {
        self.packet_type
    }
    fn set_packet_type(&mut self, pt: PacketType) {
        self.packet_type = pt;
    }

    fn set_hash(&mut self, hash: PktHash) {
        match hash {
            PktHash::None => {}
            PktHash::Rss(_) => self.ol_flags.insert(OlFlags::RSS_HASH),
            PktHash::Fdir { .. } => self.ol_flags.insert(OlFlags::FDIR),
        }
        self.hash = hash;
    }

    fn vlan_tci(self) -> u16 {
        self.vlan_tci
    }
    fn set_vlan_tci(&mut self, tci: u16) {
        self.vlan_tci = tci;
    }

    fn vlan_tci_outer(self) -> u16 {
        self.vlan_tci_outer
    }
    fn set_vlan_tci_outer(&mut self, tci: u16) {
        self.vlan_tci_outer = tci;
    }

    fn l2_len(self) -> u16 {
        14
    }
    fn l3_len(self) -> u16 {
        20
    }
    fn l4_len(self) -> u16 {
        20
    }
    fn outer_l2_len(self) -> u16 {
        0
    }
    fn outer_l3_len(self) -> u16 {
        0
    }
    fn tso_segsz(self) -> u16 {
        self.tso_segsz
    }

    fn data_dma_addr(self) -> u64 {
        0x1000_0000 + (self.id as u64) * 4096 + self.data_off as u64
    }
}

/// A flat byte buffer standing in for DMA-coherent memory.
pub struct FakeDmaZone {
    bytes: Vec<u8>,
    phys_base: u64,
}

impl FakeDmaZone {
    pub fn new(size: usize, phys_base: u64) -> Self {
        FakeDmaZone {
            bytes: alloc::vec![0u8; size],
            phys_base,
        }
    }
}

impl DmaZone for FakeDmaZone {
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    fn phys_addr(&self) -> u64 {
        self.phys_base
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Default)]
pub struct FakeTailRegister {
    pub last_written: Option<u32>,
    pub write_count: u32,
}

impl TailRegister for FakeTailRegister {
    fn write(&mut self, value: u32) {
        self.last_written = Some(value);
        self.write_count += 1;
    }
}

/// Bulk-get is configurable to fail on demand so tests can exercise the
/// bulk-alloc rollback path (spec.md §4.2 step 6).
pub struct FakeMempool {
    free: VecDeque<TestMbuf>,
    next_id: u32,
}

impl FakeMempool {
    pub fn new(capacity: u32) -> Self {
        let mut free = VecDeque::new();
        for id in 0..capacity {
            free.push_back(TestMbuf::new(id));
        }
        FakeMempool {
            free,
            next_id: capacity,
        }
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Mempool for FakeMempool {
    type Buf = TestMbuf;

    fn get(&mut self) -> Option<Self::Buf> {
        self.free.pop_front()
    }

    fn get_bulk(&mut self, n: usize, out: &mut Vec<Self::Buf>) -> bool {
        if self.free.len() < n {
            return false;
        }
        for _ in 0..n {
            out.push(self.free.pop_front().expect("checked length above"));
        }
        true
    }

    fn put(&mut self, mut buf: Self::Buf) {
        buf.reset_for_rx();
        self.free.push_back(buf);
    }
}

#[allow(dead_code)]
impl FakeMempool {
    pub fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub struct FakeVsiMap;

impl VsiMap for FakeVsiMap {
    fn lookup(&self, _port: u16, queue_id: u16) -> Option<(u16, u16)> {
        Some((0, queue_id))
    }
}
