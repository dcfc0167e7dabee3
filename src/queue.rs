//! Queue lifecycle: setup, start, stop, release (spec.md §4.7).

use log::{debug, info};

use crate::config::{RxQueueConfig, TxQueueConfig};
use crate::descriptor::{RxDesc, TxContextDesc, TxDataDesc};
use crate::error::ConfigError;
use crate::external::{DmaZone, TailRegister, VsiMap};
use crate::mempool::{Mbuf, Mempool};
use crate::ptype::PtypeTable;
use crate::sw_ring::{RxSwRing, TxSwRing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Stopped,
    Started,
}

/// An Rx queue: its configuration, DMA-backed hardware ring, software ring,
/// and the mutable cursor state the Rx engines advance.
pub struct RxQueue<D: DmaZone, B: Mbuf> {
    pub config: RxQueueConfig,
    pub dma: D,
    pub sw_ring: RxSwRing<B>,
    pub ptype_table: PtypeTable,
    pub rx_tail: u16,
    pub nb_rx_hold: u16,
    /// Staged packets already parsed out of the ring but not yet handed to
    /// the caller, drained before scanning for more (spec.md §4.2 step 2).
    pub rx_stage: alloc::vec::Vec<B>,
    /// Index of the next staged packet to hand out.
    pub rx_next_avail: usize,
    /// `rx_tail` value at (or past) which the next bulk refill is due
    /// (spec.md §4.2 step 5).
    pub rx_free_trigger: u16,
    pub state: QueueState,
    pub vsi: Option<(u16, u16)>,
    pub port_id: u16,
    pub queue_id: u16,
    /// Chain heads for the scattered path (spec.md §4.3); `None` outside it.
    pub pkt_first_seg: Option<B>,
    pub pkt_last_seg: Option<B>,
    /// The segment immediately before `pkt_last_seg`, tracked so the EOF
    /// CRC trim (spec.md §4.3) can drop the final segment and shorten its
    /// predecessor without walking the chain from `pkt_first_seg`.
    pub pkt_prev_seg: Option<B>,
}

impl<D: DmaZone, B: Mbuf> RxQueue<D, B> {
    pub fn setup<V: VsiMap>(
        config: RxQueueConfig,
        mut dma: D,
        vsi_map: &V,
        port_id: u16,
        queue_id: u16,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let required_bytes = config.nb_desc as usize * core::mem::size_of::<RxDesc>();
        if dma.len() < required_bytes {
            return Err(ConfigError::DmaAllocFailed(config.nb_desc));
        }
        debug!(
            "rx queue {queue_id}: {} descriptors, {} bytes DMA zone",
            config.nb_desc,
            dma.len()
        );

        let sw_ring = RxSwRing::new(config.nb_desc);
        let vsi = vsi_map.lookup(port_id, queue_id);

        Ok(RxQueue {
            config,
            dma,
            sw_ring,
            ptype_table: PtypeTable::new_default(),
            rx_tail: 0,
            nb_rx_hold: 0,
            rx_stage: alloc::vec::Vec::new(),
            rx_next_avail: 0,
            rx_free_trigger: config.rx_free_thresh.saturating_sub(1),
            state: QueueState::Stopped,
            vsi,
            port_id,
            queue_id,
            pkt_first_seg: None,
            pkt_last_seg: None,
            pkt_prev_seg: None,
        })
    }

    pub fn start(&mut self, tail_reg: &mut impl TailRegister) {
        self.rx_tail = 0;
        self.nb_rx_hold = 0;
        self.rx_stage.clear();
        self.rx_next_avail = 0;
        self.rx_free_trigger = self.config.rx_free_thresh.saturating_sub(1);
        crate::external::write_barrier();
        tail_reg.write(self.config.nb_desc.wrapping_sub(1) as u32);
        self.state = QueueState::Started;
        info!("rx queue {} started", self.queue_id);
    }

    pub fn stop(&mut self, pool: &mut impl Mempool<Buf = B>) {
        for idx in 0..self.sw_ring.len() as u16 {
            if let Some(buf) = self.sw_ring.take(idx) {
                pool.put(buf);
            }
        }
        for buf in self.rx_stage.drain(self.rx_next_avail..) {
            pool.put(buf);
        }
        self.rx_next_avail = 0;
        self.pkt_first_seg = None;
        self.pkt_last_seg = None;
        self.pkt_prev_seg = None;
        self.state = QueueState::Stopped;
        info!("rx queue {} stopped", self.queue_id);
    }

    /// True once hardware has written DD into the descriptor `offset`
    /// positions ahead of the current Rx tail (spec.md §6).
    pub fn rx_descriptor_done(&mut self, offset: u16) -> bool {
        let nb_desc = self.config.nb_desc;
        let idx = (self.rx_tail + offset) % nb_desc;
        let desc = unsafe { &*self.desc_ptr().add(idx as usize) };
        crate::descriptor::RxWriteback::parse(desc.hash_quadword(), desc.status_quadword()).dd()
    }

    /// Number of descriptors hardware has finished writing back, counted
    /// from the current Rx tail up to the first one still owned by
    /// hardware (spec.md §6).
    pub fn rx_queue_count(&mut self) -> usize {
        let nb_desc = self.config.nb_desc as usize;
        let mut count = 0;
        while count < nb_desc && self.rx_descriptor_done(count as u16) {
            count += 1;
        }
        count
    }

    #[inline]
    pub fn desc_ptr(&mut self) -> *mut RxDesc {
        self.dma.as_mut_ptr() as *mut RxDesc
    }
}

/// A Tx queue: its configuration, DMA-backed hardware ring, and the cleanup
/// cursor state (spec.md §4.4.1).
pub struct TxQueue<D: DmaZone, B: Mbuf> {
    pub config: TxQueueConfig,
    pub dma: D,
    pub sw_ring: TxSwRing<B>,
    pub tx_tail: u16,
    pub tx_free: u16,
    pub last_desc_cleaned: u16,
    /// Descriptors written since the last RS bit was set; the full path
    /// OR's in RS once this reaches `tx_rs_thresh` (spec.md §4.4 step 8).
    pub nb_tx_used: u16,
    /// Pacing cursors for the simple Tx path (spec.md §4.5).
    pub tx_next_dd: u16,
    pub tx_next_rs: u16,
    pub state: QueueState,
    pub port_id: u16,
    pub queue_id: u16,
}

impl<D: DmaZone, B: Mbuf> TxQueue<D, B> {
    pub fn setup(
        config: TxQueueConfig,
        dma: D,
        port_id: u16,
        queue_id: u16,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let required_bytes = config.nb_desc as usize
            * (core::mem::size_of::<TxDataDesc>().max(core::mem::size_of::<TxContextDesc>()));
        if dma.len() < required_bytes {
            return Err(ConfigError::DmaAllocFailed(config.nb_desc));
        }

        let sw_ring = TxSwRing::new(config.nb_desc);
        let tx_rs_thresh = config.tx_rs_thresh;

        Ok(TxQueue {
            config,
            dma,
            sw_ring,
            tx_tail: 0,
            tx_free: config.nb_desc - 1,
            last_desc_cleaned: config.nb_desc - 1,
            nb_tx_used: 0,
            tx_next_dd: tx_rs_thresh - 1,
            tx_next_rs: tx_rs_thresh - 1,
            state: QueueState::Stopped,
            port_id,
            queue_id,
        })
    }

    pub fn start(&mut self) {
        self.tx_tail = 0;
        self.tx_free = self.config.nb_desc - 1;
        self.last_desc_cleaned = self.config.nb_desc - 1;
        self.nb_tx_used = 0;
        self.tx_next_dd = self.config.tx_rs_thresh - 1;
        self.tx_next_rs = self.config.tx_rs_thresh - 1;
        self.state = QueueState::Started;
        info!("tx queue {} started", self.queue_id);
    }

    pub fn stop(&mut self, pool: &mut impl Mempool<Buf = B>) {
        for idx in 0..self.sw_ring.len() as u16 {
            if let Some(buf) = self.sw_ring.take_mbuf(idx) {
                pool.put(buf);
            }
        }
        self.state = QueueState::Stopped;
        info!("tx queue {} stopped", self.queue_id);
    }

    #[inline]
    pub fn data_desc_ptr(&mut self) -> *mut TxDataDesc {
        self.dma.as_mut_ptr() as *mut TxDataDesc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::NumaSocket;
    use crate::testutil::{FakeDmaZone, FakeMempool, FakeTailRegister, FakeVsiMap, TestMbuf};

    fn rx_config() -> RxQueueConfig {
        RxQueueConfig {
            nb_desc: 128,
            rx_free_thresh: 32,
            crc_len: 0,
            scattered: false,
            socket: NumaSocket(0),
        }
    }

    fn tx_config() -> TxQueueConfig {
        TxQueueConfig {
            nb_desc: 128,
            tx_rs_thresh: 32,
            tx_free_thresh: 32,
            txq_flags: crate::config::TxqFlags::empty(),
            socket: NumaSocket(0),
        }
    }

    #[test]
    fn rx_setup_rejects_undersized_dma_zone() {
        let dma = FakeDmaZone::new(16, 0x1000);
        let vsi = FakeVsiMap;
        let err = RxQueue::<_, TestMbuf>::setup(rx_config(), dma, &vsi, 0, 0).unwrap_err();
        assert!(matches!(err, ConfigError::DmaAllocFailed(128)));
    }

    #[test]
    fn rx_setup_start_stop_roundtrip() {
        let dma = FakeDmaZone::new(128 * 32, 0x1000);
        let vsi = FakeVsiMap;
        let mut q = RxQueue::<_, TestMbuf>::setup(rx_config(), dma, &vsi, 0, 3).unwrap();
        assert_eq!(q.vsi, Some((0, 3)));
        let mut tail = FakeTailRegister::default();
        q.start(&mut tail);
        assert_eq!(q.state, QueueState::Started);
        assert_eq!(tail.last_written, Some(127));

        q.sw_ring.set(5, Some(TestMbuf::new(9)));
        let mut pool = FakeMempool::new(0);
        q.stop(&mut pool);
        assert_eq!(q.state, QueueState::Stopped);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn tx_setup_initializes_pacing_cursors() {
        let dma = FakeDmaZone::new(128 * 16, 0x2000);
        let q = TxQueue::<_, TestMbuf>::setup(tx_config(), dma, 0, 1).unwrap();
        assert_eq!(q.tx_next_dd, 31);
        assert_eq!(q.tx_next_rs, 31);
        assert_eq!(q.tx_free, 127);
    }

    #[test]
    fn rx_descriptor_done_reflects_dd_at_an_offset_from_the_tail() {
        let dma = FakeDmaZone::new(128 * 32, 0x3000);
        let vsi = FakeVsiMap;
        let mut q = RxQueue::<_, TestMbuf>::setup(rx_config(), dma, &vsi, 0, 0).unwrap();
        assert!(!q.rx_descriptor_done(0));

        let desc = unsafe { &mut *q.desc_ptr().add(3) };
        desc.qw1 = 1u64 << crate::descriptor::rx_qw1::DD_SHIFT;
        assert!(q.rx_descriptor_done(3));
        assert!(!q.rx_descriptor_done(2));
    }

    #[test]
    fn rx_queue_count_counts_consecutive_done_descriptors_from_the_tail() {
        let dma = FakeDmaZone::new(128 * 32, 0x3100);
        let vsi = FakeVsiMap;
        let mut q = RxQueue::<_, TestMbuf>::setup(rx_config(), dma, &vsi, 0, 0).unwrap();
        for i in 0..5u16 {
            let desc = unsafe { &mut *q.desc_ptr().add(i as usize) };
            desc.qw1 = 1u64 << crate::descriptor::rx_qw1::DD_SHIFT;
        }
        assert_eq!(q.rx_queue_count(), 5);

        q.rx_tail = 2;
        assert_eq!(q.rx_queue_count(), 3);
    }
}
