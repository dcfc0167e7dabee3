//! Tx buffer reclamation (spec.md §4.4.1).
//!
//! RS is only set on one descriptor per `tx_rs_thresh`-sized group, so
//! reclaiming probes a fixed stride ahead of the last cleanup point —
//! `last_desc_cleaned + tx_rs_thresh` — and follows *that* slot's recorded
//! `last_id` to the descriptor the next RS bit actually landed on. If
//! hardware has written DD into that descriptor, every buffer between the
//! last cleanup point and it is free to return to the pool in one pass.

use crate::descriptor::TxDataDesc;
use crate::mempool::{Mbuf, Mempool};
use crate::queue::TxQueue;

impl<D: crate::external::DmaZone, B: Mbuf> TxQueue<D, B> {
    /// Attempts one cleanup pass, returning the number of descriptors freed.
    /// Zero means the next RS-marked descriptor has not been written back
    /// yet; the caller (typically the full-featured path, spec.md §4.4 step
    /// 6) should stop adding work rather than spin on this.
    pub fn tx_cleanup<M: Mempool<Buf = B> + ?Sized>(&mut self, pool: &mut M) -> u16 {
        let nb_desc = self.config.nb_desc;
        let desc_to_clean_to = (self.last_desc_cleaned + self.config.tx_rs_thresh) % nb_desc;
        let last_id = self.sw_ring.last_id(desc_to_clean_to);
        // SAFETY: last_id is always < nb_desc, maintained by the Tx paths
        // that populate sw_ring.
        let desc = unsafe { &*(self.data_desc_ptr().add(last_id as usize) as *const TxDataDesc) };
        if !desc.is_done() {
            return 0;
        }
        crate::external::read_barrier();

        let mut idx = (self.last_desc_cleaned + 1) % nb_desc;
        let mut freed = 0u16;
        loop {
            if let Some(buf) = self.sw_ring.take_mbuf(idx) {
                pool.put(buf);
            }
            freed += 1;
            if idx == last_id {
                break;
            }
            idx = (idx + 1) % nb_desc;
        }

        // SAFETY: same slot as above, reborrowed mutably after the dd check.
        let desc_mut =
            unsafe { &mut *(self.data_desc_ptr().add(last_id as usize) as *mut TxDataDesc) };
        desc_mut.clear_type();

        self.last_desc_cleaned = last_id;
        self.tx_free += freed;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TxQueueConfig;
    use crate::external::NumaSocket;
    use crate::testutil::{FakeDmaZone, FakeMempool, TestMbuf};

    fn setup() -> TxQueue<FakeDmaZone, TestMbuf> {
        let config = TxQueueConfig {
            nb_desc: 32,
            tx_rs_thresh: 8,
            tx_free_thresh: 8,
            txq_flags: crate::config::TxqFlags::empty(),
            socket: NumaSocket(0),
        };
        let dma = FakeDmaZone::new(32 * core::mem::size_of::<TxDataDesc>(), 0x7000);
        TxQueue::setup(config, dma, 0, 0).unwrap()
    }

    #[test]
    fn cleanup_is_noop_until_rs_descriptor_is_done() {
        let mut q = setup();
        let mut pool = FakeMempool::new(32);
        assert_eq!(q.tx_cleanup(&mut pool), 0);
    }

    #[test]
    fn cleanup_reclaims_whole_group_once_done() {
        let mut q = setup();
        let mut pool = FakeMempool::new(32);
        // last_desc_cleaned starts at nb_desc - 1 == 31; the probe slot is
        // (31 + tx_rs_thresh) % nb_desc == 7, whose recorded last_id points
        // at the actual RS-marked descriptor, also index 7 here.
        q.sw_ring.set_last_id(7, 7);
        for i in 0..8u16 {
            let buf = pool.get().unwrap();
            q.sw_ring.set_mbuf(i, Some(buf));
        }
        let desc = unsafe { &mut *(q.data_desc_ptr().add(7) as *mut TxDataDesc) };
        desc.mark_done();

        let freed = q.tx_cleanup(&mut pool);
        assert_eq!(freed, 8);
        assert_eq!(q.last_desc_cleaned, 7);
        for i in 0..8u16 {
            assert!(q.sw_ring.mbuf(i).is_none());
        }
    }
}
