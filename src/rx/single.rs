//! Single-buffer reference Rx path (spec.md §4.1).
//!
//! Processes one descriptor at a time: snapshot the writeback, allocate its
//! replacement before touching anything else, and only advance the ring once
//! the replacement is in hand. Simplest of the three paths and the one the
//! other two are checked against.

use alloc::vec::Vec;

use crate::descriptor::{RxDesc, RxWriteback};
use crate::external::{read_barrier, write_barrier, TailRegister};
use crate::mempool::{Mbuf, Mempool};
use crate::queue::RxQueue;
use crate::rx::common::finalize_mbuf;

impl<D: crate::external::DmaZone, B: Mbuf> RxQueue<D, B> {
    /// Receives up to `nb_pkts` packets into `out`, returning the number
    /// actually received. Stops early if the mempool cannot supply a
    /// replacement buffer, leaving the unconsumed descriptor for the next
    /// call (spec.md §4.1 step 2).
    pub fn rx_recv_pkts_single<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        let nb_desc = self.config.nb_desc;
        let mut received = 0usize;

        while received < nb_pkts {
            let idx = self.rx_tail;
            // SAFETY: idx is always < nb_desc and desc_ptr points at a ring
            // of exactly nb_desc RxDesc slots sized by the caller at setup.
            let desc = unsafe { &mut *self.desc_ptr().add(idx as usize) };
            let wb = RxWriteback::parse(desc.hash_quadword(), desc.status_quadword());
            if !wb.dd() {
                break;
            }
            read_barrier();

            let Some(mut replacement) = pool.get() else {
                break;
            };
            replacement.reset_for_rx();

            let mut received_buf = self
                .sw_ring
                .take(idx)
                .expect("every posted descriptor has a buffer");
            finalize_mbuf(&mut received_buf, &wb, &self.ptype_table, wb.length_pbuf);

            desc.set_read_form(replacement.data_dma_addr(), 0);
            self.sw_ring.set(idx, Some(replacement));

            out.push(received_buf);
            received += 1;
            self.rx_tail = (idx + 1) % nb_desc;
            self.nb_rx_hold += 1;
        }

        if self.nb_rx_hold > self.config.rx_free_thresh {
            write_barrier();
            let new_tail = (self.rx_tail + nb_desc - 1) % nb_desc;
            tail_reg.write(new_tail as u32);
            self.nb_rx_hold = 0;
        }

        received
    }
}

#[allow(dead_code)]
fn _assert_shape(_: &RxDesc) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RxQueueConfig;
    use crate::descriptor::rx_qw1;
    use crate::external::NumaSocket;
    use crate::testutil::{FakeDmaZone, FakeMempool, FakeTailRegister, FakeVsiMap, TestMbuf};

    fn setup() -> RxQueue<FakeDmaZone, TestMbuf> {
        let config = RxQueueConfig {
            nb_desc: 64,
            rx_free_thresh: 32,
            crc_len: 0,
            scattered: false,
            socket: NumaSocket(0),
        };
        let dma = FakeDmaZone::new(64 * core::mem::size_of::<RxDesc>(), 0x4000);
        let vsi = FakeVsiMap;
        let mut q = RxQueue::setup(config, dma, &vsi, 0, 0).unwrap();
        let mut pool = FakeMempool::new(128);
        for i in 0..64u16 {
            let buf = pool.get().unwrap();
            let desc = unsafe { &mut *q.desc_ptr().add(i as usize) };
            desc.set_read_form(buf.data_dma_addr(), 0);
            q.sw_ring.set(i, Some(buf));
        }
        q
    }

    #[test]
    fn empty_ring_returns_zero() {
        let mut q = setup();
        let mut pool = FakeMempool::new(64);
        let mut tail = FakeTailRegister::default();
        let mut out = Vec::new();
        let n = q.rx_recv_pkts_single(&mut pool, &mut tail, &mut out, 32);
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn full_burst_returns_requested_count() {
        let mut q = setup();
        for i in 0..32u16 {
            let desc = unsafe { &mut *q.desc_ptr().add(i as usize) };
            desc.qw1 = 1u64 << rx_qw1::DD_SHIFT
                | 1u64 << rx_qw1::EOF_SHIFT
                | (64u64 << rx_qw1::LENGTH_PBUF_SHIFT);
        }
        let mut pool = FakeMempool::new(128);
        let mut tail = FakeTailRegister::default();
        let mut out = Vec::new();
        let n = q.rx_recv_pkts_single(&mut pool, &mut tail, &mut out, 32);
        assert_eq!(n, 32);
        assert_eq!(out.len(), 32);
        assert_eq!(tail.write_count, 1);
    }
}
