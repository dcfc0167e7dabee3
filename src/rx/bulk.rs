//! Bulk-alloc Rx path with an 8-descriptor status look-ahead (spec.md §4.2).
//!
//! Scanning and replenishment are decoupled. Each call scans up to
//! [`RX_MAX_BURST`] descriptors in groups of [`LOOK_AHEAD`], snapshotting
//! every group's status quadwords before touching ring state and stopping
//! at the first descriptor without DD set; everything scanned goes
//! straight into `rx_stage` rather than being handed back immediately, so a
//! caller asking for fewer packets than were scanned still gets the rest on
//! a later call. Replenishment happens separately, once the scan crosses
//! `rx_free_trigger`: a whole `rx_free_thresh`-sized block of fresh buffers
//! is bulk-allocated and posted in one mempool call (spec.md §4.2 step 5).
//! If that bulk-alloc fails, the scan that crossed the trigger is unwound
//! entirely — descriptors go back to being hardware-owned as far as the
//! driver's bookkeeping is concerned — so the next call retries from
//! scratch once the pool has recovered (spec.md §4.2 step 6).

use alloc::vec::Vec;

use crate::descriptor::RxWriteback;
use crate::external::{read_barrier, write_barrier, TailRegister};
use crate::mempool::{Mbuf, Mempool};
use crate::queue::RxQueue;
use crate::rx::common::finalize_mbuf;

pub const RX_MAX_BURST: usize = 32;
pub const LOOK_AHEAD: usize = 8;

impl<D: crate::external::DmaZone, B: Mbuf> RxQueue<D, B> {
    /// Receives up to `nb_pkts` packets, fragmenting the request into
    /// `RX_MAX_BURST`-sized chunks and stopping early the first time a
    /// chunk comes back short (spec.md §4.2 step 1).
    pub fn rx_recv_pkts_bulk<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        let mut received = 0usize;
        while received < nb_pkts {
            let remaining = nb_pkts - received;
            let chunk_budget = remaining.min(RX_MAX_BURST);
            let n = self.rx_recv_pkts_bulk_once(pool, tail_reg, out, remaining);
            received += n;
            if n < chunk_budget {
                break;
            }
        }
        received
    }

    fn rx_recv_pkts_bulk_once<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        if self.rx_next_avail >= self.rx_stage.len() {
            self.rx_scan_and_stage(pool, tail_reg);
        }
        self.rx_fill_from_stage(out, nb_pkts.min(RX_MAX_BURST))
    }

    /// Drains already-staged packets into `out`, up to `max`.
    fn rx_fill_from_stage(&mut self, out: &mut Vec<B>, max: usize) -> usize {
        let avail = self.rx_stage.len() - self.rx_next_avail;
        let n = avail.min(max);
        out.extend_from_slice(&self.rx_stage[self.rx_next_avail..self.rx_next_avail + n]);
        self.rx_next_avail += n;
        if self.rx_next_avail == self.rx_stage.len() {
            self.rx_stage.clear();
            self.rx_next_avail = 0;
        }
        n
    }

    /// Scans up to `RX_MAX_BURST` descriptors in `LOOK_AHEAD`-sized groups,
    /// staging every packet found, then replenishes if the scan crossed
    /// `rx_free_trigger` (spec.md §4.2 steps 2-6). Leaves `rx_stage` empty
    /// if nothing was found, or unwinds it if a crossed trigger's replenish
    /// failed.
    fn rx_scan_and_stage<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
    ) {
        let nb_desc = self.config.nb_desc as usize;
        let scan_start = self.rx_tail;
        let mut scanned = 0usize;
        let mut taken: Vec<(u16, B)> = Vec::new();

        'groups: for _ in 0..(RX_MAX_BURST / LOOK_AHEAD) {
            let mut wbs: [Option<RxWriteback>; LOOK_AHEAD] = [None; LOOK_AHEAD];
            for (j, slot) in wbs.iter_mut().enumerate() {
                let idx = (scan_start as usize + scanned + j) % nb_desc;
                // SAFETY: idx < nb_desc, ring sized by the caller at setup.
                let desc = unsafe { &*self.desc_ptr().add(idx) };
                *slot = Some(RxWriteback::parse(desc.hash_quadword(), desc.status_quadword()));
            }
            read_barrier();

            let mut good = 0usize;
            for wb in &wbs {
                if !wb.expect("filled above").dd() {
                    break;
                }
                good += 1;
            }

            for (j, wb) in wbs.iter().enumerate().take(good) {
                let idx = (scan_start as usize + scanned + j) % nb_desc;
                let wb = wb.expect("filled above");
                let mut buf = self
                    .sw_ring
                    .take(idx as u16)
                    .expect("every posted descriptor has a buffer");
                finalize_mbuf(&mut buf, &wb, &self.ptype_table, wb.length_pbuf);
                taken.push((idx as u16, buf));
                self.rx_stage.push(buf);
            }

            scanned += good;
            if good < LOOK_AHEAD {
                break 'groups;
            }
        }

        if scanned == 0 {
            return;
        }

        let raw_new_tail = scan_start as usize + scanned;
        self.rx_tail = (raw_new_tail % nb_desc) as u16;

        if raw_new_tail > self.rx_free_trigger as usize && !self.rx_alloc_bufs(pool, tail_reg) {
            for (idx, buf) in taken {
                self.sw_ring.set(idx, Some(buf));
            }
            self.rx_stage.clear();
            self.rx_tail = scan_start;
        }
    }

    /// Bulk-allocates one `rx_free_thresh`-sized block of replacement
    /// buffers, posts their DMA addresses, and moves the tail register up
    /// to `rx_free_trigger` rather than to `rx_tail` (spec.md §4.2 step 5).
    fn rx_alloc_bufs<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
    ) -> bool {
        let nb_desc = self.config.nb_desc;
        let thresh = self.config.rx_free_thresh;
        // In bounds because rx_free_trigger only ever advances in
        // thresh-sized steps from thresh - 1 (spec.md §4.2 step 5).
        let alloc_idx = self.rx_free_trigger + 1 - thresh;

        let mut fresh = Vec::with_capacity(thresh as usize);
        if !pool.get_bulk(thresh as usize, &mut fresh) {
            return false;
        }

        for (i, mut buf) in fresh.into_iter().enumerate() {
            buf.reset_for_rx();
            let idx = alloc_idx + i as u16;
            // SAFETY: idx < nb_desc by the invariant above.
            let desc = unsafe { &mut *self.desc_ptr().add(idx as usize) };
            desc.set_read_form(buf.data_dma_addr(), 0);
            self.sw_ring.set(idx, Some(buf));
        }

        write_barrier();
        tail_reg.write(self.rx_free_trigger as u32);

        let mut new_trigger = self.rx_free_trigger + thresh;
        if new_trigger >= nb_desc {
            new_trigger = thresh - 1;
        }
        self.rx_free_trigger = new_trigger;
        true
    }
}
