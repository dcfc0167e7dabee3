//! Simple Tx fast path (spec.md §4.5).
//!
//! Assumes every packet is a single segment with no offload flags set, so
//! each packet is exactly one data descriptor. RS is set once per
//! `tx_rs_thresh` descriptors rather than on every packet (`tx_next_rs`
//! tracks where to set it next), and reclamation uses its own `tx_next_dd`
//! DD-probe rather than the full path's group-chasing `tx_cleanup`: once
//! `tx_free` drops below `tx_free_thresh`, probe `tx_next_dd` directly and,
//! if done, bulk-free the whole `tx_rs_thresh`-sized group behind it in one
//! call (spec.md §4.5 steps 1-4).

use alloc::vec::Vec;

use crate::config::TxqFlags;
use crate::descriptor::{TxCmd, TxDataDesc};
use crate::external::{write_barrier, TailRegister};
use crate::mempool::{Mbuf, Mempool};
use crate::queue::TxQueue;

impl<D: crate::external::DmaZone, B: Mbuf> TxQueue<D, B> {
    pub fn tx_xmit_pkts_simple<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
        pkts: &[B],
    ) -> usize {
        let nb_desc = self.config.nb_desc;
        let mut sent = 0usize;

        for &pkt in pkts {
            if self.tx_free < self.config.tx_free_thresh {
                self.tx_simple_free_bufs(pool);
            }
            if self.tx_free == 0 {
                break;
            }

            let idx = self.tx_tail;
            let set_rs = idx == self.tx_next_rs;
            let mut cmd = TxCmd::EOP | TxCmd::ICRC;
            if set_rs {
                cmd |= TxCmd::RS;
            }

            let desc = unsafe { &mut *self.data_desc_ptr().add(idx as usize) };
            *desc = TxDataDesc::build(pkt.data_dma_addr(), cmd, 0, pkt.data_len(), pkt.vlan_tci());

            if let Some(old) = self.sw_ring.take_mbuf(idx) {
                pool.put(old);
            }
            self.sw_ring.set_mbuf(idx, Some(pkt));
            if set_rs {
                self.sw_ring.set_last_id(idx, idx);
                self.tx_next_rs = (self.tx_next_rs + self.config.tx_rs_thresh) % nb_desc;
            }

            self.tx_tail = (idx + 1) % nb_desc;
            self.tx_free -= 1;
            sent += 1;
        }

        if sent > 0 {
            write_barrier();
            let new_tail = (self.tx_tail + nb_desc - 1) % nb_desc;
            tail_reg.write(new_tail as u32);
        }

        sent
    }

    /// Probes `tx_next_dd` directly rather than chasing `last_id` the way
    /// `tx_cleanup` does: the simple path never builds a multi-segment
    /// group, so the descriptor RS was set on *is* `tx_next_dd` (spec.md
    /// §4.5 step 1).
    fn tx_simple_free_bufs<M: Mempool<Buf = B> + ?Sized>(&mut self, pool: &mut M) {
        let nb_desc = self.config.nb_desc;
        let thresh = self.config.tx_rs_thresh;

        let desc =
            unsafe { &*(self.data_desc_ptr().add(self.tx_next_dd as usize) as *const TxDataDesc) };
        if !desc.is_done() {
            return;
        }
        crate::external::read_barrier();

        let group_start = (self.tx_next_dd + nb_desc - (thresh - 1)) % nb_desc;
        if self.config.txq_flags.contains(TxqFlags::NOREFCOUNT) {
            let mut freed: Vec<B> = Vec::with_capacity(thresh as usize);
            for i in 0..thresh {
                let idx = (group_start + i) % nb_desc;
                if let Some(buf) = self.sw_ring.take_mbuf(idx) {
                    freed.push(buf);
                }
            }
            pool.put_bulk(&freed);
        } else {
            for i in 0..thresh {
                let idx = (group_start + i) % nb_desc;
                if let Some(buf) = self.sw_ring.take_mbuf(idx) {
                    pool.put(buf);
                }
            }
        }

        let desc_mut = unsafe {
            &mut *(self.data_desc_ptr().add(self.tx_next_dd as usize) as *mut TxDataDesc)
        };
        desc_mut.clear_type();

        self.tx_next_dd = (self.tx_next_dd + thresh) % nb_desc;
        self.tx_free += thresh;
    }
}
