//! Scattered (multi-segment) Rx path (spec.md §4.3).
//!
//! Used when an incoming frame is larger than one mbuf's data area. Each
//! hardware descriptor still yields exactly one segment; the driver chains
//! segments onto `pkt_first_seg`/`pkt_last_seg` across calls until a
//! descriptor's EOF bit closes the chain, at which point the full packet is
//! handed to the caller. State survives between calls so a packet can span
//! a burst boundary.

use alloc::vec::Vec;

use crate::descriptor::RxWriteback;
use crate::external::{read_barrier, write_barrier, TailRegister};
use crate::mempool::Mbuf;
use crate::mempool::Mempool;
use crate::queue::RxQueue;
use crate::rx::common::apply_packet_metadata;

impl<D: crate::external::DmaZone, B: Mbuf> RxQueue<D, B> {
    pub fn rx_recv_scattered_pkts<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        let nb_desc = self.config.nb_desc;
        let mut received = 0usize;

        loop {
            if received >= nb_pkts {
                break;
            }
            let idx = self.rx_tail;
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

            let mut seg = self
                .sw_ring
                .take(idx)
                .expect("every posted descriptor has a buffer");
            seg.set_data_len(wb.length_pbuf);
            seg.set_pkt_len(wb.length_pbuf as u32);
            seg.set_next(None);

            desc.set_read_form(replacement.data_dma_addr(), 0);
            self.sw_ring.set(idx, Some(replacement));
            self.rx_tail = (idx + 1) % nb_desc;
            self.nb_rx_hold += 1;

            match (self.pkt_first_seg, self.pkt_last_seg) {
                (None, _) => {
                    self.pkt_first_seg = Some(seg);
                    self.pkt_last_seg = Some(seg);
                    self.pkt_prev_seg = None;
                }
                (Some(mut first), Some(mut last)) => {
                    last.set_next(Some(seg));
                    let nb_segs = first.nb_segs() + 1;
                    first.set_nb_segs(nb_segs);
                    first.set_pkt_len(first.pkt_len() + seg.data_len() as u32);
                    self.pkt_prev_seg = Some(last);
                    self.pkt_first_seg = Some(first);
                    self.pkt_last_seg = Some(seg);
                }
                _ => unreachable!("first/last are set together"),
            }

            if wb.eof() {
                let mut first = self.pkt_first_seg.take().expect("just assigned above");
                let last = self.pkt_last_seg.take().expect("first/last are set together");
                let prev = self.pkt_prev_seg.take();
                apply_packet_metadata(&mut first, &wb, &self.ptype_table);
                self.trim_crc(pool, &mut first, last, prev);
                out.push(first);
                received += 1;
            }
        }

        if self.nb_rx_hold > self.config.rx_free_thresh {
            write_barrier();
            let new_tail = (self.rx_tail + nb_desc - 1) % nb_desc;
            tail_reg.write(new_tail as u32);
            self.nb_rx_hold = 0;
        }

        received
    }

    /// Strips the 4-byte CRC hardware left attached to the final segment
    /// (spec.md §4.3). If the CRC straddles the segment boundary — the
    /// final segment holds 4 bytes or fewer of real payload — that segment
    /// is dropped entirely and the shortfall comes off its predecessor
    /// instead, which becomes the new last segment.
    fn trim_crc<M: Mempool<Buf = B> + ?Sized>(
        &self,
        pool: &mut M,
        first: &mut B,
        mut last: B,
        prev: Option<B>,
    ) {
        let crc_len = self.config.crc_len as u32;
        if crc_len == 0 {
            return;
        }
        first.set_pkt_len(first.pkt_len().saturating_sub(crc_len));

        if (last.data_len() as u32) <= crc_len {
            let deficit = crc_len - last.data_len() as u32;
            match prev {
                Some(mut prev) => {
                    prev.set_data_len(prev.data_len() - deficit as u16);
                    prev.set_next(None);
                    first.set_nb_segs(first.nb_segs() - 1);
                    pool.put(last);
                }
                None => {
                    // Single-segment packet; nothing to fall back onto, so
                    // just clamp the one segment we have.
                    last.set_data_len(last.data_len().saturating_sub(crc_len as u16));
                }
            }
        } else {
            last.set_data_len(last.data_len() - crc_len as u16);
        }
    }
}
