//! Full-featured Tx path (spec.md §4.4).
//!
//! Handles multi-segment packets and offloads: a context descriptor
//! precedes the data descriptors whenever TSO or outer-tunnel fields are in
//! play, VLAN/QinQ insertion and checksum requests are translated into the
//! per-descriptor command bits, and cleanup runs opportunistically whenever
//! free descriptors drop below `tx_free_thresh` (spec.md §4.4.1).

use crate::descriptor::{TxCmd, TxContextDesc, TxCtxCmd, TxDataDesc};
use crate::external::{write_barrier, TailRegister};
use crate::mempool::{Mbuf, Mempool, OlFlags};
use crate::queue::TxQueue;

impl<D: crate::external::DmaZone, B: Mbuf> TxQueue<D, B> {
    pub fn tx_xmit_pkts_full<M: Mempool<Buf = B> + ?Sized>(
        &mut self,
        pool: &mut M,
        tail_reg: &mut impl TailRegister,
        pkts: &[B],
    ) -> usize {
        let nb_desc = self.config.nb_desc;
        let mut sent = 0usize;

        for &pkt in pkts {
            let needs_ctx = needs_context_desc(pkt);
            let nb_segs = pkt.nb_segs().max(1) as usize;
            let descs_needed = nb_segs + if needs_ctx { 1 } else { 0 };

            if (self.tx_free as usize) < descs_needed {
                if self.tx_cleanup(pool) == 0 && (self.tx_free as usize) < descs_needed {
                    break;
                }
            }

            let group_start = self.tx_tail;
            // The final descriptor this packet will occupy, computed once so
            // every descriptor it touches (context included) can record it
            // as the `last_id` a future cleanup pass should chase (spec.md
            // §4.4 step 7, §4.4.1).
            let tx_last = (group_start + descs_needed as u16 - 1) % nb_desc;

            if needs_ctx {
                let ctx = build_context_desc(pkt);
                let idx = self.tx_tail;
                // SAFETY: context descriptors share the data-descriptor ring
                // slot layout (both 16 bytes); spec.md §3.
                let slot = unsafe {
                    &mut *(self.data_desc_ptr().add(idx as usize) as *mut TxContextDesc)
                };
                *slot = ctx;
                self.sw_ring.set_last_id(idx, tx_last);
                self.tx_tail = (idx + 1) % nb_desc;
                self.tx_free -= 1;
            }

            self.nb_tx_used += descs_needed as u16;
            let set_rs = self.nb_tx_used >= self.config.tx_rs_thresh;
            if set_rs {
                self.nb_tx_used = 0;
            }

            let mut seg = Some(pkt);
            let mut remaining = nb_segs;
            while let Some(cur) = seg {
                remaining -= 1;
                let is_last = remaining == 0;
                let idx = self.tx_tail;

                let mut cmd = build_cmd(pkt, is_last);
                if is_last && set_rs {
                    cmd |= TxCmd::RS;
                }

                let desc = unsafe { &mut *self.data_desc_ptr().add(idx as usize) };
                *desc = TxDataDesc::build(
                    cur.data_dma_addr(),
                    cmd,
                    offset_field(pkt),
                    cur.data_len(),
                    pkt.vlan_tci(),
                );

                if let Some(old) = self.sw_ring.take_mbuf(idx) {
                    pool.put(old);
                }
                self.sw_ring.set_mbuf(idx, Some(cur));
                self.sw_ring.set_last_id(idx, tx_last);

                self.tx_tail = (idx + 1) % nb_desc;
                self.tx_free -= 1;
                seg = cur.next();
            }

            sent += 1;
        }

        if sent > 0 {
            write_barrier();
            let new_tail = (self.tx_tail + nb_desc - 1) % nb_desc;
            tail_reg.write(new_tail as u32);
        }

        sent
    }
}

fn needs_context_desc<B: Mbuf>(pkt: B) -> bool {
    let flags = pkt.ol_flags();
    flags.contains(OlFlags::TX_TCP_SEG) || flags.is_tunneling() || flags.contains(OlFlags::TX_OUTER_IP_CKSUM)
}

fn build_context_desc<B: Mbuf>(pkt: B) -> TxContextDesc {
    let flags = pkt.ol_flags();
    let mut cmd = TxCtxCmd::empty();
    if flags.contains(OlFlags::TX_TCP_SEG) {
        cmd |= TxCtxCmd::TSO;
    }
    if flags.contains(OlFlags::TX_IEEE1588_TMST) {
        cmd |= TxCtxCmd::IEEE1588_TMST;
    }
    let tso_len = (pkt.outer_l2_len() as u32)
        + (pkt.outer_l3_len() as u32)
        + (pkt.l2_len() as u32)
        + (pkt.l3_len() as u32)
        + (pkt.l4_len() as u32);
    TxContextDesc::build(0, pkt.vlan_tci_outer(), cmd, tso_len, pkt.tso_segsz())
}

fn build_cmd<B: Mbuf>(pkt: B, is_last_segment: bool) -> TxCmd {
    let flags = pkt.ol_flags();
    let mut cmd = TxCmd::ICRC;
    if is_last_segment {
        cmd |= TxCmd::EOP;
    }
    if flags.contains(OlFlags::TX_VLAN) || flags.contains(OlFlags::TX_QINQ) {
        cmd |= TxCmd::IL2TAG1;
    }
    if flags.contains(OlFlags::TX_TCP_SEG) {
        cmd |= TxCmd::TSO;
    }
    if flags.contains(OlFlags::TX_IEEE1588_TMST) {
        cmd |= TxCmd::IEEE1588_TMST;
    }
    cmd
}

fn offset_field<B: Mbuf>(pkt: B) -> u64 {
    let maclen_dwords = (pkt.l2_len() as u64) / 2;
    let iplen_dwords = (pkt.l3_len() as u64) / 4;
    maclen_dwords | (iplen_dwords << 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TxQueueConfig;
    use crate::external::NumaSocket;
    use crate::testutil::{FakeDmaZone, FakeMempool, FakeTailRegister, TestMbuf};

    fn setup() -> TxQueue<FakeDmaZone, TestMbuf> {
        let config = TxQueueConfig {
            nb_desc: 32,
            tx_rs_thresh: 8,
            tx_free_thresh: 8,
            txq_flags: crate::config::TxqFlags::empty(),
            socket: NumaSocket(0),
        };
        let dma = FakeDmaZone::new(32 * core::mem::size_of::<TxDataDesc>(), 0x9000);
        let mut q = TxQueue::setup(config, dma, 0, 0).unwrap();
        q.start();
        q
    }

    #[test]
    fn single_segment_packet_consumes_one_descriptor() {
        let mut q = setup();
        let mut pool = FakeMempool::new(32);
        let mut tail = FakeTailRegister::default();
        let pkt = TestMbuf::new(1);
        let n = q.tx_xmit_pkts_full(&mut pool, &mut tail, &[pkt]);
        assert_eq!(n, 1);
        assert_eq!(q.tx_tail, 1);
    }

    #[test]
    fn tso_packet_gets_a_context_descriptor_first() {
        let mut q = setup();
        let mut pool = FakeMempool::new(32);
        let mut tail = FakeTailRegister::default();
        let mut pkt = TestMbuf::new(1);
        pkt.set_ol_flags(OlFlags::TX_TCP_SEG);
        let n = q.tx_xmit_pkts_full(&mut pool, &mut tail, &[pkt]);
        assert_eq!(n, 1);
        assert_eq!(q.tx_tail, 2);
    }

    #[test]
    fn rs_bit_lands_on_last_descriptor_once_nb_tx_used_hits_threshold() {
        let mut q = setup();
        let mut pool = FakeMempool::new(32);
        let mut tail = FakeTailRegister::default();

        let mut pkts = alloc::vec::Vec::new();
        for base in [100u32, 102, 104, 106] {
            let mut pkt = TestMbuf::new(base);
            pkt.set_nb_segs(2);
            pkt.set_next(Some(TestMbuf::new(base + 1)));
            pkts.push(pkt);
        }

        let n = q.tx_xmit_pkts_full(&mut pool, &mut tail, &pkts);
        assert_eq!(n, 4);
        assert_eq!(q.tx_tail, 8);
        assert_eq!(q.nb_tx_used, 0);

        let rs_desc = unsafe { &*q.data_desc_ptr().add(7) };
        assert_ne!(
            rs_desc.cmd_type_offset_bsz
                & (1u64 << (crate::descriptor::tx_qw1::CMD_SHIFT + 2)),
            0
        );
        for i in 0..7u16 {
            let desc = unsafe { &*q.data_desc_ptr().add(i as usize) };
            assert_eq!(
                desc.cmd_type_offset_bsz
                    & (1u64 << (crate::descriptor::tx_qw1::CMD_SHIFT + 2)),
                0
            );
            assert_eq!(q.sw_ring.last_id(i), 7);
        }
        assert!(q.sw_ring.mbuf(0).is_some());
        assert!(q.sw_ring.mbuf(1).is_some());
    }
}
