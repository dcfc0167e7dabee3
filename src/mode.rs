//! Mode selection (spec.md §4.8): choosing one Rx and one Tx implementation
//! per queue at setup time, the way hermit's virtio driver picks between
//! split and packed virtqueue layouts behind a `Box<dyn Virtq>` rather than
//! branching on a ring kind flag in every hot-path call.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::external::{DmaZone, TailRegister};
use crate::mempool::{Mbuf, Mempool};
use crate::queue::{RxQueue, TxQueue};

/// Picks the Rx implementation for a queue. Scattered wins whenever the
/// queue was configured for it, since it is a strict superset of the
/// bulk-alloc path's behavior for single-segment frames; otherwise
/// bulk-alloc is preferred for its lower per-packet overhead, matching
/// DPDK's own default preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxMode {
    Single,
    Bulk,
    Scattered,
}

impl RxMode {
    pub fn select(scattered: bool, bulk_alloc_capable: bool) -> Self {
        if scattered {
            RxMode::Scattered
        } else if bulk_alloc_capable {
            RxMode::Bulk
        } else {
            RxMode::Single
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    Full,
    Simple,
}

impl TxMode {
    /// The simple path can be used only when the application never sets an
    /// offload flag, every packet it hands in is single-segment, and the
    /// queue's RS group is large enough for the pacing cursors to stay
    /// meaningfully ahead of the ring (spec.md §4.5); `offloads_enabled` is
    /// decided once at device configuration, not per packet.
    pub fn select(offloads_enabled: bool, tx_rs_thresh: u16) -> Self {
        if offloads_enabled || tx_rs_thresh < 32 {
            TxMode::Full
        } else {
            TxMode::Simple
        }
    }
}

/// A trait-object seam over the chosen Rx implementation, so call sites do
/// not need to match on [`RxMode`] themselves.
///
/// Takes the mempool as `&mut dyn Mempool<Buf = B>` rather than a generic
/// parameter: a generic method here would make the trait impossible to put
/// behind `Box<dyn RxBurst<..>>`, which is the entire point of this seam.
pub trait RxBurst<D: DmaZone, B: Mbuf> {
    fn burst(
        &self,
        queue: &mut RxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize;
}

struct SingleRx;
struct BulkRx;
struct ScatteredRx;

impl<D: DmaZone, B: Mbuf> RxBurst<D, B> for SingleRx {
    fn burst(
        &self,
        queue: &mut RxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        queue.rx_recv_pkts_single(pool, tail_reg, out, nb_pkts)
    }
}

impl<D: DmaZone, B: Mbuf> RxBurst<D, B> for BulkRx {
    fn burst(
        &self,
        queue: &mut RxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        queue.rx_recv_pkts_bulk(pool, tail_reg, out, nb_pkts)
    }
}

impl<D: DmaZone, B: Mbuf> RxBurst<D, B> for ScatteredRx {
    fn burst(
        &self,
        queue: &mut RxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        out: &mut Vec<B>,
        nb_pkts: usize,
    ) -> usize {
        queue.rx_recv_scattered_pkts(pool, tail_reg, out, nb_pkts)
    }
}

/// Resolves a mode into the boxed implementation the queue will dispatch
/// through for the rest of its lifetime.
pub fn rx_burst_fn<D: DmaZone + 'static, B: Mbuf + 'static>(
    mode: RxMode,
) -> Box<dyn RxBurst<D, B>> {
    match mode {
        RxMode::Single => Box::new(SingleRx),
        RxMode::Bulk => Box::new(BulkRx),
        RxMode::Scattered => Box::new(ScatteredRx),
    }
}

pub trait TxBurst<D: DmaZone, B: Mbuf> {
    fn burst(
        &self,
        queue: &mut TxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        pkts: &[B],
    ) -> usize;
}

struct FullTx;
struct SimpleTx;

impl<D: DmaZone, B: Mbuf> TxBurst<D, B> for FullTx {
    fn burst(
        &self,
        queue: &mut TxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        pkts: &[B],
    ) -> usize {
        queue.tx_xmit_pkts_full(pool, tail_reg, pkts)
    }
}

impl<D: DmaZone, B: Mbuf> TxBurst<D, B> for SimpleTx {
    fn burst(
        &self,
        queue: &mut TxQueue<D, B>,
        pool: &mut dyn Mempool<Buf = B>,
        tail_reg: &mut dyn TailRegister,
        pkts: &[B],
    ) -> usize {
        queue.tx_xmit_pkts_simple(pool, tail_reg, pkts)
    }
}

pub fn tx_burst_fn<D: DmaZone + 'static, B: Mbuf + 'static>(
    mode: TxMode,
) -> Box<dyn TxBurst<D, B>> {
    match mode {
        TxMode::Full => Box::new(FullTx),
        TxMode::Simple => Box::new(SimpleTx),
    }
}
